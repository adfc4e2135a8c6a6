//! Server fixtures for end-to-end tests.
//!
//! A fixture starts a server, exposes the address it is reachable at, and
//! tears it down again:
//! - [`ServerFixture`]: the start/dispose contract implemented per server kind
//! - [`FixtureHost`]: starts the fixture on first access to its root address,
//!   exactly once, and rewrites the host for remote browser runs
//! - [`run_in_background`]: bounded execution of blocking startup routines
//! - [`find_sample_or_test_site_path`]: test application directories
//!   declared at build time
//!
//! Bundled fixtures: [`StaticSiteServerFixture`], [`ProcessServerFixture`]
//! and [`ExternalUrlFixture`].

pub mod background;
pub mod fixture;
pub mod process;
pub mod projects;
pub mod static_site;

pub use background::{STARTUP_TIMEOUT, run_in_background, run_in_background_with_timeout};
pub use errors::{FixtureError, ProjectError, TimeoutError};
pub use fixture::{ExternalUrlFixture, FixtureHost, ServerFixture, apply_remote_host};
pub use process::ProcessServerFixture;
pub use projects::{
    ProjectRegistry, SANDBOX_ENV_VAR, find_sample_or_test_site_path, resolve_sandboxed,
};
pub use static_site::StaticSiteServerFixture;
pub use url::Url;

/// Installs a `RUST_LOG`-filtered fmt subscriber for tests.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
