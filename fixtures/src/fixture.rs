//! Server fixture contract and the lazily resolved root address.

use config::E2eTestOptions;
use errors::FixtureError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use url::Url;

/// A server started for end-to-end tests.
///
/// Implementations only know how to start and stop their server. Lazy
/// startup, caching and remote host rewriting live in [`FixtureHost`].
pub trait ServerFixture: Send + Sync {
    /// Starts the server and returns the absolute address it listens on.
    ///
    /// Called at most once per [`FixtureHost`].
    fn start_and_get_root_uri(&self) -> anyhow::Result<String>;

    /// Releases every resource held by the server.
    fn dispose(&mut self) -> anyhow::Result<()>;
}

/// Owns a [`ServerFixture`] and its root address.
///
/// The first call to [`root_uri`](Self::root_uri), from any thread, starts
/// the server. Concurrent callers block until that single startup finishes
/// and all of them observe the same address or the same error. A failed
/// startup is never retried.
///
/// Dropping a host that was not disposed explicitly disposes the fixture.
pub struct FixtureHost<F: ServerFixture> {
    fixture: F,
    options: E2eTestOptions,
    root_uri: OnceLock<anyhow::Result<Url>>,
    disposed: bool,
}

impl<F: ServerFixture> FixtureHost<F> {
    /// Wraps `fixture` using the process-wide E2E options.
    pub fn new(fixture: F) -> Self {
        Self::with_options(fixture, E2eTestOptions::instance().clone())
    }

    pub fn with_options(fixture: F, options: E2eTestOptions) -> Self {
        Self {
            fixture,
            options,
            root_uri: OnceLock::new(),
            disposed: false,
        }
    }

    /// The address of the started server, starting it on first access.
    ///
    /// The error is the one returned by
    /// [`ServerFixture::start_and_get_root_uri`], so `downcast_ref` recovers
    /// its original type. If the startup panics, the first caller receives
    /// the panic and later callers a [`FixtureError::StartupPanicked`].
    pub fn root_uri(&self) -> Result<&Url, &anyhow::Error> {
        let mut panic_payload: Option<Box<dyn Any + Send>> = None;

        let resolved = self.root_uri.get_or_init(|| {
            match panic::catch_unwind(AssertUnwindSafe(|| self.resolve_root_uri())) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    panic_payload = Some(payload);
                    Err(FixtureError::StartupPanicked { message }.into())
                }
            }
        });

        if let Some(payload) = panic_payload {
            panic::resume_unwind(payload);
        }

        resolved.as_ref()
    }

    /// Whether startup has completed, successfully or not.
    pub fn is_started(&self) -> bool {
        self.root_uri.get().is_some()
    }

    pub fn fixture(&self) -> &F {
        &self.fixture
    }

    pub fn options(&self) -> &E2eTestOptions {
        &self.options
    }

    /// Tears the server down.
    pub fn dispose(mut self) -> anyhow::Result<()> {
        self.disposed = true;
        self.fixture.dispose()
    }

    fn resolve_root_uri(&self) -> anyhow::Result<Url> {
        debug!(fixture = std::any::type_name::<F>(), "Starting server fixture");

        let raw = self.fixture.start_and_get_root_uri()?;
        let mut uri = Url::parse(&raw).map_err(|e| FixtureError::InvalidRootUri {
            uri: raw.clone(),
            reason: e.to_string(),
        })?;

        if let Some(host) = self.options.remote_host() {
            uri = apply_remote_host(&uri, host)?;
            info!(%uri, "Root uri rewritten for remote browser execution");
        }

        info!(root_uri = %uri, "Server fixture started");
        Ok(uri)
    }
}

impl<F: ServerFixture> Drop for FixtureHost<F> {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        if let Err(e) = self.fixture.dispose() {
            warn!(error = %e, "Failed to dispose server fixture");
        }
    }
}

/// Rebuilds `uri` from its scheme and port with `host` as the host.
pub fn apply_remote_host(uri: &Url, host: &str) -> Result<Url, FixtureError> {
    let invalid = |reason: String| FixtureError::InvalidRemoteHost {
        host: host.to_string(),
        reason,
    };

    let mut remote = uri.clone();
    remote.set_host(Some(host)).map_err(|e| invalid(e.to_string()))?;
    remote.set_path("/");
    remote.set_query(None);
    remote.set_fragment(None);
    remote
        .set_username("")
        .and_then(|()| remote.set_password(None))
        .map_err(|()| invalid("address cannot carry credentials".to_string()))?;

    Ok(remote)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Fixture for a server that is already running elsewhere.
#[derive(Debug, Clone)]
pub struct ExternalUrlFixture {
    url: String,
}

impl ExternalUrlFixture {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ServerFixture for ExternalUrlFixture {
    fn start_and_get_root_uri(&self) -> anyhow::Result<String> {
        Ok(self.url.clone())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
