//! # E2E Test Configuration
//!
//! Options consumed by the server fixtures.
//!
//! This crate provides:
//! - The `E2eTestOptions` structure (remote browser execution, wait timeouts)
//! - Settings file loading (TOML/YAML)
//! - Environment overrides (`E2ETESTS_*`)
//! - A process-wide, lazily loaded instance

pub mod config;
pub mod file_loader;
pub mod loader;

pub use config::{E2eTestOptions, SauceOptions};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{SETTINGS_FILE_ENV, apply_env_overrides, load_options};
pub use validator::Validate;
