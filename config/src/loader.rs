//! # Environment Loader
//!
//! Builds the E2E test options from defaults, an optional settings file and
//! environment variables, in that order of precedence (environment wins).
//!
//! # Naming Convention
//! - `E2ETESTS_SETTINGS_FILE`: path of a TOML/YAML settings file
//! - `E2ETESTS_*`: top-level options (`E2ETESTS_SAUCE_TEST`, ...)
//! - `E2ETESTS_SAUCE_*`: remote grid options (`E2ETESTS_SAUCE_HOST_NAME`, ...)

use crate::config::E2eTestOptions;
use crate::file_loader::{ConfigFileError, load_from_file};
use std::env;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use validator::Validate;

/// Environment variable naming an optional settings file.
pub const SETTINGS_FILE_ENV: &str = "E2ETESTS_SETTINGS_FILE";

const ENV_PREFIX: &str = "E2ETESTS_";

static INSTANCE: LazyLock<E2eTestOptions> = LazyLock::new(|| match load_options() {
    Ok(options) => {
        debug!(sauce_test = options.sauce_test, "E2E test options loaded");
        options
    }
    Err(e) => {
        warn!(error = %e, "Invalid E2E test options, falling back to local defaults");
        E2eTestOptions::default()
    }
});

impl E2eTestOptions {
    /// Process-wide options, loaded once on first access.
    pub fn instance() -> &'static Self {
        &INSTANCE
    }
}

/// Load options from the settings file (if any) and the environment.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Produces a validated options snapshot. Environment variables override
/// values read from the settings file, which override defaults.
///
/// ## Environment Variables
/// - `E2ETESTS_DEFAULT_WAIT_TIMEOUT_IN_SECONDS`: wait timeout (default: 3)
/// - `E2ETESTS_SCREENSHOTS_PATH`: screenshot directory
/// - `E2ETESTS_SAUCE_TEST`: remote execution (true/false, default: false)
/// - `E2ETESTS_SAUCE_HOST_NAME`: host substituted into root addresses
/// - `E2ETESTS_SAUCE_USERNAME`, `E2ETESTS_SAUCE_ACCESS_KEY`,
///   `E2ETESTS_SAUCE_TUNNEL_IDENTIFIER`, `E2ETESTS_SAUCE_PLATFORM_NAME`,
///   `E2ETESTS_SAUCE_BROWSER_NAME`, `E2ETESTS_SAUCE_VERSION`,
///   `E2ETESTS_SAUCE_DEVICE_NAME`, `E2ETESTS_SAUCE_DEVICE_ORIENTATION`,
///   `E2ETESTS_SAUCE_APPIUM_VERSION`, `E2ETESTS_SAUCE_SELENIUM_VERSION`
pub fn load_options() -> Result<E2eTestOptions, ConfigFileError> {
    let mut options = match env::var(SETTINGS_FILE_ENV) {
        Ok(path) if !path.is_empty() => load_from_file(Path::new(&path))?,
        _ => E2eTestOptions::default(),
    };

    apply_env_overrides(&mut options)?;
    options.validate()?;

    Ok(options)
}

/// Overwrite every option that has a matching `E2ETESTS_*` variable.
pub fn apply_env_overrides(options: &mut E2eTestOptions) -> Result<(), ConfigFileError> {
    if let Some(timeout) = parse_env("DEFAULT_WAIT_TIMEOUT_IN_SECONDS")? {
        options.default_wait_timeout_in_seconds = timeout;
    }
    if let Some(path) = read_env("SCREENSHOTS_PATH") {
        options.screenshots_path = Some(path);
    }
    if let Some(sauce_test) = parse_env("SAUCE_TEST")? {
        options.sauce_test = sauce_test;
    }

    let sauce = &mut options.sauce;
    let fields = [
        ("SAUCE_USERNAME", &mut sauce.username),
        ("SAUCE_ACCESS_KEY", &mut sauce.access_key),
        ("SAUCE_TUNNEL_IDENTIFIER", &mut sauce.tunnel_identifier),
        ("SAUCE_HOST_NAME", &mut sauce.host_name),
        ("SAUCE_PLATFORM_NAME", &mut sauce.platform_name),
        ("SAUCE_BROWSER_NAME", &mut sauce.browser_name),
        ("SAUCE_VERSION", &mut sauce.version),
        ("SAUCE_DEVICE_NAME", &mut sauce.device_name),
        ("SAUCE_DEVICE_ORIENTATION", &mut sauce.device_orientation),
        ("SAUCE_APPIUM_VERSION", &mut sauce.appium_version),
        ("SAUCE_SELENIUM_VERSION", &mut sauce.selenium_version),
    ];
    for (suffix, field) in fields {
        if let Some(value) = read_env(suffix) {
            *field = value;
        }
    }

    Ok(())
}

fn read_env(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn parse_env<T>(suffix: &str) -> Result<Option<T>, ConfigFileError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    match env::var(&key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigFileError::InvalidEnv {
                key,
                reason: e.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const VARS: &[&str] = &[
        SETTINGS_FILE_ENV,
        "E2ETESTS_DEFAULT_WAIT_TIMEOUT_IN_SECONDS",
        "E2ETESTS_SCREENSHOTS_PATH",
        "E2ETESTS_SAUCE_TEST",
        "E2ETESTS_SAUCE_HOST_NAME",
        "E2ETESTS_SAUCE_BROWSER_NAME",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_options_defaults() {
        clear_env();
        let options = load_options().unwrap();
        assert_eq!(options, E2eTestOptions::default());
    }

    #[test]
    #[serial]
    fn test_load_options_env_overrides() {
        clear_env();
        unsafe {
            env::set_var("E2ETESTS_SAUCE_TEST", "true");
            env::set_var("E2ETESTS_SAUCE_HOST_NAME", "sauce-host");
            env::set_var("E2ETESTS_SAUCE_BROWSER_NAME", "firefox");
            env::set_var("E2ETESTS_DEFAULT_WAIT_TIMEOUT_IN_SECONDS", "15");
        }

        let options = load_options().unwrap();
        assert!(options.sauce_test);
        assert_eq!(options.remote_host(), Some("sauce-host"));
        assert_eq!(options.sauce.browser_name, "firefox");
        assert_eq!(options.default_wait_timeout_in_seconds, 15);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_settings_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e.toml");
        fs::write(
            &path,
            "sauce_test = true\nscreenshots_path = \"from-file\"\n[sauce]\nhost_name = \"file-host\"\n",
        )
        .unwrap();
        unsafe {
            env::set_var(SETTINGS_FILE_ENV, &path);
            env::set_var("E2ETESTS_SAUCE_HOST_NAME", "env-host");
        }

        let options = load_options().unwrap();
        assert!(options.sauce_test);
        assert_eq!(options.sauce.host_name, "env-host");
        assert_eq!(options.screenshots_path.as_deref(), Some("from-file"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_bool_is_reported() {
        clear_env();
        unsafe {
            env::set_var("E2ETESTS_SAUCE_TEST", "maybe");
        }

        let result = load_options();
        assert!(matches!(
            result,
            Err(ConfigFileError::InvalidEnv { ref key, .. }) if key == "E2ETESTS_SAUCE_TEST"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_remote_without_host_fails_validation() {
        clear_env();
        unsafe {
            env::set_var("E2ETESTS_SAUCE_TEST", "true");
        }

        let result = load_options();
        assert!(matches!(result, Err(ConfigFileError::Validation(_))));
        clear_env();
    }
}
