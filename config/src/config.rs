//! # E2E Test Options
//!
//! Option structures shared by every end-to-end fixture.
//!
//! All option structures:
//! - Use `serde` for deserialization with per-field defaults
//! - Use `validator` for input validation

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Options for end-to-end test runs.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Describes where browsers run and how long tests wait for the page. When
/// `sauce_test` is set, browsers execute on a remote grid and fixtures
/// rewrite the host of their root address to `sauce.host_name` so that the
/// remote browser can reach the server under test.
///
/// ## Usage
/// ```rust,no_run
/// use config::E2eTestOptions;
///
/// let options = E2eTestOptions::default();
/// assert!(!options.sauce_test);
/// ```
///
/// ## Validation
/// - `default_wait_timeout_in_seconds`: 1-600
/// - `sauce.host_name` must be set when `sauce_test` is true
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_remote_host"))]
pub struct E2eTestOptions {
    /// Seconds a test waits for an expected page state
    #[serde(default = "default_wait_timeout_in_seconds")]
    #[validate(range(min = 1, max = 600))]
    pub default_wait_timeout_in_seconds: u64,

    /// Directory receiving screenshots of failed tests
    #[serde(default)]
    pub screenshots_path: Option<String>,

    /// Run browsers on the remote Sauce grid
    #[serde(default)]
    pub sauce_test: bool,

    /// Remote grid settings, only read when `sauce_test` is set
    #[serde(default)]
    pub sauce: SauceOptions
}

fn default_wait_timeout_in_seconds() -> u64 {
    3
}

fn validate_remote_host(options: &E2eTestOptions) -> Result<(), ValidationError> {
    if options.sauce_test && options.sauce.host_name.trim().is_empty() {
        let mut err = ValidationError::new("missing_sauce_host_name");
        err.message = Some("sauce.host_name is required when sauce_test is enabled".into());
        return Err(err);
    }
    Ok(())
}

impl Default for E2eTestOptions {
    fn default() -> Self {
        Self {
            default_wait_timeout_in_seconds: default_wait_timeout_in_seconds(),
            screenshots_path: None,
            sauce_test: false,
            sauce: SauceOptions::default()
        }
    }
}

impl E2eTestOptions {
    /// Host name substituted into fixture root addresses, if remote
    /// execution is active.
    pub fn remote_host(&self) -> Option<&str> {
        if self.sauce_test {
            Some(self.sauce.host_name.as_str())
        } else {
            None
        }
    }
}

/// Remote browser grid settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SauceOptions {
    pub username: String,
    pub access_key: String,
    pub tunnel_identifier: String,
    /// Host name under which the test machine is reachable from the grid
    pub host_name: String,
    pub platform_name: String,
    pub browser_name: String,
    pub version: String,
    pub device_name: String,
    pub device_orientation: String,
    pub appium_version: String,
    pub selenium_version: String
}
