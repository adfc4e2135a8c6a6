//! # Settings File Loading
//!
//! Loads E2E test options from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::E2eTestOptions;
use std::path::Path;

/// Settings file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Settings file has no extension")]
    NoExtension,

    #[error("Unsupported settings file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid option {key}={value}: {reason}")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid options: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Load options from a TOML file.
///
/// # M-CANONICAL-DOCS
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let options = load_from_toml(Path::new("e2eTestSettings.toml"))?;
///     println!("Remote: {}", options.sauce_test);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<E2eTestOptions, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
}

/// Load options from a YAML file.
pub fn load_from_yaml(path: &Path) -> Result<E2eTestOptions, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
}

/// Load options from file, detecting the format from its extension.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml` / `.yml`: YAML format
pub fn load_from_file(path: &Path) -> Result<E2eTestOptions, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e.toml");

        let toml_content = r#"
default_wait_timeout_in_seconds = 20
screenshots_path = "shots"
sauce_test = true

[sauce]
host_name = "sauce-host"
browser_name = "chrome"
"#;
        fs::write(&path, toml_content).unwrap();

        let options = load_from_toml(&path).unwrap();
        assert_eq!(options.default_wait_timeout_in_seconds, 20);
        assert_eq!(options.screenshots_path.as_deref(), Some("shots"));
        assert!(options.sauce_test);
        assert_eq!(options.sauce.host_name, "sauce-host");
        assert_eq!(options.sauce.browser_name, "chrome");
        assert_eq!(options.sauce.username, "");
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e.yml");

        let yaml_content = r#"
sauce_test: false
sauce:
  host_name: grid.local
"#;
        fs::write(&path, yaml_content).unwrap();

        let options = load_from_file(&path).unwrap();
        assert!(!options.sauce_test);
        assert_eq!(options.sauce.host_name, "grid.local");
        assert_eq!(options.default_wait_timeout_in_seconds, 3);
    }

    #[test]
    fn test_load_from_file_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e.json");
        fs::write(&path, "{}").unwrap();

        let result = load_from_file(&path);
        assert!(matches!(result, Err(ConfigFileError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_from_file_no_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e");
        fs::write(&path, "").unwrap();

        let result = load_from_file(&path);
        assert!(matches!(result, Err(ConfigFileError::NoExtension)));
    }

    #[test]
    fn test_load_from_toml_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e2e.toml");
        fs::write(&path, "[invalid\n").unwrap();

        let result = load_from_toml(&path);
        assert!(matches!(result, Err(ConfigFileError::TomlParse(_))));
    }

    #[test]
    fn test_load_from_toml_not_found() {
        let path = Path::new("/nonexistent/path/e2e.toml");
        let result = load_from_toml(path);
        assert!(matches!(result, Err(ConfigFileError::FileNotFound(_))));
    }
}
