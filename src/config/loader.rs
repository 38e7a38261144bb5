//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", issue_list(.0))]
    Validation(Vec<ValidationIssue>),
}

fn issue_list(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RelayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given and present; otherwise fall back to the
/// built-in defaults. A path that exists but fails to load or validate is
/// an error rather than a silent fallback.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) if path.exists() => load_config(path),
        Some(path) => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(RelayConfig::default())
        }
        None => Ok(RelayConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = write_temp(
            r#"
            [upstream]
            base_url = "https://recovery.test"
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.upstream.base_url, "https://recovery.test");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_config_fails_validation() {
        let path = write_temp(
            r#"
            [retries]
            max_attempts = 0
            "#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = load_or_default(Some(Path::new("/nonexistent/relay.toml"))).unwrap();
        assert_eq!(config.retries.max_attempts, 3);
    }
}
