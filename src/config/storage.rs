//! Configuration Storage
//!
//! Locates and reads the TOML configuration file.

use crate::config::Config;
use crate::error::{QueryForgeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application directory name under the platform config dir
const APP_DIR: &str = "query-forge";

/// Get the configuration directory path (not created)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Get the default configuration file path
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content)
        .map_err(|e| QueryForgeError::Config(format!("Failed to parse config file: {}", e)))
}

/// Load configuration from an explicit file
pub fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        QueryForgeError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse(&content)
}

/// Load the default configuration file, if one exists
pub fn load_default_file() -> Result<Option<(PathBuf, Config)>> {
    match default_config_file() {
        Some(path) if path.exists() => {
            let config = load_file(&path)?;
            Ok(Some((path, config)))
        }
        _ => Ok(None),
    }
}

/// Serialize configuration to TOML (used to print a starter file)
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| QueryForgeError::Config(format!("Failed to serialize config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_location() {
        if let Some(path) = default_config_file() {
            assert!(path.ends_with("query-forge/config.toml"));
        }
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse(
            r#"
            [server]
            port = 9000

            [mongodb]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.mongodb.enabled);
        assert!(config.mysql.enabled);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(parse("[server\nport = 1"), Err(QueryForgeError::Config(_))));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let text = to_toml(&Config::default()).unwrap();
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.cache.capacity, Config::default().cache.capacity);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/definitely/not/here.toml")).is_err());
    }
}
