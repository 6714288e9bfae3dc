//! Application configuration.
//!
//! Settings are read once at startup from environment variables. Every
//! setting has a documented default and a parse failure falls back to that
//! default with a warning instead of aborting.

use serde::{Deserialize, Serialize};

use crate::{Result, TabSurveyorError};

/// Default application name (`APP_NAME`).
pub const DEFAULT_APP_NAME: &str = "CSV Data Analyzer";
/// Default application version (`APP_VERSION`).
pub const DEFAULT_APP_VERSION: &str = "0.1.0";
/// Default upload limit in megabytes (`MAX_UPLOAD_SIZE_MB`).
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 200;
/// Default allowed extensions (`ALLOWED_FILE_TYPES`).
pub const DEFAULT_ALLOWED_FILE_TYPES: &str = "csv,xlsx,json";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Startup configuration for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name of the application
    pub app_name: String,
    /// Version string shown to users
    pub app_version: String,
    /// Enables debug-level logging
    pub debug: bool,
    /// Maximum accepted upload size in megabytes
    pub max_upload_size_mb: u64,
    /// Lower-case file extensions accepted for upload
    pub allowed_file_types: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            debug: false,
            max_upload_size_mb: DEFAULT_MAX_UPLOAD_SIZE_MB,
            allowed_file_types: parse_file_types(DEFAULT_ALLOWED_FILE_TYPES),
        }
    }
}

impl AppConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// Used by [`AppConfig::from_env`]; tests pass a map lookup instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            app_version: lookup("APP_VERSION").unwrap_or(defaults.app_version),
            debug: env_bool("DEBUG", lookup("DEBUG"), defaults.debug),
            max_upload_size_mb: env_u64(
                "MAX_UPLOAD_SIZE_MB",
                lookup("MAX_UPLOAD_SIZE_MB"),
                defaults.max_upload_size_mb,
            ),
            allowed_file_types: lookup("ALLOWED_FILE_TYPES")
                .map(|raw| parse_file_types(&raw))
                .unwrap_or(defaults.allowed_file_types),
        }
    }

    /// Builder method to set the application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Builder method to enable/disable debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builder method to set the upload limit in megabytes.
    pub fn with_max_upload_size_mb(mut self, megabytes: u64) -> Self {
        self.max_upload_size_mb = megabytes;
        self
    }

    /// Builder method to set the allowed extensions.
    pub fn with_allowed_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_file_types = types
            .into_iter()
            .map(|t| normalize_extension(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Checks an upload against the size limit and the extension list.
    pub fn validate_upload(&self, filename: &str, size_bytes: u64) -> Result<()> {
        if size_bytes > self.max_upload_bytes() {
            return Err(TabSurveyorError::upload_rejected(format!(
                "'{}' is {} bytes, limit is {} MB",
                filename, size_bytes, self.max_upload_size_mb
            )));
        }

        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        if !self.allowed_file_types.iter().any(|t| *t == extension) {
            return Err(TabSurveyorError::upload_rejected(format!(
                "'{}' has extension '{}', allowed: {}",
                filename,
                extension,
                self.allowed_file_types.join(", ")
            )));
        }

        Ok(())
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn parse_file_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_extension)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Interprets an environment string as a boolean.
fn env_bool(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            tracing::warn!(
                "{} has unrecognized boolean value, using default {}",
                key,
                default
            );
            default
        }
    }
}

/// Interprets an environment string as an unsigned integer.
fn env_u64(key: &str, value: Option<String>, default: u64) -> u64 {
    let Some(value) = value else {
        return default;
    };
    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("{} is not an integer, using default {}", key, default);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.app_name, "CSV Data Analyzer");
        assert_eq!(config.app_version, "0.1.0");
        assert!(!config.debug);
        assert_eq!(config.max_upload_size_mb, 200);
        assert_eq!(config.allowed_file_types, vec!["csv", "xlsx", "json"]);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_NAME", "Survey"),
            ("DEBUG", "YES"),
            ("MAX_UPLOAD_SIZE_MB", " 50 "),
            ("ALLOWED_FILE_TYPES", "CSV, .tsv,,"),
        ]));

        assert_eq!(config.app_name, "Survey");
        assert!(config.debug);
        assert_eq!(config.max_upload_size_mb, 50);
        assert_eq!(config.allowed_file_types, vec!["csv", "tsv"]);
    }

    #[test]
    fn test_parse_failures_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DEBUG", "maybe"),
            ("MAX_UPLOAD_SIZE_MB", "lots"),
        ]));

        assert!(!config.debug);
        assert_eq!(config.max_upload_size_mb, DEFAULT_MAX_UPLOAD_SIZE_MB);
    }

    #[test]
    fn test_explicit_false_values() {
        for value in ["false", "0", "no", "OFF"] {
            let config = AppConfig::from_lookup(lookup_from(&[("DEBUG", value)]));
            assert!(!config.debug, "DEBUG={} should be false", value);
        }
    }

    #[test]
    fn test_validate_upload() {
        let config = AppConfig::new().with_max_upload_size_mb(1);

        assert!(config.validate_upload("data.CSV", 1024).is_ok());
        assert!(matches!(
            config.validate_upload("data.csv", 2 * 1024 * 1024),
            Err(TabSurveyorError::UploadRejected { .. })
        ));
        assert!(matches!(
            config.validate_upload("data.parquet", 10),
            Err(TabSurveyorError::UploadRejected { .. })
        ));
        assert!(matches!(
            config.validate_upload("no_extension", 10),
            Err(TabSurveyorError::UploadRejected { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::new()
            .with_app_name("Other")
            .with_debug(true)
            .with_allowed_file_types([".TXT", "csv"]);

        assert_eq!(config.app_name, "Other");
        assert!(config.debug);
        assert_eq!(config.allowed_file_types, vec!["txt", "csv"]);
        assert_eq!(config.max_upload_bytes(), 200 * 1024 * 1024);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AppConfig::new().with_max_upload_size_mb(10);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
