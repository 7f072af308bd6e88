//! Configuration management.
//!
//! The configuration is a small TOML file naming the two devices to pair up:
//!
//! ```toml
//! primary = "04-52-c7-aa-bb-cc"
//! follower = "a4-83-e7-dd-ee-ff"
//! sleep_time = 1.0      # optional, seconds between checks
//! log_level = "debug"   # optional, tracing filter directive
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application name used for platform directories.
pub const APP_NAME: &str = "btfollow";

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Seconds between checks when the configuration does not say.
pub const DEFAULT_SLEEP_TIME: f64 = 1.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// No per-user configuration directory could be determined.
    #[error("Cannot determine the configuration directory for this user")]
    NoConfigDir,

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field failed validation.
    #[error("{field}: {message}")]
    ValidationError {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("{} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Description of one configuration field, used by `--show`.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name in the TOML file.
    pub name: &'static str,
    /// Expected TOML type.
    pub kind: &'static str,
    /// Whether the field must be present.
    pub required: bool,
    /// What the field does.
    pub description: &'static str,
}

/// Every field the configuration file accepts.
pub const SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "primary",
        kind: "string",
        required: true,
        description: "address of the device whose presence is watched",
    },
    FieldSpec {
        name: "follower",
        kind: "string",
        required: true,
        description: "address of the device connected while the primary is",
    },
    FieldSpec {
        name: "sleep_time",
        kind: "float",
        required: false,
        description: "seconds between checks (default 1.0)",
    },
    FieldSpec {
        name: "log_level",
        kind: "string",
        required: false,
        description: "log filter, e.g. \"info\" or \"debug\"",
    },
];

/// The follow configuration.
///
/// Keys not listed in [`SCHEMA`] are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowConfig {
    /// Address of the primary device.
    pub primary: String,

    /// Address of the follower device.
    pub follower: String,

    /// Seconds between checks.
    #[serde(default = "default_sleep_time")]
    pub sleep_time: f64,

    /// Log filter directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

const fn default_sleep_time() -> f64 {
    DEFAULT_SLEEP_TIME
}

impl FollowConfig {
    /// Configuration following `follower` after `primary` with default settings.
    pub fn new(primary: impl Into<String>, follower: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            follower: follower.into(),
            sleep_time: DEFAULT_SLEEP_TIME,
            log_level: None,
        }
    }

    /// Replace the check interval.
    #[must_use]
    pub fn with_sleep_time(mut self, sleep_time: f64) -> Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed, or invalid.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Validate and write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a single problem or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.primary.trim().is_empty() {
            errors.push(invalid("primary", "must not be empty"));
        }
        if self.follower.trim().is_empty() {
            errors.push(invalid("follower", "must not be empty"));
        }
        if !self.primary.trim().is_empty() && self.primary == self.follower {
            errors.push(invalid(
                "follower",
                "must be a different device than the primary",
            ));
        }
        if !(self.sleep_time.is_finite() && self.sleep_time > 0.0) {
            errors.push(invalid(
                "sleep_time",
                &format!("must be a positive number of seconds (got {})", self.sleep_time),
            ));
        }
        if let Some(level) = &self.log_level {
            if level.trim().is_empty() {
                errors.push(invalid("log_level", "must not be empty when set"));
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// The check interval as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if `sleep_time` is not a usable duration.
    pub fn interval(&self) -> ConfigResult<Duration> {
        if self.sleep_time <= 0.0 {
            return Err(invalid("sleep_time", "must be greater than zero"));
        }
        Duration::try_from_secs_f64(self.sleep_time)
            .map_err(|e| invalid("sleep_time", &e.to_string()))
    }

    /// Default configuration file location for this user.
    ///
    /// e.g. `~/Library/Application Support/btfollow/config.toml` on macOS.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if there is no home directory.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let dirs =
            directories::ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Render [`SCHEMA`] as an aligned text table.
#[must_use]
pub fn schema_table() -> String {
    let mut out = String::new();
    for field in SCHEMA {
        let presence = if field.required { "required" } else { "optional" };
        out.push_str(&format!(
            "{:<12} {:<8} {:<9} {}\n",
            field.name, field.kind, presence, field.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sleep_time_defaults() {
        let config = FollowConfig::from_toml("primary = \"aa\"\nfollower = \"bb\"\n").unwrap();
        assert_eq!(config.primary, "aa");
        assert_eq!(config.follower, "bb");
        assert!((config.sleep_time - DEFAULT_SLEEP_TIME).abs() < f64::EPSILON);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_full_config() {
        let config = FollowConfig::from_toml(
            "primary = \"aa\"\nfollower = \"bb\"\nsleep_time = 0.25\nlog_level = \"debug\"\n",
        )
        .unwrap();
        assert!((config.sleep_time - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.interval().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_required_field() {
        let err = FollowConfig::from_toml("primary = \"aa\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let content = "primary = \"aa\"\nfollower = \"bb\"\nsleep_tme = 5.0\n";
        let err = FollowConfig::from_toml(content).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("sleep_tme"));
    }

    #[test]
    fn test_same_device_rejected() {
        let err = FollowConfig::new("aa", "aa").validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "follower"
        ));
    }

    #[test]
    fn test_non_positive_sleep_time_rejected() {
        for sleep_time in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = FollowConfig::new("aa", "bb").with_sleep_time(sleep_time);
            assert!(config.validate().is_err(), "sleep_time {sleep_time}");
        }
        assert!(FollowConfig::new("aa", "bb").with_sleep_time(-1.0).interval().is_err());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let err = FollowConfig::new("", "")
            .with_sleep_time(0.0)
            .validate()
            .unwrap_err();
        match err {
            ConfigError::MultipleValidationErrors(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = FollowConfig::new("aa-bb", "cc-dd").with_sleep_time(2.5);
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("primary = \"aa-bb\""));
        assert!(!content.contains("log_level"));

        assert_eq!(FollowConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FollowConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_schema_table_lists_every_field() {
        let table = schema_table();
        for field in SCHEMA {
            assert!(table.contains(field.name));
        }
        assert!(table.contains("required"));
        assert!(table.contains("optional"));
    }
}
