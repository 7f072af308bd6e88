//! Unified error types for the btfollow core library.
//!
//! [`FollowError`] covers every failure mode of the system. Each module also
//! has its own error type ([`BackendError`], [`DeviceError`], [`ConfigError`])
//! which converts into it with `?`.
//!
//! # Example
//!
//! ```rust
//! use btfollow_core::error::{FollowError, Result};
//!
//! fn require_device(found: bool, address: &str) -> Result<()> {
//!     if !found {
//!         return Err(FollowError::NoSuchDevice(address.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::device::DeviceError;

/// The unified error type for all btfollow operations.
#[derive(Debug, Error)]
pub enum FollowError {
    // =========================================================================
    // PLATFORM & BACKEND ERRORS
    // =========================================================================
    /// The host operating system has no backend.
    #[error("Platform '{0}' is not supported. Only macOS (blueutil) is available.")]
    PlatformUnsupported(String),

    /// The backend utility could not be started.
    #[error("Bluetooth utility unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend command ran but failed.
    #[error("Bluetooth command failed: {0}")]
    BackendCommandFailed(String),

    // =========================================================================
    // DEVICE ERRORS
    // =========================================================================
    /// A configured address matches no paired device.
    #[error("No paired device matches '{0}'. Pair it first or check the configured address.")]
    NoSuchDevice(String),

    /// A device description lacks a required field.
    #[error("{device} has no attribute '{field}'")]
    MissingField {
        /// Display form of the device.
        device: String,
        /// The missing field.
        field: String,
    },

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}. Run setup first (-c).", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE ERRORS
    // =========================================================================
    /// Reading or writing the configuration failed.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// A specialized [`Result`] type for btfollow operations.
pub type Result<T> = std::result::Result<T, FollowError>;

/// Short alias for [`FollowError`].
pub type Error = FollowError;

impl FollowError {
    /// Returns `true` for errors that abort before any polling happens.
    #[inline]
    #[must_use]
    pub const fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::PlatformUnsupported(_)
                | Self::NoSuchDevice(_)
                | Self::ConfigNotFound(_)
                | Self::ConfigParseError(_)
                | Self::ConfigValidationError(_)
        )
    }

    /// Process exit code for this error, following `sysexits.h`.
    #[inline]
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            // EX_DATAERR
            Self::NoSuchDevice(_) | Self::MissingField { .. } => 65,

            // EX_UNAVAILABLE
            Self::PlatformUnsupported(_) | Self::BackendUnavailable(_) => 69,

            // EX_SOFTWARE
            Self::BackendCommandFailed(_) => 70,

            // EX_IOERR
            Self::PersistenceError(_) => 74,

            // EX_CONFIG
            Self::ConfigNotFound(_)
            | Self::ConfigParseError(_)
            | Self::ConfigValidationError(_) => 78,
        }
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PlatformUnsupported(_) => "PLATFORM_UNSUPPORTED",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::BackendCommandFailed(_) => "BACKEND_COMMAND_FAILED",
            Self::NoSuchDevice(_) => "NO_SUCH_DEVICE",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<BackendError> for FollowError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PlatformUnsupported { os } => Self::PlatformUnsupported(os),
            err @ BackendError::Spawn { .. } => Self::BackendUnavailable(err.to_string()),
            err @ (BackendError::CommandFailed { .. } | BackendError::InvalidOutput { .. }) => {
                Self::BackendCommandFailed(err.to_string())
            }
        }
    }
}

impl From<DeviceError> for FollowError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::NoSuchDevice { address } => Self::NoSuchDevice(address),
            DeviceError::MissingField { device, field } => Self::MissingField { device, field },
            DeviceError::Backend(e) => e.into(),
        }
    }
}

impl From<ConfigError> for FollowError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::NoConfigDir => {
                Self::PersistenceError("Cannot determine configuration directory".into())
            }
            ConfigError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {path}: {source}"))
            }
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_fatal_at_startup() {
        assert!(FollowError::PlatformUnsupported("linux".into()).is_fatal_at_startup());
        assert!(FollowError::NoSuchDevice("aa".into()).is_fatal_at_startup());
        assert!(!FollowError::BackendCommandFailed("exit 1".into()).is_fatal_at_startup());
        assert!(!FollowError::PersistenceError("disk full".into()).is_fatal_at_startup());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(FollowError::NoSuchDevice("aa".into()).exit_code(), 65);
        assert_eq!(FollowError::PlatformUnsupported("linux".into()).exit_code(), 69);
        assert_eq!(FollowError::BackendCommandFailed("x".into()).exit_code(), 70);
        assert_eq!(FollowError::PersistenceError("disk full".into()).exit_code(), 74);
        assert_eq!(FollowError::ConfigNotFound(PathBuf::new()).exit_code(), 78);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FollowError::PlatformUnsupported("linux".into()).error_code(),
            "PLATFORM_UNSUPPORTED"
        );
        assert_eq!(FollowError::NoSuchDevice("aa".into()).error_code(), "NO_SUCH_DEVICE");
        assert_eq!(
            FollowError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_backend_error() {
        let err: FollowError = BackendError::PlatformUnsupported { os: "linux".into() }.into();
        assert!(matches!(err, FollowError::PlatformUnsupported(ref os) if os == "linux"));

        let err: FollowError = BackendError::CommandFailed {
            command: "blueutil --disconnect aa".into(),
            status: "exit status: 1".into(),
            stderr: "boom".into(),
        }
        .into();
        assert!(matches!(err, FollowError::BackendCommandFailed(ref msg) if msg.contains("boom")));

        let err: FollowError = BackendError::Spawn {
            program: "/usr/local/bin/blueutil".into(),
            source: IoErr::new(ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(matches!(err, FollowError::BackendUnavailable(_)));
    }

    #[test]
    fn test_from_device_error() {
        let err: FollowError = DeviceError::NoSuchDevice {
            address: "aa".into(),
        }
        .into();
        assert!(matches!(err, FollowError::NoSuchDevice(ref a) if a == "aa"));
    }

    #[test]
    fn test_from_config_error() {
        let err: FollowError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "primary".into(),
                message: "must not be empty".into(),
            },
            ConfigError::ValidationError {
                field: "follower".into(),
                message: "must not be empty".into(),
            },
        ])
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration validation failed: \
             primary: must not be empty; follower: must not be empty"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<FollowError>();
        assert_sync::<FollowError>();
    }
}
