//! # btfollow-core
//!
//! Core logic for btfollow: keep a "follower" Bluetooth device connected
//! exactly while a "primary" device is connected (e.g. attach a trackpad
//! only while a particular keyboard is present).
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`backend`] - Platform command backends (`blueutil` on macOS) and host detection
//! - [`device`] - Parsed paired-device descriptions and per-device commands
//! - [`follow`] - The polling loop that connects and disconnects the follower
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//!
//! ## Example
//!
//! ```no_run
//! use btfollow_core::{follow, FollowConfig, SystemBackend};
//!
//! fn main() -> btfollow_core::Result<()> {
//!     let backend = SystemBackend::detect()?;
//!     let config = FollowConfig::new("04-52-c7-aa-bb-cc", "a4-83-e7-dd-ee-ff");
//!     follow::run(&backend, &config)?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod follow;

// Re-export primary types for convenience
#[cfg(any(test, feature = "mock-backend"))]
pub use backend::{BackendCall, MockBackend};
pub use backend::{
    Backend, BackendError, BackendResult, Blueutil, Platform, SystemBackend, BLUEUTIL_PATH_ENV,
    DEFAULT_BLUEUTIL_PATH,
};
pub use config::{schema_table, ConfigError, ConfigResult, FollowConfig, DEFAULT_SLEEP_TIME};
pub use device::{Device, DeviceError, DeviceResult};
pub use error::{Error, FollowError, Result};
pub use follow::{Action, FollowLoop};
