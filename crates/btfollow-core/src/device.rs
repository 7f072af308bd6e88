//! Paired Bluetooth devices.
//!
//! A [`Device`] is built from one line of the backend's paired-device
//! listing, e.g.
//!
//! ```text
//! address: 04-52-c7-aa-bb-cc, connected (master, -54 dBm), paired, name: "Magic Keyboard"
//! ```
//!
//! The line is split on commas. Each trimmed segment is split on its first
//! colon into a key and value; a segment without a colon is stored under its
//! own text. Devices are plain values: connection queries and commands take
//! the [`Backend`] explicitly and always hit it live.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::backend::{Backend, BackendError};

/// Field holding the stable identity of a device.
pub const ADDRESS_FIELD: &str = "address";

/// Field holding the human-readable device name.
pub const NAME_FIELD: &str = "name";

/// Errors raised by device lookups and commands.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No paired device description contains the address.
    #[error("No paired device matches '{address}'. Pair it first or check the configured address.")]
    NoSuchDevice {
        /// The address that was searched for.
        address: String,
    },

    /// The device description has no such field.
    #[error("{device} has no attribute '{field}'")]
    MissingField {
        /// Display form of the device.
        device: String,
        /// The missing field name.
        field: String,
    },

    /// The backend command failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result alias for device operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// One device from the OS pairing registry.
#[derive(Debug, Clone, Default)]
pub struct Device {
    fields: Vec<(String, String)>,
}

impl Device {
    /// Parse a paired-device description line.
    ///
    /// Never fails. A description without an `address` field produces a
    /// device whose backend operations report [`DeviceError::MissingField`].
    #[must_use]
    pub fn parse(description: &str) -> Self {
        let mut device = Self::default();
        for part in description.split(',') {
            let part = part.trim();
            match part.split_once(':') {
                Some((key, value)) => device.insert(key.trim(), value.trim()),
                None => device.insert(part, part),
            }
        }
        device
    }

    fn insert(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            self.fields.push((key.to_string(), value.to_string()));
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of the field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MissingField`] if the description had no such field.
    pub fn field(&self, name: &str) -> DeviceResult<&str> {
        self.lookup(name).ok_or_else(|| DeviceError::MissingField {
            device: self.to_string(),
            field: name.to_string(),
        })
    }

    /// Value of the field `name`, or `default` when absent.
    #[must_use]
    pub fn field_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(default)
    }

    /// The device address, if the description had one.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.lookup(ADDRESS_FIELD)
    }

    /// The device name, if the description had one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.lookup(NAME_FIELD)
    }

    /// All fields in description order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Ask the backend whether this device is connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the device has no address or the backend fails.
    pub fn is_connected<B: Backend + ?Sized>(&self, backend: &B) -> DeviceResult<bool> {
        let raw = backend.connection_status(self.field(ADDRESS_FIELD)?)?;
        Ok(raw.trim() == "1")
    }

    /// Connect this device, reporting failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the device has no address or the backend fails.
    pub fn try_connect<B: Backend + ?Sized>(&self, backend: &B) -> DeviceResult<()> {
        backend.connect(self.field(ADDRESS_FIELD)?)?;
        Ok(())
    }

    /// Connect this device on a best-effort basis.
    ///
    /// Failures are logged and reported as `false`.
    pub fn connect<B: Backend + ?Sized>(&self, backend: &B) -> bool {
        match self.try_connect(backend) {
            Ok(()) => true,
            Err(err) => {
                debug!(device = %self, error = %err, "Failed to connect");
                false
            }
        }
    }

    /// Disconnect this device, reporting failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the device has no address or the backend fails.
    pub fn try_disconnect<B: Backend + ?Sized>(&self, backend: &B) -> DeviceResult<()> {
        backend.disconnect(self.field(ADDRESS_FIELD)?)?;
        Ok(())
    }

    /// Disconnect this device. Unlike [`Device::connect`], failures propagate.
    ///
    /// # Errors
    ///
    /// Returns an error if the device has no address or the backend fails.
    pub fn disconnect<B: Backend + ?Sized>(&self, backend: &B) -> DeviceResult<()> {
        self.try_disconnect(backend)
    }

    /// Every paired device known to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend listing fails.
    pub fn list_all<B: Backend + ?Sized>(backend: &B) -> DeviceResult<Vec<Self>> {
        Ok(backend
            .paired()?
            .iter()
            .map(|line| Self::parse(line))
            .collect())
    }

    /// First paired device whose raw description contains `address`.
    ///
    /// Matching is a plain substring test on the whole line, so an address
    /// that appears inside another field (a name, say) also matches.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NoSuchDevice`] if no line matches, or a backend
    /// error if the listing fails.
    pub fn find_by_address<B: Backend + ?Sized>(
        backend: &B,
        address: &str,
    ) -> DeviceResult<Self> {
        backend
            .paired()?
            .iter()
            .find(|line| line.contains(address))
            .map(|line| Self::parse(line))
            .ok_or_else(|| DeviceError::NoSuchDevice {
                address: address.to_string(),
            })
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.address(), other.address()), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.field_or(NAME_FIELD, "No name"),
            self.field_or(ADDRESS_FIELD, "Invalid device")
        )
    }
}
