//! The follow loop.
//!
//! Every `sleep_time` seconds the loop samples the primary device and moves
//! the follower towards the same state:
//!
//! | primary       | follower      | action                       |
//! |---------------|---------------|------------------------------|
//! | connected     | disconnected  | connect follower (best effort) |
//! | disconnected  | connected     | disconnect follower          |
//! | otherwise     |               | nothing                      |
//!
//! A failed connect is logged and retried on the next iteration. A failed
//! disconnect, or any failing state query, ends the loop with an error.

use std::convert::Infallible;
use std::time::Duration;

use tracing::{debug, info};

use crate::backend::Backend;
use crate::config::FollowConfig;
use crate::device::Device;
use crate::error::Result;

/// What one iteration did to the follower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Both devices were already in agreement.
    Idle,
    /// The follower was connected.
    Connected,
    /// Connecting the follower was attempted and failed.
    ConnectFailed,
    /// The follower was disconnected.
    Disconnected,
}

/// A primary/follower pair bound to a backend.
#[derive(Debug)]
pub struct FollowLoop<'a, B: Backend + ?Sized> {
    backend: &'a B,
    primary: Device,
    follower: Device,
    interval: Duration,
}

impl<'a, B: Backend + ?Sized> FollowLoop<'a, B> {
    /// Resolve both configured devices against the paired-device list.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is invalid, either address matches no
    /// paired device, or the backend listing fails.
    pub fn resolve(backend: &'a B, config: &FollowConfig) -> Result<Self> {
        let interval = config.interval()?;
        let primary = Device::find_by_address(backend, &config.primary)?;
        let follower = Device::find_by_address(backend, &config.follower)?;

        info!(
            "Launching {follower} -> {primary} (Check interval: {})",
            config.sleep_time
        );

        Ok(Self {
            backend,
            primary,
            follower,
            interval,
        })
    }

    /// The device whose presence is watched.
    pub const fn primary(&self) -> &Device {
        &self.primary
    }

    /// The device being connected and disconnected.
    pub const fn follower(&self) -> &Device {
        &self.follower
    }

    /// Time slept after each decision.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single iteration: decide, act, sleep, then log both states.
    ///
    /// # Errors
    ///
    /// Returns an error if a state query or a disconnect fails.
    pub fn tick(&self) -> Result<Action> {
        let action = self.step()?;

        std::thread::sleep(self.interval);

        let primary = self.primary.is_connected(self.backend)?;
        let follower = self.follower.is_connected(self.backend)?;
        debug!("Primary: {primary} Follower: {follower}");

        Ok(action)
    }

    fn step(&self) -> Result<Action> {
        if self.primary.is_connected(self.backend)? {
            if self.follower.is_connected(self.backend)? {
                return Ok(Action::Idle);
            }
            info!(
                "{} is connected but not {}, connecting follower",
                self.primary, self.follower
            );
            if self.follower.connect(self.backend) {
                Ok(Action::Connected)
            } else {
                Ok(Action::ConnectFailed)
            }
        } else if self.follower.is_connected(self.backend)? {
            info!("Releasing {}", self.follower);
            self.follower.disconnect(self.backend)?;
            Ok(Action::Disconnected)
        } else {
            Ok(Action::Idle)
        }
    }

    /// Iterate forever. Only returns when an iteration fails.
    ///
    /// # Errors
    ///
    /// Returns the first unrecoverable error.
    pub fn run(&self) -> Result<Infallible> {
        loop {
            self.tick()?;
        }
    }
}

/// Resolve the configured devices and follow forever.
///
/// # Errors
///
/// Returns an error if startup resolution fails or an iteration fails.
pub fn run<B: Backend + ?Sized>(backend: &B, config: &FollowConfig) -> Result<Infallible> {
    FollowLoop::resolve(backend, config)?.run()
}
