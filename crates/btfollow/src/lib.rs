//! # btfollow
//!
//! Command-line front end for btfollow.
//!
//! This library provides the argument parsing, interactive setup wizard, and
//! logging initialization used by the `btfollow` binary. The follow loop
//! itself lives in `btfollow-core`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod cli;
pub mod logging;
pub mod setup;
