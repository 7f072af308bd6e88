//! # btfollow
//!
//! Connect a follower Bluetooth device whenever a primary device is present.
//!
//! ## Running
//!
//! ```bash
//! # First run: pick the two devices
//! btfollow -c
//!
//! # Follow, checking every half second
//! btfollow -s 0.5
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use btfollow::cli::{Cli, Mode};
use btfollow::{logging, setup};
use btfollow_core::{follow, FollowConfig, FollowError, SystemBackend};
use clap::Parser;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    let follow_err = err.downcast_ref::<FollowError>();

    if logging::is_initialized() {
        match follow_err {
            Some(e) if e.is_fatal_at_startup() => {
                error!(code = e.error_code(), "Startup failed: {err:#}");
            }
            Some(e) => error!(code = e.error_code(), "Follow loop stopped: {err:#}"),
            None => error!("{err:#}"),
        }
    } else {
        eprintln!("{err:#}");
    }

    ExitCode::from(follow_err.map_or(1, FollowError::exit_code))
}

fn run(cli: &Cli) -> Result<()> {
    let mode = cli.mode()?;
    let path = cli.config_path()?;

    match mode {
        Mode::Create { force } => create(cli, &path, force),
        Mode::Show => setup::show_config(&path, &mut io::stdout()),
        Mode::Follow => follow_devices(cli, &path),
    }
}

fn create(cli: &Cli, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Config file already exists. Overwrite with -f or list with -l");
    }
    logging::init(None, cli.log_dir.as_deref())?;

    let backend = SystemBackend::detect().map_err(FollowError::from)?;
    let config = setup::run_setup(&backend, path, &mut io::stdin().lock(), &mut io::stdout())?;
    info!(
        primary = %config.primary,
        follower = %config.follower,
        "Configuration written to {}",
        path.display()
    );
    Ok(())
}

fn follow_devices(cli: &Cli, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Run setup first (-c)");
    }

    let mut config = FollowConfig::load(path).map_err(FollowError::from)?;
    if let Some(sleep_time) = cli.sleep_time {
        config = config.with_sleep_time(sleep_time);
        config.validate().map_err(FollowError::from)?;
    }

    logging::init(config.log_level.as_deref(), cli.log_dir.as_deref())?;
    info!("Using configuration {}", path.display());

    let backend = SystemBackend::detect().map_err(FollowError::from)?;
    match follow::run(&backend, &config) {
        Ok(never) => match never {},
        Err(err) => Err(err.into()),
    }
}
