//! Command-line arguments.

use std::path::PathBuf;

use btfollow_core::FollowConfig;
use clap::Parser;

/// Connect a follower Bluetooth device whenever a primary device is present.
#[derive(Debug, Parser)]
#[command(name = "btfollow", version)]
#[command(about = "Connect a follower Bluetooth device whenever a primary device is present")]
pub struct Cli {
    /// Create the configuration file interactively
    #[arg(short = 'c', long = "create-config")]
    pub create: bool,

    /// Overwrite an existing configuration. Used with -c
    #[arg(short, long)]
    pub force: bool,

    /// Show the current configuration
    #[arg(short = 'l', long)]
    pub show: bool,

    /// Seconds between checks (overrides the configuration)
    #[arg(short, long, value_name = "SECS")]
    pub sleep_time: Option<f64>,

    /// Configuration file path (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write JSON logs to daily-rotated files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the setup wizard, replacing an existing file only when `force` is set.
    Create {
        /// Overwrite an existing configuration.
        force: bool,
    },
    /// Print the configuration and its schema.
    Show,
    /// Follow the primary device.
    Follow,
}

impl Cli {
    /// Resolve the flags into a single mode.
    ///
    /// `--create-config` wins over `--show`.
    ///
    /// # Errors
    ///
    /// Returns an error when `--force` is given without `--create-config`.
    pub fn mode(&self) -> anyhow::Result<Mode> {
        if self.force && !self.create {
            anyhow::bail!("You can't use force (-f) without create (-c)");
        }
        if self.create {
            Ok(Mode::Create { force: self.force })
        } else if self.show {
            Ok(Mode::Show)
        } else {
            Ok(Mode::Follow)
        }
    }

    /// The configuration file to use.
    ///
    /// # Errors
    ///
    /// Returns an error if no path was given and there is no default location.
    pub fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(FollowConfig::default_path()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("btfollow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_mode_is_follow() {
        let cli = parse(&[]);
        assert_eq!(cli.mode().unwrap(), Mode::Follow);
        assert_eq!(cli.sleep_time, None);
    }

    #[test]
    fn test_create_with_force() {
        assert_eq!(parse(&["-c", "-f"]).mode().unwrap(), Mode::Create { force: true });
        assert_eq!(
            parse(&["--create-config"]).mode().unwrap(),
            Mode::Create { force: false }
        );
    }

    #[test]
    fn test_force_requires_create() {
        let err = parse(&["-f"]).mode().unwrap_err();
        assert!(err.to_string().contains("without create"));
    }

    #[test]
    fn test_show_and_sleep_time() {
        let cli = parse(&["-l", "-s", "0.5"]);
        assert_eq!(cli.mode().unwrap(), Mode::Show);
        assert_eq!(cli.sleep_time, Some(0.5));
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = parse(&["--config", "/tmp/btfollow.toml"]);
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("/tmp/btfollow.toml"));
    }

    #[test]
    fn test_invalid_sleep_time_rejected() {
        assert!(Cli::try_parse_from(["btfollow", "-s", "soon"]).is_err());
    }
}
