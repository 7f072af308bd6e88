//! Platform command backends.
//!
//! Every interaction with the operating system's Bluetooth pairing registry
//! goes through the [`Backend`] trait. Each operation runs an external
//! utility and returns or consumes plain text:
//!
//! - [`Backend::paired`] lists one description line per paired device
//! - [`Backend::connection_status`] returns the raw connection check output
//! - [`Backend::connect`] / [`Backend::disconnect`] issue the commands
//!
//! The backend for the running host is picked by an explicit switch on the
//! OS identifier ([`Platform::from_os`]). Only macOS (via `blueutil`) is
//! supported; any other OS fails with [`BackendError::PlatformUnsupported`].

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the `blueutil` executable path.
pub const BLUEUTIL_PATH_ENV: &str = "BLUEUTIL_PATH";

/// Default location of the `blueutil` executable.
pub const DEFAULT_BLUEUTIL_PATH: &str = "/usr/local/bin/blueutil";

/// Errors raised by a platform backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend exists for the host operating system.
    #[error("Platform '{os}' is not supported. Only macOS (blueutil) is available.")]
    PlatformUnsupported {
        /// OS identifier of the host.
        os: String,
    },

    /// The external utility could not be started.
    #[error("Failed to run '{program}': {source}. Install it or set BLUEUTIL_PATH.")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external utility exited unsuccessfully.
    #[error("Command '{command}' failed ({status}): {stderr}")]
    CommandFailed {
        /// The rendered command line.
        command: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed standard error of the command.
        stderr: String,
    },

    /// The external utility printed something that is not UTF-8.
    #[error("Command '{command}' produced output that is not valid UTF-8")]
    InvalidOutput {
        /// The rendered command line.
        command: String,
    },
}

/// Result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// The four Bluetooth operations every platform must provide.
///
/// Calls are synchronous and block until the underlying command exits.
pub trait Backend {
    /// List paired devices, one comma-separated description per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing command cannot run or fails.
    fn paired(&self) -> BackendResult<Vec<String>>;

    /// Raw output of the connection check for `address`.
    ///
    /// A device is connected iff the trimmed output is exactly `"1"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the check command cannot run or fails.
    fn connection_status(&self, address: &str) -> BackendResult<String>;

    /// Connect the device with the given address.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot run or exits non-zero.
    fn connect(&self, address: &str) -> BackendResult<()>;

    /// Disconnect the device with the given address.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot run or exits non-zero.
    fn disconnect(&self, address: &str) -> BackendResult<()>;
}

/// Operating systems with a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS, driven through `blueutil`.
    Darwin,
}

impl Platform {
    /// Map an OS identifier to a supported platform.
    ///
    /// Accepts the Rust identifier (`"macos"`) and the historical
    /// `"darwin"` spelling.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PlatformUnsupported`] for any other OS.
    pub fn from_os(os: &str) -> BackendResult<Self> {
        match os {
            "macos" | "darwin" => Ok(Self::Darwin),
            other => Err(BackendError::PlatformUnsupported {
                os: other.to_string(),
            }),
        }
    }

    /// The platform of the running host.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PlatformUnsupported`] if the host has no backend.
    pub fn current() -> BackendResult<Self> {
        Self::from_os(std::env::consts::OS)
    }
}

/// `blueutil` command-line wrapper used on macOS.
#[derive(Debug, Clone)]
pub struct Blueutil {
    program: PathBuf,
}

impl Blueutil {
    /// Use the `blueutil` executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$BLUEUTIL_PATH`, falling back to [`DEFAULT_BLUEUTIL_PATH`].
    #[must_use]
    pub fn from_env() -> Self {
        let program = std::env::var_os(BLUEUTIL_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_BLUEUTIL_PATH), PathBuf::from);
        Self::new(program)
    }

    /// Path of the executable this backend invokes.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, flag: &str, address: Option<&str>) -> BackendResult<String> {
        let mut command = Command::new(&self.program);
        command.arg(flag);
        if let Some(address) = address {
            command.arg(address);
        }

        let rendered = match address {
            Some(address) => format!("{} {flag} {address}", self.program.display()),
            None => format!("{} {flag}", self.program.display()),
        };
        debug!(command = %rendered, "Running backend command");

        let output = command.output().map_err(|source| BackendError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| BackendError::InvalidOutput { command: rendered })
    }
}

impl Default for Blueutil {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Backend for Blueutil {
    fn paired(&self) -> BackendResult<Vec<String>> {
        let stdout = self.run("--paired", None)?;
        Ok(stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn connection_status(&self, address: &str) -> BackendResult<String> {
        self.run("--is-connected", Some(address))
    }

    fn connect(&self, address: &str) -> BackendResult<()> {
        self.run("--connect", Some(address)).map(|_| ())
    }

    fn disconnect(&self, address: &str) -> BackendResult<()> {
        self.run("--disconnect", Some(address)).map(|_| ())
    }
}

/// The backend selected for the running host.
#[derive(Debug, Clone)]
pub enum SystemBackend {
    /// macOS `blueutil` backend.
    Blueutil(Blueutil),
}

impl SystemBackend {
    /// Build the backend for a known platform.
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Darwin => Self::Blueutil(Blueutil::from_env()),
        }
    }

    /// Detect the host platform and build its backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PlatformUnsupported`] when the host OS has no backend.
    pub fn detect() -> BackendResult<Self> {
        let platform = Platform::current()?;
        let backend = Self::for_platform(platform);
        debug!(?platform, ?backend, "Loaded platform backend");
        Ok(backend)
    }
}

impl Backend for SystemBackend {
    fn paired(&self) -> BackendResult<Vec<String>> {
        match self {
            Self::Blueutil(inner) => inner.paired(),
        }
    }

    fn connection_status(&self, address: &str) -> BackendResult<String> {
        match self {
            Self::Blueutil(inner) => inner.connection_status(address),
        }
    }

    fn connect(&self, address: &str) -> BackendResult<()> {
        match self {
            Self::Blueutil(inner) => inner.connect(address),
        }
    }

    fn disconnect(&self, address: &str) -> BackendResult<()> {
        match self {
            Self::Blueutil(inner) => inner.disconnect(address),
        }
    }
}

#[cfg(any(test, feature = "mock-backend"))]
pub use mock::{BackendCall, MockBackend};

#[cfg(any(test, feature = "mock-backend"))]
mod mock {
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use super::{Backend, BackendError, BackendResult};

    /// A call recorded by [`MockBackend`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BackendCall {
        /// `paired()`
        Paired,
        /// `connection_status(address)`
        ConnectionStatus(String),
        /// `connect(address)`
        Connect(String),
        /// `disconnect(address)`
        Disconnect(String),
    }

    #[derive(Debug, Default)]
    struct MockState {
        paired: Vec<String>,
        status: HashMap<String, String>,
        fail_paired: bool,
        fail_status: bool,
        fail_connect: bool,
        fail_disconnect: bool,
        calls: Vec<BackendCall>,
    }

    /// In-memory backend with scripted state and a call journal.
    ///
    /// Unknown addresses report `"0"`. A successful `connect` marks the
    /// address connected and a successful `disconnect` marks it disconnected.
    #[derive(Debug, Default)]
    pub struct MockBackend {
        state: Mutex<MockState>,
    }

    impl MockBackend {
        /// Empty mock with no paired devices.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Mock reporting the given paired description lines.
        #[must_use]
        pub fn with_paired<I, S>(lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let mock = Self::new();
            mock.lock().paired = lines.into_iter().map(Into::into).collect();
            mock
        }

        /// Set the connection state reported for `address`.
        pub fn set_connected(&self, address: &str, connected: bool) {
            let raw = if connected { "1\n" } else { "0\n" };
            self.set_raw_status(address, raw);
        }

        /// Set the exact text returned by the connection check for `address`.
        pub fn set_raw_status(&self, address: &str, raw: &str) {
            self.lock()
                .status
                .insert(address.to_string(), raw.to_string());
        }

        /// Make every `paired` call fail.
        pub fn fail_paired(&self, fail: bool) {
            self.lock().fail_paired = fail;
        }

        /// Make every `connection_status` call fail.
        pub fn fail_status(&self, fail: bool) {
            self.lock().fail_status = fail;
        }

        /// Make every `connect` call fail.
        pub fn fail_connect(&self, fail: bool) {
            self.lock().fail_connect = fail;
        }

        /// Make every `disconnect` call fail.
        pub fn fail_disconnect(&self, fail: bool) {
            self.lock().fail_disconnect = fail;
        }

        /// Every call made so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<BackendCall> {
            self.lock().calls.clone()
        }

        /// Addresses passed to `connect`, in order.
        #[must_use]
        pub fn connect_calls(&self) -> Vec<String> {
            self.lock()
                .calls
                .iter()
                .filter_map(|call| match call {
                    BackendCall::Connect(address) => Some(address.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Addresses passed to `disconnect`, in order.
        #[must_use]
        pub fn disconnect_calls(&self) -> Vec<String> {
            self.lock()
                .calls
                .iter()
                .filter_map(|call| match call {
                    BackendCall::Disconnect(address) => Some(address.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Forget the recorded calls.
        pub fn clear_calls(&self) {
            self.lock().calls.clear();
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn failure(op: &str, address: &str) -> BackendError {
            BackendError::CommandFailed {
                command: format!("mock {op} {address}").trim_end().to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            }
        }
    }

    impl Backend for MockBackend {
        fn paired(&self) -> BackendResult<Vec<String>> {
            let mut state = self.lock();
            state.calls.push(BackendCall::Paired);
            if state.fail_paired {
                return Err(Self::failure("--paired", ""));
            }
            Ok(state.paired.clone())
        }

        fn connection_status(&self, address: &str) -> BackendResult<String> {
            let mut state = self.lock();
            state
                .calls
                .push(BackendCall::ConnectionStatus(address.to_string()));
            if state.fail_status {
                return Err(Self::failure("--is-connected", address));
            }
            Ok(state
                .status
                .get(address)
                .cloned()
                .unwrap_or_else(|| "0\n".to_string()))
        }

        fn connect(&self, address: &str) -> BackendResult<()> {
            let mut state = self.lock();
            state.calls.push(BackendCall::Connect(address.to_string()));
            if state.fail_connect {
                return Err(Self::failure("--connect", address));
            }
            state.status.insert(address.to_string(), "1\n".to_string());
            Ok(())
        }

        fn disconnect(&self, address: &str) -> BackendResult<()> {
            let mut state = self.lock();
            state.calls.push(BackendCall::Disconnect(address.to_string()));
            if state.fail_disconnect {
                return Err(Self::failure("--disconnect", address));
            }
            state.status.insert(address.to_string(), "0\n".to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::Darwin);
        assert_eq!(Platform::from_os("darwin").unwrap(), Platform::Darwin);
    }

    #[test]
    fn test_unsupported_platform() {
        let err = Platform::from_os("windows").unwrap_err();
        assert!(matches!(err, BackendError::PlatformUnsupported { ref os } if os == "windows"));
        assert!(err.to_string().contains("windows"));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_detect_fails_off_macos() {
        assert!(matches!(
            SystemBackend::detect(),
            Err(BackendError::PlatformUnsupported { .. })
        ));
    }

    #[test]
    fn test_blueutil_program_path() {
        let backend = Blueutil::new("/opt/homebrew/bin/blueutil");
        assert_eq!(backend.program(), Path::new("/opt/homebrew/bin/blueutil"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let backend = Blueutil::new("/nonexistent/btfollow-test/blueutil");
        let err = backend.paired().unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_command_failure() {
        let backend = Blueutil::new("false");
        let err = backend.connect("aa-bb").unwrap_err();
        match err {
            BackendError::CommandFailed { command, .. } => {
                assert_eq!(command, "false --connect aa-bb");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        let backend = Blueutil::new("true");
        assert!(backend.connect("aa-bb").is_ok());
        assert!(backend.disconnect("aa-bb").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_returned_verbatim() {
        // `echo` prints its arguments back, standing in for the utility.
        let backend = Blueutil::new("echo");
        assert_eq!(
            backend.connection_status("aa-bb").unwrap(),
            "--is-connected aa-bb\n"
        );
        assert_eq!(backend.paired().unwrap(), vec!["--paired".to_string()]);
    }

    #[test]
    fn test_mock_records_calls_and_tracks_state() {
        let mock = MockBackend::with_paired(["address: aa-bb"]);
        assert_eq!(mock.connection_status("aa-bb").unwrap(), "0\n");
        mock.connect("aa-bb").unwrap();
        assert_eq!(mock.connection_status("aa-bb").unwrap(), "1\n");
        mock.disconnect("aa-bb").unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                BackendCall::ConnectionStatus("aa-bb".into()),
                BackendCall::Connect("aa-bb".into()),
                BackendCall::ConnectionStatus("aa-bb".into()),
                BackendCall::Disconnect("aa-bb".into()),
            ]
        );
        assert_eq!(mock.connect_calls(), vec!["aa-bb".to_string()]);
        assert_eq!(mock.disconnect_calls(), vec!["aa-bb".to_string()]);
    }

    #[test]
    fn test_mock_failure_injection() {
        let mock = MockBackend::new();
        mock.fail_connect(true);
        mock.fail_disconnect(true);
        assert!(mock.connect("aa-bb").is_err());
        assert!(mock.disconnect("aa-bb").is_err());
        assert_eq!(mock.connection_status("aa-bb").unwrap(), "0\n");

        mock.fail_paired(true);
        mock.fail_status(true);
        assert!(matches!(
            mock.paired(),
            Err(BackendError::CommandFailed { ref command, .. }) if command == "mock --paired"
        ));
        assert!(mock.connection_status("aa-bb").is_err());
    }
}
