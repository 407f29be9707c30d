//! Unified error types for the filament monitor.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! binary's startup and host-protocol error handling uniform. Port-level
//! errors live next to their traits in [`crate::app::ports`].

use core::fmt;

use crate::app::ports::{ConfigError, GpioError, PrinterError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible monitor operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Startup requirements not met. Fatal.
    Init(InitError),
    /// The GPIO collaborator rejected an operation.
    Gpio(GpioError),
    /// Settings could not be loaded, validated or persisted.
    Config(ConfigError),
    /// The print-control host rejected a request.
    Printer(PrinterError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Printer(e) => write!(f, "printer: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

/// Fatal startup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// GPIO library predates edge detection support.
    GpioTooOld { found: String, required: &'static str },
    /// GPIO library reported a version string we cannot interpret.
    GpioVersionUnknown(String),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioTooOld { found, required } => {
                write!(f, "GPIO version {found} is older than required {required}")
            }
            Self::GpioVersionUnknown(v) => write!(f, "unrecognised GPIO version '{v}'"),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PrinterError> for Error {
    fn from(e: PrinterError) -> Self {
        Self::Printer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
