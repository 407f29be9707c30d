//! Port traits: the hexagonal boundary between the monitor and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorMonitor (domain)
//! ```
//!
//! Driven adapters (GPIO, print host, settings storage, event sinks)
//! implement these traits.  The [`SensorMonitor`](super::service::SensorMonitor)
//! consumes them via generics and shares them between the lifecycle path and
//! the per-channel edge workers, so every port takes `&self` and must be
//! `Send + Sync`.

use embedded_hal::digital::PinState;

use crate::config::Settings;
use crate::events::EdgeNotifier;
use crate::pins::{PinNumbering, Pull};

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: pins ↔ domain)
// ───────────────────────────────────────────────────────────────

/// The slice of a GPIO library the monitor needs.
pub trait GpioPort: Send + Sync {
    /// Library version string, e.g. `"0.7.1"`.
    fn version(&self) -> String;

    /// Select the global pin numbering scheme.
    fn set_numbering(&self, numbering: PinNumbering) -> Result<(), GpioError>;

    /// Configure `pin` as an input with the given bias.
    fn configure_input(&self, pin: u8, pull: Pull) -> Result<(), GpioError>;

    /// Synchronous level read.
    fn read(&self, pin: u8) -> Result<PinState, GpioError>;

    /// Register both-edge detection on `pin`.  Edges closer together than
    /// `debounce_ms` may be coalesced by the library.  Every accepted edge
    /// calls [`EdgeNotifier::notify`].
    fn add_edge_detect(
        &self,
        pin: u8,
        debounce_ms: u32,
        notifier: EdgeNotifier,
    ) -> Result<(), GpioError>;

    /// Remove edge detection from `pin`.  Must succeed if none is registered.
    fn remove_edge_detect(&self, pin: u8) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Printer port (driven adapter: domain → print host)
// ───────────────────────────────────────────────────────────────

/// Print-control host operations.  Calls are fire-and-forget from the
/// monitor's point of view: failures are logged, never retried.
pub trait PrinterPort: Send + Sync {
    /// Abort the current print job.
    fn cancel_print(&self) -> Result<(), PrinterError>;

    /// Pause the current print job.  A no-op downstream if nothing prints.
    fn pause_print(&self) -> Result<(), PrinterError>;

    /// Forward opaque command lines, in order.
    fn commands(&self, lines: &[String]) -> Result<(), PrinterError>;
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: domain ↔ persistent settings)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`Settings`].
///
/// Implementations MUST validate before persisting.  Invalid values are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort: Send + Sync {
    /// Load settings.  Returns [`Settings::default()`] if none are stored.
    fn load(&self) -> Result<Settings, ConfigError>;

    /// Validate and persist settings.
    fn save(&self, settings: &Settings) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / host)
// ───────────────────────────────────────────────────────────────

/// The monitor emits structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::MonitorEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`GpioPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// Pin does not exist under the current numbering.
    InvalidPin(u8),
    /// Pin was never configured as an input.
    NotConfigured(u8),
    /// Numbering cannot change while pins are in use.
    NumberingLocked,
    /// Library / kernel reported an error.
    Io(String),
}

/// Errors from [`PrinterPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterError {
    /// The host link is gone.
    Disconnected,
    /// The host refused the request.
    Rejected(String),
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored settings failed to deserialize.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin(p) => write!(f, "invalid pin {p}"),
            Self::NotConfigured(p) => write!(f, "pin {p} not configured as input"),
            Self::NumberingLocked => write!(f, "pin numbering locked while pins are in use"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl core::fmt::Display for PrinterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "printer host disconnected"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
