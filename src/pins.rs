//! GPIO conventions shared by every driver and adapter.
//!
//! Single source of truth for pin numbering schemes, valid pin ranges, the
//! disabled-pin sentinel and the minimum GPIO library level the monitor
//! needs.  Pin assignments themselves are user settings, not constants.

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Settings sentinels and defaults
// ---------------------------------------------------------------------------

/// Persisted pin value meaning "no sensor wired".
pub const DISABLED_PIN: i32 = -1;

/// Default debounce / settle window (ms).
pub const DEFAULT_DEBOUNCE_MS: u32 = 250;

/// Longest accepted debounce window (ms).
pub const MAX_DEBOUNCE_MS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Numbering schemes
// ---------------------------------------------------------------------------

/// Global pin numbering mode.  Must be set before any pin is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinNumbering {
    /// Physical 40-pin header position.
    Board,
    /// Processor (Broadcom) GPIO number.
    Bcm,
}

impl PinNumbering {
    /// Decode the persisted `mode` setting (`0` = Board, `1` = BCM).
    pub fn from_setting(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(Self::Board),
            1 => Some(Self::Bcm),
            _ => None,
        }
    }

    /// Whether `pin` addresses an existing pin under this scheme.
    pub fn is_valid_pin(self, pin: u8) -> bool {
        match self {
            Self::Board => (1..=40).contains(&pin),
            Self::Bcm => pin <= 27,
        }
    }
}

// ---------------------------------------------------------------------------
// Input bias
// ---------------------------------------------------------------------------

/// Input pull resistor.  Sensor inputs always use `Up` so an open-circuit
/// switch reads a defined level instead of floating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
}

/// Level a pulled input idles at.
pub fn idle_level(pull: Pull) -> PinState {
    match pull {
        Pull::Up => PinState::High,
        Pull::Down => PinState::Low,
    }
}

/// Decode a persisted switch polarity (`0` = low, `1` = high).
pub fn level_from_setting(switch: u8) -> Option<PinState> {
    match switch {
        0 => Some(PinState::Low),
        1 => Some(PinState::High),
        _ => None,
    }
}

/// Short label for log lines.
pub fn level_name(level: PinState) -> &'static str {
    match level {
        PinState::Low => "LOW",
        PinState::High => "HIGH",
    }
}

// ---------------------------------------------------------------------------
// GPIO library level
// ---------------------------------------------------------------------------

/// First GPIO library release with edge detection.
pub const MIN_GPIO_VERSION: &str = "0.6";

/// Parse a dotted version into numeric components.
///
/// Trailing non-numeric suffixes on a component (`"2a"`) are ignored;
/// a component with no leading digit makes the whole string invalid.
pub fn parse_version(raw: &str) -> Option<Vec<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

/// Numeric comparison of two dotted versions, missing components count as 0.
/// Returns `None` if either side fails to parse.
pub fn version_at_least(found: &str, required: &str) -> Option<bool> {
    let found = parse_version(found)?;
    let required = parse_version(required)?;
    let len = found.len().max(required.len());
    for i in 0..len {
        let a = found.get(i).copied().unwrap_or(0);
        let b = required.get(i).copied().unwrap_or(0);
        if a != b {
            return Some(a > b);
        }
    }
    Some(true)
}
