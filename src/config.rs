//! Monitor configuration.
//!
//! Two layers:
//!
//! - [`Settings`] is the persisted, user-editable form (plain integers and
//!   text, `-1` for a disabled pin, newline-delimited command text).
//! - [`MonitorConfig`] is the validated form the monitor runs on.  It is
//!   derived from fresh settings before each arm cycle.

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins::{self, PinNumbering};

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// One of the two independent fault-detection paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    /// Filament runout / starvation detector.
    Underfill,
    /// Filament jam / excess detector.
    Overfill,
}

impl SensorId {
    pub const ALL: [Self; 2] = [Self::Underfill, Self::Overfill];

    /// Stable array index.
    pub const fn index(self) -> usize {
        match self {
            Self::Underfill => 0,
            Self::Overfill => 1,
        }
    }

    /// Human-readable label for log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Underfill => "underfill",
            Self::Overfill => "overfill",
        }
    }
}

impl core::fmt::Display for SensorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Persisted settings
// ---------------------------------------------------------------------------

/// Per-channel persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Input pin, `-1` = disabled.
    pub pin: i32,
    /// Debounce / settle window in milliseconds.
    pub bounce_ms: u32,
    /// Normal (non-fault) level: `0` = low, `1` = high.
    pub switch: u8,
    /// Commands to forward on fault, one per line.
    pub gcode: String,
    /// Pause the active print on fault.
    pub pause_print: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            pin: pins::DISABLED_PIN,
            bounce_ms: pins::DEFAULT_DEBOUNCE_MS,
            switch: 0,
            gcode: String::new(),
            pause_print: true,
        }
    }
}

/// Full persisted settings document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub underfill: ChannelSettings,
    pub overfill: ChannelSettings,
    /// Pin numbering: `0` = Board, `1` = BCM.
    pub mode: u8,
    /// Send fault commands only on the first trigger since arming.
    /// Off by default: older installs relied on commands being resent.
    pub send_gcode_only_once: bool,
}

impl Settings {
    pub fn channel(&self, id: SensorId) -> &ChannelSettings {
        match id {
            SensorId::Underfill => &self.underfill,
            SensorId::Overfill => &self.overfill,
        }
    }

    /// Validate and convert into the runtime form.
    ///
    /// Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<MonitorConfig, ConfigError> {
        let numbering = PinNumbering::from_setting(self.mode)
            .ok_or(ConfigError::ValidationFailed("mode must be 0 (board) or 1 (bcm)"))?;
        let resend = if self.send_gcode_only_once {
            ResendPolicy::SendOnce
        } else {
            ResendPolicy::ResendOnEveryTrigger
        };

        let [underfill, overfill] =
            SensorId::ALL.map(|id| validate_channel(self.channel(id), numbering, resend));
        Ok(MonitorConfig {
            numbering,
            underfill: underfill?,
            overfill: overfill?,
        })
    }
}

fn validate_channel(
    raw: &ChannelSettings,
    numbering: PinNumbering,
    resend: ResendPolicy,
) -> Result<ChannelConfig, ConfigError> {
    let pin = match raw.pin {
        pins::DISABLED_PIN => None,
        p => {
            let p = u8::try_from(p)
                .map_err(|_| ConfigError::ValidationFailed("pin must be -1 or a valid pin"))?;
            if !numbering.is_valid_pin(p) {
                return Err(ConfigError::ValidationFailed(
                    "pin out of range for numbering mode (board 1-40, bcm 0-27)",
                ));
            }
            Some(p)
        }
    };
    if !(1..=pins::MAX_DEBOUNCE_MS).contains(&raw.bounce_ms) {
        return Err(ConfigError::ValidationFailed("bounce_ms must be 1-10000"));
    }
    let active_level = pins::level_from_setting(raw.switch)
        .ok_or(ConfigError::ValidationFailed("switch must be 0 or 1"))?;

    Ok(ChannelConfig {
        pin,
        debounce_ms: raw.bounce_ms,
        active_level,
        fault_commands: split_commands(&raw.gcode),
        pause_on_fault: raw.pause_print,
        resend,
    })
}

/// Split command text into lines, dropping blank ones.
pub fn split_commands(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

// ---------------------------------------------------------------------------
// Validated runtime configuration
// ---------------------------------------------------------------------------

/// Whether fault commands repeat while a fault persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendPolicy {
    /// Dispatch once per latch; later edges are ignored until clearance or re-arm.
    SendOnce,
    /// Clear the latch right after dispatch so every settled fault dispatches again.
    ResendOnEveryTrigger,
}

/// Validated configuration of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// `None` = sensor not wired.
    pub pin: Option<u8>,
    pub debounce_ms: u32,
    /// Level meaning "normal"; the opposite level is a fault.
    pub active_level: PinState,
    pub fault_commands: Vec<String>,
    pub pause_on_fault: bool,
    pub resend: ResendPolicy,
}

impl ChannelConfig {
    pub fn is_enabled(&self) -> bool {
        self.pin.is_some()
    }

    /// Classify a sampled level.
    pub fn is_fault_level(&self, level: PinState) -> bool {
        level != self.active_level
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            pin: None,
            debounce_ms: pins::DEFAULT_DEBOUNCE_MS,
            active_level: PinState::Low,
            fault_commands: Vec::new(),
            pause_on_fault: true,
            resend: ResendPolicy::ResendOnEveryTrigger,
        }
    }
}

/// Validated configuration of the whole monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub numbering: PinNumbering,
    pub underfill: ChannelConfig,
    pub overfill: ChannelConfig,
}

impl MonitorConfig {
    pub fn channel(&self, id: SensorId) -> &ChannelConfig {
        match id {
            SensorId::Underfill => &self.underfill,
            SensorId::Overfill => &self.overfill,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.underfill.is_enabled() || self.overfill.is_enabled()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            numbering: PinNumbering::Board,
            underfill: ChannelConfig::default(),
            overfill: ChannelConfig::default(),
        }
    }
}
