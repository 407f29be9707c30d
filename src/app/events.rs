//! Outbound monitor events.
//!
//! The [`SensorMonitor`](super::service::SensorMonitor) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, forward them to the host.

use serde::Serialize;

use crate::config::SensorId;

/// Structured events emitted by the monitor core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Edge detection enabled on a channel.
    Armed { sensor: SensorId, pin: u8 },

    /// Edge detection removed from a channel.
    Disarmed { sensor: SensorId },

    /// A settled fault was recognised and actions dispatched.
    FaultDetected { sensor: SensorId, paused: bool, commands_sent: usize },

    /// A channel returned to its normal level.
    FaultCleared { sensor: SensorId },

    /// A print was cancelled at start because a channel was already faulted.
    PrintAborted { sensor: SensorId },
}
