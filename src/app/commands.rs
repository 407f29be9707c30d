//! Inbound print lifecycle notifications.
//!
//! The print host reports job transitions; the
//! [`SensorMonitor`](super::service::SensorMonitor) arms and disarms its
//! channels in response.

use serde::{Deserialize, Serialize};

/// Print-session events the monitor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintEvent {
    Started,
    Resumed,
    Done,
    Failed,
    Cancelled,
    /// The print host reported an error.
    Error,
}

impl PrintEvent {
    /// Events after which edge detection must be active.
    pub fn arms(self) -> bool {
        matches!(self, Self::Started | Self::Resumed)
    }

    /// Events that end monitoring.
    pub fn disarms(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled | Self::Error)
    }
}
