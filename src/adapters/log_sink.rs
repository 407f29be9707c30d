//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured monitor events through the
//! `log` facade.  The sidecar binary routes them to stderr; a host-side
//! adapter could forward the same events over the protocol instead.

use log::{info, warn};

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Armed { sensor, pin } => {
                info!("ARM   | {} | pin={}", sensor, pin);
            }
            MonitorEvent::Disarmed { sensor } => {
                info!("DISARM| {}", sensor);
            }
            MonitorEvent::FaultDetected {
                sensor,
                paused,
                commands_sent,
            } => {
                warn!(
                    "FAULT | {} | paused={} commands={}",
                    sensor, paused, commands_sent
                );
            }
            MonitorEvent::FaultCleared { sensor } => {
                info!("CLEAR | {}", sensor);
            }
            MonitorEvent::PrintAborted { sensor } => {
                warn!("ABORT | {} faulted at print start", sensor);
            }
        }
    }
}
