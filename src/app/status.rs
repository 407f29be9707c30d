//! Read-only status projection for the `underfilled` / `overfilled` endpoints.
//!
//! Reports the instantaneous physical state of a sensor, independent of the
//! latched state machine.  Codes are strings on the wire:
//!
//! | endpoint      | disabled | fault | normal |
//! |---------------|----------|-------|--------|
//! | `underfilled` | `"-1"`   | `"0"` | `"1"`  |
//! | `overfilled`  | `"-1"`   | `"1"` | `"0"`  |
//!
//! `underfilled` answers "is filament present", `overfilled` answers "is it
//! overfilled".

use serde::Serialize;

use crate::config::SensorId;

/// Instantaneous sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// No pin configured.
    Disabled,
    Fault,
    Ok,
}

impl SensorStatus {
    /// Wire code for the sensor's endpoint.
    pub fn code(self, sensor: SensorId) -> &'static str {
        match (self, sensor) {
            (Self::Disabled, _) => "-1",
            (Self::Fault, SensorId::Underfill) | (Self::Ok, SensorId::Overfill) => "0",
            (Self::Ok, SensorId::Underfill) | (Self::Fault, SensorId::Overfill) => "1",
        }
    }
}

/// Endpoint path for a sensor.
pub fn endpoint(sensor: SensorId) -> &'static str {
    match sensor {
        SensorId::Underfill => "underfilled",
        SensorId::Overfill => "overfilled",
    }
}

/// JSON body returned by the endpoints: `{"status": "<code>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

impl StatusBody {
    pub fn new(sensor: SensorId, status: SensorStatus) -> Self {
        Self {
            status: status.code(sensor),
        }
    }
}
