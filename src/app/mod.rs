//! Application core: monitor logic behind port traits.
//!
//! This module contains the rules binding the two filament channels to the
//! print lifecycle: arming, disarming, edge settling and fault dispatch.
//! All interaction with pins, the print host and storage happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real hardware.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
