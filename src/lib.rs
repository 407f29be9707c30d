//! Filament underfill / overfill safety monitor.
//!
//! Watches two digital filament sensors during a print and reacts to
//! settled faults by pausing the print and forwarding operator-configured
//! commands.  A print that would start with a sensor already faulted is
//! cancelled instead.
//!
//! The monitor core ([`app::service::SensorMonitor`]) talks to the outside
//! world only through the port traits in [`app::ports`]; [`adapters`]
//! provides the host-side implementations used by the `filamon` sidecar.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod safety;

pub use error::{Error, Result};
