//! Host simulation GPIO.
//!
//! Implements [`GpioPort`] in memory so the sidecar and the tests run
//! without a pin header.  Levels are injected with [`SimGpio::set_level`];
//! a change on a pin with edge detection fires its notifier, unless the
//! previous accepted edge on that pin is younger than the registered
//! debounce interval.  That mirrors the coarse interrupt-level debounce of
//! real GPIO libraries.
//!
//! Pull-up inputs idle high.  A level injected before the pin is configured
//! is kept, so a test can stage "sensor already faulted" before startup.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use embedded_hal::digital::PinState;
use log::{debug, info};

use crate::app::ports::{GpioError, GpioPort};
use crate::events::EdgeNotifier;
use crate::pins::{self, PinNumbering, Pull};

/// Version reported by default.
pub const SIM_VERSION: &str = "0.7.1";

struct EdgeReg {
    debounce: Duration,
    notifier: EdgeNotifier,
    last_accepted: Option<Instant>,
}

#[derive(Default)]
struct SimPin {
    level: Option<PinState>,
    configured: bool,
    edge: Option<EdgeReg>,
}

#[derive(Default)]
struct SimState {
    numbering: Option<PinNumbering>,
    pins: HashMap<u8, SimPin>,
}

pub struct SimGpio {
    version: String,
    state: Mutex<SimState>,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::with_version(SIM_VERSION)
    }

    /// Simulate a specific library release.
    pub fn with_version(version: &str) -> Self {
        Self {
            version: version.to_owned(),
            state: Mutex::new(SimState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive `pin` to `level`.  Returns `true` if an edge notification was
    /// delivered.
    pub fn set_level(&self, pin: u8, level: PinState) -> bool {
        let notifier = {
            let mut st = self.state();
            let p = st.pins.entry(pin).or_default();
            let previous = p.level.replace(level);
            if previous == Some(level) || !p.configured {
                return false;
            }
            let Some(edge) = p.edge.as_mut() else {
                return false;
            };
            let now = Instant::now();
            if edge
                .last_accepted
                .is_some_and(|t| now.duration_since(t) < edge.debounce)
            {
                debug!("SimGpio: pin {} edge inside debounce, suppressed", pin);
                return false;
            }
            edge.last_accepted = Some(now);
            debug!(
                "SimGpio: pin {} edge -> {} (generation {})",
                pin,
                edge.notifier.sensor(),
                edge.notifier.generation()
            );
            edge.notifier.clone()
        };
        // Notify outside the lock, like a real interrupt thread would.
        notifier.notify()
    }

    /// Whether edge detection is registered on `pin`.
    pub fn has_edge_detect(&self, pin: u8) -> bool {
        self.state().pins.get(&pin).is_some_and(|p| p.edge.is_some())
    }
}

impl Default for SimGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort for SimGpio {
    fn version(&self) -> String {
        self.version.clone()
    }

    fn set_numbering(&self, numbering: PinNumbering) -> Result<(), GpioError> {
        let mut st = self.state();
        if st.numbering == Some(numbering) {
            return Ok(());
        }
        if st.pins.values().any(|p| p.edge.is_some()) {
            return Err(GpioError::NumberingLocked);
        }
        // Pin numbers change meaning: every pin needs a fresh setup.
        for p in st.pins.values_mut() {
            p.configured = false;
        }
        st.numbering = Some(numbering);
        info!("SimGpio: numbering {:?}", numbering);
        Ok(())
    }

    fn configure_input(&self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        let mut st = self.state();
        let numbering = st
            .numbering
            .ok_or_else(|| GpioError::Io("pin numbering not set".into()))?;
        if !numbering.is_valid_pin(pin) {
            return Err(GpioError::InvalidPin(pin));
        }
        let p = st.pins.entry(pin).or_default();
        p.level.get_or_insert(pins::idle_level(pull));
        p.configured = true;
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<PinState, GpioError> {
        let st = self.state();
        match st.pins.get(&pin) {
            Some(SimPin {
                level: Some(level),
                configured: true,
                ..
            }) => Ok(*level),
            _ => Err(GpioError::NotConfigured(pin)),
        }
    }

    fn add_edge_detect(
        &self,
        pin: u8,
        debounce_ms: u32,
        notifier: EdgeNotifier,
    ) -> Result<(), GpioError> {
        let mut st = self.state();
        let p = st
            .pins
            .get_mut(&pin)
            .filter(|p| p.configured)
            .ok_or(GpioError::NotConfigured(pin))?;
        if p.edge.is_some() {
            return Err(GpioError::Io(format!(
                "conflicting edge detection already enabled on pin {pin}"
            )));
        }
        p.edge = Some(EdgeReg {
            debounce: Duration::from_millis(u64::from(debounce_ms)),
            notifier,
            last_accepted: None,
        });
        Ok(())
    }

    fn remove_edge_detect(&self, pin: u8) -> Result<(), GpioError> {
        if let Some(p) = self.state().pins.get_mut(&pin) {
            p.edge = None;
        }
        Ok(())
    }
}
