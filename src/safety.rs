//! Per-channel fault state machine.
//!
//! Pure logic, no I/O: the [`SensorMonitor`](crate::app::service::SensorMonitor)
//! feeds it arm/disarm transitions and settled pin levels, and acts on the
//! verdicts it returns.
//!
//! ## Fault lifecycle
//!
//! 1. `arm` registers edge detection, bumps the generation and clears the
//!    latch.
//! 2. An edge settles.  If the channel is not armed, or the edge belongs to
//!    an older generation, it is stale and dropped.  If the latch is set on
//!    a channel that pauses on fault, the edge is dropped ("no trigger state
//!    change"): only a resume re-arms it.
//! 3. A settled fault level sets the latch and yields a [`FaultAction`].
//!    Under [`ResendPolicy::ResendOnEveryTrigger`] the latch is released
//!    immediately so the next settled fault dispatches again.  A fault
//!    settling while the latch is already set dispatches nothing.
//! 4. A settled normal level releases the latch only when the channel does
//!    not pause on fault.  A paused print keeps the latch until the next
//!    arm (resume or new print).
//! 5. `disarm` drops the registration.  The latch is left alone; the next
//!    `arm` resets it.

use embedded_hal::digital::PinState;

use crate::config::{ChannelConfig, ResendPolicy, SensorId};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// An active edge registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Pin the registration was made on (may differ from the configured pin
    /// after a settings change).
    pub pin: u8,
    pub generation: u32,
}

/// Mutable state of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    registration: Option<Registration>,
    triggered: bool,
    generation: u32,
}

impl ChannelState {
    pub fn armed(&self) -> bool {
        self.registration.is_some()
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Generation of the most recent arm attempt.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn registration(&self) -> Option<Registration> {
        self.registration
    }

    /// Start an arm cycle: clear the latch and reserve a fresh generation.
    /// Any edge stamped with an older generation is stale from here on.
    pub fn begin_arm(&mut self) -> u32 {
        self.registration = None;
        self.triggered = false;
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Complete an arm cycle once the edge registration succeeded.
    pub fn complete_arm(&mut self, pin: u8, generation: u32) {
        debug_assert_eq!(generation, self.generation);
        self.registration = Some(Registration { pin, generation });
    }

    /// Drop the registration.  Returns the pin it was on, if any.
    pub fn disarm(&mut self) -> Option<u8> {
        self.registration.take().map(|r| r.pin)
    }

    /// Set the latch.  Refused (returns `false`) while disarmed.
    fn latch(&mut self) -> bool {
        if !self.armed() {
            return false;
        }
        self.triggered = true;
        true
    }

    fn release(&mut self) {
        self.triggered = false;
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Whether a queued edge should be settled at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Not armed, or registered under an older generation.
    Stale,
    /// Latched in a fault on a pausing channel; no repeated action.
    Latched,
    /// Re-sample and classify.
    Open,
}

/// Actions to dispatch for a settled fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultAction {
    pub pause: bool,
    pub commands: Vec<String>,
}

impl FaultAction {
    pub fn is_empty(&self) -> bool {
        !self.pause && self.commands.is_empty()
    }
}

/// Outcome of classifying a settled level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Fault(FaultAction),
    /// Fault level again while already latched.  Nothing to dispatch.
    StillFaulted,
    /// Level is back to normal.  `released` tells whether the latch was
    /// cleared by this recovery.
    Cleared { released: bool },
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// One filament sensor: its current configuration plus its state.
#[derive(Debug, Clone)]
pub struct FilamentChannel {
    id: SensorId,
    config: ChannelConfig,
    state: ChannelState,
}

impl FilamentChannel {
    pub fn new(id: SensorId, config: ChannelConfig) -> Self {
        Self {
            id,
            config,
            state: ChannelState::default(),
        }
    }

    pub fn id(&self) -> SensorId {
        self.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Swap in a fresh configuration.  The registration (if any) is kept:
    /// it still points at the pin it was made on, so `disarm` can remove it.
    pub fn set_config(&mut self, config: ChannelConfig) {
        self.config = config;
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChannelState {
        &mut self.state
    }

    /// Decide whether an edge stamped with `generation` gets settled.
    ///
    /// A latched channel that does not pause stays open so it can observe
    /// the recovery that releases it.
    pub fn gate(&self, generation: u32) -> Gate {
        match self.state.registration {
            Some(r) if r.generation == generation => {
                if self.state.triggered && self.config.pause_on_fault {
                    Gate::Latched
                } else {
                    Gate::Open
                }
            }
            _ => Gate::Stale,
        }
    }

    /// Classify a settled level and apply the latch transitions.
    ///
    /// Callers must only invoke this after [`gate`](Self::gate) returned
    /// [`Gate::Open`] under the same lock.
    pub fn settle(&mut self, level: PinState) -> Verdict {
        if self.config.is_fault_level(level) {
            if self.state.triggered {
                return Verdict::StillFaulted;
            }
            self.state.latch();
            if self.config.resend == ResendPolicy::ResendOnEveryTrigger {
                self.state.release();
            }
            Verdict::Fault(FaultAction {
                pause: self.config.pause_on_fault,
                commands: self.config.fault_commands.clone(),
            })
        } else {
            let released = !self.config.pause_on_fault;
            if released {
                self.state.release();
            }
            Verdict::Cleared { released }
        }
    }
}
