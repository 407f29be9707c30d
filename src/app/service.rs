//! Monitor service: the hexagonal core.
//!
//! [`SensorMonitor`] owns both filament channels and binds them to the print
//! lifecycle.  All I/O flows through port traits held by the service, so the
//! whole monitor is testable with mock adapters.
//!
//! ```text
//!    GpioPort ──▶ ┌────────────────────────┐ ──▶ PrinterPort
//!                 │     SensorMonitor      │
//!  ConfigPort ──▶ │ underfill · overfill   │ ──▶ EventSink
//!                 └────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! Each channel sits behind its own mutex; edge workers only ever take the
//! lock of their own channel.  Lifecycle operations that touch the global
//! pin numbering take the numbering lock first, then the channel locks in
//! [`SensorId::index`] order.  No lock is held across the settle delay or
//! across calls into the [`PrinterPort`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::{ChannelConfig, MonitorConfig, SensorId, Settings};
use crate::error::{InitError, Result};
use crate::events::{EdgeEvent, EdgeMsg, EdgeNotifier, EdgeQueue};
use crate::pins::{self, PinNumbering, Pull};
use crate::safety::{ChannelState, FaultAction, FilamentChannel, Gate, Verdict};

use super::commands::PrintEvent;
use super::events::MonitorEvent;
use super::ports::{ConfigPort, EventSink, GpioError, GpioPort, PrinterPort};
use super::status::{SensorStatus, StatusBody};

/// Requested vs. applied global pin numbering.
#[derive(Debug)]
struct PinMode {
    wanted: PinNumbering,
    applied: Option<PinNumbering>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// SensorMonitor
// ───────────────────────────────────────────────────────────────

/// Filament underfill / overfill monitor.
pub struct SensorMonitor<G, P, C, S> {
    gpio: G,
    printer: P,
    settings: C,
    sink: S,
    pin_mode: Mutex<PinMode>,
    channels: [Mutex<FilamentChannel>; 2],
    queues: [Arc<EdgeQueue>; 2],
}

impl<G, P, C, S> SensorMonitor<G, P, C, S>
where
    G: GpioPort,
    P: PrinterPort,
    C: ConfigPort,
    S: EventSink,
{
    /// Construct the monitor with both channels disabled.
    ///
    /// Does **not** touch the GPIO library; call [`start`](Self::start) for
    /// the full startup contract.
    pub fn new(gpio: G, printer: P, settings: C, sink: S) -> Self {
        let defaults = MonitorConfig::default();
        Self {
            gpio,
            printer,
            settings,
            sink,
            pin_mode: Mutex::new(PinMode {
                wanted: defaults.numbering,
                applied: None,
            }),
            channels: SensorId::ALL
                .map(|id| Mutex::new(FilamentChannel::new(id, defaults.channel(id).clone()))),
            queues: [Arc::new(EdgeQueue::new()), Arc::new(EdgeQueue::new())],
        }
    }

    /// Verify the GPIO library, load settings and set up the sensor pins.
    ///
    /// Only an unusable GPIO library is fatal.  Settings or pin setup
    /// failures are logged and the monitor starts with what it has.
    pub fn start(gpio: G, printer: P, settings: C, sink: S) -> Result<Self> {
        let monitor = Self::new(gpio, printer, settings, sink);
        monitor.check_gpio()?;
        info!("Filament monitor started");
        if let Err(e) = monitor.reload_settings() {
            warn!("Initial sensor setup failed ({}), continuing", e);
        }
        Ok(monitor)
    }

    /// Fail unless the GPIO library supports edge detection.
    pub fn check_gpio(&self) -> core::result::Result<(), InitError> {
        let version = self.gpio.version();
        info!("Running GPIO library version '{}'", version);
        match pins::version_at_least(&version, pins::MIN_GPIO_VERSION) {
            Some(true) => Ok(()),
            Some(false) => Err(InitError::GpioTooOld {
                found: version,
                required: pins::MIN_GPIO_VERSION,
            }),
            None => Err(InitError::GpioVersionUnknown(version)),
        }
    }

    // ── Settings ──────────────────────────────────────────────

    /// Load fresh settings, swap them in and set up the pins.
    ///
    /// On failure the previous configuration stays in effect.
    pub fn reload_settings(&self) -> Result<()> {
        let settings = self.settings.load()?;
        let config = settings.validate()?;
        self.apply_config(config)?;
        Ok(())
    }

    /// Validate, persist and apply new settings (the host's "settings saved"
    /// hook).
    pub fn update_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.settings.save(settings)?;
        info!("Settings saved");
        self.reload_settings()
    }

    /// Swap in a validated config.  Pin setup happens now if every channel
    /// is disarmed, otherwise it waits for the next arm cycle.
    fn apply_config(&self, config: MonitorConfig) -> core::result::Result<(), GpioError> {
        let (mut mode, mut chans) = self.lock_all();
        mode.wanted = config.numbering;
        for ch in &mut chans {
            let id = ch.id();
            ch.set_config(config.channel(id).clone());
            // A channel disabled while armed must not keep its registration.
            if ch.config().pin.is_none() {
                self.disarm_locked(ch);
            }
        }

        if chans.iter().any(|c| c.state().armed()) {
            info!("Sensors armed, pin setup deferred to next arm cycle");
            return Ok(());
        }
        if !config.any_enabled() {
            info!("Pins not configured, sensors won't work unless configured!");
            return Ok(());
        }

        self.ensure_numbering(&mut mode, false)?;
        for ch in &chans {
            match ch.config().pin {
                Some(pin) => {
                    info!("Filament {} sensor active on GPIO pin [{}]", ch.id(), pin);
                    self.gpio.configure_input(pin, Pull::Up)?;
                }
                None => info!("Filament {} sensor pin not configured", ch.id()),
            }
        }
        Ok(())
    }

    fn ensure_numbering(
        &self,
        mode: &mut PinMode,
        any_armed: bool,
    ) -> core::result::Result<(), GpioError> {
        if mode.applied == Some(mode.wanted) {
            return Ok(());
        }
        if any_armed {
            return Err(GpioError::NumberingLocked);
        }
        match mode.wanted {
            PinNumbering::Board => info!("Using Board mode"),
            PinNumbering::Bcm => info!("Using BCM mode"),
        }
        self.gpio.set_numbering(mode.wanted)?;
        mode.applied = Some(mode.wanted);
        Ok(())
    }

    // ── Print lifecycle ───────────────────────────────────────

    /// React to a print-session event.
    pub fn on_print_event(&self, event: PrintEvent) {
        if event.arms() {
            if let Err(e) = self.reload_settings() {
                warn!("{:?}: settings reload failed ({}), keeping previous", event, e);
            }
            // Never start a print on a sensor that already reports a fault.
            if event == PrintEvent::Started && self.abort_if_faulted() {
                return;
            }
            info!("{:?}: enabling filament sensors", event);
            self.arm_all();
        } else if event.disarms() {
            info!("{:?}: disabling filament sensors", event);
            self.disarm_all();
        }
    }

    /// One synchronous read per enabled channel; cancel the print if any
    /// reports a fault.  Returns `true` if the print was cancelled.
    fn abort_if_faulted(&self) -> bool {
        let mut faulted = false;
        for id in SensorId::ALL {
            match self.is_faulted(id) {
                Ok(SensorStatus::Fault) => {
                    info!("Printing aborted: {} detected!", id);
                    self.sink.emit(&MonitorEvent::PrintAborted { sensor: id });
                    faulted = true;
                }
                Ok(_) => {}
                Err(e) => warn!("{}: start check read failed: {}", id, e),
            }
        }
        if !faulted {
            return false;
        }
        match self.printer.cancel_print() {
            Ok(()) => true,
            Err(e) => {
                // The print is still running; keep guarding it.
                error!("Cancel request failed: {}, arming sensors anyway", e);
                false
            }
        }
    }

    /// Arm every enabled channel.  Existing registrations are dropped first
    /// so a numbering change can be applied.
    pub fn arm_all(&self) {
        let (mut mode, mut chans) = self.lock_all();
        for ch in &mut chans {
            self.release_registration(ch);
        }
        if let Err(e) = self.ensure_numbering(&mut mode, false) {
            error!("Pin numbering setup failed: {}, sensors stay disarmed", e);
            return;
        }
        for ch in &mut chans {
            if let Err(e) = self.arm_locked(ch) {
                error!("{}: arming failed: {}", ch.id(), e);
            }
        }
    }

    /// Arm one channel.  Returns `Ok(false)` for a disabled channel.
    pub fn arm(&self, sensor: SensorId) -> core::result::Result<bool, GpioError> {
        let (mut mode, mut chans) = self.lock_all();
        let others_armed = chans
            .iter()
            .any(|c| c.id() != sensor && c.state().armed());
        self.ensure_numbering(&mut mode, others_armed)?;
        self.arm_locked(&mut chans[sensor.index()])
    }

    fn arm_locked(&self, ch: &mut FilamentChannel) -> core::result::Result<bool, GpioError> {
        let id = ch.id();
        let Some(pin) = ch.config().pin else {
            self.disarm_locked(ch);
            info!("Filament {} sensor not configured, skipping", id);
            return Ok(false);
        };

        // A registration left on another pin by a settings change.
        self.release_registration(ch);

        let generation = ch.state_mut().begin_arm();
        self.gpio.configure_input(pin, Pull::Up)?;
        self.gpio.remove_edge_detect(pin)?;
        let notifier = EdgeNotifier::new(id, generation, self.queues[id.index()].clone());
        self.gpio
            .add_edge_detect(pin, ch.config().debounce_ms, notifier)?;
        ch.state_mut().complete_arm(pin, generation);

        info!(
            "Filament {} sensor armed on pin [{}] (debounce {} ms)",
            id,
            pin,
            ch.config().debounce_ms
        );
        self.sink.emit(&MonitorEvent::Armed { sensor: id, pin });
        Ok(true)
    }

    /// Disarm every channel.
    pub fn disarm_all(&self) {
        for id in SensorId::ALL {
            self.disarm(id);
        }
    }

    /// Disarm one channel.  No-op if it is not armed.
    pub fn disarm(&self, sensor: SensorId) {
        let mut ch = lock(&self.channels[sensor.index()]);
        self.disarm_locked(&mut ch);
    }

    fn disarm_locked(&self, ch: &mut FilamentChannel) {
        if self.release_registration(ch) {
            info!("Filament {} sensor disarmed", ch.id());
            self.sink.emit(&MonitorEvent::Disarmed { sensor: ch.id() });
        }
    }

    /// Drop the channel's edge registration, if any.
    fn release_registration(&self, ch: &mut FilamentChannel) -> bool {
        let Some(pin) = ch.state_mut().disarm() else {
            return false;
        };
        if let Err(e) = self.gpio.remove_edge_detect(pin) {
            warn!("{}: removing edge detection on pin {} failed: {}", ch.id(), pin, e);
        }
        true
    }

    // ── Edge handling ─────────────────────────────────────────

    /// Settle and classify an edge on `sensor` under its current generation.
    pub fn on_edge(&self, sensor: SensorId, delay: &mut impl DelayNs) {
        let generation = lock(&self.channels[sensor.index()]).state().generation();
        self.handle_edge(EdgeEvent { sensor, generation }, delay);
    }

    /// Settle and classify a queued edge.
    ///
    /// Blocks the calling worker for the channel's debounce window first:
    /// interrupt-level debouncing alone lets mechanical bounce through.
    pub fn handle_edge(&self, ev: EdgeEvent, delay: &mut impl DelayNs) {
        let sensor = ev.sensor;
        let settle_ms = lock(&self.channels[sensor.index()]).config().debounce_ms;
        delay.delay_ms(settle_ms);

        let verdict = {
            let mut ch = lock(&self.channels[sensor.index()]);
            match ch.gate(ev.generation) {
                Gate::Stale => {
                    debug!("{}: stale edge (generation {}) dropped", sensor, ev.generation);
                    return;
                }
                Gate::Latched => {
                    info!("{}: sensor callback but no trigger state change", sensor);
                    return;
                }
                Gate::Open => {}
            }
            let Some(reg) = ch.state().registration() else {
                return;
            };
            match self.gpio.read(reg.pin) {
                Ok(level) => {
                    debug!("{}: settled {}", sensor, pins::level_name(level));
                    ch.settle(level)
                }
                Err(e) => {
                    warn!("{}: settle read failed ({}), edge ignored", sensor, e);
                    return;
                }
            }
        };

        match verdict {
            Verdict::Fault(action) => self.dispatch_fault(sensor, &action),
            Verdict::StillFaulted => {
                info!("{}: sensor callback but no trigger state change", sensor);
            }
            Verdict::Cleared { released } => {
                info!(
                    "{}: filament normal{}",
                    sensor,
                    if released { "" } else { " (latched until resume)" }
                );
                self.sink.emit(&MonitorEvent::FaultCleared { sensor });
            }
        }
    }

    fn dispatch_fault(&self, sensor: SensorId, action: &FaultAction) {
        error!("Filament {} fault!", sensor);
        if action.is_empty() {
            warn!("{}: no pause or commands configured, fault only logged", sensor);
        }
        if action.pause {
            info!("Pausing print");
            if let Err(e) = self.printer.pause_print() {
                error!("{}: pause request failed: {}", sensor, e);
            }
        }
        if !action.commands.is_empty() {
            info!("Sending {} {} fault command(s)", action.commands.len(), sensor);
            if let Err(e) = self.printer.commands(&action.commands) {
                error!("{}: forwarding fault commands failed: {}", sensor, e);
            }
        }
        self.sink.emit(&MonitorEvent::FaultDetected {
            sensor,
            paused: action.pause,
            commands_sent: action.commands.len(),
        });
    }

    /// Handle every edge currently queued for `sensor` on the calling thread.
    /// Stops early at a shutdown message.  Returns the number handled.
    pub fn process_pending(&self, sensor: SensorId, delay: &mut impl DelayNs) -> usize {
        let queue = &self.queues[sensor.index()];
        let mut handled = 0;
        while let Ok(msg) = queue.try_receive() {
            match msg {
                EdgeMsg::Edge(ev) => {
                    self.handle_edge(ev, delay);
                    handled += 1;
                }
                EdgeMsg::Shutdown => break,
            }
        }
        handled
    }

    // ── Queries ───────────────────────────────────────────────

    /// Instantaneous physical state of a sensor.  Never consults or
    /// changes the latch.
    pub fn is_faulted(&self, sensor: SensorId) -> core::result::Result<SensorStatus, GpioError> {
        let config = self.channel_config(sensor);
        let Some(pin) = config.pin else {
            return Ok(SensorStatus::Disabled);
        };
        let level = self.gpio.read(pin)?;
        Ok(if config.is_fault_level(level) {
            SensorStatus::Fault
        } else {
            SensorStatus::Ok
        })
    }

    /// Body for the sensor's status endpoint.
    pub fn status_body(&self, sensor: SensorId) -> core::result::Result<StatusBody, GpioError> {
        self.is_faulted(sensor).map(|s| StatusBody::new(sensor, s))
    }

    /// Snapshot of a channel's state.
    pub fn channel_state(&self, sensor: SensorId) -> ChannelState {
        lock(&self.channels[sensor.index()]).state().clone()
    }

    /// Current configuration of a channel.
    pub fn channel_config(&self, sensor: SensorId) -> ChannelConfig {
        lock(&self.channels[sensor.index()]).config().clone()
    }

    /// Edge queue drained by the channel's worker.
    pub fn queue(&self, sensor: SensorId) -> Arc<EdgeQueue> {
        self.queues[sensor.index()].clone()
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn printer(&self) -> &P {
        &self.printer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // ── Shutdown ──────────────────────────────────────────────

    /// Disarm everything and tell the channel workers to stop.
    pub fn shutdown(&self) {
        self.disarm_all();
        for (id, queue) in SensorId::ALL.iter().zip(&self.queues) {
            // Every queued edge is stale once disarmed; make room for the stop.
            let dropped = queue.len();
            queue.clear();
            if dropped > 0 {
                debug!("{}: {} stale edge(s) dropped at shutdown", id, dropped);
            }
            if queue.try_send(EdgeMsg::Shutdown).is_err() {
                warn!("{}: edge queue full, shutdown not delivered", id);
            }
        }
        info!("Filament monitor stopped");
    }

    // ── Internal ──────────────────────────────────────────────

    fn lock_all(&self) -> (MutexGuard<'_, PinMode>, [MutexGuard<'_, FilamentChannel>; 2]) {
        let mode = lock(&self.pin_mode);
        let chans = [lock(&self.channels[0]), lock(&self.channels[1])];
        (mode, chans)
    }
}
