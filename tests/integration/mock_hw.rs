//! Mock adapters for integration tests.
//!
//! Every mock is a cheap handle around shared state: the monitor owns one
//! clone, the test keeps another to stage pin levels and assert on the full
//! call history without real GPIO.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use filamon::app::events::MonitorEvent;
use filamon::app::ports::{
    ConfigError, ConfigPort, EventSink, GpioError, GpioPort, PrinterError, PrinterPort,
};
use filamon::app::service::SensorMonitor;
use filamon::config::{SensorId, Settings};
use filamon::events::EdgeNotifier;
use filamon::pins::{PinNumbering, Pull};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioCall {
    SetNumbering(PinNumbering),
    ConfigureInput(u8, Pull),
    AddEdge { pin: u8, debounce_ms: u32 },
    RemoveEdge(u8),
}

struct GpioState {
    version: String,
    levels: HashMap<u8, PinState>,
    edges: HashMap<u8, EdgeNotifier>,
    failing_reads: HashSet<u8>,
    calls: Vec<GpioCall>,
}

#[derive(Clone)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::with_version("0.7.1")
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(GpioState {
                version: version.to_owned(),
                levels: HashMap::new(),
                edges: HashMap::new(),
                failing_reads: HashSet::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Set the level `read` reports.  Does not notify.
    pub fn set_level(&self, pin: u8, level: PinState) {
        lock(&self.state).levels.insert(pin, level);
    }

    /// Deliver an edge through the registered notifier.
    pub fn fire(&self, pin: u8) -> bool {
        let notifier = lock(&self.state).edges.get(&pin).cloned();
        notifier.is_some_and(|n| n.notify())
    }

    /// Set the level, then deliver an edge.
    pub fn drive(&self, pin: u8, level: PinState) -> bool {
        self.set_level(pin, level);
        self.fire(pin)
    }

    pub fn notifier(&self, pin: u8) -> Option<EdgeNotifier> {
        lock(&self.state).edges.get(&pin).cloned()
    }

    pub fn has_edge(&self, pin: u8) -> bool {
        lock(&self.state).edges.contains_key(&pin)
    }

    pub fn edge_count(&self) -> usize {
        lock(&self.state).edges.len()
    }

    pub fn fail_reads(&self, pin: u8) {
        lock(&self.state).failing_reads.insert(pin);
    }

    pub fn calls(&self) -> Vec<GpioCall> {
        lock(&self.state).calls.clone()
    }

    pub fn numbering_changes(&self) -> Vec<PinNumbering> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GpioCall::SetNumbering(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl GpioPort for MockGpio {
    fn version(&self) -> String {
        lock(&self.state).version.clone()
    }

    fn set_numbering(&self, numbering: PinNumbering) -> Result<(), GpioError> {
        let mut st = lock(&self.state);
        if !st.edges.is_empty() {
            return Err(GpioError::NumberingLocked);
        }
        st.calls.push(GpioCall::SetNumbering(numbering));
        Ok(())
    }

    fn configure_input(&self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        let mut st = lock(&self.state);
        st.levels.entry(pin).or_insert(PinState::High);
        st.calls.push(GpioCall::ConfigureInput(pin, pull));
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<PinState, GpioError> {
        let st = lock(&self.state);
        if st.failing_reads.contains(&pin) {
            return Err(GpioError::Io("read failed".into()));
        }
        st.levels
            .get(&pin)
            .copied()
            .ok_or(GpioError::NotConfigured(pin))
    }

    fn add_edge_detect(
        &self,
        pin: u8,
        debounce_ms: u32,
        notifier: EdgeNotifier,
    ) -> Result<(), GpioError> {
        let mut st = lock(&self.state);
        if st.edges.contains_key(&pin) {
            return Err(GpioError::Io("conflicting edge detection".into()));
        }
        st.edges.insert(pin, notifier);
        st.calls.push(GpioCall::AddEdge { pin, debounce_ms });
        Ok(())
    }

    fn remove_edge_detect(&self, pin: u8) -> Result<(), GpioError> {
        let mut st = lock(&self.state);
        st.edges.remove(&pin);
        st.calls.push(GpioCall::RemoveEdge(pin));
        Ok(())
    }
}

// ── Printer ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterCall {
    Cancel,
    Pause,
    Commands(Vec<String>),
}

#[derive(Clone, Default)]
pub struct MockPrinter {
    calls: Arc<Mutex<Vec<PrinterCall>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls but report every one as failed.
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn calls(&self) -> Vec<PrinterCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, call: &PrinterCall) -> usize {
        lock(&self.calls).iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: PrinterCall) -> Result<(), PrinterError> {
        lock(&self.calls).push(call);
        if *lock(&self.failing) {
            Err(PrinterError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl PrinterPort for MockPrinter {
    fn cancel_print(&self) -> Result<(), PrinterError> {
        self.record(PrinterCall::Cancel)
    }

    fn pause_print(&self) -> Result<(), PrinterError> {
        self.record(PrinterCall::Pause)
    }

    fn commands(&self, lines: &[String]) -> Result<(), PrinterError> {
        self.record(PrinterCall::Commands(lines.to_vec()))
    }
}

// ── Settings ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemSettings {
    stored: Arc<Mutex<Result<Settings, ConfigError>>>,
    saves: Arc<Mutex<u32>>,
}

impl MemSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            stored: Arc::new(Mutex::new(Ok(settings))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    pub fn corrupted() -> Self {
        let s = Self::new(Settings::default());
        *lock(&s.stored) = Err(ConfigError::Corrupted);
        s
    }

    /// Replace the stored document behind the monitor's back.
    pub fn put(&self, settings: Settings) {
        *lock(&self.stored) = Ok(settings);
    }

    pub fn saves(&self) -> u32 {
        *lock(&self.saves)
    }
}

impl ConfigPort for MemSettings {
    fn load(&self) -> Result<Settings, ConfigError> {
        lock(&self.stored).clone()
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        *lock(&self.stored) = Ok(settings.clone());
        *lock(&self.saves) += 1;
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MonitorEvent> {
        lock(&self.events).clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &MonitorEvent) {
        lock(&self.events).push(event.clone());
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records settle delays.  Staged level changes are applied one per sleep,
/// simulating a pin that moves during the settle window.
#[derive(Default)]
pub struct MockDelay {
    pub slept_ms: Vec<u32>,
    during: VecDeque<(MockGpio, u8, PinState)>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_set(&mut self, gpio: &MockGpio, pin: u8, level: PinState) {
        self.during.push_back((gpio.clone(), pin, level));
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.slept_ms.push(ms);
        if let Some((gpio, pin, level)) = self.during.pop_front() {
            gpio.set_level(pin, level);
        }
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestMonitor = SensorMonitor<MockGpio, MockPrinter, MemSettings, RecordingSink>;

pub struct Rig {
    pub monitor: TestMonitor,
    pub gpio: MockGpio,
    pub printer: MockPrinter,
    pub settings: MemSettings,
    pub sink: RecordingSink,
}

impl Rig {
    /// Start a monitor over `settings` with pins pre-set to `levels`.
    pub fn start(settings: Settings, levels: &[(u8, PinState)]) -> Self {
        let gpio = MockGpio::new();
        for &(pin, level) in levels {
            gpio.set_level(pin, level);
        }
        let printer = MockPrinter::new();
        let store = MemSettings::new(settings);
        let sink = RecordingSink::default();
        let monitor = SensorMonitor::start(
            gpio.clone(),
            printer.clone(),
            store.clone(),
            sink.clone(),
        )
        .expect("monitor starts");
        Self {
            monitor,
            gpio,
            printer,
            settings: store,
            sink,
        }
    }

    pub fn settle(&self, sensor: SensorId) -> usize {
        self.monitor.process_pending(sensor, &mut MockDelay::new())
    }
}

/// Underfill on BCM 17, normal level HIGH, 250 ms settle, pause + two
/// commands.  Overfill disabled.
pub fn underfill_settings() -> Settings {
    let mut s = Settings::default();
    s.mode = 1;
    s.underfill.pin = 17;
    s.underfill.switch = 1;
    s.underfill.bounce_ms = 250;
    s.underfill.gcode = "M600\n\nM117 Filament out\n".into();
    s
}

pub fn fault_commands() -> Vec<String> {
    vec!["M600".to_owned(), "M117 Filament out".to_owned()]
}
