//! Startup, settings reload and shutdown.

use embedded_hal::digital::PinState::{High, Low};

use filamon::app::commands::PrintEvent;
use filamon::app::events::MonitorEvent;
use filamon::app::ports::ConfigError;
use filamon::app::service::SensorMonitor;
use filamon::app::status::SensorStatus;
use filamon::config::SensorId::{Overfill, Underfill};
use filamon::error::{Error, InitError};
use filamon::events::EdgeMsg;
use filamon::pins::{PinNumbering, Pull};

use crate::mock_hw::{
    GpioCall, MemSettings, MockGpio, MockPrinter, RecordingSink, Rig, underfill_settings,
};

fn start_with(gpio: MockGpio, settings: MemSettings) -> filamon::Result<crate::mock_hw::TestMonitor> {
    SensorMonitor::start(gpio, MockPrinter::new(), settings, RecordingSink::default())
}

// ── Version gate ──────────────────────────────────────────────

#[test]
fn old_gpio_library_is_fatal() {
    let gpio = MockGpio::with_version("0.5.11");
    let err = start_with(gpio.clone(), MemSettings::new(underfill_settings()))
        .err()
        .unwrap();
    assert!(matches!(err, Error::Init(InitError::GpioTooOld { .. })));
    assert!(gpio.calls().is_empty());
}

#[test]
fn unparsable_gpio_version_is_fatal() {
    let err = start_with(MockGpio::with_version("dev"), MemSettings::corrupted())
        .err()
        .unwrap();
    assert_eq!(err, Error::Init(InitError::GpioVersionUnknown("dev".into())));
}

#[test]
fn newer_minor_versions_compare_numerically() {
    for v in ["0.6.0", "0.7.1", "0.10"] {
        assert!(start_with(MockGpio::with_version(v), MemSettings::corrupted()).is_ok());
    }
}

// ── Setup ─────────────────────────────────────────────────────

#[test]
fn startup_sets_numbering_and_configures_inputs() {
    let rig = Rig::start(underfill_settings(), &[]);
    assert_eq!(
        rig.gpio.calls()[..2],
        [
            GpioCall::SetNumbering(PinNumbering::Bcm),
            GpioCall::ConfigureInput(17, Pull::Up),
        ]
    );
    assert_eq!(rig.gpio.edge_count(), 0);
    assert!(!rig.monitor.channel_state(Underfill).armed());
}

#[test]
fn corrupted_settings_start_with_sensors_disabled() {
    let gpio = MockGpio::new();
    let monitor = start_with(gpio.clone(), MemSettings::corrupted()).unwrap();
    assert_eq!(monitor.channel_config(Underfill).pin, None);

    monitor.on_print_event(PrintEvent::Started);
    assert_eq!(gpio.edge_count(), 0);
    assert_eq!(monitor.is_faulted(Underfill), Ok(SensorStatus::Disabled));
}

// ── Reload ────────────────────────────────────────────────────

#[test]
fn settings_are_reloaded_on_each_print_start() {
    let rig = Rig::start(underfill_settings(), &[(17, High), (22, High)]);
    let mut s = underfill_settings();
    s.underfill.pin = 22;
    rig.settings.put(s);

    rig.monitor.on_print_event(PrintEvent::Started);
    assert!(rig.gpio.has_edge(22));
    assert!(!rig.gpio.has_edge(17));
}

#[test]
fn pin_moved_while_armed_is_rearmed_on_resume() {
    let rig = Rig::start(underfill_settings(), &[(17, High), (22, High)]);
    rig.monitor.on_print_event(PrintEvent::Started);
    assert!(rig.gpio.has_edge(17));

    let mut s = underfill_settings();
    s.underfill.pin = 22;
    rig.settings.put(s);
    rig.monitor.on_print_event(PrintEvent::Resumed);

    assert!(rig.gpio.has_edge(22));
    assert!(!rig.gpio.has_edge(17));
    assert_eq!(rig.gpio.edge_count(), 1);
}

#[test]
fn invalid_update_is_rejected_and_not_saved() {
    let rig = Rig::start(underfill_settings(), &[]);
    let mut s = underfill_settings();
    s.underfill.bounce_ms = 0;

    let err = rig.monitor.update_settings(&s).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ValidationFailed(_))));
    assert_eq!(rig.settings.saves(), 0);
    assert_eq!(rig.monitor.channel_config(Underfill).debounce_ms, 250);
}

#[test]
fn valid_update_is_saved_and_applied() {
    let rig = Rig::start(underfill_settings(), &[]);
    let mut s = underfill_settings();
    s.overfill.pin = 27;
    s.overfill.switch = 0;

    rig.monitor.update_settings(&s).unwrap();
    assert_eq!(rig.settings.saves(), 1);
    assert_eq!(rig.monitor.channel_config(Overfill).pin, Some(27));
    assert!(rig.gpio.calls().contains(&GpioCall::ConfigureInput(27, Pull::Up)));

    // Normal level is LOW; a HIGH overfill sensor reports a fault.
    rig.gpio.set_level(27, High);
    assert_eq!(rig.monitor.status_body(Overfill).unwrap().status, "1");
    rig.gpio.set_level(27, Low);
    assert_eq!(rig.monitor.status_body(Overfill).unwrap().status, "0");
}

#[test]
fn numbering_change_waits_for_next_arm_cycle() {
    let rig = Rig::start(underfill_settings(), &[(17, High), (11, High)]);
    rig.monitor.on_print_event(PrintEvent::Started);

    let mut s = underfill_settings();
    s.mode = 0;
    s.underfill.pin = 11;
    rig.monitor.update_settings(&s).unwrap();
    assert_eq!(rig.gpio.numbering_changes(), vec![PinNumbering::Bcm]);
    assert!(rig.gpio.has_edge(17));

    rig.monitor.on_print_event(PrintEvent::Resumed);
    assert_eq!(
        rig.gpio.numbering_changes(),
        vec![PinNumbering::Bcm, PinNumbering::Board]
    );
    assert!(rig.gpio.has_edge(11));
    assert!(!rig.gpio.has_edge(17));
}

// ── Disarm / shutdown ─────────────────────────────────────────

#[test]
fn every_terminal_event_disarms() {
    for event in [
        PrintEvent::Done,
        PrintEvent::Failed,
        PrintEvent::Cancelled,
        PrintEvent::Error,
    ] {
        let rig = Rig::start(underfill_settings(), &[(17, High)]);
        rig.monitor.on_print_event(PrintEvent::Started);
        rig.monitor.on_print_event(event);
        assert!(!rig.monitor.channel_state(Underfill).armed(), "{event:?}");
        assert!(rig.gpio.calls().contains(&GpioCall::RemoveEdge(17)));
    }
}

#[test]
fn disarming_idle_monitor_emits_nothing() {
    let rig = Rig::start(underfill_settings(), &[]);
    rig.monitor.on_print_event(PrintEvent::Done);
    assert!(rig.sink.events().is_empty());
}

#[test]
fn shutdown_disarms_and_stops_workers() {
    let rig = Rig::start(underfill_settings(), &[(17, High)]);
    rig.monitor.on_print_event(PrintEvent::Started);
    rig.monitor.shutdown();

    assert_eq!(rig.gpio.edge_count(), 0);
    for sensor in [Underfill, Overfill] {
        assert_eq!(
            rig.monitor.queue(sensor).try_receive().ok(),
            Some(EdgeMsg::Shutdown)
        );
    }
    assert_eq!(
        rig.sink.events().last(),
        Some(&MonitorEvent::Disarmed { sensor: Underfill })
    );
}

#[test]
fn shutdown_gets_through_a_full_queue() {
    let rig = Rig::start(underfill_settings(), &[(17, High)]);
    rig.monitor.on_print_event(PrintEvent::Started);
    let notifier = rig.gpio.notifier(17).unwrap();
    while notifier.notify() {}

    rig.monitor.shutdown();

    let queue = rig.monitor.queue(Underfill);
    assert_eq!(queue.try_receive().ok(), Some(EdgeMsg::Shutdown));
    assert!(queue.try_receive().is_err());
}
