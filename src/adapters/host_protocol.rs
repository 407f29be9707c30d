//! Line-oriented JSON protocol between the print host and the sidecar.
//!
//! Every line on stdin is one [`HostMessage`]; every line on stdout is one
//! [`HostAction`].  Logs go to stderr so stdout stays protocol-only.
//!
//! ```text
//! {"type":"print","event":"started"}      → arm sensors
//! {"type":"pin","pin":17,"high":false}    → drive a simulated pin
//! {"type":"status","sensor":"underfill"}  → {"action":"status","sensor":"underfill","status":"1"}
//! {"type":"shutdown"}                     → disarm, stop workers, exit
//! ```
//!
//! A malformed line is answered with an `error` action and otherwise
//! ignored.

use std::io::{self, BufRead, Write};

use embedded_hal::digital::PinState;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::PrintEvent;
use crate::app::ports::{ConfigPort, EventSink};
use crate::app::service::SensorMonitor;
use crate::app::status;
use crate::config::{SensorId, Settings};

use super::printer_link::HostLink;
use super::sim_gpio::SimGpio;

/// Longest accepted input line.  Longer lines are rejected unparsed.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Inbound message from the print host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Print { event: PrintEvent },
    /// Drive a simulated pin.
    Pin { pin: u8, high: bool },
    Status { sensor: SensorId },
    SaveSettings { settings: Settings },
    Reload,
    Shutdown,
}

/// Outbound action for the print host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    Cancel,
    Pause,
    Commands { lines: Vec<String> },
    Status { sensor: SensorId, status: String },
    Error { message: String },
}

/// Whether the session keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Decode one input line.
pub fn decode(line: &str) -> Result<HostMessage, String> {
    if line.len() > MAX_LINE_LEN {
        return Err(format!("line too long ({} bytes)", line.len()));
    }
    serde_json::from_str(line).map_err(|e| e.to_string())
}

/// Monitor as wired by the sidecar: simulated pins, host link output.
pub type HostMonitor<C, S, W> = SensorMonitor<SimGpio, HostLink<W>, C, S>;

fn reply<C, S, W>(monitor: &HostMonitor<C, S, W>, action: &HostAction)
where
    C: ConfigPort,
    S: EventSink,
    W: Write + Send,
{
    if let Err(e) = monitor.printer().send(action) {
        warn!("reply dropped: {}", e);
    }
}

fn report_error<C, S, W>(monitor: &HostMonitor<C, S, W>, message: String)
where
    C: ConfigPort,
    S: EventSink,
    W: Write + Send,
{
    reply(monitor, &HostAction::Error { message });
}

/// Apply one decoded message.
pub fn dispatch<C, S, W>(monitor: &HostMonitor<C, S, W>, msg: HostMessage) -> Flow
where
    C: ConfigPort,
    S: EventSink,
    W: Write + Send,
{
    match msg {
        HostMessage::Print { event } => monitor.on_print_event(event),
        HostMessage::Pin { pin, high } => {
            let level = if high { PinState::High } else { PinState::Low };
            monitor.gpio().set_level(pin, level);
        }
        HostMessage::Status { sensor } => match monitor.status_body(sensor) {
            Ok(body) => reply(
                monitor,
                &HostAction::Status {
                    sensor,
                    status: body.status.to_owned(),
                },
            ),
            Err(e) => {
                warn!("{} status unavailable: {}", status::endpoint(sensor), e);
                report_error(
                    monitor,
                    format!("{} unavailable: {e}", status::endpoint(sensor)),
                );
            }
        },
        HostMessage::SaveSettings { settings } => {
            if let Err(e) = monitor.update_settings(&settings) {
                report_error(monitor, format!("save_settings: {e}"));
            }
        }
        HostMessage::Reload => {
            if let Err(e) = monitor.reload_settings() {
                report_error(monitor, format!("reload: {e}"));
            }
        }
        HostMessage::Shutdown => return Flow::Shutdown,
    }
    Flow::Continue
}

/// Read one line into `buf`, newline included.  At most
/// `MAX_LINE_LEN + 1` bytes are kept; the rest of an overlong line is
/// consumed and discarded.  Returns the bytes consumed, 0 at EOF.
fn read_line_bounded<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let available = match input.fill_buf() {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(consumed);
        }
        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = (MAX_LINE_LEN + 1).saturating_sub(buf.len());
        buf.extend_from_slice(&available[..used.min(room)]);
        input.consume(used);
        consumed += used;
        if done {
            return Ok(consumed);
        }
    }
}

/// Read messages until EOF or `shutdown`.  Blank lines are skipped.
///
/// Only a failing input stream ends the session early.  Overlong or
/// non-UTF-8 lines are answered with an `error` action like any other
/// malformed message.
pub fn serve<C, S, W, R>(monitor: &HostMonitor<C, S, W>, mut input: R) -> io::Result<()>
where
    C: ConfigPort,
    S: EventSink,
    W: Write + Send,
    R: BufRead,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if read_line_bounded(&mut input, &mut buf)? == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.len() > MAX_LINE_LEN {
            warn!("host line exceeds {} bytes, dropped", MAX_LINE_LEN);
            report_error(monitor, format!("line too long (max {MAX_LINE_LEN} bytes)"));
            continue;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("host line is not valid UTF-8, dropped");
            report_error(monitor, "malformed message: invalid UTF-8".to_owned());
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode(line) {
            Ok(msg) => {
                if dispatch(monitor, msg) == Flow::Shutdown {
                    info!("shutdown requested by host");
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("malformed host message: {}", e);
                report_error(monitor, format!("malformed message: {e}"));
            }
        }
    }
    info!("host closed input");
    Ok(())
}
