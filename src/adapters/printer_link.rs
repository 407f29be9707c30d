//! Print host link adapter.
//!
//! Implements [`PrinterPort`] by writing [`HostAction`] JSON lines to the
//! host, one object per line.  The sidecar binary hands it stdout; tests
//! hand it a `Vec<u8>`.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::app::ports::{PrinterError, PrinterPort};

use super::host_protocol::HostAction;

pub struct HostLink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> HostLink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn out(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one action line and flush it.
    pub fn send(&self, action: &HostAction) -> Result<(), PrinterError> {
        let line = serde_json::to_string(action)
            .map_err(|e| PrinterError::Rejected(e.to_string()))?;
        let mut out = self.out();
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| {
                warn!("HostLink: write failed: {}", e);
                PrinterError::Disconnected
            })?;
        debug!("HostLink: -> {}", line);
        Ok(())
    }

    /// Run `f` against the underlying writer.
    pub fn with_output<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        f(&mut self.out())
    }
}

impl<W: Write + Send> PrinterPort for HostLink<W> {
    fn cancel_print(&self) -> Result<(), PrinterError> {
        self.send(&HostAction::Cancel)
    }

    fn pause_print(&self) -> Result<(), PrinterError> {
        self.send(&HostAction::Pause)
    }

    fn commands(&self, lines: &[String]) -> Result<(), PrinterError> {
        self.send(&HostAction::Commands {
            lines: lines.to_vec(),
        })
    }
}
