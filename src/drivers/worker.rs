//! Per-channel edge workers.
//!
//! One named thread per filament channel drains that channel's
//! [`EdgeQueue`](crate::events::EdgeQueue) and runs the settle step on it.
//! Edges for one channel are therefore handled strictly in order, while the
//! two channels settle independently of each other.
//!
//! Workers exit when they receive [`EdgeMsg::Shutdown`], which
//! [`SensorMonitor::shutdown`] sends to both queues.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;
use futures_lite::future::block_on;
use log::{debug, info};

use crate::app::ports::{ConfigPort, EventSink, GpioPort, PrinterPort};
use crate::app::service::SensorMonitor;
use crate::config::SensorId;
use crate::events::EdgeMsg;

/// Worker stack.  The settle path is shallow; 64 KB leaves ample headroom.
pub const WORKER_STACK_KB: usize = 64;

/// Drain `sensor`'s queue on the calling thread until shutdown.
pub fn run_channel<G, P, C, S>(
    monitor: &SensorMonitor<G, P, C, S>,
    sensor: SensorId,
    delay: &mut impl DelayNs,
) where
    G: GpioPort,
    P: PrinterPort,
    C: ConfigPort,
    S: EventSink,
{
    let queue = monitor.queue(sensor);
    loop {
        match block_on(queue.receive()) {
            EdgeMsg::Edge(ev) => monitor.handle_edge(ev, delay),
            EdgeMsg::Shutdown => {
                debug!("{} worker: shutdown received", sensor);
                break;
            }
        }
    }
}

/// Spawn a named worker thread for `sensor`.
pub fn spawn_channel<G, P, C, S, D>(
    monitor: Arc<SensorMonitor<G, P, C, S>>,
    sensor: SensorId,
    mut delay: D,
) -> io::Result<JoinHandle<()>>
where
    G: GpioPort + 'static,
    P: PrinterPort + 'static,
    C: ConfigPort + 'static,
    S: EventSink + 'static,
    D: DelayNs + Send + 'static,
{
    let name = format!("filamon-{}", sensor.label());
    info!("Spawning '{}' (stack={}KB)", name, WORKER_STACK_KB);
    std::thread::Builder::new()
        .name(name)
        .stack_size(WORKER_STACK_KB * 1024)
        .spawn(move || run_channel(&monitor, sensor, &mut delay))
}

/// Handles to both channel workers.
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    /// Spawn one worker per channel, each with its own delay.
    pub fn spawn<G, P, C, S, D>(
        monitor: &Arc<SensorMonitor<G, P, C, S>>,
        delay: D,
    ) -> io::Result<Self>
    where
        G: GpioPort + 'static,
        P: PrinterPort + 'static,
        C: ConfigPort + 'static,
        S: EventSink + 'static,
        D: DelayNs + Clone + Send + 'static,
    {
        let handles = SensorId::ALL
            .into_iter()
            .map(|id| spawn_channel(Arc::clone(monitor), id, delay.clone()))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self { handles })
    }

    /// Wait for both workers to exit.  Call after
    /// [`SensorMonitor::shutdown`].
    pub fn join(self) {
        for h in self.handles {
            if h.join().is_err() {
                log::error!("channel worker panicked");
            }
        }
    }
}
