//! Per-channel edge queues.
//!
//! The GPIO library reports raw edges from its own callback context.  Those
//! callbacks never touch monitor state: they push an [`EdgeEvent`] onto the
//! channel's bounded queue and return.  A single worker per channel drains
//! the queue, so edges for one channel are handled strictly one at a time.
//!
//! ```text
//! ┌──────────────┐  EdgeEvent  ┌──────────────┐     ┌──────────────┐
//! │ GPIO callback│────────────▶│  EdgeQueue   │────▶│ channel      │
//! │ (any thread) │  try_send   │  (bounded)   │     │ worker       │
//! └──────────────┘             └──────────────┘     └──────────────┘
//! ```
//!
//! Every notifier is stamped with the arm generation it was created for.
//! After a disarm or re-arm the old generation is stale and the worker
//! discards anything still queued under it.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::config::SensorId;

/// Queue depth per channel.  Edges beyond this while the worker is
/// settling are dropped; the settled re-sample sees the final level anyway.
pub const EDGE_QUEUE_DEPTH: usize = 16;

/// A raw edge accepted by the GPIO library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub sensor: SensorId,
    /// Arm generation the registration belonged to.
    pub generation: u32,
}

/// Messages consumed by a channel worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMsg {
    Edge(EdgeEvent),
    /// Stop the worker.
    Shutdown,
}

pub type EdgeQueue = Channel<CriticalSectionRawMutex, EdgeMsg, EDGE_QUEUE_DEPTH>;

/// Producer handle given to the GPIO library at registration time.
#[derive(Clone)]
pub struct EdgeNotifier {
    sensor: SensorId,
    generation: u32,
    queue: Arc<EdgeQueue>,
}

impl EdgeNotifier {
    pub fn new(sensor: SensorId, generation: u32, queue: Arc<EdgeQueue>) -> Self {
        Self {
            sensor,
            generation,
            queue,
        }
    }

    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Queue an edge.  Never blocks; returns `false` if the queue is full
    /// and the edge was dropped.
    pub fn notify(&self) -> bool {
        let ev = EdgeEvent {
            sensor: self.sensor,
            generation: self.generation,
        };
        if self.queue.try_send(EdgeMsg::Edge(ev)).is_err() {
            warn!("{} edge queue full, edge dropped", self.sensor);
            return false;
        }
        true
    }
}

impl core::fmt::Debug for EdgeNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EdgeNotifier")
            .field("sensor", &self.sensor)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
