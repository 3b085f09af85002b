//! Broadcast bus for engine-level simulation events.

use std::sync::Arc;

use tokio::sync::broadcast;

use kinetica_models::PointId;

use crate::point::Point;

const BUS_CAPACITY: usize = 256;

/// Host-observable engine events.
#[derive(Clone)]
pub enum SimulationEvent {
    /// Emitted at the end of every instant.
    Tick { now: f64, points: Vec<Arc<Point>> },
    /// Emitted only for instants where at least one point changed.
    PointsChanged {
        now: f64,
        points: Vec<Arc<Point>>,
        changed: Vec<PointId>,
    },
}

/// Publish/subscribe hub for `SimulationEvent`s. Publishing never blocks;
/// events are dropped when no subscriber is attached or a subscriber lags.
pub struct SimulationBus {
    tx: broadcast::Sender<SimulationEvent>,
}

impl Default for SimulationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SimulationEvent) {
        let _ = self.tx.send(event);
    }
}
