//! # Round Driver
//!
//! Drives the simulation one instant at a time.
//!
//! ## Phase order per instant
//! 1. Advance the clock (scheduler).
//! 2. Move points when any axis is statically defined; then the localized
//!    pass, once per point, on the serial thread.
//! 3. Global pass: gather failed certificates, clear inboxes, run the
//!    whole-arena algorithm hook.
//! 4. Per-point rounds: `max_iteration_count` passes, one task per point
//!    per round, joined between rounds.
//! 5. Certificate collection: graveyards are drained, entries leave the
//!    live indexes and are disposed.
//! 6. Event classification per point against the node's change count.
//! 7. Certificate rebuild: whole-arena serially, then per point fanned
//!    out.
//! 8. Audit; an error halts the run with state left observable.
//! 9. Emit tick events on the bus.
//!
//! Phases 1-3, 5, 6, 8 and 9 run on the serial thread. The mover await
//! and the fan-out joins of phases 4 and 7 are the only suspension
//! points. Round 0's inbox clear also happens on the serial thread,
//! before the fan-out, so a clear can never race a peer's send inside
//! the same round.
//!
//! Hooks that report `Unsupported` are disabled for the rest of the run
//! and logged once.

use std::sync::Arc;

use tracing::{debug, info};

use kinetica_models::PointId;

use crate::bus::{SimulationBus, SimulationEvent};
use crate::capabilities::{
    AlgorithmCode, Audit, CertificateGenerator, Mover, NodeInitializer, NullNode,
};
use crate::config::SimulationConfig;
use crate::error::{EngineError, HookError};
use crate::point::{AxisInit, Point, PointSettings};
use crate::report::{PointReportRow, SimulationReport};
use crate::scheduler::Scheduler;

/// Initial definition of one point.
pub struct PointSpec {
    pub axes: Vec<AxisInit>,
    /// User node; a `NullNode` is attached when absent.
    pub node: Option<Box<dyn crate::capabilities::Node>>,
}

/// User code the engine consumes.
pub struct Capabilities {
    pub mover: Arc<dyn Mover>,
    pub initializer: Option<Box<dyn NodeInitializer>>,
    pub algorithm: Arc<dyn AlgorithmCode>,
    pub generator: Option<Arc<dyn CertificateGenerator>>,
    pub audit: Option<Arc<dyn Audit>>,
}

/// Which optional hooks are still live. Everything starts enabled; an
/// `Unsupported` signal turns the flag off for the rest of the run.
struct HookFlags {
    per_point: bool,
    after_all: bool,
    after_single: bool,
    rebuild_all: bool,
    rebuild_point: bool,
}

impl Default for HookFlags {
    fn default() -> Self {
        Self {
            per_point: true,
            after_all: true,
            after_single: true,
            rebuild_all: true,
            rebuild_point: true,
        }
    }
}

pub struct Simulator {
    cfg: SimulationConfig,
    points: Vec<Arc<Point>>,
    scheduler: Scheduler,
    caps: Capabilities,
    hooks: HookFlags,
    bus: SimulationBus,
    previous_now: Option<f64>,
    instants: u64,
}

impl Simulator {
    /// Build the point arena from specs, attach nodes, and run the node
    /// initializer.
    pub fn new(
        cfg: SimulationConfig,
        specs: Vec<PointSpec>,
        caps: Capabilities,
    ) -> Result<Self, EngineError> {
        if cfg.axis_count == 0 {
            return Err(EngineError::Config("axis_count must be positive".into()));
        }
        if cfg.history == 0 {
            return Err(EngineError::Config("history must be positive".into()));
        }
        if cfg.time_step <= 0.0 {
            return Err(EngineError::Config("time_step must be positive".into()));
        }

        let settings = PointSettings::from(&cfg);
        let mut points = Vec::with_capacity(specs.len());
        for (idx, spec) in specs.into_iter().enumerate() {
            if spec.axes.len() != cfg.axis_count {
                return Err(EngineError::Config(format!(
                    "point {idx} defines {} axes, expected {}",
                    spec.axes.len(),
                    cfg.axis_count
                )));
            }
            let node = spec.node.unwrap_or_else(|| Box::new(NullNode));
            points.push(Point::create(PointId(idx), spec.axes, node, &settings));
        }

        if let Some(initializer) = &caps.initializer {
            initializer
                .compute_initial_values(&points)
                .map_err(|cause| EngineError::Initializer { cause })?;
        }

        let scheduler = Scheduler::new(&cfg);
        Ok(Self {
            cfg,
            points,
            scheduler,
            caps,
            hooks: HookFlags::default(),
            bus: SimulationBus::new(),
            previous_now: None,
            instants: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.cfg
    }

    pub fn points(&self) -> &[Arc<Point>] {
        &self.points
    }

    pub fn current_time(&self) -> f64 {
        self.scheduler.current_time()
    }

    pub fn instants(&self) -> u64 {
        self.instants
    }

    /// Subscribe to engine events before calling `run`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SimulationEvent> {
        self.bus.subscribe()
    }

    /// Run to the configured end time, or until the audit or a capability
    /// halts the simulation.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        info!(
            points = self.points.len(),
            start = self.cfg.start_time,
            end = self.cfg.end_time,
            predictions = self.cfg.enable_predictions,
            "simulation starting"
        );
        while !self.scheduler.finished() {
            let now = self.scheduler.advance_time(&self.points);
            self.step(now).await?;
            self.instants += 1;
        }
        info!(instants = self.instants, "simulation finished");
        Ok(())
    }

    /// One instant: the phase sequence documented at module level.
    async fn step(&mut self, now: f64) -> Result<(), EngineError> {
        // Movement only matters while some axis takes scalar writes; a
        // fully dynamic arena already knows its trajectories.
        let any_static = self.points.iter().any(|p| p.has_static_axis());
        if any_static {
            self.caps
                .mover
                .move_points(&self.points, now, self.previous_now)
                .await
                .map_err(|cause| EngineError::Mover { now, cause })?;
            self.previous_now = Some(now);
            self.run_localized_pass(now)?;
        }

        // Global pass.
        let mut failed_all = Vec::new();
        for point in &self.points {
            failed_all.extend(point.failed_certificates(now));
        }
        for point in &self.points {
            point.clear_inbox();
        }
        if self.hooks.after_all {
            match self
                .caps
                .algorithm
                .run_after_all_points_moved(&failed_all, &self.points, now)
            {
                Ok(()) => {}
                Err(HookError::Unsupported) => {
                    self.hooks.after_all = false;
                    info!("run_after_all_points_moved not implemented, hook disabled");
                }
                Err(HookError::Other(cause)) => {
                    return Err(EngineError::Algorithm { now, cause })
                }
            }
        }

        // Per-point rounds.
        if self.hooks.per_point {
            let rounds = self.caps.algorithm.max_iteration_count();
            'rounds: for round in 0..rounds {
                if round == 0 {
                    for point in &self.points {
                        point.clear_inbox();
                    }
                }
                let mut tasks = Vec::with_capacity(self.points.len());
                for point in &self.points {
                    let point = Arc::clone(point);
                    let code = Arc::clone(&self.caps.algorithm);
                    tasks.push(tokio::spawn(
                        async move { point.run_round(round, &code, now) },
                    ));
                }
                let mut unsupported = false;
                for task in tasks {
                    match task.await? {
                        Ok(_ran) => {}
                        Err(HookError::Unsupported) => unsupported = true,
                        Err(HookError::Other(cause)) => {
                            return Err(EngineError::Algorithm { now, cause })
                        }
                    }
                }
                if unsupported {
                    self.hooks.per_point = false;
                    info!("per_point not implemented, rounds disabled");
                    break 'rounds;
                }
            }
        }

        // Certificate collection.
        let mut retired = 0;
        for point in &self.points {
            retired += point.collect_certificates();
        }

        // Event classification.
        let mut changed = Vec::new();
        for point in &self.points {
            let external = point.classify_events(self.cfg.classification);
            if external != 0 {
                changed.push(point.id());
            }
        }

        // Rebuild.
        if let Some(generator) = &self.caps.generator {
            let generator = Arc::clone(generator);
            if self.hooks.rebuild_all {
                match generator.rebuild_all(&self.points, now) {
                    Ok(()) => {}
                    Err(HookError::Unsupported) => {
                        self.hooks.rebuild_all = false;
                        info!("rebuild_all not implemented, hook disabled");
                    }
                    Err(HookError::Other(cause)) => {
                        return Err(EngineError::Rebuild { now, cause })
                    }
                }
            }
            if self.hooks.rebuild_point {
                let mut tasks = Vec::with_capacity(self.points.len());
                for point in &self.points {
                    let point = Arc::clone(point);
                    let generator = Arc::clone(&generator);
                    tasks.push(tokio::spawn(async move {
                        generator.rebuild_for_point(&point, now)
                    }));
                }
                let mut unsupported = false;
                for task in tasks {
                    match task.await? {
                        Ok(()) => {}
                        Err(HookError::Unsupported) => unsupported = true,
                        Err(HookError::Other(cause)) => {
                            return Err(EngineError::Rebuild { now, cause })
                        }
                    }
                }
                if unsupported {
                    self.hooks.rebuild_point = false;
                    info!("rebuild_for_point not implemented, hook disabled");
                }
            }
        }

        // Audit.
        if let Some(audit) = &self.caps.audit {
            audit
                .audit(&self.points)
                .map_err(|cause| EngineError::Audit { now, cause })?;
        }

        // Emit.
        debug!(now, retired, changed = changed.len(), "instant complete");
        self.bus.publish(SimulationEvent::Tick {
            now,
            points: self.points.clone(),
        });
        if !changed.is_empty() {
            self.bus.publish(SimulationEvent::PointsChanged {
                now,
                points: self.points.clone(),
                changed,
            });
        }
        Ok(())
    }

    /// Localized modality: the single-point hook, raised serially once per
    /// point right after movement.
    fn run_localized_pass(&mut self, now: f64) -> Result<(), EngineError> {
        if !self.hooks.after_single {
            return Ok(());
        }
        for point in &self.points {
            let failed = point.failed_certificates(now);
            match self
                .caps
                .algorithm
                .run_after_single_point_moved(&failed, point, &self.points, now)
            {
                Ok(()) => {}
                Err(HookError::Unsupported) => {
                    self.hooks.after_single = false;
                    info!("run_after_single_point_moved not implemented, hook disabled");
                    return Ok(());
                }
                Err(HookError::Other(cause)) => {
                    return Err(EngineError::Algorithm { now, cause })
                }
            }
        }
        Ok(())
    }

    /// Assemble the end-of-run summary from live state.
    pub fn report(&self) -> SimulationReport {
        let points: Vec<PointReportRow> = self
            .points
            .iter()
            .map(|p| PointReportRow {
                point: p.id(),
                live_certificates: p.live_certificate_count(),
                metrics: p.metrics(),
            })
            .collect();
        SimulationReport {
            start_time: self.cfg.start_time,
            end_time: self.cfg.end_time,
            final_time: self.scheduler.current_time(),
            instants: self.instants,
            total_internal_events: points.iter().map(|r| r.metrics.internal_events).sum(),
            total_external_events: points.iter().map(|r| r.metrics.external_events).sum(),
            total_messages_sent: points.iter().map(|r| r.metrics.sent_messages).sum(),
            total_messages_received: points.iter().map(|r| r.metrics.received_messages).sum(),
            points,
        }
    }
}
