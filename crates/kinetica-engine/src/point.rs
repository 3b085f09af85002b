//! Per-point aggregate state.
//!
//! A point owns its axis states, its live certificate index and graveyard,
//! an inbox for decentralized messaging, per-run counters, the user node,
//! and the two observer channels. Points live in the simulator's arena as
//! `Arc<Point>`; everything mutable sits behind its own lock or atomic so
//! the per-point round fan-out can run one task per point.
//!
//! Lock discipline: the inbox mutex is the only lock ever taken on a point
//! other than the current task's own (`send_message` locks the recipient's
//! inbox briefly). User code is never invoked while an engine lock on the
//! same structure is held; callers snapshot and release first.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use serde::Serialize;
use tracing::debug;

use kinetica_models::{CertificateId, Message, MessageKind, PointId, Polynomial, Sample};

use crate::axis::AxisState;
use crate::capabilities::{AlgorithmCode, Node};
use crate::certificate::{Certificate, CertificateIndex};
use crate::config::{ClassificationPolicy, SimulationConfig};
use crate::error::HookError;
use crate::observer::{ObserverList, PositionUpdate, PredictionUpdate};

/// Initial definition of one axis of a point.
pub enum AxisInit {
    /// Statically defined: a scalar position, sampled at the start time.
    Static(f64),
    /// Dynamically defined: a full trajectory polynomial.
    Trajectory(Polynomial),
}

/// The slice of simulation configuration a point needs at creation.
#[derive(Debug, Clone)]
pub struct PointSettings {
    pub history: usize,
    pub trajectory_epsilon: f64,
    pub enable_predictions: bool,
    pub start_time: f64,
}

impl From<&SimulationConfig> for PointSettings {
    fn from(cfg: &SimulationConfig) -> Self {
        Self {
            history: cfg.history,
            trajectory_epsilon: cfg.trajectory_epsilon,
            enable_predictions: cfg.enable_predictions,
            start_time: cfg.start_time,
        }
    }
}

/// Snapshot of a point's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointMetrics {
    pub sent_messages: u64,
    pub received_messages: u64,
    pub internal_events: u64,
    pub external_events: u64,
    pub recomputed_polynomials: u64,
    pub changed: bool,
}

#[derive(Default)]
struct PointCounters {
    received_messages: AtomicU64,
    sent_messages: AtomicU64,
    internal_events: AtomicU64,
    external_events: AtomicU64,
    /// Per-instant scratch: certificates that left the live index this
    /// instant. Swapped to zero by event classification.
    removed_certificates: AtomicU64,
    recomputed_polynomials: AtomicU64,
}

pub struct Point {
    id: PointId,
    axes: RwLock<Vec<AxisState>>,
    certificates: Mutex<CertificateIndex>,
    graveyard: Mutex<Vec<Arc<Certificate>>>,
    inbox: Mutex<Vec<Message<Weak<Point>>>>,
    node: Mutex<Box<dyn Node>>,
    position_changed: ObserverList<PositionUpdate>,
    prediction_changed: ObserverList<PredictionUpdate>,
    counters: PointCounters,
    changed: AtomicBool,
    trajectory_epsilon: f64,
    predictions_enabled: bool,
}

impl Point {
    /// Create a point, seed its statically defined axes with a sample at
    /// the start time, and attach the node with a back-reference.
    pub fn create(
        id: PointId,
        axes: Vec<AxisInit>,
        node: Box<dyn Node>,
        settings: &PointSettings,
    ) -> Arc<Self> {
        let axes = axes
            .into_iter()
            .map(|init| match init {
                AxisInit::Static(x) => {
                    let mut axis = AxisState::new(settings.history);
                    axis.add_sample(x, settings.start_time);
                    axis
                }
                AxisInit::Trajectory(p) => AxisState::with_trajectory(settings.history, p),
            })
            .collect();

        let point = Arc::new(Self {
            id,
            axes: RwLock::new(axes),
            certificates: Mutex::new(CertificateIndex::new()),
            graveyard: Mutex::new(Vec::new()),
            inbox: Mutex::new(Vec::new()),
            node: Mutex::new(node),
            position_changed: ObserverList::new(),
            prediction_changed: ObserverList::new(),
            counters: PointCounters::default(),
            changed: AtomicBool::new(false),
            trajectory_epsilon: settings.trajectory_epsilon,
            predictions_enabled: settings.enable_predictions,
        });
        point
            .node
            .lock()
            .unwrap()
            .attach_point(Arc::downgrade(&point));
        point
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn axis_count(&self) -> usize {
        self.axes.read().unwrap().len()
    }

    pub fn position_channel(&self) -> &ObserverList<PositionUpdate> {
        &self.position_changed
    }

    pub fn prediction_channel(&self) -> &ObserverList<PredictionUpdate> {
        &self.prediction_changed
    }

    /// Run `f` against the node under its lock.
    pub fn with_node<R>(&self, f: impl FnOnce(&mut dyn Node) -> R) -> R {
        let mut node = self.node.lock().unwrap();
        f(node.as_mut())
    }

    // ------------------------------------------------------------------
    // Positions and trajectories
    // ------------------------------------------------------------------

    /// Whether any axis is currently statically defined.
    pub fn has_static_axis(&self) -> bool {
        self.axes.read().unwrap().iter().any(|a| a.is_static())
    }

    /// Whether every axis carries a fitted prediction.
    pub fn has_full_prediction(&self) -> bool {
        self.axes
            .read()
            .unwrap()
            .iter()
            .all(|a| a.predicted_polynomial().is_some())
    }

    pub fn static_positions(&self, t: f64) -> Vec<f64> {
        self.axes
            .read()
            .unwrap()
            .iter()
            .map(|a| a.static_position(t))
            .collect()
    }

    /// Positions from the fitted predictions; `None` unless every axis
    /// predicts.
    pub fn predicted_positions(&self, t: f64) -> Option<Vec<f64>> {
        self.axes
            .read()
            .unwrap()
            .iter()
            .map(|a| a.predicted_position(t))
            .collect()
    }

    /// Chronological sample history per axis.
    pub fn ordered_samples(&self) -> Vec<Vec<Option<Sample>>> {
        self.axes
            .read()
            .unwrap()
            .iter()
            .map(|a| a.ordered_samples())
            .collect()
    }

    /// Record freshly observed positions for every axis at time `t`, then
    /// apply the refit policy. All axes share one polynomial epoch: if any
    /// axis's prediction is missing or has drifted beyond the tolerance,
    /// every axis is refitted together.
    pub fn add_last_position(&self, positions: &[f64], t: f64) {
        let mut refit_fired = false;
        let predicted;
        {
            let mut axes = self.axes.write().unwrap();
            debug_assert_eq!(positions.len(), axes.len());
            for (axis, &x) in axes.iter_mut().zip(positions) {
                axis.add_sample(x, t);
            }

            if self.predictions_enabled && axes.iter().all(|a| a.samples_full()) {
                let stale = axes.iter().any(|a| match a.predicted_position(t) {
                    None => true,
                    Some(p) => (p - a.static_position(t)).abs() > self.trajectory_epsilon,
                });
                if stale {
                    for axis in axes.iter_mut() {
                        axis.refit();
                    }
                    refit_fired = axes.iter().all(|a| a.predicted_polynomial().is_some());
                }
            }
            predicted = axes
                .iter()
                .filter_map(|a| a.predicted_polynomial().cloned())
                .collect::<Vec<_>>();
        }

        if refit_fired {
            self.counters
                .recomputed_polynomials
                .fetch_add(1, Ordering::Relaxed);
            debug!(point = %self.id, now = t, "trajectory refitted");
            self.prediction_changed.emit(&PredictionUpdate {
                point: self.id,
                predicted,
                now: t,
            });
        }
        self.position_changed.emit(&PositionUpdate {
            point: self.id,
            positions: positions.to_vec(),
            now: t,
        });
    }

    /// L2 distance between effective positions: the predicted view when
    /// both points carry full predictions, the static view otherwise.
    pub fn distance(&self, other: &Point, t: f64) -> f64 {
        let (a, b) = match (self.predicted_positions(t), other.predicted_positions(t)) {
            (Some(a), Some(b)) => (a, b),
            _ => (self.static_positions(t), other.static_positions(t)),
        };
        a.iter()
            .zip(&b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// Squared distance as a polynomial in time, built from per-axis
    /// effective polynomials so certificate predicates can root-solve it.
    pub fn square_distance(&self, other: &Point) -> Polynomial {
        if std::ptr::eq(self, other) {
            return Polynomial::zero();
        }
        let ours = self.axes.read().unwrap();
        let theirs = other.axes.read().unwrap();
        let mut acc = Polynomial::zero();
        for (a, b) in ours.iter().zip(theirs.iter()) {
            let d = a.effective_polynomial() - b.effective_polynomial();
            acc = &acc + &(&d * &d);
        }
        acc
    }

    // ------------------------------------------------------------------
    // Certificates
    // ------------------------------------------------------------------

    pub fn add_certificate(&self, cert: Arc<Certificate>) {
        self.certificates.lock().unwrap().insert(cert);
    }

    pub fn contains_certificate(&self, id: CertificateId) -> bool {
        self.certificates.lock().unwrap().contains(id)
    }

    pub fn live_certificates(&self) -> Vec<Arc<Certificate>> {
        self.certificates.lock().unwrap().snapshot()
    }

    pub fn live_certificate_count(&self) -> usize {
        self.certificates.lock().unwrap().len()
    }

    pub fn graveyard_len(&self) -> usize {
        self.graveyard.lock().unwrap().len()
    }

    /// Remove a certificate from the live index into the graveyard.
    /// Returns false when it was not live here.
    pub fn remove_certificate(&self, cert: &Arc<Certificate>) -> bool {
        let removed = self
            .certificates
            .lock()
            .unwrap()
            .remove(cert.id())
            .is_some();
        if removed {
            self.counters
                .removed_certificates
                .fetch_add(1, Ordering::Relaxed);
            let mut graveyard = self.graveyard.lock().unwrap();
            if !graveyard.iter().any(|c| c.id() == cert.id()) {
                graveyard.push(cert.clone());
            }
        }
        removed
    }

    /// Scan the live set for certificates whose predicate no longer holds
    /// at `now`. Failed ones are recorded in the graveyard but stay in the
    /// live index until end-of-instant collection, so repeated calls
    /// within an instant return the same snapshot.
    pub fn failed_certificates(&self, now: f64) -> Vec<Arc<Certificate>> {
        let live = self.live_certificates();
        let failed: Vec<Arc<Certificate>> = live
            .into_iter()
            .filter(|c| !c.evaluate_validity(now))
            .collect();
        if !failed.is_empty() {
            let mut graveyard = self.graveyard.lock().unwrap();
            for cert in &failed {
                if !graveyard.iter().any(|c| c.id() == cert.id()) {
                    graveyard.push(cert.clone());
                }
            }
        }
        failed
    }

    /// End-of-instant collection: physically remove every graveyard entry
    /// from the live index, dispose it, and empty the graveyard. Returns
    /// how many certificates were retired.
    pub fn collect_certificates(&self) -> usize {
        let retired: Vec<Arc<Certificate>> = {
            let mut graveyard = self.graveyard.lock().unwrap();
            graveyard.drain(..).collect()
        };
        for cert in &retired {
            // Entries that arrived via remove_certificate already left the
            // live index and were counted there.
            if self
                .certificates
                .lock()
                .unwrap()
                .remove(cert.id())
                .is_some()
            {
                self.counters
                    .removed_certificates
                    .fetch_add(1, Ordering::Relaxed);
            }
            cert.dispose();
        }
        retired.len()
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Deliver a message into `to`'s inbox. Visible to any subsequent
    /// receive; by engine convention consumed in the next round.
    pub fn send_message(
        self: &Arc<Self>,
        to: &Arc<Point>,
        kind: MessageKind,
        payload: Option<&Arc<Point>>,
    ) {
        self.counters.sent_messages.fetch_add(1, Ordering::Relaxed);
        let message = Message {
            kind,
            sender: Arc::downgrade(self),
            payload: payload.map(Arc::downgrade),
        };
        to.inbox.lock().unwrap().push(message);
    }

    /// Filter-drain the inbox by kind and return the origin point of each
    /// drained message (payload if attached, sender otherwise).
    pub fn receive_messages(&self, kind: MessageKind) -> Vec<Arc<Point>> {
        let drained: Vec<Message<Weak<Point>>> = {
            let mut inbox = self.inbox.lock().unwrap();
            let mut kept = Vec::with_capacity(inbox.len());
            let mut taken = Vec::new();
            for message in inbox.drain(..) {
                if message.kind == kind {
                    taken.push(message);
                } else {
                    kept.push(message);
                }
            }
            *inbox = kept;
            taken
        };
        self.counters
            .received_messages
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained.iter().filter_map(|m| m.origin().upgrade()).collect()
    }

    pub fn clear_inbox(&self) {
        self.inbox.lock().unwrap().clear();
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().unwrap().len()
    }

    // ------------------------------------------------------------------
    // Rounds and event classification
    // ------------------------------------------------------------------

    /// One per-point pass of the user algorithm. Skips (returning false)
    /// when this point has no failed certificates at `now`.
    pub fn run_round(
        self: &Arc<Self>,
        round: usize,
        code: &Arc<dyn AlgorithmCode>,
        now: f64,
    ) -> Result<bool, HookError> {
        let failed = self.failed_certificates(now);
        if failed.is_empty() {
            return Ok(false);
        }
        code.per_point(round, &failed, self, now)?;
        Ok(true)
    }

    /// Split this instant's certificate removals into internal and
    /// external events against the node's reported change count, then
    /// reset the scratch counter and latch `changed`. Returns the node's
    /// change count.
    pub fn classify_events(&self, policy: ClassificationPolicy) -> u64 {
        let removed = self.counters.removed_certificates.swap(0, Ordering::SeqCst);
        let external = self.with_node(|n| n.number_of_changes());
        if removed > external {
            self.counters
                .external_events
                .fetch_add(external, Ordering::Relaxed);
            self.counters
                .internal_events
                .fetch_add(removed - external, Ordering::Relaxed);
        } else {
            match policy {
                ClassificationPolicy::AllExternal => {
                    self.counters
                        .external_events
                        .fetch_add(removed, Ordering::Relaxed);
                }
                ClassificationPolicy::Skip => {}
            }
        }
        self.changed.store(external != 0, Ordering::SeqCst);
        external
    }

    pub fn changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    pub fn sent_messages(&self) -> u64 {
        self.counters.sent_messages.load(Ordering::Relaxed)
    }

    pub fn received_messages(&self) -> u64 {
        self.counters.received_messages.load(Ordering::Relaxed)
    }

    pub fn internal_events(&self) -> u64 {
        self.counters.internal_events.load(Ordering::Relaxed)
    }

    pub fn external_events(&self) -> u64 {
        self.counters.external_events.load(Ordering::Relaxed)
    }

    pub fn recomputed_polynomials(&self) -> u64 {
        self.counters.recomputed_polynomials.load(Ordering::Relaxed)
    }

    /// Certificates removed so far in the current instant.
    pub fn removed_this_instant(&self) -> u64 {
        self.counters.removed_certificates.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> PointMetrics {
        PointMetrics {
            sent_messages: self.sent_messages(),
            received_messages: self.received_messages(),
            internal_events: self.internal_events(),
            external_events: self.external_events(),
            recomputed_polynomials: self.recomputed_polynomials(),
            changed: self.changed(),
        }
    }
}
