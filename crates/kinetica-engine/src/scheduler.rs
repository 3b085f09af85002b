//! Advance-time policy and termination detection.
//!
//! When every point predicts (or no axis is statically defined), the next
//! instant is the soonest cached certificate failure time; otherwise the
//! clock steps by the configured width. The candidate bound is inclusive:
//! a certificate whose failure time equals the current instant is still a
//! candidate unless it already fired here, which makes exact tie points
//! safe at the cost of letting an instant repeat at most once per
//! certificate.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use kinetica_models::CertificateId;

use crate::config::SimulationConfig;
use crate::point::Point;

pub struct Scheduler {
    start_time: f64,
    current: f64,
    end_time: f64,
    time_step: f64,
    fired_at_instant: HashSet<CertificateId>,
}

impl Scheduler {
    pub fn new(cfg: &SimulationConfig) -> Self {
        Self {
            start_time: cfg.start_time,
            current: cfg.start_time,
            end_time: cfg.end_time,
            time_step: cfg.time_step,
            fired_at_instant: HashSet::new(),
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn current_time(&self) -> f64 {
        self.current
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn finished(&self) -> bool {
        self.current >= self.end_time
    }

    /// Pick the next simulation instant and move the clock there.
    pub fn advance_time(&mut self, points: &[Arc<Point>]) -> f64 {
        let all_have_predictions = points.iter().all(|p| p.has_full_prediction());
        let no_statics = points.iter().all(|p| !p.has_static_axis());

        let next = if all_have_predictions || no_statics {
            match self.soonest_failure(points) {
                Some((t, _)) => t,
                None => {
                    debug!(end = self.end_time, "no failure candidates, jumping to end");
                    self.end_time
                }
            }
        } else {
            self.current + self.time_step
        };
        let next = next.min(self.end_time);

        if next > self.current {
            self.fired_at_instant.clear();
        }
        for point in points {
            for cert in point.live_certificates() {
                if cert.failure_time_at_creation() == Some(next) {
                    self.fired_at_instant.insert(cert.id());
                }
            }
        }

        self.current = next;
        next
    }

    /// The lowest cached failure time at or after the current instant,
    /// excluding certificates that already fired here. Ties resolve to the
    /// lowest certificate id.
    fn soonest_failure(&self, points: &[Arc<Point>]) -> Option<(f64, CertificateId)> {
        let mut best: Option<(f64, CertificateId)> = None;
        for point in points {
            for cert in point.live_certificates() {
                let Some(t) = cert.failure_time_at_creation() else {
                    continue;
                };
                if t < self.current {
                    continue;
                }
                if t == self.current && self.fired_at_instant.contains(&cert.id()) {
                    continue;
                }
                let candidate = (t, cert.id());
                best = match best {
                    None => Some(candidate),
                    Some(current_best) if candidate < current_best => Some(candidate),
                    Some(current_best) => Some(current_best),
                };
            }
        }
        best
    }
}
