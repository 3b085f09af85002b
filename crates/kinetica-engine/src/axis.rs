//! Per-axis trajectory state.
//!
//! Each axis holds a ground-truth static polynomial, an optional fitted
//! prediction, and the bounded sample history feeding that fit. An axis is
//! "statically defined" while its ground truth comes from scalar position
//! writes; installing a trajectory polynomial makes it dynamic.

use kinetica_models::{Polynomial, Sample, SampleBuffer};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AxisState {
    pol_static: Polynomial,
    is_static: bool,
    pol_predicted: Option<Polynomial>,
    samples: SampleBuffer,
}

impl AxisState {
    /// A statically defined axis at position 0 with an empty history.
    pub fn new(history: usize) -> Self {
        Self {
            pol_static: Polynomial::zero(),
            is_static: true,
            pol_predicted: None,
            samples: SampleBuffer::new(history),
        }
    }

    /// A dynamic axis whose ground truth is the given trajectory.
    pub fn with_trajectory(history: usize, trajectory: Polynomial) -> Self {
        Self {
            pol_static: trajectory,
            is_static: false,
            pol_predicted: None,
            samples: SampleBuffer::new(history),
        }
    }

    /// Record a scalar position write: the ground truth becomes the
    /// constant `[x]`, the axis becomes statically defined, and the sample
    /// enters the history ring.
    pub fn add_sample(&mut self, x: f64, t: f64) {
        self.pol_static = Polynomial::constant(x);
        self.is_static = true;
        self.samples.push(t, x);
    }

    /// Install a trajectory polynomial as ground truth.
    pub fn set_trajectory(&mut self, trajectory: Polynomial) {
        self.pol_static = trajectory;
        self.is_static = false;
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn static_polynomial(&self) -> &Polynomial {
        &self.pol_static
    }

    pub fn predicted_polynomial(&self) -> Option<&Polynomial> {
        self.pol_predicted.as_ref()
    }

    /// Prediction if present, ground truth otherwise.
    pub fn effective_polynomial(&self) -> &Polynomial {
        self.pol_predicted.as_ref().unwrap_or(&self.pol_static)
    }

    pub fn static_position(&self, t: f64) -> f64 {
        self.pol_static.evaluate(t)
    }

    pub fn predicted_position(&self, t: f64) -> Option<f64> {
        self.pol_predicted.as_ref().map(|p| p.evaluate(t))
    }

    pub fn ordered_samples(&self) -> Vec<Option<Sample>> {
        self.samples.ordered_samples()
    }

    pub fn samples_full(&self) -> bool {
        self.samples.is_full()
    }

    /// Refit the prediction from the full sample history. A singular fit
    /// clears the prediction instead of erroring.
    pub fn refit(&mut self) {
        let Some(samples) = self.samples.filled_samples() else {
            return;
        };
        let observations: Vec<(f64, f64)> =
            samples.iter().map(|s| (s.time, s.position)).collect();
        match Polynomial::fit(&observations) {
            Ok(p) => self.pol_predicted = Some(p),
            Err(err) => {
                warn!(%err, "trajectory fit failed, clearing prediction");
                self.pol_predicted = None;
            }
        }
    }

    pub fn clear_prediction(&mut self) {
        self.pol_predicted = None;
    }
}
