//! Capability contracts consumed by the engine.
//!
//! User code plugs in through these traits. Optional hooks carry default
//! bodies returning `HookError::Unsupported`; the driver memoises that
//! signal and stops calling the hook, so an implementor only writes the
//! methods that exist in their algorithm.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::certificate::Certificate;
use crate::error::{HookError, HookResult};
use crate::point::Point;

/// The user structure maintained at each point.
pub trait Node: Send {
    /// Back-reference installed once at point creation. Never an
    /// ownership edge; implementors hold the weak handle as-is.
    fn attach_point(&mut self, point: Weak<Point>);

    /// Externally visible structural changes since the last instant.
    fn number_of_changes(&mut self) -> u64;
}

/// Node that maintains nothing and never changes. Used when a point spec
/// carries no user node.
pub struct NullNode;

impl Node for NullNode {
    fn attach_point(&mut self, _point: Weak<Point>) {}

    fn number_of_changes(&mut self) -> u64 {
        0
    }
}

/// One-shot initialization of user node state after the arena is built.
pub trait NodeInitializer: Send + Sync {
    fn compute_initial_values(&self, points: &[Arc<Point>]) -> anyhow::Result<()>;
}

/// The movement function. Writes fresh positions through
/// `Point::add_last_position` for every statically defined point.
#[async_trait]
pub trait Mover: Send + Sync {
    /// `previous_now` is `None` on the first movement of the run.
    async fn move_points(
        &self,
        points: &[Arc<Point>],
        now: f64,
        previous_now: Option<f64>,
    ) -> anyhow::Result<()>;
}

/// The user algorithm, in its three modalities.
#[allow(unused_variables)]
pub trait AlgorithmCode: Send + Sync {
    /// Number of per-point message-passing rounds per instant.
    fn max_iteration_count(&self) -> usize {
        1
    }

    /// Localized repair for one point with failed certificates, invoked
    /// once per round.
    fn per_point(
        &self,
        round: usize,
        failed: &[Arc<Certificate>],
        point: &Arc<Point>,
        now: f64,
    ) -> HookResult {
        Err(HookError::Unsupported)
    }

    /// Global repair after all points have moved in an instant.
    fn run_after_all_points_moved(
        &self,
        failed: &[Arc<Certificate>],
        points: &[Arc<Point>],
        now: f64,
    ) -> HookResult {
        Err(HookError::Unsupported)
    }

    /// Localized hook raised for each point right after the movement
    /// phase wrote its position. Must not re-enter the driver; it mutates
    /// point state only.
    fn run_after_single_point_moved(
        &self,
        failed: &[Arc<Certificate>],
        point: &Arc<Point>,
        points: &[Arc<Point>],
        now: f64,
    ) -> HookResult {
        Err(HookError::Unsupported)
    }
}

/// Reissues certificates after each instant's repairs.
#[allow(unused_variables)]
pub trait CertificateGenerator: Send + Sync {
    /// Whole-arena rebuild, run serially.
    fn rebuild_all(&self, points: &[Arc<Point>], now: f64) -> HookResult {
        Err(HookError::Unsupported)
    }

    /// Per-point rebuild, fanned out one task per point.
    fn rebuild_for_point(&self, point: &Arc<Point>, now: f64) -> HookResult {
        Err(HookError::Unsupported)
    }
}

/// Consistency check over the whole arena at the end of each instant.
/// Returning an error halts the simulation with state left observable.
pub trait Audit: Send + Sync {
    fn audit(&self, points: &[Arc<Point>]) -> anyhow::Result<()>;
}
