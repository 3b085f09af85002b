//! Stable identifiers for points and certificates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Index of a point in the simulator's arena.
///
/// Points are created once at init and never destroyed, so the arena index
/// doubles as a stable identity for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub usize);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Monotonic certificate identifier.
///
/// Allocated process-wide from an atomic counter. The ordered certificate
/// index keys on this id, which gives every certificate a total order that
/// is stable for its lifetime and collision-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CertificateId(pub u64);

static NEXT_CERTIFICATE_ID: AtomicU64 = AtomicU64::new(1);

impl CertificateId {
    /// Allocate the next id. Never returns the same value twice.
    pub fn allocate() -> Self {
        Self(NEXT_CERTIFICATE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_ids_are_monotonic() {
        let a = CertificateId::allocate();
        let b = CertificateId::allocate();
        assert!(b > a);
    }

    #[test]
    fn point_id_display() {
        assert_eq!(PointId(7).to_string(), "p7");
    }
}
