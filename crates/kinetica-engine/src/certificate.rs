//! Certificate base and the per-point ordered index.
//!
//! A certificate is an engine-managed shell around a user predicate over
//! two endpoint points. The shell owns the lifecycle: it caches the
//! failure time computed at creation, re-caches it whenever either
//! endpoint's prediction changes, and deregisters those listeners exactly
//! once on disposal. Endpoints are held weakly; the simulator's arena owns
//! every point.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use kinetica_models::CertificateId;

use crate::observer::PredictionUpdate;
use crate::point::Point;

/// The user-supplied half of a certificate.
///
/// `evaluate_validity` is expected to answer from current ground-truth
/// data; `failure_time` is expected to root-solve the predicate's
/// polynomial forward from `now` and return the first time the predicate
/// stops holding, or `None` when it holds forever.
pub trait CertificatePredicate: Send + Sync {
    fn failure_time(&self, u: &Arc<Point>, v: &Arc<Point>, now: f64) -> Option<f64>;

    fn evaluate_validity(&self, u: &Arc<Point>, v: &Arc<Point>, now: f64) -> bool;
}

/// Engine-side certificate: endpoints, predicate, cached failure time.
pub struct Certificate {
    id: CertificateId,
    u: Weak<Point>,
    v: Weak<Point>,
    predicate: Box<dyn CertificatePredicate>,
    failure_at_creation: Mutex<Option<f64>>,
    disposed: AtomicBool,
}

impl Certificate {
    /// Create a certificate over `(u, v)`, compute its initial failure
    /// time, and hook the re-cache listener onto both endpoints'
    /// prediction channels under the certificate's id.
    pub fn register(
        u: &Arc<Point>,
        v: &Arc<Point>,
        predicate: Box<dyn CertificatePredicate>,
        now: f64,
    ) -> Arc<Self> {
        let id = CertificateId::allocate();
        let initial = predicate.failure_time(u, v, now);
        let cert = Arc::new(Self {
            id,
            u: Arc::downgrade(u),
            v: Arc::downgrade(v),
            predicate,
            failure_at_creation: Mutex::new(initial),
            disposed: AtomicBool::new(false),
        });

        for endpoint in [u, v] {
            let weak = Arc::downgrade(&cert);
            endpoint.prediction_channel().subscribe(
                id.0,
                Arc::new(move |update: &PredictionUpdate| {
                    if let Some(cert) = weak.upgrade() {
                        cert.recache_failure_time(update.now);
                    }
                }),
            );
        }
        cert
    }

    pub fn id(&self) -> CertificateId {
        self.id
    }

    /// Both endpoints, if the arena still holds them.
    pub fn endpoints(&self) -> Option<(Arc<Point>, Arc<Point>)> {
        Some((self.u.upgrade()?, self.v.upgrade()?))
    }

    /// The cached failure time: computed at creation and refreshed on
    /// every endpoint prediction change. The scheduler reads this.
    pub fn failure_time_at_creation(&self) -> Option<f64> {
        *self.failure_at_creation.lock().unwrap()
    }

    /// Recompute and store the cached failure time as of `now`.
    pub fn recache_failure_time(&self, now: f64) {
        let fresh = self.failure_time(now);
        *self.failure_at_creation.lock().unwrap() = fresh;
    }

    /// Recompute the failure time on demand without touching the cache.
    pub fn failure_time(&self, now: f64) -> Option<f64> {
        let (u, v) = self.endpoints()?;
        self.predicate.failure_time(&u, &v, now)
    }

    /// Whether the predicate still holds at `now`. A certificate whose
    /// endpoints have left the arena no longer holds.
    pub fn evaluate_validity(&self, now: f64) -> bool {
        match self.endpoints() {
            Some((u, v)) => self.predicate.evaluate_validity(&u, &v, now),
            None => false,
        }
    }

    /// Deregister the prediction listeners from both endpoints. Safe to
    /// call more than once; only the first call does anything.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for endpoint in [&self.u, &self.v] {
            if let Some(point) = endpoint.upgrade() {
                point.prediction_channel().unsubscribe(self.id.0);
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A point's live certificates, ordered by certificate id.
///
/// The id is monotonic and unique, so iteration order is a stable total
/// order for every certificate's lifetime.
#[derive(Default)]
pub struct CertificateIndex {
    entries: BTreeMap<CertificateId, Arc<Certificate>>,
}

impl CertificateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cert: Arc<Certificate>) {
        self.entries.insert(cert.id(), cert);
    }

    pub fn remove(&mut self, id: CertificateId) -> Option<Arc<Certificate>> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: CertificateId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live certificates in id order.
    pub fn snapshot(&self) -> Vec<Arc<Certificate>> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{AxisInit, Point, PointSettings};
    use kinetica_models::PointId;

    struct NeverFails;

    impl CertificatePredicate for NeverFails {
        fn failure_time(&self, _u: &Arc<Point>, _v: &Arc<Point>, _now: f64) -> Option<f64> {
            None
        }

        fn evaluate_validity(&self, _u: &Arc<Point>, _v: &Arc<Point>, _now: f64) -> bool {
            true
        }
    }

    fn pair() -> (Arc<Point>, Arc<Point>) {
        let settings = PointSettings {
            history: 3,
            trajectory_epsilon: 20.0,
            enable_predictions: false,
            start_time: 0.0,
        };
        let u = Point::create(
            PointId(0),
            vec![AxisInit::Static(0.0), AxisInit::Static(0.0)],
            Box::new(crate::capabilities::NullNode),
            &settings,
        );
        let v = Point::create(
            PointId(1),
            vec![AxisInit::Static(10.0), AxisInit::Static(0.0)],
            Box::new(crate::capabilities::NullNode),
            &settings,
        );
        (u, v)
    }

    #[test]
    fn registration_hooks_both_endpoints() {
        let (u, v) = pair();
        let cert = Certificate::register(&u, &v, Box::new(NeverFails), 0.0);
        assert_eq!(u.prediction_channel().len(), 1);
        assert_eq!(v.prediction_channel().len(), 1);

        cert.dispose();
        assert!(cert.is_disposed());
        assert_eq!(u.prediction_channel().len(), 0);
        assert_eq!(v.prediction_channel().len(), 0);

        // Idempotent.
        cert.dispose();
        assert_eq!(u.prediction_channel().len(), 0);
    }

    #[test]
    fn index_iterates_in_id_order() {
        let (u, v) = pair();
        let a = Certificate::register(&u, &v, Box::new(NeverFails), 0.0);
        let b = Certificate::register(&u, &v, Box::new(NeverFails), 0.0);

        let mut index = CertificateIndex::new();
        index.insert(b.clone());
        index.insert(a.clone());
        assert_eq!(index.len(), 2);
        assert!(index.contains(a.id()));

        let ids: Vec<_> = index.snapshot().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);

        assert!(index.remove(a.id()).is_some());
        assert!(index.remove(a.id()).is_none());
        assert_eq!(index.len(), 1);
        a.dispose();
        b.dispose();
    }
}
