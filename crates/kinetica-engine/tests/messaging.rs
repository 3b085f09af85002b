//! Decentralized messaging rounds and certificate-lifecycle idempotence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use kinetica_engine::{
    AlgorithmCode, AxisInit, Capabilities, Certificate, CertificatePredicate, HookResult,
    MessageKind, Mover, Point, PointId, PointSettings, PointSpec, SimulationConfig, Simulator,
};

const PING: MessageKind = MessageKind(1);

struct AlwaysFails;

impl CertificatePredicate for AlwaysFails {
    fn failure_time(&self, _u: &Arc<Point>, _v: &Arc<Point>, _now: f64) -> Option<f64> {
        None
    }

    fn evaluate_validity(&self, _u: &Arc<Point>, _v: &Arc<Point>, _now: f64) -> bool {
        false
    }
}

struct StaticMover;

#[async_trait]
impl Mover for StaticMover {
    async fn move_points(
        &self,
        points: &[Arc<Point>],
        now: f64,
        _previous_now: Option<f64>,
    ) -> anyhow::Result<()> {
        for point in points {
            let positions = point.static_positions(now);
            point.add_last_position(&positions, now);
        }
        Ok(())
    }
}

fn settings() -> PointSettings {
    PointSettings {
        history: 3,
        trajectory_epsilon: 20.0,
        enable_predictions: false,
        start_time: 0.0,
    }
}

fn static_pair() -> (Arc<Point>, Arc<Point>) {
    let a = Point::create(
        PointId(0),
        vec![AxisInit::Static(0.0), AxisInit::Static(0.0)],
        Box::new(kinetica_engine::NullNode),
        &settings(),
    );
    let b = Point::create(
        PointId(1),
        vec![AxisInit::Static(10.0), AxisInit::Static(0.0)],
        Box::new(kinetica_engine::NullNode),
        &settings(),
    );
    (a, b)
}

/// Round 0: point 0 pings point 1 through the endpoint handle of its
/// failed certificate. Round 1: point 1 drains the ping. Message counters
/// land on the right points.
#[tokio::test(flavor = "multi_thread")]
async fn ping_crosses_rounds() {
    struct PingPong {
        received_in_round_one: Arc<AtomicU64>,
    }

    impl AlgorithmCode for PingPong {
        fn max_iteration_count(&self) -> usize {
            2
        }

        fn per_point(
            &self,
            round: usize,
            failed: &[Arc<Certificate>],
            point: &Arc<Point>,
            _now: f64,
        ) -> HookResult {
            if round == 0 && point.id() == PointId(0) {
                let (_, other) = failed[0].endpoints().unwrap();
                point.send_message(&other, PING, None);
            }
            if round == 1 && point.id() == PointId(1) {
                let origins = point.receive_messages(PING);
                self.received_in_round_one
                    .fetch_add(origins.len() as u64, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    let received = Arc::new(AtomicU64::new(0));
    let cfg = SimulationConfig {
        end_time: 1.0,
        time_step: 1.0,
        ..SimulationConfig::default()
    };
    let caps = Capabilities {
        mover: Arc::new(StaticMover),
        initializer: None,
        algorithm: Arc::new(PingPong {
            received_in_round_one: received.clone(),
        }),
        generator: None,
        audit: None,
    };
    let specs = vec![
        PointSpec {
            axes: vec![AxisInit::Static(0.0), AxisInit::Static(0.0)],
            node: None,
        },
        PointSpec {
            axes: vec![AxisInit::Static(10.0), AxisInit::Static(0.0)],
            node: None,
        },
    ];
    let mut sim = Simulator::new(cfg, specs, caps).unwrap();

    // Every point needs a failed certificate for its rounds to run.
    let a = sim.points()[0].clone();
    let b = sim.points()[1].clone();
    a.add_certificate(Certificate::register(&a, &b, Box::new(AlwaysFails), 0.0));
    b.add_certificate(Certificate::register(&b, &a, Box::new(AlwaysFails), 0.0));

    sim.run().await.unwrap();

    assert_eq!(a.sent_messages(), 1);
    assert_eq!(b.received_messages(), 1);
    assert_eq!(received.load(Ordering::SeqCst), 1);
    assert_eq!(b.inbox_len(), 0);
}

/// Draining a kind twice in a row: the second receive is empty.
#[test]
fn receive_is_idempotent() {
    let (a, b) = static_pair();
    a.send_message(&b, PING, None);

    assert_eq!(b.receive_messages(PING).len(), 1);
    assert!(b.receive_messages(PING).is_empty());
    assert_eq!(b.received_messages(), 1);
}

/// Failure detection only accumulates into the graveyard; the live index
/// is untouched until end-of-instant collection.
#[test]
fn failure_detection_is_idempotent_within_an_instant() {
    let (a, b) = static_pair();
    let cert = Certificate::register(&a, &b, Box::new(AlwaysFails), 0.0);
    a.add_certificate(cert.clone());

    let first = a.failed_certificates(0.0);
    let second = a.failed_certificates(0.0);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id(), second[0].id());
    assert_eq!(a.graveyard_len(), 1);
    assert_eq!(a.live_certificate_count(), 1);

    // Collection retires it exactly once.
    assert_eq!(a.collect_certificates(), 1);
    assert_eq!(a.graveyard_len(), 0);
    assert_eq!(a.live_certificate_count(), 0);
    assert!(cert.is_disposed());
    assert_eq!(a.removed_this_instant(), 1);
}

/// Every certificate subscribes once to each endpoint's prediction channel
/// and disposal unsubscribes both, even when disposal runs twice.
#[test]
fn listener_balance_over_certificate_lifetime() {
    let (a, b) = static_pair();
    assert_eq!(a.prediction_channel().len(), 0);

    let cert = Certificate::register(&a, &b, Box::new(AlwaysFails), 0.0);
    assert_eq!(a.prediction_channel().len(), 1);
    assert_eq!(b.prediction_channel().len(), 1);

    cert.dispose();
    cert.dispose();
    assert_eq!(a.prediction_channel().len(), 0);
    assert_eq!(b.prediction_channel().len(), 0);
}

/// Explicit removal moves the certificate to the graveyard immediately and
/// counts it; collection then disposes without double counting.
#[test]
fn explicit_removal_counts_once() {
    let (a, b) = static_pair();
    let cert = Certificate::register(&a, &b, Box::new(AlwaysFails), 0.0);
    a.add_certificate(cert.clone());

    assert!(a.remove_certificate(&cert));
    assert!(!a.remove_certificate(&cert));
    assert_eq!(a.live_certificate_count(), 0);
    assert_eq!(a.graveyard_len(), 1);
    assert_eq!(a.removed_this_instant(), 1);

    assert_eq!(a.collect_certificates(), 1);
    assert_eq!(a.removed_this_instant(), 1);
    assert!(cert.is_disposed());
}
