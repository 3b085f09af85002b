//! # Kinetica Engine
//!
//! Simulation engine for kinetic data structures: combinatorial structures
//! over moving points whose correctness is guarded by certificates —
//! algebraic predicates over point trajectories. When a certificate's
//! predicate stops holding, an event fires and user repair code runs and
//! reissues certificates.
//!
//! ## Architecture
//! - **Scheduler**: event-driven jumps to the soonest cached certificate
//!   failure when trajectories are known, discrete stepping otherwise.
//! - **Trajectory prediction**: per-axis polynomial fits over a bounded
//!   sample history, invalidated when drift exceeds tolerance.
//! - **Certificate lifecycle**: failure-time caching, prediction-change
//!   listeners, graveyard collection with single disposal.
//! - **Round driver**: movement, a global pass, per-point message-passing
//!   rounds fanned out one task per point, rebuild, and audit.
//!
//! User code plugs in through the capability traits in [`capabilities`];
//! hosts observe the run through the broadcast [`bus`].

pub mod axis;
pub mod bus;
pub mod capabilities;
pub mod certificate;
pub mod config;
pub mod driver;
pub mod error;
pub mod observability;
pub mod observer;
pub mod point;
pub mod report;
pub mod scheduler;

pub use axis::AxisState;
pub use bus::{SimulationBus, SimulationEvent};
pub use capabilities::{
    AlgorithmCode, Audit, CertificateGenerator, Mover, Node, NodeInitializer, NullNode,
};
pub use certificate::{Certificate, CertificateIndex, CertificatePredicate};
pub use config::{ClassificationPolicy, SimulationConfig};
pub use driver::{Capabilities, PointSpec, Simulator};
pub use error::{EngineError, HookError, HookResult};
pub use observability::{init_tracing, TracingGuards};
pub use observer::{ObserverList, PositionUpdate, PredictionUpdate};
pub use point::{AxisInit, Point, PointMetrics, PointSettings};
pub use report::{PointReportRow, SimulationReport};
pub use scheduler::Scheduler;

// Re-export the leaf types so hosts depend on one crate.
pub use kinetica_models::{
    CertificateId, Message, MessageKind, PointId, Polynomial, PolynomialError, Sample,
    SampleBuffer,
};
