//! # Kinetica Models Crate
//!
//! Leaf data types shared across the kinetica simulation engine.
//!
//! This crate provides:
//! - `Polynomial` — dense univariate polynomial arithmetic, interpolating
//!   fit, and first-root solving for failure-time evaluation
//! - `SampleBuffer` — bounded chronological ring of position samples
//! - `Message` / `MessageKind` — inbox records for per-point messaging
//! - `PointId` / `CertificateId` — stable identifiers
//!
//! Everything here is deliberately free of engine state: no locks, no
//! trajectories, no time advancement. The engine crate composes these.

pub mod ids;
pub mod message;
pub mod polynomial;
pub mod sample;

pub use ids::{CertificateId, PointId};
pub use message::{Message, MessageKind};
pub use polynomial::{Polynomial, PolynomialError};
pub use sample::{Sample, SampleBuffer};
