//! Bounded chronological ring of position samples.

use serde::{Deserialize, Serialize};

/// A single observed `(time, position)` pair on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub position: f64,
}

/// Fixed-capacity ring buffer of samples.
///
/// Writes overwrite the oldest slot once the buffer is full. Reads always
/// come back oldest to newest regardless of where the head currently sits.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    slots: Vec<Option<Sample>>,
    head: usize,
}

impl SampleBuffer {
    /// Create a buffer holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sample buffer capacity must be positive");
        Self {
            slots: vec![None; capacity],
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// Write a sample at the head and advance it.
    pub fn push(&mut self, time: f64, position: f64) {
        self.slots[self.head] = Some(Sample { time, position });
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Slots rotated so the oldest written sample comes first: the slice
    /// from the head onward, then the slice before it. Unwritten slots stay
    /// `None`.
    pub fn ordered_samples(&self) -> Vec<Option<Sample>> {
        let mut out = Vec::with_capacity(self.slots.len());
        out.extend_from_slice(&self.slots[self.head..]);
        out.extend_from_slice(&self.slots[..self.head]);
        out
    }

    /// All samples oldest to newest once the buffer is full; `None` before.
    pub fn filled_samples(&self) -> Option<Vec<Sample>> {
        if !self.is_full() {
            return None;
        }
        Some(self.ordered_samples().into_iter().flatten().collect())
    }
}
