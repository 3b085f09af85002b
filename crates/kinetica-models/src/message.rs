//! Inbox records for per-point message passing.

use serde::{Deserialize, Serialize};

/// Discriminant used to filter a point's inbox. Meanings are defined by the
/// user algorithm; the engine only matches on equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKind(pub u32);

/// One record in a point's inbox.
///
/// Generic over the handle type so the storage layer can decide how points
/// are referenced (the engine uses weak handles; tests often use plain ids).
#[derive(Debug, Clone)]
pub struct Message<H> {
    pub kind: MessageKind,
    pub sender: H,
    pub payload: Option<H>,
}

impl<H: Clone> Message<H> {
    /// The point this message is "about": the payload when one was attached,
    /// the sender otherwise.
    pub fn origin(&self) -> H {
        self.payload.clone().unwrap_or_else(|| self.sender.clone())
    }
}
