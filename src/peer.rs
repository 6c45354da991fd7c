//! Relay-side handle to one connected peer.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::error::RelayError;

/// Opaque per-connection identifier, assigned at upgrade time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A text frame shared by every recipient of one broadcast.
pub type Frame = Arc<str>;

/// Sending half of a peer's outbound queue.
///
/// The connection's writer task owns the receiving half; once it exits the
/// handle reports closed and deliveries to it fail.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: PeerId,
    tx: mpsc::Sender<Frame>,
}

impl PeerHandle {
    pub fn new(id: PeerId, tx: mpsc::Sender<Frame>) -> Self {
        Self { id, tx }
    }

    /// Handle plus the queue its writer drains.
    pub fn channel(id: PeerId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), RelayError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::PeerBacklogged(self.id),
            TrySendError::Closed(_) => RelayError::PeerClosed(self.id),
        })
    }
}
