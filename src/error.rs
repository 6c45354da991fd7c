//! Error types for the signaling relay

use crate::peer::PeerId;
use thiserror::Error;

/// Errors raised while relaying signaling traffic.
///
/// Apart from [`RelayError::Io`], none of these leave the connection that
/// produced them: they are logged and the offending frame or recipient is
/// skipped.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Inbound frame is not a signaling envelope
    #[error("malformed signaling message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Envelope could not be serialized
    #[error("failed to encode signaling message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Recipient's channel is no longer open
    #[error("peer {0} is closed")]
    PeerClosed(PeerId),

    /// Recipient's outbound queue is full
    #[error("peer {0} is not keeping up, frame dropped")]
    PeerBacklogged(PeerId),

    /// Cross-instance publish failed
    #[error("bridge error: {0}")]
    Bridge(String),

    /// Listener setup failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
