//! Cross-instance fan-out.
//!
//! Relay instances that share no memory announce locally received messages
//! through a [`Bridge`]. Publishing is fire-and-forget. Receiving instances
//! hand events to [`crate::router::SignalRouter::on_bridge_event`], which
//! skips events it published itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::error::RelayError;
use crate::peer::Frame;
use crate::registry::RoomId;

/// Identity of one relay process, stamped on everything it publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One signaling frame crossing instance boundaries.
#[derive(Debug, Clone)]
pub struct BridgeEvent {
    pub origin: InstanceId,
    pub room: RoomId,
    /// Envelope text exactly as the sender wrote it
    pub frame: Frame,
}

pub trait Bridge: Send + Sync + 'static {
    /// Announce a locally received frame. Must not block.
    fn publish(&self, event: BridgeEvent) -> Result<(), RelayError>;

    /// Stream of events published by other instances, if this bridge has one.
    fn subscribe(&self) -> Option<broadcast::Receiver<BridgeEvent>>;
}

/// Single-instance deployments: nothing is sent, nothing arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBridge;

impl Bridge for NoopBridge {
    fn publish(&self, event: BridgeEvent) -> Result<(), RelayError> {
        trace!(room = %event.room, "bridge publish skipped (no bridge)");
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<BridgeEvent>> {
        None
    }
}

/// In-process pub/sub bus; every [`BusBridge`] cloned from the same bus sees
/// every event, including its own.
#[derive(Debug, Clone)]
pub struct BusBridge {
    tx: broadcast::Sender<BridgeEvent>,
}

impl BusBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Bridge for BusBridge {
    fn publish(&self, event: BridgeEvent) -> Result<(), RelayError> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| RelayError::Bridge("no subscribers on bus".into()))
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<BridgeEvent>> {
        Some(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(origin: InstanceId) -> BridgeEvent {
        BridgeEvent {
            origin,
            room: RoomId::from("alpha"),
            frame: Frame::from(r#"{"type":"offer"}"#),
        }
    }

    #[test]
    fn noop_bridge_accepts_and_has_no_stream() {
        let bridge = NoopBridge;
        assert!(bridge.publish(event(InstanceId::new())).is_ok());
        assert!(bridge.subscribe().is_none());
    }

    #[tokio::test]
    async fn bus_delivers_to_every_subscriber() {
        let bus = BusBridge::new(16);
        let other = bus.clone();
        let mut rx_a = bus.subscribe().unwrap();
        let mut rx_b = other.subscribe().unwrap();

        let origin = InstanceId::new();
        bus.publish(event(origin)).unwrap();

        assert_eq!(rx_a.recv().await.unwrap().origin, origin);
        let got = rx_b.recv().await.unwrap();
        assert_eq!(got.room, RoomId::from("alpha"));
        assert_eq!(&*got.frame, r#"{"type":"offer"}"#);
    }

    #[test]
    fn bus_without_subscribers_reports_error() {
        let bus = BusBridge::new(4);
        assert!(matches!(
            bus.publish(event(InstanceId::new())),
            Err(RelayError::Bridge(_))
        ));
    }
}
