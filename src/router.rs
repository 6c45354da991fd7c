//! Room-wide delivery of signaling frames.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::bridge::{Bridge, BridgeEvent, InstanceId};
use crate::error::RelayError;
use crate::peer::{Frame, PeerId};
use crate::registry::{RoomId, RoomRegistry};
use crate::signal::SignalMessage;

/// Fans frames out to room members and mirrors them onto the bridge.
pub struct SignalRouter {
    instance: InstanceId,
    registry: Arc<RoomRegistry>,
    bridge: Arc<dyn Bridge>,
}

impl SignalRouter {
    pub fn new(registry: Arc<RoomRegistry>, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            instance: InstanceId::new(),
            registry,
            bridge,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Route one text frame received from `sender`.
    ///
    /// The frame must decode as a peer-sendable [`SignalMessage`]; if it does, the original
    /// text (not a re-encoding) goes to every other open member of `room` and
    /// to the bridge. Returns the number of local deliveries.
    pub fn handle_inbound(
        &self,
        room: &RoomId,
        sender: &PeerId,
        text: &str,
    ) -> Result<usize, RelayError> {
        let msg = SignalMessage::decode_inbound(text)?;
        let frame = Frame::from(text);

        let delivered = self.broadcast(room, sender, frame.clone());
        debug!(%room, peer = %sender.short(), kind = ?msg.kind, recipients = delivered, "relayed signal");

        self.publish(room, frame);
        Ok(delivered)
    }

    /// Deliver `frame` to every open member of `room` except `sender`.
    pub fn broadcast(&self, room: &RoomId, sender: &PeerId, frame: Frame) -> usize {
        self.fan_out(room, Some(sender), frame)
    }

    /// Deliver `frame` to every open member of `room` other than `exclude`.
    ///
    /// Each recipient is attempted independently; a closed or backlogged one
    /// is skipped and the rest still receive the frame.
    pub fn fan_out(&self, room: &RoomId, exclude: Option<&PeerId>, frame: Frame) -> usize {
        let mut delivered = 0;
        for member in self.registry.members_of(room) {
            if exclude == Some(&member.id()) {
                continue;
            }
            if !member.is_open() {
                trace!(%room, peer = %member.id().short(), "skipping closed peer");
                continue;
            }
            match member.try_deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(%room, error = %e, "delivery failed"),
            }
        }
        delivered
    }

    /// Tell the rest of `room` that `peer` is gone.
    pub fn notify_leave(&self, room: &RoomId, peer: &PeerId) -> usize {
        let frame = match SignalMessage::leave(peer.to_string()).encode() {
            Ok(text) => Frame::from(text),
            Err(e) => {
                warn!(%room, error = %e, "failed to encode leave notice");
                return 0;
            }
        };
        let delivered = self.fan_out(room, Some(peer), frame.clone());
        self.publish(room, frame);
        delivered
    }

    /// Merge an event from another instance into local delivery.
    ///
    /// Events stamped with this instance's id were already delivered locally
    /// and are dropped.
    pub fn on_bridge_event(&self, event: BridgeEvent) -> usize {
        if event.origin == self.instance {
            return 0;
        }
        let delivered = self.fan_out(&event.room, None, event.frame);
        trace!(room = %event.room, origin = %event.origin, recipients = delivered, "merged bridge event");
        delivered
    }

    /// Feed the bridge's inbound stream into [`Self::on_bridge_event`].
    ///
    /// Returns `None` when the bridge has no inbound stream.
    pub fn spawn_bridge_listener(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.bridge.subscribe()?;
        let router = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        router.on_bridge_event(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bridge listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("bridge listener stopped");
        }))
    }

    fn publish(&self, room: &RoomId, frame: Frame) {
        let event = BridgeEvent {
            origin: self.instance,
            room: room.clone(),
            frame,
        };
        if let Err(e) = self.bridge.publish(event) {
            debug!(%room, error = %e, "bridge publish failed");
        }
    }
}
