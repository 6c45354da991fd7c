//! WebSocket upgrade and per-connection tasks.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::peer::{Frame, PeerHandle, PeerId};
use crate::registry::RoomId;
use crate::router::SignalRouter;
use crate::signal::SignalMessage;

pub const UPGRADE_REQUIRED_BODY: &str = "Upgrade to WebSocket required";

/// `/{room}`: upgrade to a signaling channel, or 426 if the request can't be upgraded.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
            .on_upgrade(move |socket| handle_socket(socket, RoomId(room_id), state))
            .into_response(),
        Err(rejection) => {
            debug!(room = %room_id, %rejection, "rejecting non-upgrade request");
            (StatusCode::UPGRADE_REQUIRED, UPGRADE_REQUIRED_BODY).into_response()
        }
    }
}

/// Room membership for one connection. Dropping it leaves the room.
///
/// With `notify_leave` set the peer is first told its own id, which is the
/// `from` of the leave notice the rest of the room gets later.
struct Membership {
    router: Arc<SignalRouter>,
    room: RoomId,
    peer: PeerId,
    notify_leave: bool,
}

impl Membership {
    fn join(router: Arc<SignalRouter>, room: RoomId, handle: PeerHandle, notify_leave: bool) -> Self {
        let peer = handle.id();
        if notify_leave {
            match SignalMessage::welcome(peer.to_string()).encode() {
                Ok(text) => {
                    if let Err(e) = handle.try_deliver(Frame::from(text)) {
                        warn!(%room, error = %e, "failed to queue welcome");
                    }
                }
                Err(e) => warn!(%room, error = %e, "failed to encode welcome"),
            }
        }
        router.registry().join(&room, handle);
        info!(%room, peer = %peer.short(), "peer joined");
        Self {
            router,
            room,
            peer,
            notify_leave,
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if !self.router.registry().leave(&self.room, &self.peer) {
            return;
        }
        info!(room = %self.room, peer = %self.peer.short(), "peer left");
        if self.notify_leave {
            self.router.notify_leave(&self.room, &self.peer);
        }
    }
}

/// Aborts the wrapped task when dropped, so a cancelled connection handler
/// takes its socket tasks down with it.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn handle_socket(socket: WebSocket, room: RoomId, state: AppState) {
    let peer_id = PeerId::new();
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut rx) = PeerHandle::channel(peer_id, state.config.peer_queue());

    let recv_room = room.clone();
    let _membership = Membership::join(state.router.clone(), room, handle, state.config.notify_leave);

    // Queue -> socket. A write that outlives the timeout ends the connection.
    let send_timeout = state.config.send_timeout();
    let mut send_task = AbortOnDrop(tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match timeout(send_timeout, sender.send(Message::Text(frame.to_string()))).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(peer = %peer_id.short(), error = %e, "socket write failed");
                    break;
                }
                Err(_) => {
                    warn!(peer = %peer_id.short(), ?send_timeout, "socket write timed out");
                    break;
                }
            }
        }
    }));

    let router = state.router.clone();
    let mut recv_task = AbortOnDrop(tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(e) = router.handle_inbound(&recv_room, &peer_id, &text) {
                        warn!(room = %recv_room, peer = %peer_id.short(), error = %e, "dropping frame");
                    }
                }
                Ok(Message::Binary(_)) => {
                    warn!(room = %recv_room, peer = %peer_id.short(), "dropping binary frame");
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(room = %recv_room, peer = %peer_id.short(), error = %e, "socket error");
                    break;
                }
            }
        }
    }));

    // whichever side finishes first, both tasks are aborted on return
    tokio::select! {
        _ = &mut send_task.0 => {}
        _ = &mut recv_task.0 => {}
    }
}
