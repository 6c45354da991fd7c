//! WebRTC signaling relay.
//!
//! Peers connect with a WebSocket to `/{room}` and exchange JSON envelopes:
//!
//! ```json
//! {"type": "offer" | "answer" | "candidate" | "join", "data": ..., "from": "...", "to": "..."}
//! ```
//!
//! Every envelope a peer sends is forwarded, byte for byte, to all other
//! members of its room. Frames that are not envelopes are logged and dropped.
//! The relay never looks inside `data`.
//!
//! Rooms appear on first join and vanish when the last member leaves.
//! Several relay processes can share rooms through a [`bridge::Bridge`].

#![forbid(unsafe_code)]

pub mod app_state;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod peer;
pub mod registry;
pub mod router;
pub mod server;
pub mod signal;
pub mod ws;

pub use app_state::AppState;
pub use config::Config;
pub use error::RelayError;
pub use registry::{RoomId, RoomRegistry};
pub use router::SignalRouter;
pub use signal::{SignalMessage, SignalType};
