//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

/// WebRTC signaling relay
///
/// Groups WebSocket peers into rooms (`/{room}`) and forwards signaling
/// envelopes between members of the same room.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), env = "RELAY_HOST")]
    pub host: IpAddr,

    /// Port to listen on (managed platforms may assign their own)
    #[arg(short, long, default_value_t = 8000, env = "PORT")]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "RELAY_LOG")]
    pub log_level: String,

    /// Outbound frames buffered per peer before deliveries to it are dropped
    #[arg(long, default_value_t = 64, env = "RELAY_PEER_QUEUE", value_parser = clap::value_parser!(u32).range(1..))]
    pub peer_queue: u32,

    /// Upper bound on a single socket write, in milliseconds
    #[arg(long, default_value_t = 5000, env = "RELAY_SEND_TIMEOUT_MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub send_timeout_ms: u64,

    /// Tell each peer its id on join, and the rest of the room when it leaves
    #[arg(long, default_value_t = false, env = "RELAY_NOTIFY_LEAVE")]
    pub notify_leave: bool,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn peer_queue(&self) -> usize {
        self.peer_queue as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            log_level: "info".into(),
            peer_queue: 64,
            send_timeout_ms: 5000,
            notify_leave: false,
        }
    }
}
