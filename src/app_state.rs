use std::sync::Arc;

use crate::bridge::{Bridge, NoopBridge};
use crate::config::Config;
use crate::registry::RoomRegistry;
use crate::router::SignalRouter;

/// Shared state handed to every connection handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<SignalRouter>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Single-instance relay.
    pub fn new(config: Config) -> Self {
        Self::with_bridge(config, Arc::new(NoopBridge))
    }

    pub fn with_bridge(config: Config, bridge: Arc<dyn Bridge>) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let router = Arc::new(SignalRouter::new(registry.clone(), bridge));
        Self {
            registry,
            router,
            config: Arc::new(config),
        }
    }
}
