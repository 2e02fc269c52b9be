use std::sync::Arc;

use movetools_core::{Config, MoveService, TorrentRegistry};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<MoveService>,
    registry: Arc<TorrentRegistry>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<MoveService>, registry: Arc<TorrentRegistry>) -> Self {
        Self {
            config,
            service,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &MoveService {
        self.service.as_ref()
    }

    /// Torrents known to "move completed".
    pub fn registry(&self) -> &TorrentRegistry {
        self.registry.as_ref()
    }
}
