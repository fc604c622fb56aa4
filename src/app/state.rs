//! Application state shared across routes

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::game::{GameMatch, MatchHandle, MatchRegistry, MatchSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            match_registry: Arc::new(MatchRegistry::new()),
        }
    }

    /// Create a match, register it and start its task. The match drops out
    /// of the registry once its task ends.
    pub fn create_match(&self, settings: MatchSettings) -> Result<MatchHandle> {
        let id = Uuid::new_v4();
        let (game_match, handle) = GameMatch::new(id, settings, self.config.tick_rate)?;

        self.match_registry.insert(handle.clone());

        let registry = self.match_registry.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(game_match.run());
            if let Err(e) = task.await {
                error!(match_id = %id, error = %e, "Match task failed");
            }
            registry.remove(&id);
            info!(match_id = %id, "Match removed from registry");
        });

        Ok(handle)
    }
}
