//! Application state.

use std::sync::Arc;

use docmill_queue::{Broker, RedisBroker};
use docmill_store::{JobStore, SqliteJobStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub broker: Arc<dyn Broker>,
}

impl AppState {
    /// Create new application state from the configured store and broker.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = SqliteJobStore::connect(&config.database_url).await?;
        let broker = RedisBroker::from_env()?;

        Ok(Self {
            config,
            store: Arc::new(store),
            broker: Arc::new(broker),
        })
    }
}
