// Application state module
// Holds the collaborators every request handler needs

use std::sync::Arc;

use super::types::Config;
use crate::keygen::KeyGenerator;
use crate::logger::EventLog;
use crate::store::ContentStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: ContentStore,
    pub keys: KeyGenerator,
    pub events: Arc<dyn EventLog>,
}

impl AppState {
    /// Build state around an already opened store
    pub fn new(config: Config, store: ContentStore, events: Arc<dyn EventLog>) -> Self {
        Self {
            config,
            store,
            keys: KeyGenerator::new(),
            events,
        }
    }

    /// Open the content store described by `config` and build state around it
    pub async fn open(config: Config, events: Arc<dyn EventLog>) -> std::io::Result<Self> {
        let store = ContentStore::open(&config.storage.data_dir).await?;
        Ok(Self::new(config, store, events))
    }
}
