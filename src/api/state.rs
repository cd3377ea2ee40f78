use std::sync::Arc;

use crate::db::{ConsensusStore, InMemoryStore};
use crate::services::{ConsensusEngine, EngineSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: ConsensusEngine,
}

impl AppState {
    /// Creates application state over the given store
    pub fn new(store: Arc<dyn ConsensusStore>, settings: EngineSettings) -> Self {
        Self {
            engine: ConsensusEngine::new(store, settings),
        }
    }

    /// Creates application state backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), EngineSettings::default())
    }

    pub fn store(&self) -> &dyn ConsensusStore {
        self.engine.store().as_ref()
    }
}
