use std::sync::Arc;

use crate::config::Settings;
use crate::database::{MemoryStore, MongoStore, SetStore, UserStore};
use crate::services::auth_service::TokenKeys;

/// Shared handles given to every request through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub sets: Arc<dyn SetStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenKeys,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn with_mongo(store: MongoStore, settings: Settings) -> Self {
        let store = Arc::new(store);
        Self {
            sets: store.clone(),
            users: store,
            tokens: TokenKeys::from_settings(&settings),
            settings: Arc::new(settings),
        }
    }

    pub fn in_memory(settings: Settings) -> Self {
        Self::with_memory_store(Arc::new(MemoryStore::new()), settings)
    }

    pub fn with_memory_store(store: Arc<MemoryStore>, settings: Settings) -> Self {
        Self {
            sets: store.clone(),
            users: store,
            tokens: TokenKeys::from_settings(&settings),
            settings: Arc::new(settings),
        }
    }
}
