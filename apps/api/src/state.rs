//! Shared application state.

use std::sync::Arc;

use shopfront_db::{CheckoutService, Database, MemoryStore, OrderStore};

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub orders: Arc<dyn OrderStore>,
    /// `None` when running on the in-memory store.
    pub database: Option<Database>,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// State backed by PostgreSQL.
    pub fn postgres(db: Database, config: ApiConfig) -> Self {
        AppState {
            checkout: CheckoutService::new(db.checkout_store()),
            orders: Arc::new(db.orders()),
            jwt: Arc::new(jwt_manager(&config)),
            database: Some(db),
            config: Arc::new(config),
        }
    }

    /// State backed by an in-memory store.
    pub fn memory(store: MemoryStore, config: ApiConfig) -> Self {
        AppState {
            checkout: CheckoutService::new(Arc::new(store.clone())),
            orders: Arc::new(store),
            jwt: Arc::new(jwt_manager(&config)),
            database: None,
            config: Arc::new(config),
        }
    }
}

fn jwt_manager(config: &ApiConfig) -> JwtManager {
    JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs)
}
