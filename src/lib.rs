mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod memory;
    pub mod schema;
    pub mod store;
}
pub mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
pub mod constants;
pub mod error;
pub mod media;
pub mod routes;
pub mod serializers;
pub mod state;

pub use database::{actions, connection, filters, form, memory, schema, store};
pub use database::error::{QueryError, ValidationErrors};

use std::sync::Arc;

use config::Config;
use memory::MemoryStore;
use state::AppState;

/// State backed by the in-process store. Nothing survives a restart.
pub fn memory_state(config: &Config) -> error::Result<Arc<AppState>> {
    AppState::new(Arc::new(MemoryStore::new()), config)
}
