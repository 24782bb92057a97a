use std::sync::Arc;

use chrono::Duration;

use crate::{
    authentication::jwt::TokenKeys, config::Config, error::Result, media::MediaStorage,
    store::Store,
};

/// Shared by every request handler.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub keys: TokenKeys,
    pub media: MediaStorage,
    pub serve_media: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Result<Arc<Self>> {
        let keys = TokenKeys::new(
            config.secret_key.as_bytes(),
            Duration::hours(config.token_lifetime_hours),
        )?;

        Ok(Arc::new(Self {
            store,
            keys,
            media: MediaStorage::new(config.media_root.to_owned()),
            serve_media: config.serve_media,
        }))
    }
}
