use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::config::Config;
use super::context::ServiceContext;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub keys: Arc<JwtKeys>,
}

pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, secret: &str) -> Self {
        Self {
            db,
            config: Arc::new(config),
            keys: Arc::new(JwtKeys::from_secret(secret.as_bytes())),
        }
    }

    /// Service context for a request made by `actor`
    pub fn service_context(&self, actor: Uuid) -> ServiceContext {
        ServiceContext::new(actor, self.config.deadline(), self.config.display_offset())
    }
}
