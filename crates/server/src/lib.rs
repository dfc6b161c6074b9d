use std::sync::Arc;

use db::DBService;
use services::services::attachment::{AttachmentService, FsObjectStore, ObjectStore};
use utils_core::assets::asset_dir;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

pub const API_TOKEN_ENV: &str = "TUTORDESK_API_TOKEN";

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    attachments: AttachmentService,
    api_token: Option<String>,
}

impl AppState {
    /// Environment-driven construction used by `main`: sqlite under the
    /// asset dir, attachment binaries beside it, optional API token.
    pub async fn new() -> anyhow::Result<Self> {
        let db = DBService::new().await?;
        let store = Arc::new(FsObjectStore::new(asset_dir().join("attachments")));
        let api_token = std::env::var(API_TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if api_token.is_none() {
            tracing::warn!("{API_TOKEN_ENV} is not set; the API is open to anyone who can reach it");
        }
        Ok(Self::with_parts(db, store, api_token))
    }

    pub fn with_parts(
        db: DBService,
        store: Arc<dyn ObjectStore>,
        api_token: Option<String>,
    ) -> Self {
        let attachments = AttachmentService::new(db.clone(), store);
        Self {
            db,
            attachments,
            api_token,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn attachments(&self) -> &AttachmentService {
        &self.attachments
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }
}
