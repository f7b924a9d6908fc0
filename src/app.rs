use crate::call_storage::CallStorage;
use crate::config::Config;
use crate::files::{FileBackend, LocalFileBackend};
use crate::processing::{DocumentProcessor, ImmediateProcessor};
use crate::storage::DocumentStorage;
use crate::user_storage::UserStorage;
use crate::{auth, calls, documents};
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub documents: DocumentStorage,
    pub users: UserStorage,
    pub calls: CallStorage,
    pub files: Arc<dyn FileBackend>,
    pub processor: Arc<dyn DocumentProcessor>,
    pub max_upload_bytes: usize,
    pub password_cost: u32,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            documents: DocumentStorage::new(config.documents_file())?,
            users: UserStorage::new(config.users_file())?,
            calls: CallStorage::new(config.calls_file())?,
            files: Arc::new(LocalFileBackend::new(&config.upload_dir)?),
            processor: Arc::new(ImmediateProcessor),
            max_upload_bytes: config.max_upload_bytes,
            password_cost: config.password_cost,
        })
    }

    pub fn with_processor(mut self, processor: Arc<dyn DocumentProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_file_backend(mut self, files: Arc<dyn FileBackend>) -> Self {
        self.files = files;
        self
    }
}

pub fn router(state: SharedState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/upload",
            post(documents::upload_document).layer(upload_limit),
        )
        .route("/documents/url", post(documents::create_url_document))
        .route(
            "/documents/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/calls", get(calls::list_calls).post(calls::create_call))
        .route("/dashboard/analytics", get(calls::analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Finishes every tombstoned delete. Returns how many records were purged.
pub async fn reap_pending_deletes(state: &AppState) -> usize {
    let mut reaped = 0;

    for document in state.documents.pending_deletes().await {
        match documents::finish_delete(state, &document).await {
            Ok(true) => reaped += 1,
            Ok(false) => {}
            Err(e) => warn!(id = %document.id, error = %format!("{e:#}"), "pending delete still blocked"),
        }
    }

    reaped
}

pub async fn reaper_service(state: SharedState, period: Duration) {
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let reaped = reap_pending_deletes(&state).await;
        if reaped > 0 {
            info!(reaped, "finished pending document deletes");
        }
    }
}
