pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod publisher;
pub mod router;
pub mod signature;
pub mod webhook;

use axum::{Router, routing};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::publisher::Publisher;
use crate::router::EventRouter;

/// Read-only state shared by every request.
pub struct AppState {
    pub config: Arc<PipelineConfig>,
    pub router: EventRouter,
}

impl AppState {
    pub fn new(config: PipelineConfig, publisher: Arc<dyn Publisher>) -> Self {
        let config = Arc::new(config);
        Self {
            router: EventRouter::new(Arc::clone(&config), publisher),
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// `POST /` receives webhooks; any other method on `/` is 501.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/",
            routing::post(api::handle_webhook).fallback(api::not_implemented),
        )
        .with_state(state)
}
