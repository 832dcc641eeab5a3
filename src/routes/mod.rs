//! API Routes
//!
//! - `/api/research` - Synchronous research
//! - `/api/research/start` - Submit a background research job
//! - `/api/research/status/{research_id}` - Poll a job
//! - `/api/health` - Health check with job and cache counts

pub mod health;
pub mod research;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(research::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}
