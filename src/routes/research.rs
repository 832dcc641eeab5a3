use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::models::{
    AppState, ResearchRequest, ResearchStatusResponse, StartResearchResponse,
    SyncResearchResponse,
};
use crate::types::{ApiJson, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/research", post(research_sync))
        .route("/api/research/start", post(start_research))
        .route("/api/research/status/{research_id}", get(get_status))
        .with_state(state)
}

async fn start_research(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResearchRequest>,
) -> AppResult<Json<StartResearchResponse>> {
    let topic = request.topic()?;
    info!(topic = %topic, "Received research request");

    let research_id = state.jobs.submit(topic).await?;
    Ok(Json(StartResearchResponse::started(research_id)))
}

async fn get_status(
    State(state): State<AppState>,
    Path(research_id): Path<String>,
) -> AppResult<Json<ResearchStatusResponse>> {
    let job = state.jobs.get_status(&research_id).await?;
    Ok(Json(job.into()))
}

/// Runs the workflow inline, bypassing the job table and the cache.
async fn research_sync(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResearchRequest>,
) -> AppResult<Json<SyncResearchResponse>> {
    let topic = request.topic()?;
    info!(topic = %topic, "Running synchronous research");

    let summary = state.workflow.research(topic).await?;
    Ok(Json(SyncResearchResponse { summary }))
}
