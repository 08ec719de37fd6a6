// HTTP request handlers
use crate::application::analysis_service::AnalysisRequest;
use crate::domain::analysis::PipelineResult;
use crate::presentation::app_state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Run the full analysis over the posted samples and charts
pub async fn run_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Json<PipelineResult> {
    tracing::debug!(
        "Analysis requested for {} categories and {} charts",
        request.samples.len(),
        request.charts.len()
    );
    Json(state.analysis_pipeline.run(request).await)
}
