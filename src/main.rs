// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::{get, post}, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::analysis_service::AnalysisPipeline;
use crate::application::text_generator::TextGenerator;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::gemini_generator::{GeminiTextGenerator, UnconfiguredTextGenerator};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, run_analysis};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration; invalid settings stop the service before it binds
    let app_config = load_app_config()?;
    let pipeline_settings = app_config.analysis.validate()?;

    // Text generation adapter (infrastructure layer)
    let text_config = &app_config.text_generation;
    let generator: Arc<dyn TextGenerator> = match text_config.resolved_api_key() {
        Some(api_key) => {
            tracing::info!("Using {} for chart explanations", text_config.model);
            Arc::new(GeminiTextGenerator::new(
                text_config.base_url.clone(),
                text_config.model.clone(),
                api_key,
            ))
        }
        None => {
            tracing::warn!("No text generation API key configured, explanations will use templates");
            Arc::new(UnconfiguredTextGenerator)
        }
    };

    // Create application state
    let state = Arc::new(AppState {
        analysis_pipeline: AnalysisPipeline::new(generator, pipeline_settings),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/analyses", post(run_analysis))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", app_config.server.host, app_config.server.port).parse()?;
    tracing::info!("Starting enviro-insights service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
