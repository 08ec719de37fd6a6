// Application state for HTTP handlers
use crate::application::analysis_service::AnalysisPipeline;

pub struct AppState {
    pub analysis_pipeline: AnalysisPipeline,
}
