// Text generation trait for chart and narrative explanations
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextGenerationError {
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("text generation service error: {0}")]
    Service(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt. Implementations should give up after `timeout`;
    /// callers enforce it regardless.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, TextGenerationError>;
}
