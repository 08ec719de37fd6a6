// Gemini text generator - REST adapter for the text generation port
use crate::application::text_generator::{TextGenerationError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeminiTextGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl GeminiTextGenerator {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    fn build_generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiTextGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, TextGenerationError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.build_generate_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!("Gemini request for model {} failed with {}", self.model, status);
            return Err(TextGenerationError::Service(format!("status {}", status)));
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| classify(e, timeout))?;

        parsed
            .into_text()
            .ok_or_else(|| TextGenerationError::Service("response carried no text".to_string()))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TextGenerationError {
    if error.is_timeout() {
        TextGenerationError::Timeout(timeout)
    } else {
        // reqwest errors may embed the request URL; keep only the kind
        let kind = if error.is_connect() {
            "connection failed"
        } else if error.is_decode() {
            "malformed response"
        } else {
            "request failed"
        };
        TextGenerationError::Service(kind.to_string())
    }
}

/// Stand-in when no API key is configured: every call fails fast, so every
/// explanation falls back to its template.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredTextGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredTextGenerator {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, TextGenerationError> {
        Err(TextGenerationError::Service(
            "text generation is not configured".to_string(),
        ))
    }
}
