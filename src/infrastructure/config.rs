// Configuration loading and validation
use crate::application::analysis_service::PipelineSettings;
use crate::application::explanation_service::ExplanationBudget;
use crate::domain::risk::{BreakpointTable, CycloneThresholds};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub text_generation: TextGenerationSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_explained: usize,
    pub per_call_timeout_ms: u64,
    pub overall_timeout_ms: u64,
    pub total_budget_ms: u64,
    pub safety_margin_ms: u64,
    pub worker_pool_size: usize,
    pub cyclone_wind_low_kmh: f64,
    pub cyclone_wind_high_kmh: f64,
    pub trend_epsilon: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_explained: 10,
            per_call_timeout_ms: 5_000,
            overall_timeout_ms: 8_000,
            total_budget_ms: 55_000,
            safety_margin_ms: 1_000,
            worker_pool_size: 4,
            cyclone_wind_low_kmh: 30.0,
            cyclone_wind_high_kmh: 60.0,
            trend_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TextGenerationSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for TextGenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
        }
    }
}

impl TextGenerationSettings {
    /// Configured key, else `GEMINI_API_KEY`. Blank keys count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("total_budget_ms must be greater than zero")]
    ZeroBudget,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("{name} ({value_ms} ms) does not fit the usable budget of {budget_ms} ms")]
    ExceedsBudget {
        name: &'static str,
        value_ms: u64,
        budget_ms: u64,
    },
    #[error("worker_pool_size must be at least 1")]
    EmptyWorkerPool,
    #[error("cyclone wind thresholds must satisfy 0 < low < high, got low={low} high={high}")]
    InvalidWindThresholds { low: f64, high: f64 },
    #[error("trend_epsilon must be a finite non-negative number, got {0}")]
    InvalidTrendEpsilon(f64),
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<PipelineSettings, ConfigurationError> {
        if self.total_budget_ms == 0 {
            return Err(ConfigurationError::ZeroBudget);
        }
        if self.per_call_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroTimeout("per_call_timeout_ms"));
        }
        if self.overall_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroTimeout("overall_timeout_ms"));
        }
        if self.safety_margin_ms >= self.total_budget_ms {
            return Err(ConfigurationError::ExceedsBudget {
                name: "safety_margin_ms",
                value_ms: self.safety_margin_ms,
                budget_ms: self.total_budget_ms,
            });
        }
        // a chart call starts only if it can end by the cutoff, and the
        // narrative only if strictly more than its timeout remains
        let usable_ms = self.total_budget_ms - self.safety_margin_ms;
        if self.per_call_timeout_ms > usable_ms {
            return Err(ConfigurationError::ExceedsBudget {
                name: "per_call_timeout_ms",
                value_ms: self.per_call_timeout_ms,
                budget_ms: usable_ms,
            });
        }
        if self.overall_timeout_ms >= usable_ms {
            return Err(ConfigurationError::ExceedsBudget {
                name: "overall_timeout_ms",
                value_ms: self.overall_timeout_ms,
                budget_ms: usable_ms,
            });
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigurationError::EmptyWorkerPool);
        }

        let (low, high) = (self.cyclone_wind_low_kmh, self.cyclone_wind_high_kmh);
        if !(low.is_finite() && high.is_finite() && low > 0.0 && low < high) {
            return Err(ConfigurationError::InvalidWindThresholds { low, high });
        }
        if !self.trend_epsilon.is_finite() || self.trend_epsilon < 0.0 {
            return Err(ConfigurationError::InvalidTrendEpsilon(self.trend_epsilon));
        }

        Ok(PipelineSettings {
            trend_epsilon: self.trend_epsilon,
            cyclone: CycloneThresholds {
                wind_low_kmh: low,
                wind_high_kmh: high,
            },
            breakpoints: BreakpointTable::epa(),
            explanation: ExplanationBudget {
                total_budget: Duration::from_millis(self.total_budget_ms),
                safety_margin: Duration::from_millis(self.safety_margin_ms),
                max_explained: self.max_explained,
                per_call_timeout: Duration::from_millis(self.per_call_timeout_ms),
                overall_timeout: Duration::from_millis(self.overall_timeout_ms),
                worker_pool_size: self.worker_pool_size,
            },
        })
    }
}

/// `config/app.toml` if present, overlaid by `ENVIRO__SECTION__KEY` variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(
            config::Environment::with_prefix("ENVIRO")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
