// Analysis service - Runs statistics, risk, insight and explanation stages for one request
use crate::application::explanation_service::{
    ExplanationBudget, ExplanationOrchestrator, ExplanationOutcome,
};
use crate::application::text_generator::TextGenerator;
use crate::domain::analysis::{DataQuality, PipelineResult};
use crate::domain::explanation::{ChartDescriptor, OverallFacts};
use crate::domain::insight::InsightGenerator;
use crate::domain::risk::{BreakpointTable, CycloneThresholds, Pollutant, RiskClassifier};
use crate::domain::series::{Category, PRESSURE_PARAMETERS, Sample, SeriesStore, WIND_PARAMETERS};
use crate::domain::statistics::{DEFAULT_TREND_EPSILON, Statistic, StatisticsComputer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Validated knobs for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub trend_epsilon: f64,
    pub cyclone: CycloneThresholds,
    pub breakpoints: BreakpointTable,
    pub explanation: ExplanationBudget,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            trend_epsilon: DEFAULT_TREND_EPSILON,
            cyclone: CycloneThresholds::default(),
            breakpoints: BreakpointTable::epa(),
            explanation: ExplanationBudget::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub samples: BTreeMap<Category, Vec<Sample>>,
    #[serde(default)]
    pub charts: Vec<ChartDescriptor>,
}

type StatisticsByCategory = BTreeMap<Category, BTreeMap<String, Statistic>>;

pub struct AnalysisPipeline {
    statistics: StatisticsComputer,
    classifier: RiskClassifier,
    insights: InsightGenerator,
    orchestrator: ExplanationOrchestrator,
    budget: ExplanationBudget,
}

impl AnalysisPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: PipelineSettings) -> Self {
        Self {
            statistics: StatisticsComputer::new(settings.trend_epsilon),
            classifier: RiskClassifier::new(settings.breakpoints, settings.cyclone),
            insights: InsightGenerator::new(),
            orchestrator: ExplanationOrchestrator::new(generator),
            budget: settings.explanation,
        }
    }

    /// Never fails: bad parameters are left out and unavailable explanations
    /// are replaced by templates.
    pub async fn run(&self, request: AnalysisRequest) -> PipelineResult {
        let started = Instant::now();
        let store = SeriesStore::from_grouped(request.samples);

        let statistics = self.compute_statistics(&store);

        let concentrations: BTreeMap<Pollutant, f64> = Pollutant::ALL
            .iter()
            .filter_map(|p| find_statistic(&statistics, &[p.parameter()]).map(|s| (*p, s.current)))
            .collect();
        let air_quality = self.classifier.classify_air_quality(&concentrations);
        let cyclone = self.classifier.classify_cyclone_risk(
            find_statistic(&statistics, &PRESSURE_PARAMETERS).map(|s| s.trend),
            find_statistic(&statistics, &WIND_PARAMETERS),
        );
        let risk_assessments = vec![air_quality, cyclone];

        let data_quality = DataQuality::from_store(&store);
        let insights = self
            .insights
            .generate(&statistics, &risk_assessments, Some(&data_quality));

        let facts = OverallFacts {
            sample_count: data_quality.sample_count,
            parameter_count: data_quality.parameter_count,
            insights: insights.iter().map(|i| i.text.clone()).collect(),
        };
        let ExplanationOutcome {
            explanations,
            overall_narrative,
        } = if request.charts.is_empty() {
            ExplanationOutcome {
                explanations: Vec::new(),
                overall_narrative: facts.synthesized_narrative(0),
            }
        } else {
            self.orchestrator
                .explain(&request.charts, &facts, &self.budget)
                .await
        };

        tracing::info!(
            "Analysis finished: {} samples, {} parameters, {} insights, {} charts in {:?}",
            data_quality.sample_count,
            data_quality.parameter_count,
            insights.len(),
            explanations.len(),
            started.elapsed()
        );

        PipelineResult {
            statistics,
            risk_assessments,
            insights,
            explanations,
            overall_narrative,
            data_quality,
        }
    }

    fn compute_statistics(&self, store: &SeriesStore) -> StatisticsByCategory {
        let mut by_category = StatisticsByCategory::new();
        for (category, parameters) in store.categories() {
            let mut computed = BTreeMap::new();
            for (name, series) in parameters {
                match self.statistics.compute(series) {
                    Ok(statistic) => {
                        computed.insert(name.clone(), statistic);
                    }
                    Err(e) => tracing::debug!("Omitting {} from {}: {}", name, category, e),
                }
            }
            if !computed.is_empty() {
                by_category.insert(category, computed);
            }
        }
        by_category
    }
}

/// First of `parameters` that has a statistic in any category.
fn find_statistic<'a>(statistics: &'a StatisticsByCategory, parameters: &[&str]) -> Option<&'a Statistic> {
    parameters
        .iter()
        .find_map(|name| statistics.values().find_map(|params| params.get(*name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::text_generator::TextGenerationError;
    use crate::domain::explanation::{ChartKind, ExplanationSource};
    use crate::domain::risk::{CycloneLevel, RiskCategory, RiskKind};
    use crate::domain::statistics::Trend;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::time::Duration;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, TextGenerationError> {
            Ok(format!("generated from {} bytes", prompt.len()))
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl TextGenerator for DownGenerator {
        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, TextGenerationError> {
            Err(TextGenerationError::Service("unavailable".to_string()))
        }
    }

    fn hourly(category: Category, columns: &[(&str, &[Option<f64>])]) -> (Category, Vec<Sample>) {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let len = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let samples = (0..len)
            .map(|i| {
                columns.iter().fold(
                    Sample::new(start + ChronoDuration::hours(i as i64)),
                    |sample, (name, values)| sample.with(name, values.get(i).copied().flatten()),
                )
            })
            .collect();
        (category, samples)
    }

    // hourly pressure falls by a few hPa, well under 1% of its mean per step
    fn sensitive_settings() -> PipelineSettings {
        PipelineSettings {
            trend_epsilon: 0.001,
            ..PipelineSettings::default()
        }
    }

    fn stormy_request() -> AnalysisRequest {
        let samples = BTreeMap::from([
            hourly(
                Category::Atmospheric,
                &[
                    ("temperature_2m", &[Some(21.0), Some(22.5), None, Some(24.0)]),
                    ("wind_speed_10m", &[Some(68.0), Some(70.0), Some(71.0), Some(72.0)]),
                ],
            ),
            hourly(
                Category::Hydrological,
                &[("pressure_msl", &[Some(1004.0), Some(998.0), Some(992.0), Some(985.0)])],
            ),
            hourly(
                Category::Environmental,
                &[
                    ("pm2_5", &[Some(8.0), Some(9.0), Some(10.0), Some(11.0)]),
                    ("ozone", &[None, None, None, None]),
                ],
            ),
        ]);
        let charts = vec![ChartDescriptor {
            id: "temp".to_string(),
            category: "atmospheric".to_string(),
            title: "Temperature".to_string(),
            kind: ChartKind::Line,
            underlying_statistics: BTreeMap::new(),
        }];
        AnalysisRequest { samples, charts }
    }

    #[tokio::test]
    async fn test_run_assembles_every_stage() {
        let pipeline = AnalysisPipeline::new(Arc::new(EchoGenerator), sensitive_settings());

        let result = pipeline.run(stormy_request()).await;

        let atmospheric = &result.statistics[&Category::Atmospheric];
        assert_eq!(atmospheric["temperature_2m"].current, 24.0);
        assert_eq!(result.statistics[&Category::Hydrological]["pressure_msl"].trend, Trend::Decreasing);

        let cyclone = result
            .risk_assessments
            .iter()
            .find(|r| r.kind == RiskKind::Cyclone)
            .unwrap();
        assert_eq!(cyclone.category, RiskCategory::Cyclone(CycloneLevel::VeryHigh));
        let air = result
            .risk_assessments
            .iter()
            .find(|r| r.kind == RiskKind::AirQuality)
            .unwrap();
        assert_eq!(air.contributing_factors, vec!["pm2_5".to_string()]);

        assert!(!result.insights.is_empty());
        assert_eq!(result.explanations.len(), 1);
        assert_eq!(result.explanations[0].source, ExplanationSource::Generated);
        assert_eq!(result.overall_narrative.source, ExplanationSource::Generated);
        assert_eq!(result.data_quality.sample_count, 12);
        assert_eq!(result.data_quality.missing_values, 5);
    }

    #[tokio::test]
    async fn test_all_missing_parameter_is_omitted() {
        let pipeline = AnalysisPipeline::new(Arc::new(EchoGenerator), PipelineSettings::default());

        let result = pipeline.run(stormy_request()).await;

        let environmental = &result.statistics[&Category::Environmental];
        assert!(environmental.contains_key("pm2_5"));
        assert!(!environmental.contains_key("ozone"));
    }

    #[tokio::test]
    async fn test_no_charts_skips_collaborator() {
        let pipeline = AnalysisPipeline::new(Arc::new(EchoGenerator), PipelineSettings::default());
        let request = AnalysisRequest {
            charts: Vec::new(),
            ..stormy_request()
        };

        let result = pipeline.run(request).await;

        assert!(result.explanations.is_empty());
        assert_eq!(result.overall_narrative.source, ExplanationSource::Fallback);
        assert!(result.overall_narrative.text.contains("0 visualizations"));
    }

    #[tokio::test]
    async fn test_empty_request_still_completes() {
        let pipeline = AnalysisPipeline::new(Arc::new(DownGenerator), PipelineSettings::default());

        let result = pipeline.run(AnalysisRequest::default()).await;

        assert!(result.statistics.is_empty());
        assert_eq!(result.risk_assessments.len(), 2);
        assert!(result
            .risk_assessments
            .iter()
            .all(|r| r.category == RiskCategory::Unknown));
        assert_eq!(result.data_quality, DataQuality::default());
    }

    #[tokio::test]
    async fn test_collaborator_outage_degrades_to_templates() {
        let pipeline = AnalysisPipeline::new(Arc::new(DownGenerator), PipelineSettings::default());

        let result = pipeline.run(stormy_request()).await;

        assert_eq!(result.explanations.len(), 1);
        assert_eq!(result.explanations[0].source, ExplanationSource::Fallback);
        assert_eq!(result.overall_narrative.source, ExplanationSource::Fallback);
    }

    #[tokio::test]
    async fn test_identical_input_gives_identical_result() {
        let pipeline = AnalysisPipeline::new(Arc::new(EchoGenerator), PipelineSettings::default());

        let first = pipeline.run(stormy_request()).await;
        let second = pipeline.run(stormy_request()).await;

        assert_eq!(first, second);
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: AnalysisRequest = serde_json::from_str(
            r#"{
                "samples": {
                    "oceanic": [
                        {"timestamp": "2024-06-01T00:00:00Z", "values": {"wave_height": 1.2}},
                        {"timestamp": "2024-06-01T01:00:00Z", "values": {"wave_height": null}}
                    ]
                },
                "charts": [
                    {"id": "w", "category": "oceanic", "title": "Waves", "type": "line"}
                ]
            }"#,
        )
        .unwrap();

        let waves = &request.samples[&Category::Oceanic];
        assert_eq!(waves[1].values["wave_height"], None);
        assert_eq!(request.charts[0].kind, ChartKind::Line);
    }
}
