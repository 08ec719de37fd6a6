// Analysis result domain model
use super::explanation::{ExplanationResult, Narrative};
use super::insight::Insight;
use super::risk::RiskAssessment;
use super::series::{Category, SeriesStore};
use super::statistics::Statistic;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQuality {
    pub sample_count: usize,
    pub parameter_count: usize,
    pub total_points: usize,
    pub missing_values: usize,
    pub rejected_points: usize,
}

impl DataQuality {
    pub fn from_store(store: &SeriesStore) -> Self {
        Self {
            sample_count: store.sample_count(),
            parameter_count: store.parameter_count(),
            total_points: store.total_points(),
            missing_values: store.missing_values(),
            rejected_points: store.rejected_points(),
        }
    }

    pub fn missing_percentage(&self) -> Option<f64> {
        if self.total_points == 0 {
            return None;
        }
        Some(self.missing_values as f64 / self.total_points as f64 * 100.0)
    }
}

/// Everything one pipeline run produced, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub statistics: BTreeMap<Category, BTreeMap<String, Statistic>>,
    pub risk_assessments: Vec<RiskAssessment>,
    pub insights: Vec<Insight>,
    pub explanations: Vec<ExplanationResult>,
    pub overall_narrative: Narrative,
    pub data_quality: DataQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_percentage() {
        let quality = DataQuality {
            total_points: 8,
            missing_values: 2,
            ..Default::default()
        };
        assert_eq!(quality.missing_percentage(), Some(25.0));
        assert_eq!(DataQuality::default().missing_percentage(), None);
    }
}
