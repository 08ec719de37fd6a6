// Explanation domain model - Chart descriptors, per-chart explanation state and fallback text
use super::statistics::Statistic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Histogram,
    Box,
    Heatmap,
    Pie,
    #[serde(other)]
    Other,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Pie => "pie",
            ChartKind::Other => "other",
        }
    }
}

/// A chart produced by the charting collaborator. Only these fields are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub id: String,
    pub category: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub underlying_statistics: BTreeMap<String, Statistic>,
}

impl ChartDescriptor {
    /// Deterministic stand-in for a generated explanation.
    pub fn fallback_explanation(&self) -> String {
        let title = &self.title;
        let category = &self.category;
        match self.kind {
            ChartKind::Line => format!(
                "This line chart shows the trend of {title} over time for {category} data, allowing you to identify patterns and changes."
            ),
            ChartKind::Bar => format!(
                "This bar chart compares {title} across different groups of {category} data, making relative differences easy to see."
            ),
            ChartKind::Scatter => format!(
                "This scatter plot reveals the relationship between variables in {title} ({category}), helping identify correlations."
            ),
            ChartKind::Histogram => format!(
                "This histogram displays the distribution of {title} ({category}), showing how frequently different values occur."
            ),
            ChartKind::Box => format!(
                "This box plot summarizes the distribution of {title} ({category}), highlighting median, quartiles and outliers."
            ),
            ChartKind::Heatmap => format!(
                "This heatmap visualizes {title} ({category}), with colors indicating the strength of relationships."
            ),
            ChartKind::Pie => format!(
                "This pie chart shows the proportional breakdown of {title} ({category}), illustrating the relative size of each component."
            ),
            ChartKind::Other => format!(
                "This chart visualizes {title} for {category} data, providing insight into the underlying patterns."
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Past `max_explained`; the collaborator was never asked.
    OverCap,
    /// Not started because the remaining budget could not fit another call.
    BudgetExhausted,
    Timeout,
    ServiceError,
    /// In flight when the budget ran out; the late result is discarded.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationResult {
    pub chart_id: String,
    pub text: String,
    pub source: ExplanationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub text: String,
    pub source: ExplanationSource,
}

/// Aggregate facts the overall narrative is written from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverallFacts {
    pub sample_count: usize,
    pub parameter_count: usize,
    pub insights: Vec<String>,
}

impl OverallFacts {
    pub fn synthesized_narrative(&self, chart_count: usize) -> Narrative {
        Narrative {
            text: format!(
                "This analysis examined {} samples across {} parameters and generated {} visualizations. \
                 It identified {} insights about the observed environmental conditions. \
                 These findings provide context for understanding local weather, ocean and air-quality trends.",
                self.sample_count,
                self.parameter_count,
                chart_count,
                self.insights.len()
            ),
            source: ExplanationSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    Pending,
    Generating,
    Explained,
    Fallback,
}

impl ChartState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChartState::Explained | ChartState::Fallback)
    }
}

struct Slot {
    state: ChartState,
    result: Option<ExplanationResult>,
}

/// Tracks every chart through pending -> generating -> explained | fallback.
/// Terminal states are never left.
pub struct ExplanationTracker<'a> {
    charts: &'a [ChartDescriptor],
    slots: Vec<Slot>,
}

impl<'a> ExplanationTracker<'a> {
    pub fn new(charts: &'a [ChartDescriptor]) -> Self {
        let slots = charts
            .iter()
            .map(|_| Slot {
                state: ChartState::Pending,
                result: None,
            })
            .collect();
        Self { charts, slots }
    }

    #[cfg(test)]
    pub fn state(&self, index: usize) -> Option<ChartState> {
        self.slots.get(index).map(|s| s.state)
    }

    pub fn begin(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == ChartState::Pending => {
                slot.state = ChartState::Generating;
                true
            }
            _ => false,
        }
    }

    pub fn explain(&mut self, index: usize, text: String) -> bool {
        let (Some(slot), Some(chart)) = (self.slots.get_mut(index), self.charts.get(index)) else {
            return false;
        };
        if slot.state != ChartState::Generating {
            return false;
        }
        slot.state = ChartState::Explained;
        slot.result = Some(ExplanationResult {
            chart_id: chart.id.clone(),
            text,
            source: ExplanationSource::Generated,
            fallback_reason: None,
        });
        true
    }

    pub fn fall_back(&mut self, index: usize, reason: FallbackReason) -> bool {
        let (Some(slot), Some(chart)) = (self.slots.get_mut(index), self.charts.get(index)) else {
            return false;
        };
        if slot.state.is_terminal() {
            return false;
        }
        slot.state = ChartState::Fallback;
        slot.result = Some(ExplanationResult {
            chart_id: chart.id.clone(),
            text: chart.fallback_explanation(),
            source: ExplanationSource::Fallback,
            fallback_reason: Some(reason),
        });
        true
    }

    pub fn unresolved(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.state.is_terminal())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn generated_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == ChartState::Explained)
            .count()
    }

    /// Resolve everything left when the budget runs out: charts whose call was
    /// dispatched are cancelled, charts never dispatched ran out of budget.
    pub fn abandon(&mut self) {
        for index in self.unresolved() {
            let reason = if self.slots[index].state == ChartState::Generating {
                FallbackReason::Cancelled
            } else {
                FallbackReason::BudgetExhausted
            };
            self.fall_back(index, reason);
        }
    }

    /// Results in chart order. Anything still unresolved becomes a cancelled fallback.
    pub fn into_results(mut self) -> Vec<ExplanationResult> {
        for index in self.unresolved() {
            self.fall_back(index, FallbackReason::Cancelled);
        }
        self.slots.into_iter().filter_map(|s| s.result).collect()
    }
}
