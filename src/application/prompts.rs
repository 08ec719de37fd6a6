// Prompt construction for the text generation collaborator
use crate::domain::explanation::{ChartDescriptor, OverallFacts};

const MAX_STATISTIC_LINES: usize = 5;
const MAX_NARRATIVE_CHARTS: usize = 8;
const MAX_NARRATIVE_INSIGHTS: usize = 10;

pub fn chart_prompt(chart: &ChartDescriptor) -> String {
    format!(
        "You are a data analyst explaining a climate/environmental data visualization to users.

Chart Information:
- Title: {}
- Type: {}
- Category: {}

Data Summary:
{}

Task: Provide a clear, concise explanation (2-3 sentences) of what this chart shows and what insights can be drawn from it. Focus on:
1. What the chart displays
2. Key patterns or trends visible
3. What this means for climate/environmental analysis

Keep the explanation professional but accessible. Use specific numbers when available.

Explanation:",
        chart.title,
        chart.kind.as_str(),
        chart.category,
        format_statistics(chart)
    )
}

fn format_statistics(chart: &ChartDescriptor) -> String {
    let lines: Vec<String> = chart
        .underlying_statistics
        .iter()
        .take(MAX_STATISTIC_LINES)
        .map(|(name, s)| {
            format!(
                "- {}: min={:.2}, max={:.2}, mean={:.2}, trend={}",
                name,
                s.min,
                s.max,
                s.mean,
                s.trend.as_str()
            )
        })
        .collect();

    if lines.is_empty() {
        "No detailed statistics available".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn narrative_prompt(charts: &[ChartDescriptor], facts: &OverallFacts) -> String {
    let titles: Vec<&str> = charts
        .iter()
        .take(MAX_NARRATIVE_CHARTS)
        .map(|c| c.title.as_str())
        .collect();
    let insights: Vec<String> = facts
        .insights
        .iter()
        .take(MAX_NARRATIVE_INSIGHTS)
        .map(|i| format!("- {}", i))
        .collect();

    format!(
        "You are a climate data analyst providing an executive summary of an environmental data analysis.

Analysis Overview:
- Samples analysed: {}
- Parameters observed: {}
- Visualizations created: {}
- Charts: {}

Key Insights:
{}

Task: Provide a brief executive summary (3-4 sentences) that summarizes the overall findings, highlights the most important patterns or risks, and suggests what further monitoring might be valuable.

Executive Summary:",
        facts.sample_count,
        facts.parameter_count,
        charts.len(),
        titles.join(", "),
        if insights.is_empty() {
            "- None identified".to_string()
        } else {
            insights.join("\n")
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::explanation::ChartKind;
    use crate::domain::statistics::{Statistic, Trend};
    use std::collections::BTreeMap;

    fn stat(mean: f64) -> Statistic {
        Statistic {
            current: mean,
            min: mean - 1.0,
            max: mean + 1.0,
            mean,
            trend: Trend::Increasing,
            count: 3,
            total: mean * 3.0,
            unit: None,
        }
    }

    #[test]
    fn test_chart_prompt_includes_descriptor_and_capped_statistics() {
        let underlying_statistics = (0..7)
            .map(|i| (format!("p{}", i), stat(i as f64)))
            .collect::<BTreeMap<_, _>>();
        let chart = ChartDescriptor {
            id: "c1".to_string(),
            category: "oceanic".to_string(),
            title: "Wave height".to_string(),
            kind: ChartKind::Line,
            underlying_statistics,
        };

        let prompt = chart_prompt(&chart);
        assert!(prompt.contains("- Title: Wave height"));
        assert!(prompt.contains("- Type: line"));
        assert!(prompt.contains("- Category: oceanic"));
        assert!(prompt.contains("- p0: min=-1.00, max=1.00, mean=0.00, trend=increasing"));
        assert!(prompt.contains("- p4:"));
        assert!(!prompt.contains("- p5:"));
    }

    #[test]
    fn test_narrative_prompt_without_insights() {
        let prompt = narrative_prompt(&[], &OverallFacts::default());
        assert!(prompt.contains("- Visualizations created: 0"));
        assert!(prompt.contains("- None identified"));
    }
}
