// Explanation service - Budgeted fan-out of chart explanations with template fallback
use crate::application::prompts::{chart_prompt, narrative_prompt};
use crate::application::text_generator::{TextGenerationError, TextGenerator};
use crate::domain::explanation::{
    ChartDescriptor, ExplanationResult, ExplanationSource, ExplanationTracker, FallbackReason,
    Narrative, OverallFacts,
};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Request-scoped limits for one explanation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplanationBudget {
    pub total_budget: Duration,
    pub safety_margin: Duration,
    pub max_explained: usize,
    pub per_call_timeout: Duration,
    pub overall_timeout: Duration,
    pub worker_pool_size: usize,
}

impl Default for ExplanationBudget {
    fn default() -> Self {
        Self {
            total_budget: Duration::from_secs(55),
            safety_margin: Duration::from_secs(1),
            max_explained: 10,
            per_call_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(8),
            worker_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationOutcome {
    pub explanations: Vec<ExplanationResult>,
    pub overall_narrative: Narrative,
}

#[derive(Clone)]
pub struct ExplanationOrchestrator {
    generator: Arc<dyn TextGenerator>,
}

impl ExplanationOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// One result per chart, in chart order, plus an overall narrative. Never fails:
    /// anything the collaborator cannot deliver inside the budget gets template text.
    pub async fn explain(
        &self,
        charts: &[ChartDescriptor],
        facts: &OverallFacts,
        budget: &ExplanationBudget,
    ) -> ExplanationOutcome {
        let start = Instant::now();
        let cutoff = start + budget.total_budget.saturating_sub(budget.safety_margin);
        let head_len = charts.len().min(budget.max_explained);

        let mut tracker = ExplanationTracker::new(charts);
        if charts.len() > head_len {
            tracing::info!(
                "Skipping generated explanations for {} charts over the cap of {}",
                charts.len() - head_len,
                budget.max_explained
            );
        }
        for index in head_len..charts.len() {
            tracker.fall_back(index, FallbackReason::OverCap);
        }

        self.explain_head(charts, head_len, cutoff, budget, &mut tracker).await;

        let generated = tracker.generated_count();
        let overall_narrative = self.narrate(charts, facts, cutoff, budget).await;
        let explanations = tracker.into_results();

        tracing::info!(
            "Explained {} charts ({} generated, narrative {:?}) in {:?}",
            explanations.len(),
            generated,
            overall_narrative.source,
            start.elapsed()
        );

        ExplanationOutcome {
            explanations,
            overall_narrative,
        }
    }

    async fn explain_head<'a>(
        &self,
        charts: &'a [ChartDescriptor],
        head_len: usize,
        cutoff: Instant,
        budget: &ExplanationBudget,
        tracker: &mut ExplanationTracker<'a>,
    ) {
        let per_call_timeout = budget.per_call_timeout;
        let pool_size = budget.worker_pool_size.max(1);
        let mut queued = 0..head_len;
        let mut calls = FuturesUnordered::new();

        loop {
            while calls.len() < pool_size {
                let Some(index) = queued.next() else {
                    break;
                };
                let chart = &charts[index];
                // a call that could not finish before the cutoff is never started
                if Instant::now() + per_call_timeout > cutoff {
                    tracing::warn!("Chart {} fell back: budget exhausted", chart.id);
                    tracker.fall_back(index, FallbackReason::BudgetExhausted);
                    continue;
                }
                tracker.begin(index);
                calls.push(async move {
                    let prompt = chart_prompt(chart);
                    tracing::debug!(
                        "Requesting explanation for chart {} ({} byte prompt)",
                        chart.id,
                        prompt.len()
                    );
                    (index, self.call(&prompt, per_call_timeout).await)
                });
            }
            if calls.is_empty() {
                break;
            }

            match tokio::time::timeout_at(cutoff, calls.next()).await {
                Ok(Some((index, Ok(text)))) => {
                    tracker.explain(index, text);
                }
                Ok(Some((index, Err(e)))) => {
                    tracing::warn!("Chart {} fell back: {}", charts[index].id, e);
                    let reason = match e {
                        TextGenerationError::Timeout(_) => FallbackReason::Timeout,
                        TextGenerationError::Service(_) => FallbackReason::ServiceError,
                    };
                    tracker.fall_back(index, reason);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!("Explanation budget exhausted, abandoning in-flight calls");
                    break;
                }
            }
        }

        // dropping the pending futures cancels the calls still in flight
        drop(calls);
        tracker.abandon();
    }

    async fn narrate(
        &self,
        charts: &[ChartDescriptor],
        facts: &OverallFacts,
        cutoff: Instant,
        budget: &ExplanationBudget,
    ) -> Narrative {
        let remaining = cutoff.saturating_duration_since(Instant::now());
        if remaining <= budget.overall_timeout {
            tracing::info!(
                "Synthesizing narrative: {:?} left, summary needs {:?}",
                remaining,
                budget.overall_timeout
            );
            return facts.synthesized_narrative(charts.len());
        }

        match self
            .call(&narrative_prompt(charts, facts), budget.overall_timeout)
            .await
        {
            Ok(text) => Narrative {
                text,
                source: ExplanationSource::Generated,
            },
            Err(e) => {
                tracing::warn!("Overall narrative fell back: {}", e);
                facts.synthesized_narrative(charts.len())
            }
        }
    }

    /// Single attempt, bounded by our own timer whatever the collaborator does.
    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, TextGenerationError> {
        match tokio::time::timeout(timeout, self.generator.generate(prompt, timeout)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(Ok(_)) => Err(TextGenerationError::Service("empty response".to_string())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TextGenerationError::Timeout(timeout)),
        }
    }
}
