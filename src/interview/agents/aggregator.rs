//! Insight aggregator: synthesizes every collected insight into the final report.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{AgentOutput, PhaseAgent, ensure_phase};
use crate::error::AgentError;
use crate::interview::responses;
use crate::interview::state::{InsightCategory, InterviewState, Message, Next, Phase, StatePatch};

#[derive(Debug, Default)]
pub struct InsightAggregator;

impl InsightAggregator {
    pub fn new() -> Self {
        Self
    }

    fn required<'a>(
        &self,
        state: &'a InterviewState,
        category: InsightCategory,
    ) -> Result<&'a Map<String, Value>, AgentError> {
        state
            .insight(category)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| AgentError::MissingInsight {
                agent: self.name().to_string(),
                category: category.to_string(),
            })
    }
}

#[async_trait]
impl PhaseAgent for InsightAggregator {
    fn name(&self) -> &str {
        "Insight Aggregator"
    }

    fn phase(&self) -> Phase {
        Phase::Aggregate
    }

    async fn process(
        &self,
        state: &InterviewState,
        _input: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        ensure_phase(self, state)?;

        let learning = self.required(state, InsightCategory::LearningStyle)?;
        let career = self.required(state, InsightCategory::CareerGoals)?;
        let intake = state
            .insight(InsightCategory::InitialInsights)
            .cloned()
            .unwrap_or_default();

        let report = json!({
            "learning_profile": learning,
            "career_development": career,
            "intake": intake,
            "recommendations": responses::recommendations(),
        });

        let patch = StatePatch::new()
            .with_message(Message::assistant(responses::REPORT_READY))
            .with_insight(InsightCategory::FinalReport, report);
        Ok(AgentOutput::new(patch, Next::Terminal))
    }
}
