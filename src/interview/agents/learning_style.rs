//! Learning-style analyzer.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{AgentOutput, PhaseAgent, ensure_phase, reprompt};
use crate::error::AgentError;
use crate::interview::responses;
use crate::interview::state::{InsightCategory, InterviewState, Message, Next, Phase, StatePatch};

/// Turns the user's description of how they learn into a learning-style profile.
#[derive(Debug, Default)]
pub struct LearningStyleAnalyzer;

impl LearningStyleAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhaseAgent for LearningStyleAnalyzer {
    fn name(&self) -> &str {
        "Learning Style Analyzer"
    }

    fn phase(&self) -> Phase {
        Phase::LearningStyle
    }

    async fn process(
        &self,
        state: &InterviewState,
        input: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        ensure_phase(self, state)?;

        let Some(answer) = input else {
            debug!("No answer yet, asking about learning style again");
            return Ok(reprompt(Phase::LearningStyle));
        };

        let mut analysis = responses::learning_style_analysis();
        analysis["source_response"] = json!(answer);

        let reply = responses::compose(&[
            responses::LEARNING_STYLE_SUMMARY,
            responses::question(Phase::CareerGoals),
        ]);
        let patch = StatePatch::new()
            .with_message(Message::assistant(reply))
            .with_insight(InsightCategory::LearningStyle, analysis);
        Ok(AgentOutput::new(patch, Next::Phase(Phase::CareerGoals)))
    }
}
