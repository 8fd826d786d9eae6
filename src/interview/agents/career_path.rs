//! Career-path analyzer.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{AgentOutput, PhaseAgent, ensure_phase, reprompt};
use crate::error::AgentError;
use crate::interview::responses;
use crate::interview::state::{InsightCategory, InterviewState, Message, Next, Phase, StatePatch};

/// Builds a development roadmap from the user's stated career goals.
#[derive(Debug, Default)]
pub struct CareerPathAnalyzer;

impl CareerPathAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhaseAgent for CareerPathAnalyzer {
    fn name(&self) -> &str {
        "Career Path Analyzer"
    }

    fn phase(&self) -> Phase {
        Phase::CareerGoals
    }

    async fn process(
        &self,
        state: &InterviewState,
        input: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        ensure_phase(self, state)?;

        let Some(answer) = input else {
            debug!("No answer yet, asking about career goals again");
            return Ok(reprompt(Phase::CareerGoals));
        };

        let mut roadmap = responses::career_roadmap();
        roadmap["source_response"] = json!(answer);

        let reply = responses::compose(&[
            responses::CAREER_SUMMARY,
            responses::question(Phase::Aggregate),
        ]);
        let patch = StatePatch::new()
            .with_message(Message::assistant(reply))
            .with_insight(InsightCategory::CareerGoals, roadmap);
        Ok(AgentOutput::new(patch, Next::Phase(Phase::Aggregate)))
    }
}
