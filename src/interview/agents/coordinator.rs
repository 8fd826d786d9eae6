//! Coordinator: opens the interview and seeds the intake insight.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{AgentOutput, PhaseAgent, ensure_phase};
use crate::error::AgentError;
use crate::interview::responses;
use crate::interview::state::{InsightCategory, InterviewState, Message, Next, Phase, StatePatch};

/// Greets the user and hands off to learning-style analysis.
///
/// Unlike the analyzers it does not wait for an answer: the intake phase
/// completes on the coordinator's first turn.
#[derive(Debug, Default)]
pub struct Coordinator;

impl Coordinator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhaseAgent for Coordinator {
    fn name(&self) -> &str {
        "Interview Coordinator"
    }

    fn phase(&self) -> Phase {
        Phase::Initial
    }

    async fn process(
        &self,
        state: &InterviewState,
        input: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        ensure_phase(self, state)?;

        let mut seed = json!({
            "greeted": true,
            "prior_messages": state.messages().len(),
        });
        if let Some(input) = input {
            seed["user_input"] = json!(input);
        }
        debug!(prior_messages = state.messages().len(), "Coordinator seeding intake");

        let patch = StatePatch::new()
            .with_message(Message::assistant(responses::WELCOME))
            .with_insight(InsightCategory::InitialInsights, seed);
        Ok(AgentOutput::new(patch, Next::Phase(Phase::LearningStyle)))
    }
}
