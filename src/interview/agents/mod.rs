//! Phase agents: one per interview phase.
//!
//! Each agent reads the current state and returns a patch plus a routing
//! directive. Agents never mutate state themselves; the workflow merges what
//! they return. [`run_agent`] is the boundary that turns errors and panics
//! into an [`AgentError`] the workflow can degrade on.

pub mod aggregator;
pub mod career_path;
pub mod coordinator;
pub mod learning_style;

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use super::responses;
use super::state::{InterviewState, Message, Next, Phase, Role, StatePatch};
use crate::error::AgentError;

pub use aggregator::InsightAggregator;
pub use career_path::CareerPathAnalyzer;
pub use coordinator::Coordinator;
pub use learning_style::LearningStyleAnalyzer;

/// What an agent hands back to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub patch: StatePatch,
    /// Where the agent expects the workflow to go. Guards have the final say.
    pub next: Next,
}

impl AgentOutput {
    pub fn new(patch: StatePatch, next: Next) -> Self {
        Self { patch, next }
    }

    /// The last assistant message in the patch, if any.
    pub fn reply(&self) -> Option<&str> {
        self.patch
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}

/// A handler for one interview phase.
#[async_trait]
pub trait PhaseAgent: Send + Sync {
    fn name(&self) -> &str;

    /// The phase this agent owns.
    fn phase(&self) -> Phase;

    /// `input` is the user's answer for this turn, if there is one.
    async fn process(
        &self,
        state: &InterviewState,
        input: Option<&str>,
    ) -> Result<AgentOutput, AgentError>;
}

/// Run an agent, converting a panic inside `process` into an error.
pub async fn run_agent(
    agent: &dyn PhaseAgent,
    state: &InterviewState,
    input: Option<&str>,
) -> Result<AgentOutput, AgentError> {
    match AssertUnwindSafe(agent.process(state, input)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Panicked {
            agent: agent.name().to_string(),
        }),
    }
}

/// Patch applied when an agent fails: apology only, phase and insights untouched.
pub fn fallback_patch(phase: Phase) -> StatePatch {
    StatePatch::new()
        .with_message(Message::assistant(responses::APOLOGY))
        .with_next(Next::Phase(phase))
}

/// Ask the current phase's question again without producing any insight.
pub(crate) fn reprompt(phase: Phase) -> AgentOutput {
    AgentOutput::new(
        StatePatch::new().with_message(Message::assistant(responses::question(phase))),
        Next::Phase(phase),
    )
}

pub(crate) fn ensure_phase(agent: &dyn PhaseAgent, state: &InterviewState) -> Result<(), AgentError> {
    if state.current_phase() == agent.phase() {
        Ok(())
    } else {
        Err(AgentError::Processing {
            agent: agent.name().to_string(),
            reason: format!(
                "invoked in phase {} but owns phase {}",
                state.current_phase(),
                agent.phase()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingAgent;

    #[async_trait]
    impl PhaseAgent for PanickingAgent {
        fn name(&self) -> &str {
            "panicking"
        }
        fn phase(&self) -> Phase {
            Phase::Initial
        }
        async fn process(
            &self,
            _state: &InterviewState,
            _input: Option<&str>,
        ) -> Result<AgentOutput, AgentError> {
            panic!("boom")
        }
    }

    #[tokio::test]
    async fn panics_become_errors() {
        let state = InterviewState::new();
        let result = run_agent(&PanickingAgent, &state, None).await;
        assert!(matches!(result, Err(AgentError::Panicked { ref agent }) if agent == "panicking"));
    }

    #[test]
    fn fallback_patch_only_apologizes() {
        let patch = fallback_patch(Phase::CareerGoals);
        assert!(patch.current_phase.is_none());
        assert!(patch.collected_insights.is_empty());
        assert_eq!(patch.messages, vec![Message::assistant(responses::APOLOGY)]);
        assert_eq!(patch.next, Some(Next::Phase(Phase::CareerGoals)));
    }

    #[test]
    fn reply_picks_last_assistant_message() {
        let output = AgentOutput::new(
            StatePatch::new()
                .with_message(Message::assistant("first"))
                .with_message(Message::user("echo"))
                .with_message(Message::assistant("second")),
            Next::Terminal,
        );
        assert_eq!(output.reply(), Some("second"));
    }
}
