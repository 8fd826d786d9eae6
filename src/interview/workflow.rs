//! Interview workflow: wires phase agents as nodes and guards as edges.
//!
//! The workflow is driven one step at a time: each call to
//! [`InterviewWorkflow::step`] runs the node for the current phase once,
//! merges its patch, and lets the guards pick at most one transition. It then
//! returns control to the caller until the next external input.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::agents::{
    self, CareerPathAnalyzer, Coordinator, InsightAggregator, LearningStyleAnalyzer, PhaseAgent,
};
use super::guards::{self, PhaseTransition};
use super::responses;
use super::state::{InterviewState, Message, Next, Phase, StatePatch};
use crate::error::WorkflowError;

/// Result of a single workflow step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// Assistant text produced by this step (safe to display).
    pub reply: String,
    /// Phase after the step.
    pub phase: Phase,
    /// Where the next step will go.
    pub next: Next,
    /// The transition taken, if the step advanced.
    pub transition: Option<PhaseTransition>,
    /// Whether the node failed and the step fell back to an apology.
    pub degraded: bool,
}

/// Picks the transition, if any, once an agent's patch is merged.
type GuardEvaluator = fn(&InterviewState) -> Option<PhaseTransition>;

/// The wired interview graph.
pub struct InterviewWorkflow {
    nodes: BTreeMap<Phase, Arc<dyn PhaseAgent>>,
}

impl InterviewWorkflow {
    /// An empty graph. Use [`InterviewWorkflow::with_node`] to register agents.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// The graph backed by the canned-response agents.
    pub fn mock() -> Self {
        Self::new()
            .with_node(Arc::new(Coordinator::new()))
            .with_node(Arc::new(LearningStyleAnalyzer::new()))
            .with_node(Arc::new(CareerPathAnalyzer::new()))
            .with_node(Arc::new(InsightAggregator::new()))
    }

    /// Register an agent as the node for the phase it owns, replacing any
    /// previous node for that phase.
    pub fn with_node(mut self, agent: Arc<dyn PhaseAgent>) -> Self {
        self.nodes.insert(agent.phase(), agent);
        self
    }

    /// Check that every non-terminal phase has a node.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        Phase::ALL
            .iter()
            .filter(|phase| !phase.is_terminal())
            .find(|phase| !self.nodes.contains_key(*phase))
            .map_or(Ok(()), |phase| {
                Err(WorkflowError::MissingNode {
                    phase: phase.to_string(),
                })
            })
    }

    /// `(phase, agent name)` for every registered node, in phase order.
    pub fn nodes(&self) -> Vec<(Phase, &str)> {
        self.nodes
            .iter()
            .map(|(phase, agent)| (*phase, agent.name()))
            .collect()
    }

    /// Run one step: the current phase's node, then guard evaluation.
    ///
    /// The node sees the last transcript message as its input when the user
    /// spoke last.
    pub async fn step(&self, state: &mut InterviewState) -> StepOutcome {
        let input = state.last_user_input().map(str::to_owned);
        self.run_step(state, input.as_deref(), guards::evaluate).await
    }

    /// Record a user answer and run one step on it.
    ///
    /// The answer reaches the node even when the transcript already holds an
    /// identical message and the append is skipped.
    pub async fn respond(&self, state: &mut InterviewState, answer: &str) -> StepOutcome {
        state.add_message(Message::user(answer));
        let input = Some(answer).filter(|a| !a.trim().is_empty());
        self.run_step(state, input, guards::evaluate).await
    }

    async fn run_step(
        &self,
        state: &mut InterviewState,
        input: Option<&str>,
        evaluator: GuardEvaluator,
    ) -> StepOutcome {
        let phase = state.current_phase();

        if phase.is_terminal() {
            debug!("Interview already complete, nothing to run");
            state.merge(StatePatch::new().with_next(Next::Terminal));
            return StepOutcome {
                reply: responses::question(phase).to_string(),
                phase,
                next: Next::Terminal,
                transition: None,
                degraded: false,
            };
        }

        let Some(agent) = self.nodes.get(&phase) else {
            let err = WorkflowError::MissingNode {
                phase: phase.to_string(),
            };
            warn!(error = %err, "Cannot run interview step");
            return degrade(state);
        };

        let output = match agents::run_agent(agent.as_ref(), state, input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(agent = agent.name(), phase = %phase, error = %e, "Phase agent failed");
                return degrade(state);
            }
        };

        let reply = output
            .reply()
            .unwrap_or_else(|| responses::question(phase))
            .to_string();
        let hint = output.next;
        state.merge(output.patch);

        let transition = evaluate_guards(state, evaluator);
        let mut patch = StatePatch::new();
        if let Some(t) = transition {
            info!(from = %t.from, to = %t.to, agent = agent.name(), "Interview phase advanced");
            patch = patch.with_phase(t.to);
        }
        let after = transition.map_or(phase, |t| t.to);
        let next = if after.is_terminal() {
            Next::Terminal
        } else {
            Next::Phase(after)
        };
        if next != hint {
            debug!(hint = %hint, next = %next, "Guards overrode agent routing hint");
        }
        state.merge(patch.with_next(next));

        StepOutcome {
            reply,
            phase: after,
            next,
            transition,
            degraded: false,
        }
    }
}

impl Default for InterviewWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterviewWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewWorkflow")
            .field("nodes", &self.nodes())
            .finish()
    }
}

/// Build the interview workflow.
///
/// Only mock mode is available; asking for a live backend is an error.
pub fn create_workflow(mock: bool) -> Result<InterviewWorkflow, WorkflowError> {
    if !mock {
        return Err(WorkflowError::LiveBackendUnavailable);
    }
    let workflow = InterviewWorkflow::mock();
    workflow.validate()?;
    debug!(nodes = ?workflow.nodes(), "Interview workflow created");
    Ok(workflow)
}

/// A fresh interview state, positioned at the initial phase.
pub fn new_state() -> InterviewState {
    InterviewState::new()
}

/// Guards are total, but a panic in one is still treated as "stay put".
fn evaluate_guards(state: &InterviewState, evaluator: GuardEvaluator) -> Option<PhaseTransition> {
    std::panic::catch_unwind(AssertUnwindSafe(|| evaluator(state))).unwrap_or_else(|_| {
        warn!(phase = %state.current_phase(), "Guard evaluation panicked, staying on current node");
        None
    })
}

/// Apologize without touching phase or insights.
fn degrade(state: &mut InterviewState) -> StepOutcome {
    let phase = state.current_phase();
    state.merge(agents::fallback_patch(phase));
    StepOutcome {
        reply: responses::APOLOGY.to_string(),
        phase,
        next: Next::Phase(phase),
        transition: None,
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::interview::agents::AgentOutput;
    use crate::interview::state::{InsightCategory, Message};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingAgent {
        phase: Phase,
    }

    #[async_trait]
    impl PhaseAgent for FailingAgent {
        fn name(&self) -> &str {
            "failing"
        }
        fn phase(&self) -> Phase {
            self.phase
        }
        async fn process(
            &self,
            _state: &InterviewState,
            _input: Option<&str>,
        ) -> Result<AgentOutput, AgentError> {
            Err(AgentError::Processing {
                agent: "failing".to_string(),
                reason: "simulated".to_string(),
            })
        }
    }

    /// Fails its first call, then behaves like the learning-style analyzer.
    #[derive(Default)]
    struct FlakyAnalyzer {
        failed: AtomicBool,
        inner: LearningStyleAnalyzer,
    }

    #[async_trait]
    impl PhaseAgent for FlakyAnalyzer {
        fn name(&self) -> &str {
            "flaky"
        }
        fn phase(&self) -> Phase {
            Phase::LearningStyle
        }
        async fn process(
            &self,
            state: &InterviewState,
            input: Option<&str>,
        ) -> Result<AgentOutput, AgentError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(AgentError::Processing {
                    agent: "flaky".to_string(),
                    reason: "transient".to_string(),
                });
            }
            self.inner.process(state, input).await
        }
    }

    #[test]
    fn live_mode_is_rejected() {
        assert!(matches!(
            create_workflow(false),
            Err(WorkflowError::LiveBackendUnavailable)
        ));
    }

    #[test]
    fn mock_workflow_has_a_node_per_phase() {
        let workflow = create_workflow(true).unwrap();
        let phases: Vec<Phase> = workflow.nodes().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Initial,
                Phase::LearningStyle,
                Phase::CareerGoals,
                Phase::Aggregate
            ]
        );
    }

    #[test]
    fn validate_reports_missing_nodes() {
        let workflow = InterviewWorkflow::new().with_node(Arc::new(Coordinator::new()));
        let err = workflow.validate().unwrap_err();
        assert!(matches!(err, WorkflowError::MissingNode { ref phase } if phase == "learning_style"));
    }

    #[tokio::test]
    async fn initial_step_advances_exactly_one_phase() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();

        let outcome = workflow.step(&mut state).await;

        assert_eq!(state.current_phase(), Phase::LearningStyle);
        assert_eq!(state.completed_phases(), &[Phase::Initial]);
        assert_eq!(outcome.next, Next::Phase(Phase::LearningStyle));
        assert_eq!(
            outcome.transition,
            Some(PhaseTransition {
                from: Phase::Initial,
                to: Phase::LearningStyle
            })
        );
        assert_eq!(outcome.reply, responses::WELCOME);
        assert!(state.insight(InsightCategory::LearningStyle).is_none());
    }

    #[tokio::test]
    async fn unanswered_phase_is_reentered() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();
        workflow.step(&mut state).await;

        let outcome = workflow.step(&mut state).await;
        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.next, Next::Phase(Phase::LearningStyle));
        assert_eq!(state.current_phase(), Phase::LearningStyle);
        assert!(state.insight(InsightCategory::LearningStyle).is_none());
        assert_eq!(outcome.reply, responses::question(Phase::LearningStyle));
    }

    #[tokio::test]
    async fn full_interview_reaches_terminal_once() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();
        let inputs = [
            None,
            Some("I like hands-on projects"),
            Some("I want to be an architect"),
            None,
        ];

        let mut terminal_transitions = 0;
        for input in inputs {
            if let Some(text) = input {
                state.add_message(Message::user(text));
            }
            let outcome = workflow.step(&mut state).await;
            assert!(!outcome.degraded);
            if outcome.transition.is_some_and(|t| t.to == Phase::Complete) {
                terminal_transitions += 1;
                assert!(outcome.next.is_terminal());
            }
        }

        // Stepping a finished interview is a no-op.
        let again = workflow.step(&mut state).await;
        assert_eq!(again.next, Next::Terminal);
        assert_eq!(again.transition, None);

        assert_eq!(terminal_transitions, 1);
        assert_eq!(state.current_phase(), Phase::Complete);
        assert_eq!(state.next(), Next::Terminal);
        for category in [
            InsightCategory::LearningStyle,
            InsightCategory::CareerGoals,
            InsightCategory::FinalReport,
        ] {
            assert!(
                state.insight(category).is_some_and(|p| !p.is_empty()),
                "{category} should be populated"
            );
        }
        assert_eq!(
            state.completed_phases(),
            &[
                Phase::Initial,
                Phase::LearningStyle,
                Phase::CareerGoals,
                Phase::Aggregate
            ]
        );
    }

    #[tokio::test]
    async fn failing_agent_degrades_without_advancing() {
        let workflow = InterviewWorkflow::mock().with_node(Arc::new(FailingAgent {
            phase: Phase::LearningStyle,
        }));
        let mut state = new_state();
        workflow.step(&mut state).await;
        state.add_message(Message::user("I like hands-on projects"));
        let insights_before = state.collected_insights().clone();

        let outcome = workflow.step(&mut state).await;

        assert!(outcome.degraded);
        assert_eq!(outcome.reply, responses::APOLOGY);
        assert_eq!(outcome.next, Next::Phase(Phase::LearningStyle));
        assert_eq!(state.current_phase(), Phase::LearningStyle);
        assert_eq!(state.collected_insights(), &insights_before);
        assert_eq!(state.last_message().unwrap().content, responses::APOLOGY);
    }

    #[tokio::test]
    async fn failure_does_not_advance_even_when_guard_would_hold() {
        let workflow = InterviewWorkflow::mock().with_node(Arc::new(FailingAgent {
            phase: Phase::LearningStyle,
        }));
        let mut state = new_state();
        workflow.step(&mut state).await;
        state
            .update_from_value(&json!({"collected_insights": {"learning_style": {"style": "visual"}}}))
            .unwrap();

        let outcome = workflow.step(&mut state).await;
        assert!(outcome.degraded);
        assert_eq!(state.current_phase(), Phase::LearningStyle);
    }

    #[tokio::test]
    async fn aggregator_without_prerequisites_degrades() {
        let workflow = create_workflow(true).unwrap();
        let mut state = InterviewState::from_value(&json!({"current_phase": "aggregate"})).unwrap();

        let outcome = workflow.step(&mut state).await;
        assert!(outcome.degraded);
        assert_eq!(state.current_phase(), Phase::Aggregate);
        assert!(state.insight(InsightCategory::FinalReport).is_none());
    }

    #[tokio::test]
    async fn missing_node_degrades() {
        let workflow = InterviewWorkflow::new();
        let mut state = new_state();
        let outcome = workflow.step(&mut state).await;
        assert!(outcome.degraded);
        assert_eq!(state.current_phase(), Phase::Initial);
    }

    #[tokio::test]
    async fn same_answer_is_analyzed_in_each_phase() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();
        workflow.step(&mut state).await;

        let first = workflow.respond(&mut state, "yes").await;
        assert_eq!(first.phase, Phase::CareerGoals);

        // The repeated text is not appended again, but still answers the question.
        let transcript_len = state.messages().len();
        let second = workflow.respond(&mut state, "yes").await;
        assert_eq!(second.phase, Phase::Aggregate);
        assert_eq!(
            state.insight(InsightCategory::CareerGoals).unwrap()["source_response"],
            "yes"
        );
        assert_eq!(state.messages().len(), transcript_len + 1);
    }

    #[tokio::test]
    async fn retrying_same_answer_after_degraded_turn_advances() {
        let workflow = InterviewWorkflow::mock().with_node(Arc::new(FlakyAnalyzer::default()));
        let mut state = new_state();
        workflow.step(&mut state).await;

        let failed = workflow.respond(&mut state, "I like hands-on projects").await;
        assert!(failed.degraded);
        assert_eq!(state.current_phase(), Phase::LearningStyle);

        let retried = workflow.respond(&mut state, "I like hands-on projects").await;
        assert!(!retried.degraded);
        assert_eq!(retried.phase, Phase::CareerGoals);
        assert!(state.insight(InsightCategory::LearningStyle).is_some());
    }

    #[tokio::test]
    async fn blank_answer_reprompts() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();
        workflow.step(&mut state).await;

        let outcome = workflow.respond(&mut state, "   ").await;
        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.reply, responses::question(Phase::LearningStyle));
        assert!(state.insight(InsightCategory::LearningStyle).is_none());
    }

    #[tokio::test]
    async fn guard_panic_stays_on_current_node() {
        let workflow = create_workflow(true).unwrap();
        let mut state = new_state();
        workflow.step(&mut state).await;
        state.add_message(Message::user("I like hands-on projects"));

        let outcome = workflow
            .run_step(&mut state, Some("I like hands-on projects"), |_| {
                panic!("guard failure")
            })
            .await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.phase, Phase::LearningStyle);
        assert_eq!(outcome.next, Next::Phase(Phase::LearningStyle));
        assert_eq!(state.current_phase(), Phase::LearningStyle);
        // The agent's patch was merged before the guards ran.
        assert!(state.insight(InsightCategory::LearningStyle).is_some());
    }

    #[test]
    fn guard_panic_is_not_satisfied() {
        let state = new_state();
        assert_eq!(evaluate_guards(&state, |_| panic!("guard failure")), None);
    }
}
