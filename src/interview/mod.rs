//! Multi-agent profiling interview.
//!
//! An interview is a conversation driven through fixed phases. Each phase is
//! owned by one agent that reads the shared state and returns a patch. Guards
//! decide when the collected insights allow the interview to move on, and the
//! last phase folds everything into a final report.

pub mod agents;
pub mod guards;
pub mod responses;
pub mod routes;
pub mod session;
pub mod state;
pub mod workflow;

pub use agents::{AgentOutput, PhaseAgent};
pub use guards::PhaseTransition;
pub use routes::{InterviewRouteState, interview_routes};
pub use session::{InterviewResponse, SessionStore, spawn_idle_sweeper};
pub use state::{InsightCategory, InterviewState, Message, Next, Phase, Role, StatePatch};
pub use workflow::{InterviewWorkflow, StepOutcome, create_workflow, new_state};
