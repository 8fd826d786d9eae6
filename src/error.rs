//! Error types for the interview orchestrator.

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Interview state errors.
///
/// Only `InvalidPhase` ever leaves the state container; `MalformedInsight`
/// is built for logging and the offending sub-key is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Unrecognized interview phase: {value}")]
    InvalidPhase { value: String },

    #[error("Malformed insight for category {category}: {reason}")]
    MalformedInsight { category: String, reason: String },

    #[error("State is not a JSON object")]
    NotAnObject,
}

/// Phase agent errors. Absorbed at the agent boundary.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent {agent} failed: {reason}")]
    Processing { agent: String, reason: String },

    #[error("Agent {agent} requires the {category} insight, which is not collected yet")]
    MissingInsight { agent: String, category: String },

    #[error("Agent {agent} panicked")]
    Panicked { agent: String },
}

/// Workflow construction and wiring errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No live language-model backend is available; use mock mode")]
    LiveBackendUnavailable,

    #[error("No agent node is registered for phase {phase}")]
    MissingNode { phase: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Interview session {id} not found")]
    NotFound { id: Uuid },

    #[error("Interview session {id} is not complete; final report not available")]
    NotComplete { id: Uuid },
}

/// Result type alias for the orchestrator.
pub type Result<T> = std::result::Result<T, Error>;
