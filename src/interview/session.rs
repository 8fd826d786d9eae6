//! Session store: owns one independent (state, workflow) pair per interview.
//!
//! Calls for the same session are serialized by a per-session mutex; calls
//! for different sessions never contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::state::{InsightCategory, InterviewState, Next, Phase};
use super::workflow::{InterviewWorkflow, StepOutcome, create_workflow, new_state};
use crate::error::{Error, SessionError, WorkflowError};

/// One interview in progress.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub state: InterviewState,
    workflow: InterviewWorkflow,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(workflow: InterviewWorkflow) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: new_state(),
            workflow,
            created_at: now,
            last_active: now,
        }
    }

    async fn step(&mut self, answer: Option<&str>) -> StepOutcome {
        self.last_active = Utc::now();
        let outcome = match answer {
            Some(answer) => self.workflow.respond(&mut self.state, answer).await,
            None => self.workflow.step(&mut self.state).await,
        };
        debug!(
            session_id = %self.id,
            phase = %outcome.phase,
            degraded = outcome.degraded,
            "Session stepped"
        );
        outcome
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// What the caller sees after each turn.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewResponse {
    pub message: String,
    pub session_id: Uuid,
    pub phase: Phase,
    pub completed_phases: Vec<Phase>,
    pub next: Next,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl InterviewResponse {
    fn from_step(session: &Session, outcome: StepOutcome) -> Self {
        Self {
            message: outcome.reply,
            session_id: session.id,
            phase: session.state.current_phase(),
            completed_phases: session.state.completed_phases().to_vec(),
            next: outcome.next,
            degraded: outcome.degraded,
        }
    }
}

/// In-memory interview sessions keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
    mock: bool,
}

impl SessionStore {
    /// Create a store. Fails up front if the workflow cannot be built in
    /// the requested mode.
    pub fn new(mock: bool) -> Result<Arc<Self>, WorkflowError> {
        create_workflow(mock)?;
        Ok(Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            mock,
        }))
    }

    /// Start a new interview and run its opening step.
    pub async fn start(&self) -> Result<InterviewResponse, Error> {
        let mut session = Session::new(create_workflow(self.mock)?);
        let outcome = session.step(None).await;
        let response = InterviewResponse::from_step(&session, outcome);

        info!(session_id = %session.id, "Interview session started");
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session)));
        Ok(response)
    }

    /// Record a user message and run one step.
    pub async fn respond(&self, id: Uuid, message: &str) -> Result<InterviewResponse, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        let outcome = session.step(Some(message)).await;
        Ok(InterviewResponse::from_step(&session, outcome))
    }

    /// Run one step without new input, e.g. to let the aggregator finish.
    pub async fn advance(&self, id: Uuid) -> Result<InterviewResponse, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        let outcome = session.step(None).await;
        Ok(InterviewResponse::from_step(&session, outcome))
    }

    /// A copy of the session's current state.
    pub async fn state(&self, id: Uuid) -> Result<InterviewState, SessionError> {
        let handle = self.get(id).await?;
        let session = handle.lock().await;
        Ok(session.state.clone())
    }

    /// Merge a raw patch into a session's state.
    pub async fn merge_patch(&self, id: Uuid, patch: &Value) -> Result<InterviewState, Error> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        session.state.update_from_value(patch)?;
        session.touch();
        Ok(session.state.clone())
    }

    /// The final report, available once the interview is complete.
    pub async fn report(&self, id: Uuid) -> Result<Value, SessionError> {
        let handle = self.get(id).await?;
        let session = handle.lock().await;
        if !session.state.current_phase().is_terminal() {
            return Err(SessionError::NotComplete { id });
        }
        let report = session
            .state
            .insight(InsightCategory::FinalReport)
            .cloned()
            .unwrap_or_default();
        Ok(Value::Object(report))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many were dropped.
    ///
    /// Sessions currently in use are skipped.
    pub async fn prune_idle(&self, max_idle: chrono::Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.last_active >= cutoff,
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle interview sessions");
        }
        pruned
    }

    async fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound { id })
    }
}

/// Spawn a background task that prunes idle sessions every `interval`.
pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    interval: std::time::Duration,
    max_idle: chrono::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            store.prune_idle(max_idle).await;
        }
    })
}
