//! Interview state: phases, insight categories, and the merge-only record
//! threaded between phase agents.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StateError;

/// The phases of the interview.
///
/// Progresses linearly: Initial → LearningStyle → CareerGoals → Aggregate →
/// Complete. Declaration order is the guard evaluation order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Initial,
    LearningStyle,
    #[serde(alias = "career_path")]
    CareerGoals,
    #[serde(alias = "skills_assessment")]
    Aggregate,
    Complete,
}

impl Phase {
    /// Every phase, in progression order.
    pub const ALL: [Phase; 5] = [
        Phase::Initial,
        Phase::LearningStyle,
        Phase::CareerGoals,
        Phase::Aggregate,
        Phase::Complete,
    ];

    /// Check if a transition from `self` to `target` follows the canonical flow.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (Initial, LearningStyle)
                | (LearningStyle, CareerGoals)
                | (CareerGoals, Aggregate)
                | (Aggregate, Complete)
        )
    }

    /// Whether this phase is terminal (interview is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next phase in the linear progression, if any.
    pub fn next(&self) -> Option<Phase> {
        use Phase::*;
        match self {
            Initial => Some(LearningStyle),
            LearningStyle => Some(CareerGoals),
            CareerGoals => Some(Aggregate),
            Aggregate => Some(Complete),
            Complete => None,
        }
    }

    /// The insight category this phase is responsible for populating.
    pub fn insight_category(&self) -> Option<InsightCategory> {
        match self {
            Self::Initial => Some(InsightCategory::InitialInsights),
            Self::LearningStyle => Some(InsightCategory::LearningStyle),
            Self::CareerGoals => Some(InsightCategory::CareerGoals),
            Self::Aggregate => Some(InsightCategory::FinalReport),
            Self::Complete => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::LearningStyle => "learning_style",
            Self::CareerGoals => "career_goals",
            Self::Aggregate => "aggregate",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Self::Initial),
            "learning_style" => Ok(Self::LearningStyle),
            "career_goals" | "career_path" => Ok(Self::CareerGoals),
            "aggregate" | "skills_assessment" => Ok(Self::Aggregate),
            "complete" => Ok(Self::Complete),
            other => Err(StateError::InvalidPhase {
                value: other.to_string(),
            }),
        }
    }
}

/// Named buckets of structured output, one per phase agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    #[serde(alias = "skills")]
    InitialInsights,
    LearningStyle,
    #[serde(alias = "career_path")]
    CareerGoals,
    FinalReport,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 4] = [
        InsightCategory::InitialInsights,
        InsightCategory::LearningStyle,
        InsightCategory::CareerGoals,
        InsightCategory::FinalReport,
    ];

    /// Parse a category key, accepting the legacy aliases.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "initial_insights" | "skills" => Some(Self::InitialInsights),
            "learning_style" => Some(Self::LearningStyle),
            "career_goals" | "career_path" => Some(Self::CareerGoals),
            "final_report" => Some(Self::FinalReport),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialInsights => "initial_insights",
            Self::LearningStyle => "learning_style",
            Self::CareerGoals => "career_goals",
            Self::FinalReport => "final_report",
        }
    }
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Build a message from its `{role, content}` JSON shape.
    ///
    /// Returns `None` if either field is missing or has the wrong type.
    pub fn from_value(value: &Value) -> Option<Self> {
        let role = serde_json::from_value::<Role>(value.get("role")?.clone()).ok()?;
        let content = value.get("content")?.as_str()?;
        Some(Self::new(role, content))
    }

    fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Where the workflow goes after a step.
///
/// The terminal sentinel is its own variant so it can never be confused with
/// a phase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phase", rename_all = "snake_case")]
pub enum Next {
    Phase(Phase),
    Terminal,
}

impl Next {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl Default for Next {
    fn default() -> Self {
        Self::Phase(Phase::Initial)
    }
}

impl std::fmt::Display for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phase(phase) => write!(f, "{phase}"),
            Self::Terminal => write!(f, "<terminal>"),
        }
    }
}

/// A partial state update, applied with [`InterviewState::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub current_phase: Option<Phase>,
    pub messages: Vec<Message>,
    pub completed_phases: Vec<Phase>,
    pub collected_insights: BTreeMap<InsightCategory, Map<String, Value>>,
    pub next: Option<Next>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.current_phase = Some(phase);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Attach an insight payload. Non-object payloads are dropped with a warning.
    pub fn with_insight(mut self, category: InsightCategory, payload: Value) -> Self {
        match payload {
            Value::Object(map) => {
                let entry = self.collected_insights.entry(category).or_default();
                deep_merge(entry, map);
            }
            other => {
                let err = StateError::MalformedInsight {
                    category: category.to_string(),
                    reason: format!("expected an object, got {}", json_kind(&other)),
                };
                warn!(error = %err, "Dropping insight payload");
            }
        }
        self
    }

    pub fn with_next(mut self, next: Next) -> Self {
        self.next = Some(next);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.current_phase.is_none()
            && self.messages.is_empty()
            && self.completed_phases.is_empty()
            && self.collected_insights.is_empty()
            && self.next.is_none()
    }

    /// Parse a dict-shaped patch.
    ///
    /// Phase values are validated up front, so an `InvalidPhase` error means
    /// nothing from the patch has been applied. Everything else is tolerant:
    /// malformed or unknown entries are logged and skipped.
    pub fn from_value(value: &Value) -> Result<Self, StateError> {
        let Some(fields) = value.as_object() else {
            warn!(kind = json_kind(value), "Ignoring non-object state patch");
            return Ok(Self::default());
        };

        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "current_phase" => {
                    patch.current_phase = Some(parse_phase(value)?);
                }
                "completed_phases" => match value.as_array() {
                    Some(items) => {
                        for item in items {
                            patch.completed_phases.push(parse_phase(item)?);
                        }
                    }
                    None => warn!(kind = json_kind(value), "Ignoring non-array completed_phases"),
                },
                "collected_insights" => match value.as_object() {
                    Some(insights) => {
                        for (sub_key, payload) in insights {
                            let Some(category) = InsightCategory::parse(sub_key) else {
                                warn!(category = %sub_key, "Skipping unknown insight category");
                                continue;
                            };
                            patch = patch.with_insight(category, payload.clone());
                        }
                    }
                    None => {
                        let err = StateError::MalformedInsight {
                            category: "collected_insights".to_string(),
                            reason: format!("expected an object, got {}", json_kind(value)),
                        };
                        warn!(error = %err, "Dropping insight patch");
                    }
                },
                "messages" => match value.as_array() {
                    Some(items) => {
                        for item in items {
                            match Message::from_value(item) {
                                Some(message) => patch.messages.push(message),
                                None => warn!(entry = %item, "Skipping malformed message"),
                            }
                        }
                    }
                    None => warn!(kind = json_kind(value), "Ignoring non-array messages"),
                },
                "next" => match serde_json::from_value::<Next>(value.clone()) {
                    Ok(next) => patch.next = Some(next),
                    Err(e) => warn!(error = %e, "Ignoring unreadable routing hint"),
                },
                unknown => {
                    warn!(field = %unknown, "Ignoring unknown state field");
                }
            }
        }
        Ok(patch)
    }
}

/// The interview record.
///
/// Fields are private: [`InterviewState::merge`] is the only way to change
/// them once the state exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterviewState {
    messages: Vec<Message>,
    current_phase: Phase,
    completed_phases: Vec<Phase>,
    collected_insights: BTreeMap<InsightCategory, Map<String, Value>>,
    next: Next,
}

impl InterviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn completed_phases(&self) -> &[Phase] {
        &self.completed_phases
    }

    pub fn has_completed(&self, phase: Phase) -> bool {
        self.completed_phases.contains(&phase)
    }

    pub fn collected_insights(&self) -> &BTreeMap<InsightCategory, Map<String, Value>> {
        &self.collected_insights
    }

    pub fn insight(&self, category: InsightCategory) -> Option<&Map<String, Value>> {
        self.collected_insights.get(&category)
    }

    pub fn next(&self) -> Next {
        self.next
    }

    /// Read a top-level field of the serialized state, or `default`.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.to_value().get(key).cloned().unwrap_or(default)
    }

    /// The most recent transcript message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the last message when the user spoke last.
    ///
    /// `None` means the assistant is still waiting for an answer.
    pub fn last_user_input(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Apply a patch.
    ///
    /// - phase changes record the phase being left in `completed_phases`
    /// - insights deep-merge per category, never replace
    /// - messages append, skipping exact duplicates
    /// - `next` overwrites
    pub fn merge(&mut self, patch: StatePatch) {
        let StatePatch {
            current_phase,
            messages,
            completed_phases,
            collected_insights,
            next,
        } = patch;

        if let Some(phase) = current_phase {
            self.set_phase(phase);
        }

        for phase in completed_phases {
            self.mark_completed(phase);
        }

        for (category, payload) in collected_insights {
            if payload.is_empty() && !self.collected_insights.contains_key(&category) {
                continue;
            }
            let entry = self.collected_insights.entry(category).or_default();
            deep_merge(entry, payload);
        }

        for message in messages {
            if message.is_blank() {
                debug!(role = ?message.role, "Skipping blank message");
                continue;
            }
            if self.messages.contains(&message) {
                debug!(role = ?message.role, "Skipping duplicate message");
                continue;
            }
            self.messages.push(message);
        }

        if let Some(next) = next {
            self.next = next;
        }
    }

    /// Merge a dict-shaped patch.
    ///
    /// Fails only with [`StateError::InvalidPhase`], in which case the state
    /// is left untouched.
    pub fn update_from_value(&mut self, patch: &Value) -> Result<(), StateError> {
        let patch = StatePatch::from_value(patch)?;
        if patch.is_empty() {
            debug!("State patch carried nothing applicable");
            return Ok(());
        }
        self.merge(patch);
        Ok(())
    }

    /// Append one message. Blank content is a silent no-op.
    pub fn add_message(&mut self, message: Message) {
        if message.is_blank() {
            debug!("Ignoring blank message");
            return;
        }
        self.merge(StatePatch::new().with_message(message));
    }

    /// Append a message given as raw JSON; malformed input is ignored.
    pub fn add_message_value(&mut self, value: &Value) {
        match Message::from_value(value) {
            Some(message) => self.add_message(message),
            None => debug!(raw = %value, "Ignoring malformed message"),
        }
    }

    /// Serialize the full state.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize interview state");
            Value::Null
        })
    }

    /// Restore a state previously produced by [`InterviewState::to_value`].
    ///
    /// The phase is restored as-is rather than merged, so restoring does not
    /// mark anything completed on its own.
    pub fn from_value(value: &Value) -> Result<Self, StateError> {
        if !value.is_object() {
            return Err(StateError::NotAnObject);
        }
        let mut patch = StatePatch::from_value(value)?;

        let mut state = Self {
            current_phase: patch.current_phase.take().unwrap_or_default(),
            ..Self::default()
        };
        state.merge(patch);
        state.next = state.next_hint_or_current();
        Ok(state)
    }

    fn next_hint_or_current(&self) -> Next {
        if self.next == Next::default() && self.current_phase != Phase::Initial {
            if self.current_phase.is_terminal() {
                Next::Terminal
            } else {
                Next::Phase(self.current_phase)
            }
        } else {
            self.next
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase == self.current_phase {
            return;
        }
        let previous = self.current_phase;
        if !previous.can_transition_to(phase) {
            warn!(from = %previous, to = %phase, "Non-linear phase change");
        }
        self.mark_completed(previous);
        self.current_phase = phase;
    }

    fn mark_completed(&mut self, phase: Phase) {
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
        }
    }
}

/// Recursively merge `incoming` into `target`. Nested objects merge; any
/// other value overwrites. Keys are never removed.
pub(crate) fn deep_merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn parse_phase(value: &Value) -> Result<Phase, StateError> {
    match value.as_str() {
        Some(s) => s.parse(),
        None => Err(StateError::InvalidPhase {
            value: value.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
