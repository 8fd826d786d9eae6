//! Transition guards: pure predicates deciding when a phase may be left.
//!
//! A guard for phase X holds when X is the current phase and the insight
//! category X owns carries its signature field. The aggregate guard is the
//! terminal guard and also checks that every insight is in and every earlier
//! phase has been completed.

use serde::Serialize;
use serde_json::{Map, Value};

use super::state::{InsightCategory, InterviewState, Phase};

/// A phase change chosen by a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

type Guard = fn(&InterviewState) -> bool;

/// Guards in evaluation order.
const GUARDS: [(Phase, Guard); 4] = [
    (Phase::Initial, initial_complete),
    (Phase::LearningStyle, learning_style_complete),
    (Phase::CareerGoals, career_goals_complete),
    (Phase::Aggregate, interview_complete),
];

/// Phases that must be completed before the interview can finish.
const PREREQUISITE_PHASES: [Phase; 3] = [Phase::Initial, Phase::LearningStyle, Phase::CareerGoals];

/// Evaluate guards in phase order; the first that holds decides the transition.
///
/// `None` means stay on the current node.
pub fn evaluate(state: &InterviewState) -> Option<PhaseTransition> {
    GUARDS
        .iter()
        .find(|(_, guard)| guard(state))
        .and_then(|(from, _)| {
            from.next().map(|to| PhaseTransition { from: *from, to })
        })
}

pub fn initial_complete(state: &InterviewState) -> bool {
    state.current_phase() == Phase::Initial
        && category_satisfied(state, InsightCategory::InitialInsights)
}

pub fn learning_style_complete(state: &InterviewState) -> bool {
    state.current_phase() == Phase::LearningStyle
        && category_satisfied(state, InsightCategory::LearningStyle)
}

pub fn career_goals_complete(state: &InterviewState) -> bool {
    state.current_phase() == Phase::CareerGoals
        && category_satisfied(state, InsightCategory::CareerGoals)
}

/// Terminal guard.
pub fn interview_complete(state: &InterviewState) -> bool {
    state.current_phase() == Phase::Aggregate
        && InsightCategory::ALL
            .iter()
            .all(|category| category_satisfied(state, *category))
        && PREREQUISITE_PHASES
            .iter()
            .all(|phase| state.has_completed(*phase))
}

/// Whether a category holds a non-empty payload with its signature field.
pub fn category_satisfied(state: &InterviewState, category: InsightCategory) -> bool {
    let Some(payload) = state.insight(category) else {
        return false;
    };
    if payload.is_empty() {
        return false;
    }
    match category {
        InsightCategory::InitialInsights => true,
        InsightCategory::LearningStyle => non_empty_str(payload, "style"),
        InsightCategory::CareerGoals => non_empty_str(payload, "career_path"),
        InsightCategory::FinalReport => payload
            .get("recommendations")
            .and_then(Value::as_object)
            .is_some_and(|r| !r.is_empty()),
    }
}

fn non_empty_str(payload: &Map<String, Value>, field: &str) -> bool {
    payload
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}
