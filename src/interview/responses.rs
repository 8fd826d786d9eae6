//! Canned assistant text and analysis tables used by the mock agents.

use serde_json::{Value, json};

use super::state::Phase;

/// Opening message sent by the coordinator.
pub const WELCOME: &str = "\
Welcome! I'm excited to help create your personalized learning journey. \
To start, could you tell me about your recent learning experiences? \
What methods have worked well for you, and what challenges have you faced?";

/// Shown when a phase agent fails and the turn degrades.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error. Could you please try again?";

pub const LEARNING_STYLE_SUMMARY: &str = "\
Based on your responses, you show a strong preference for visual and hands-on learning approaches.";

pub const CAREER_SUMMARY: &str =
    "I've created a roadmap focused on your software architect career goals.";

pub const REPORT_READY: &str =
    "Your personalized learning and career development report is ready.";

/// The question that keeps a phase open until the user answers it.
pub fn question(phase: Phase) -> &'static str {
    match phase {
        Phase::Initial => WELCOME,
        Phase::LearningStyle => "\
When learning something new, do you prefer practical exercises, theoretical understanding, \
visual aids, or discussion-based learning? Could you give specific examples?",
        Phase::CareerGoals => "\
Now that I understand your learning style better, let's discuss your career aspirations. \
What roles or positions interest you most? Where do you see yourself in 3-5 years, \
and what skills do you think you'll need to get there?",
        Phase::Aggregate => "\
Great career goals! I have what I need to put together your personalized report.",
        Phase::Complete => "Your interview is complete. Your final report is available.",
    }
}

/// Join reply fragments into one assistant message.
pub fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn learning_style_analysis() -> Value {
    json!({
        "style": "Visual and hands-on learner",
        "preferred_methods": [
            "Project-based learning",
            "Interactive tutorials",
            "Visual documentation"
        ],
        "challenges": ["Traditional lectures", "Text-only materials"],
        "recommendations": [
            "Focus on practical projects",
            "Use visual learning aids",
            "Interactive coding exercises"
        ],
        "confidence": 0.8
    })
}

pub fn career_roadmap() -> Value {
    json!({
        "career_path": "Software Architect",
        "milestones": [
            "Master system design principles",
            "Gain experience with distributed systems",
            "Develop leadership skills"
        ],
        "skills_needed": [
            "Advanced system design",
            "Cloud architecture",
            "Technical leadership"
        ],
        "confidence": 0.9
    })
}

pub fn recommendations() -> Value {
    json!({
        "learning_approach": "Project-based curriculum with visual aids",
        "skill_development": "Focus on system design and cloud architecture",
        "next_steps": "Begin with hands-on distributed systems projects"
    })
}
