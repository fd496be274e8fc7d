use crate::skills::Proficiency;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Minimum percentage score for an attempt to count as passed.
pub const PASS_RATE: u8 = 80;

/// Points granted for every newly earned skill badge.
pub const BADGE_POINTS: u32 = 50;

pub fn is_passing(score: u8) -> bool {
    score >= PASS_RATE
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    #[serde(alias = "multiple-choice", alias = "multiple_choice")]
    MultipleChoice,
    #[serde(alias = "true-false", alias = "true_false")]
    TrueFalse,
    #[serde(alias = "short-answer", alias = "short_answer")]
    ShortAnswer,
    #[serde(alias = "code-sandbox", alias = "code_sandbox")]
    CodeSandbox,
}

impl QuestionType {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple choice",
            QuestionType::TrueFalse => "True / False",
            QuestionType::ShortAnswer => "Short answer",
            QuestionType::CodeSandbox => "Code",
        }
    }

    /// Choice-style questions are answered by picking one of the options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Options the user can pick from. True/false questions without explicit
    /// options get the two literal choices.
    pub fn choices(&self) -> Vec<String> {
        match (&self.options, self.question_type) {
            (Some(options), _) if !options.is_empty() => options.clone(),
            (_, QuestionType::TrueFalse) => vec!["True".to_string(), "False".to_string()],
            _ => Vec::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.user_answer.trim().is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAttempt {
    pub id: String,
    pub date: DateTime<Local>,
    pub score: u8,
    pub skill_id: String,
    pub skill_name: String,
    #[serde(default)]
    pub proficiency: Proficiency,
    pub questions: Vec<Question>,
    pub passed: bool,
    #[serde(default)]
    pub badge_awarded: bool,
}

impl AssessmentAttempt {
    /// Builds a completed attempt. `passed` is derived from the score and the
    /// question list is a snapshot owned by the attempt.
    pub fn new(
        skill_id: &str,
        skill_name: &str,
        proficiency: Proficiency,
        score: u8,
        questions: &[Question],
    ) -> Self {
        let date = Local::now();
        let score = score.min(100);
        Self {
            id: format!("attempt-{}", date.timestamp_millis()),
            date,
            score,
            skill_id: skill_id.to_string(),
            skill_name: skill_name.to_string(),
            proficiency,
            questions: questions.to_vec(),
            passed: is_passing(score),
            badge_awarded: false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillBadge {
    pub id: String,
    pub skill_id: String,
    pub skill_name: String,
    pub proficiency: Proficiency,
    pub date_earned: DateTime<Local>,
}

impl SkillBadge {
    pub fn new(skill_id: &str, skill_name: &str, proficiency: Proficiency) -> Self {
        let date_earned = Local::now();
        Self {
            id: format!("badge-{}", date_earned.timestamp_millis()),
            skill_id: skill_id.to_string(),
            skill_name: skill_name.to_string(),
            proficiency,
            date_earned,
        }
    }

    pub fn matches(&self, skill_id: &str, proficiency: Proficiency) -> bool {
        self.skill_id == skill_id && self.proficiency == proficiency
    }

    /// Get the emoji icon for this badge
    pub fn get_icon(&self) -> &str {
        match self.proficiency {
            Proficiency::Awareness => "🌱",
            Proficiency::Knowledge => "📘",
            Proficiency::Skill => "🛠",
            Proficiency::Mastery => "🏆",
        }
    }

    /// Get the display text for this badge
    pub fn get_display_text(&self) -> String {
        format!("{} ({})", self.skill_name, self.proficiency)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointsEntry {
    pub points: u32,
    pub reason: String,
    pub action_type: String,
    pub item_id: String,
    pub awarded_at: DateTime<Local>,
}
