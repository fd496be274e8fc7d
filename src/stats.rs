use crate::models::{AssessmentAttempt, SkillBadge};
use crate::skills::Skill;
use chrono::{DateTime, Local};

/// Aggregated attempt history for one skill.
#[derive(Clone, Debug, PartialEq)]
pub struct SkillSummary {
    pub skill_id: String,
    pub skill_name: String,
    pub attempts: usize,
    pub passed: usize,
    pub best_score: Option<u8>,
    pub latest_score: Option<u8>,
    pub latest_date: Option<DateTime<Local>>,
    pub average_score: Option<f32>,
    pub has_badge: bool,
}

impl SkillSummary {
    /// `attempts` is expected most recent first, as the ledger returns it.
    pub fn from_attempts(skill: &Skill, attempts: &[AssessmentAttempt], badges: &[SkillBadge]) -> Self {
        let average_score = if attempts.is_empty() {
            None
        } else {
            let total: u32 = attempts.iter().map(|a| a.score as u32).sum();
            Some(total as f32 / attempts.len() as f32)
        };

        Self {
            skill_id: skill.id.clone(),
            skill_name: skill.name.clone(),
            attempts: attempts.len(),
            passed: attempts.iter().filter(|a| a.passed).count(),
            best_score: attempts.iter().map(|a| a.score).max(),
            latest_score: attempts.first().map(|a| a.score),
            latest_date: attempts.first().map(|a| a.date),
            average_score,
            has_badge: badges.iter().any(|b| b.matches(&skill.id, skill.proficiency)),
        }
    }

    pub fn pass_rate(&self) -> Option<f32> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.passed as f32 * 100.0 / self.attempts as f32)
        }
    }
}

/// Get badges sorted by earned time, newest first
pub fn badges_newest_first(badges: &[SkillBadge]) -> Vec<&SkillBadge> {
    let mut sorted: Vec<&SkillBadge> = badges.iter().collect();
    sorted.sort_by(|a, b| b.date_earned.cmp(&a.date_earned));
    sorted
}
