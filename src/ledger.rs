use crate::error::AppError;
use crate::models::{AssessmentAttempt, BADGE_POINTS, SkillBadge};
use crate::points::PointsAward;
use crate::skills::Proficiency;
use crate::storage::{BADGES_KEY, KeyValueStore, attempts_key};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const BADGE_REASON: &str = "skill_badge";
pub const BADGE_ACTION: &str = "assessment";

#[derive(Clone, Debug)]
pub struct RecordedAttempt {
    pub attempt: AssessmentAttempt,
    /// Set only when this attempt produced a new badge.
    pub badge: Option<SkillBadge>,
}

pub trait AttemptLedger: Send {
    fn load_attempts(&mut self, skill_id: &str) -> Vec<AssessmentAttempt>;
    fn load_badges(&mut self) -> Vec<SkillBadge>;
    fn record_attempt(&mut self, attempt: AssessmentAttempt) -> RecordedAttempt;
    fn award_badge_if_absent(
        &mut self,
        skill_id: &str,
        skill_name: &str,
        proficiency: Proficiency,
    ) -> Option<SkillBadge>;
}

/// Attempts per skill, most recent first, and a global badge list with at
/// most one badge per `(skill_id, proficiency)`.
///
/// Writes are best effort: a failed write is logged and the in-memory copy
/// stays authoritative for the rest of the process.
pub struct Ledger {
    store: Arc<dyn KeyValueStore>,
    points: Arc<dyn PointsAward>,
    attempts: HashMap<String, Vec<AssessmentAttempt>>,
    badges: Option<Vec<SkillBadge>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KeyValueStore>, points: Arc<dyn PointsAward>) -> Self {
        Self {
            store,
            points,
            attempts: HashMap::new(),
            badges: None,
        }
    }

    fn attempts_mut(&mut self, skill_id: &str) -> &mut Vec<AssessmentAttempt> {
        if !self.attempts.contains_key(skill_id) {
            let loaded = read_list(self.store.as_ref(), &attempts_key(skill_id));
            self.attempts.insert(skill_id.to_string(), loaded);
        }
        self.attempts.entry(skill_id.to_string()).or_default()
    }

    fn badges_mut(&mut self) -> &mut Vec<SkillBadge> {
        let store = self.store.clone();
        self.badges
            .get_or_insert_with(|| read_list(store.as_ref(), BADGES_KEY))
    }
}

impl AttemptLedger for Ledger {
    fn load_attempts(&mut self, skill_id: &str) -> Vec<AssessmentAttempt> {
        self.attempts_mut(skill_id).clone()
    }

    fn load_badges(&mut self) -> Vec<SkillBadge> {
        self.badges_mut().clone()
    }

    fn record_attempt(&mut self, mut attempt: AssessmentAttempt) -> RecordedAttempt {
        let badge = if attempt.passed {
            self.award_badge_if_absent(&attempt.skill_id, &attempt.skill_name, attempt.proficiency)
        } else {
            None
        };
        attempt.badge_awarded = badge.is_some();

        let skill_id = attempt.skill_id.clone();
        info!(
            attempt_id = %attempt.id,
            skill_id = %skill_id,
            score = attempt.score,
            passed = attempt.passed,
            badge_awarded = attempt.badge_awarded,
            "Recording assessment attempt"
        );

        let store = self.store.clone();
        let list = self.attempts_mut(&skill_id);
        list.insert(0, attempt.clone());
        if let Err(e) = write_list(store.as_ref(), &attempts_key(&skill_id), list) {
            warn!(skill_id = %skill_id, error = %e, "Failed to persist attempts; keeping in memory");
        }

        RecordedAttempt { attempt, badge }
    }

    fn award_badge_if_absent(
        &mut self,
        skill_id: &str,
        skill_name: &str,
        proficiency: Proficiency,
    ) -> Option<SkillBadge> {
        if self
            .badges_mut()
            .iter()
            .any(|b| b.matches(skill_id, proficiency))
        {
            debug!(skill_id, %proficiency, "Badge already held");
            return None;
        }

        let badge = SkillBadge::new(skill_id, skill_name, proficiency);
        let store = self.store.clone();
        let badges = self.badges_mut();
        badges.push(badge.clone());
        if let Err(e) = write_list(store.as_ref(), BADGES_KEY, badges) {
            warn!(skill_id, error = %e, "Failed to persist badges; keeping in memory");
        }
        info!(badge_id = %badge.id, skill_id, %proficiency, "Badge earned");

        let delivered =
            self.points
                .award_points(BADGE_POINTS, BADGE_REASON, BADGE_ACTION, &badge.id);
        if !delivered {
            debug!(badge_id = %badge.id, "Points award was not confirmed");
        }

        Some(badge)
    }
}

/// Reads a JSON list, treating a missing key, an unreadable store or corrupt
/// content as empty.
fn read_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    match store.read(key) {
        Ok(Some(content)) => match serde_json::from_str(&content) {
            Ok(list) => list,
            Err(e) => {
                warn!(key, error = %e, "Ignoring corrupt persisted list");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted list");
            Vec::new()
        }
    }
}

fn write_list<T: Serialize>(store: &dyn KeyValueStore, key: &str, list: &[T]) -> Result<(), AppError> {
    let content = serde_json::to_string(list)?;
    store.write(key, &content)
}
