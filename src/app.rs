use crate::models::Question;
use crate::points::PointsLog;
use crate::session::{AssessmentSession, NotificationLevel, SessionState, SubmissionOutcome};
use crate::skills::{Skill, SkillCatalog};
use crate::stats::SkillSummary;
use rat_text::text_area::{TextAreaState, TextWrap};
use std::sync::Arc;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ViewMode {
    Menu,
    Assessment,
    Report,
    Help,
}

/// Remote work the main loop is awaiting; drawn before the call starts.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum PendingWork {
    Generating,
    Scoring,
}

impl PendingWork {
    pub fn message(&self) -> &'static str {
        match self {
            PendingWork::Generating => "Generating questions...",
            PendingWork::Scoring => "Scoring your answers...",
        }
    }
}

const MENU_STATUS: &str = "Select a skill and press Enter to start";
pub const ASSESSMENT_STATUS: &str = "j/k: question, 1-9: choose, i: write answer, Ctrl+S: submit";

/// Application state
pub struct App {
    pub session: AssessmentSession,
    pub catalog: SkillCatalog,
    pub points: Arc<PointsLog>,
    pub view_mode: ViewMode,
    /// View to go back to when Report or Help is closed.
    previous_view: ViewMode,
    pub pending: Option<PendingWork>,
    pub selected_menu_item: usize,
    pub selected_question: usize,
    pub is_editing: bool,
    pub text_area_state: TextAreaState,
    pub show_result_overlay: bool,
    pub result_overlay_scroll: u16,
    pub last_outcome: Option<SubmissionOutcome>,
    pub status_message: String,
    pub should_quit: bool,
    pub help_scroll: u16,
    pub report_scroll: u16,
    pub terminal_width: u16,
    pub terminal_height: u16,
}

impl App {
    pub fn new(session: AssessmentSession, catalog: SkillCatalog, points: Arc<PointsLog>) -> Self {
        Self {
            session,
            catalog,
            points,
            view_mode: ViewMode::Menu,
            previous_view: ViewMode::Menu,
            pending: None,
            selected_menu_item: 0,
            selected_question: 0,
            is_editing: false,
            text_area_state: Self::new_text_area_state(),
            show_result_overlay: false,
            result_overlay_scroll: 0,
            last_outcome: None,
            status_message: MENU_STATUS.to_string(),
            should_quit: false,
            help_scroll: 0,
            report_scroll: 0,
            terminal_width: 100, // Default, will be updated on first render
            terminal_height: 30, // Default, will be updated on first render
        }
    }

    pub fn new_text_area_state() -> TextAreaState {
        let mut state = TextAreaState::default();
        state.set_text_wrap(TextWrap::Word(2)); // prefer safe word-wrap
        state
    }

    pub fn selected_skill(&self) -> Option<&Skill> {
        self.catalog.get(self.selected_menu_item)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.questions().get(self.selected_question)
    }

    pub fn begin_pending(&mut self, work: PendingWork) {
        self.pending = Some(work);
        self.status_message = work.message().to_string();
    }

    pub fn finish_pending(&mut self) {
        self.pending = None;
    }

    pub fn can_answer(&self) -> bool {
        self.session.state() == SessionState::Ready
    }

    pub fn select_next_question(&mut self) {
        let count = self.session.questions().len();
        if self.selected_question + 1 < count {
            self.selected_question += 1;
        }
    }

    pub fn select_previous_question(&mut self) {
        self.selected_question = self.selected_question.saturating_sub(1);
    }

    /// Picks option `index` (zero-based) for the current choice question.
    pub fn choose_option(&mut self, index: usize) -> bool {
        if !self.can_answer() {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        if !question.question_type.is_choice() {
            return false;
        }
        let id = question.id;
        match question.choices().get(index) {
            Some(choice) => {
                let choice = choice.clone();
                self.session.set_answer(id, &choice);
                true
            }
            None => false,
        }
    }

    /// Opens the text area for the current free-text question, pre-filled
    /// with any earlier answer.
    pub fn begin_editing(&mut self) -> bool {
        if !self.can_answer() {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        if question.question_type.is_choice() {
            return false;
        }
        let answer = question.user_answer.clone();
        self.text_area_state = Self::new_text_area_state();
        self.text_area_state.set_text(&answer);
        self.text_area_state.focus.set(true); // Enable focus for input!
        self.text_area_state.scroll_cursor_to_visible(); // Keep cursor viewport sane
        self.is_editing = true;
        self.status_message = "Editing answer. Esc: keep, Ctrl+S: keep and submit".to_string();
        true
    }

    /// Closes the text area and stores its content as the answer.
    pub fn commit_editing(&mut self) {
        if !self.is_editing {
            return;
        }
        self.is_editing = false;
        self.text_area_state.focus.set(false); // Disable focus
        let value = self.text_area_state.value().to_string();
        if let Some(id) = self.current_question().map(|q| q.id) {
            self.session.set_answer(id, value.trim_end());
        }
        self.status_message = ASSESSMENT_STATUS.to_string();
    }

    /// Moves session notifications into the status bar.
    pub fn absorb_notifications(&mut self) {
        let notifications = self.session.take_notifications();
        if notifications.is_empty() {
            return;
        }
        self.status_message = notifications
            .iter()
            .map(|n| match n.level {
                NotificationLevel::Error => format!("⚠ {}", n.message),
                NotificationLevel::Success => format!("🏅 {}", n.message),
                NotificationLevel::Info => n.message.clone(),
            })
            .collect::<Vec<_>>()
            .join(" | ");
    }

    pub fn prepare_for_questions(&mut self) {
        self.selected_question = 0;
        self.is_editing = false;
        self.text_area_state = Self::new_text_area_state();
        self.show_result_overlay = false;
        self.result_overlay_scroll = 0;
        self.last_outcome = None;
    }

    pub fn back_to_menu(&mut self) {
        self.is_editing = false;
        self.show_result_overlay = false;
        self.view_mode = ViewMode::Menu;
        self.status_message = MENU_STATUS.to_string();
    }

    pub fn skill_summaries(&mut self) -> Vec<SkillSummary> {
        let badges = self.session.ledger().load_badges();
        let skills: Vec<Skill> = self.catalog.skills().to_vec();
        skills
            .iter()
            .map(|skill| {
                let attempts = self.session.ledger().load_attempts(&skill.id);
                SkillSummary::from_attempts(skill, &attempts, &badges)
            })
            .collect()
    }

    /// Text for the result overlay: score, badge and per-question review.
    pub fn result_text(&self) -> String {
        let Some(outcome) = &self.last_outcome else {
            return String::new();
        };
        let attempt = &outcome.attempt;
        let mut text = format!(
            "{}  {}%  ({})\n",
            if attempt.passed { "PASSED" } else { "NOT PASSED" },
            attempt.score,
            attempt.skill_name
        );
        if !outcome.remote_score {
            text.push_str("Score estimated locally: the scoring service was unavailable.\n");
        }
        if let Some(badge) = &outcome.badge {
            text.push_str(&format!(
                "{} New badge: {}\n",
                badge.get_icon(),
                badge.get_display_text()
            ));
        }
        text.push('\n');

        for (index, q) in attempt.questions.iter().enumerate() {
            text.push_str(&format!("Q{}. {}\n", index + 1, q.text));
            text.push_str(&format!("  Your answer:    {}\n", display_answer(&q.user_answer)));
            text.push_str(&format!("  Correct answer: {}\n", display_answer(&q.correct_answer)));
            if !q.explanation.is_empty() {
                text.push_str(&format!("  {}\n", q.explanation));
            }
            text.push('\n');
        }
        text
    }

    /// Opens Report or Help, remembering where the user came from.
    pub fn open_aux_view(&mut self, mode: ViewMode) {
        if !matches!(self.view_mode, ViewMode::Report | ViewMode::Help) {
            self.previous_view = self.view_mode;
        }
        self.view_mode = mode;
        self.status_message = match mode {
            ViewMode::Report => {
                self.report_scroll = 0;
                "Report. Press 'r' to close.".to_string()
            }
            ViewMode::Help => {
                self.help_scroll = 0;
                "Help. Press 'h' to close.".to_string()
            }
            _ => self.status_message.clone(),
        };
    }

    pub fn return_from_aux_view(&mut self) {
        self.view_mode = self.previous_view;
        self.status_message = match self.view_mode {
            ViewMode::Assessment => ASSESSMENT_STATUS.to_string(),
            _ => MENU_STATUS.to_string(),
        };
    }
}

fn display_answer(answer: &str) -> String {
    if answer.trim().is_empty() {
        "(none)".to_string()
    } else {
        answer.lines().collect::<Vec<_>>().join(" / ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{AssessmentApi, Evaluation};
    use crate::error::AppError;
    use crate::ledger::Ledger;
    use crate::skills::Proficiency;
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;

    struct OfflineApi;

    #[async_trait]
    impl AssessmentApi for OfflineApi {
        async fn generate_questions(&self, _skill: &Skill) -> Result<Vec<Question>, AppError> {
            Err(AppError::MalformedResponse("offline".to_string()))
        }

        async fn evaluate_assessment(
            &self,
            _skill: &Skill,
            _questions: &[Question],
        ) -> Result<Evaluation, AppError> {
            Ok(Evaluation {
                score: 100,
                feedback: Vec::new(),
            })
        }
    }

    fn app() -> App {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let points = Arc::new(PointsLog::new(store.clone()));
        let ledger = Ledger::new(store, points.clone());
        let session = AssessmentSession::new(Arc::new(OfflineApi), Box::new(ledger));
        App::new(session, SkillCatalog::default(), points)
    }

    #[test]
    fn test_initial_state() {
        let app = app();
        assert_eq!(app.view_mode, ViewMode::Menu);
        assert!(app.pending.is_none());
        assert!(!app.can_answer());
        assert_eq!(app.selected_skill().unwrap().id, "rust-ownership");
    }

    #[tokio::test]
    async fn test_choose_option_only_for_choice_questions() {
        let mut app = app();
        let skill = app.selected_skill().unwrap().clone();
        app.session.generate_questions(skill).await;
        app.prepare_for_questions();
        app.absorb_notifications();
        assert!(app.status_message.starts_with('⚠'));

        // Fallback question 1 is multiple choice.
        assert!(app.choose_option(0));
        let first = app.current_question().unwrap();
        assert_eq!(first.user_answer, first.choices()[0]);
        assert!(!app.choose_option(9));

        app.select_next_question();
        assert!(app.choose_option(1));
        assert_eq!(app.current_question().unwrap().user_answer, "False");

        app.select_next_question();
        assert!(!app.choose_option(0));
        app.select_next_question();
        app.select_next_question();
        assert_eq!(app.selected_question, 3);
        app.select_previous_question();
        assert_eq!(app.selected_question, 2);
    }

    #[tokio::test]
    async fn test_result_text_and_summaries() {
        let mut app = app();
        let skill = app.selected_skill().unwrap().clone();
        app.session.generate_questions(skill).await;
        app.session.set_answer(1, "something");
        let outcome = app.session.submit().await.unwrap();
        app.last_outcome = Some(outcome);
        app.absorb_notifications();

        let text = app.result_text();
        assert!(text.starts_with("PASSED  100%"));
        assert!(text.contains("New badge: Rust Ownership (Knowledge)"));
        assert!(text.contains("Your answer:    something"));
        assert!(text.contains("Your answer:    (none)"));
        assert!(app.status_message.contains("Badge earned"));

        let summaries = app.skill_summaries();
        let rust = summaries.iter().find(|s| s.skill_id == "rust-ownership").unwrap();
        assert_eq!(rust.attempts, 1);
        assert!(rust.has_badge);
        assert_eq!(app.points.total_points(), 50);
        assert_eq!(
            app.catalog.find("rust-ownership").unwrap().proficiency,
            Proficiency::Knowledge
        );
    }

    #[test]
    fn test_return_from_aux_view_without_assessment() {
        let mut app = app();
        app.open_aux_view(ViewMode::Report);
        assert_eq!(app.view_mode, ViewMode::Report);
        app.return_from_aux_view();
        assert_eq!(app.view_mode, ViewMode::Menu);
    }

    #[tokio::test]
    async fn test_aux_view_returns_to_where_it_was_opened() {
        let mut app = app();
        let skill = app.selected_skill().unwrap().clone();
        app.session.generate_questions(skill).await;
        app.view_mode = ViewMode::Assessment;

        app.open_aux_view(ViewMode::Help);
        app.return_from_aux_view();
        assert_eq!(app.view_mode, ViewMode::Assessment);
        assert_eq!(app.status_message, ASSESSMENT_STATUS);

        // Leaving the assessment keeps the session Ready, but the menu is
        // where the report was opened from.
        app.back_to_menu();
        assert!(app.can_answer());
        app.open_aux_view(ViewMode::Report);
        app.open_aux_view(ViewMode::Help);
        app.return_from_aux_view();
        assert_eq!(app.view_mode, ViewMode::Menu);
        assert_eq!(app.status_message, MENU_STATUS);
    }

    #[test]
    fn test_pending_work_sets_status() {
        let mut app = app();
        app.begin_pending(PendingWork::Scoring);
        assert_eq!(app.pending, Some(PendingWork::Scoring));
        assert_eq!(app.status_message, "Scoring your answers...");
        app.finish_pending();
        assert!(app.pending.is_none());
    }
}
