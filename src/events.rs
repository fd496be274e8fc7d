use crate::app::{App, ViewMode};
use crate::error::AppError;
use crate::session::SessionState;
use rat_text::event::HandleEvent;
use ratatui::{
    crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    widgets::{Paragraph, Wrap},
};
use std::time::Duration;

/// Event polling interval in milliseconds
const EVENT_POLL_INTERVAL_MS: u64 = 100;

/// Overlay size as percentage of screen
pub const OVERLAY_SIZE_PERCENT: u16 = 75;

#[derive(Debug, PartialEq, Eq)]
pub enum AppAction {
    StartAssessment(String),
    Submit,
    Retake,
}

pub async fn handle_events(app: &mut App) -> Result<Option<AppAction>, AppError> {
    if event::poll(Duration::from_millis(EVENT_POLL_INTERVAL_MS))? {
        let ev = event::read()?;
        if let Event::Key(key) = ev {
            if key.kind != KeyEventKind::Press {
                return Ok(None);
            }

            match app.view_mode {
                ViewMode::Menu => return Ok(handle_menu_events(app, key)),
                ViewMode::Report => {
                    handle_report_events(app, key);
                    return Ok(None);
                }
                ViewMode::Help => {
                    handle_help_events(app, key);
                    return Ok(None);
                }
                ViewMode::Assessment => {
                    if app.is_editing {
                        return Ok(handle_editing_events(app, ev, key));
                    } else {
                        return Ok(handle_assessment_events(app, key));
                    }
                }
            }
        }
    }
    Ok(None)
}

fn handle_menu_events(app: &mut App, key: event::KeyEvent) -> Option<AppAction> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.selected_menu_item = app.selected_menu_item.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if app.selected_menu_item + 1 < app.catalog.len() {
                app.selected_menu_item += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(skill) = app.selected_skill() {
                return Some(AppAction::StartAssessment(skill.id.clone()));
            }
        }
        KeyCode::Char('r') => app.open_aux_view(ViewMode::Report),
        KeyCode::Char('h') => app.open_aux_view(ViewMode::Help),
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        _ => {}
    }
    None
}

fn handle_editing_events(app: &mut App, ev: Event, key: event::KeyEvent) -> Option<AppAction> {
    // Ctrl+S keeps the answer and submits (Shift+Enter doesn't work in most terminals)
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.commit_editing();
        return request_submit(app);
    } else if key.code == KeyCode::Esc {
        app.commit_editing();
    } else {
        // Pass all other input to rat-text TextArea
        let _ = app.text_area_state.handle(&ev, rat_text::event::Regular);
    }
    None
}

fn handle_report_events(app: &mut App, key: event::KeyEvent) {
    match key.code {
        KeyCode::Char('r') => {
            app.return_from_aux_view();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.report_scroll = app.report_scroll.saturating_add(1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.report_scroll = app.report_scroll.saturating_sub(1);
        }
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        _ => {}
    }
}

fn handle_help_events(app: &mut App, key: event::KeyEvent) {
    match key.code {
        KeyCode::Char('h') => {
            app.return_from_aux_view();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        _ => {}
    }
}

fn handle_assessment_events(app: &mut App, key: event::KeyEvent) -> Option<AppAction> {
    if key.code == KeyCode::Char('q') {
        app.should_quit = true;
        return None;
    }
    match key.code {
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return request_submit(app);
        }
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if !app.choose_option(index) && app.can_answer() {
                app.status_message = "No such option for this question.".to_string();
            }
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            if !app.show_result_overlay {
                app.begin_editing();
            }
        }
        KeyCode::Char('e') => {
            // Toggle result overlay (only if a result exists)
            if app.last_outcome.is_some() {
                app.show_result_overlay = !app.show_result_overlay;
                if app.show_result_overlay {
                    app.result_overlay_scroll = 0;
                }
            }
        }
        KeyCode::Char('n') => {
            if app.session.state() == SessionState::Scored {
                app.show_result_overlay = false;
                return Some(AppAction::Retake);
            }
        }
        KeyCode::Char('m') => {
            app.back_to_menu();
        }
        KeyCode::Char('r') => app.open_aux_view(ViewMode::Report),
        KeyCode::Char('h') => app.open_aux_view(ViewMode::Help),
        KeyCode::Down | KeyCode::Char('j') => {
            if app.show_result_overlay && key.modifiers.contains(KeyModifiers::SHIFT) {
                // Scroll result overlay with bounds checking
                let visible_height =
                    (app.terminal_height * OVERLAY_SIZE_PERCENT / 100).saturating_sub(4);
                let visible_width =
                    (app.terminal_width * OVERLAY_SIZE_PERCENT / 100).saturating_sub(2);
                let max_scroll =
                    calculate_max_scroll(&app.result_text(), visible_height, visible_width);
                app.result_overlay_scroll = app
                    .result_overlay_scroll
                    .saturating_add(1)
                    .min(max_scroll);
            } else if !app.show_result_overlay {
                app.select_next_question();
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if app.show_result_overlay && key.modifiers.contains(KeyModifiers::SHIFT) {
                app.result_overlay_scroll = app.result_overlay_scroll.saturating_sub(1);
            } else if !app.show_result_overlay {
                app.select_previous_question();
            }
        }
        _ => {}
    }
    None
}

/// Submission is only offered once every question has an answer.
fn request_submit(app: &mut App) -> Option<AppAction> {
    if !app.can_answer() {
        return None;
    }
    match app.session.unanswered_count() {
        0 => Some(AppAction::Submit),
        n => {
            app.status_message = format!(
                "{} question{} still unanswered.",
                n,
                if n == 1 { "" } else { "s" }
            );
            None
        }
    }
}

/// Calculate the maximum scroll offset for given text content
fn calculate_max_scroll(text: &str, visible_height: u16, visible_width: u16) -> u16 {
    if visible_width == 0 {
        return 0;
    }
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
    let total_lines = paragraph.line_count(visible_width) as u16;
    total_lines.saturating_sub(visible_height.saturating_sub(2)) // -2 for borders
}
