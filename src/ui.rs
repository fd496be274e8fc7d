use crate::app::{App, PendingWork, ViewMode};
use crate::events::OVERLAY_SIZE_PERCENT;
use crate::help;
use crate::models::Question;
use crate::reports;
use rat_text::{HasScreenCursor, text_area::TextAreaState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const OVERLAY_MARGIN: u16 = 2;
/// Minimum overlay dimensions
const MIN_OVERLAY_WIDTH: u16 = 40;
const MIN_OVERLAY_HEIGHT: u16 = 10;
/// Width of the question list on the left of the assessment view
const QUESTION_LIST_WIDTH: u16 = 32;

/// Renders the user interface widgets.
pub fn render(app: &mut App, frame: &mut Frame) {
    // Update terminal dimensions
    app.terminal_width = frame.area().width;
    app.terminal_height = frame.area().height;

    match app.view_mode {
        ViewMode::Menu => {
            render_menu_view(app, frame);
            return;
        }
        ViewMode::Report => {
            render_report_view(app, frame);
            return;
        }
        ViewMode::Help => {
            render_help_view(app, frame);
            return;
        }
        ViewMode::Assessment => {}
    }

    // Main layout: Header, Content, Status
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    render_header(app, frame, main_layout[0]);

    if app.pending == Some(PendingWork::Generating) || app.session.questions().is_empty() {
        render_waiting(frame, main_layout[1], PendingWork::Generating.message());
    } else {
        let content_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(QUESTION_LIST_WIDTH), // Left: question list
                Constraint::Min(0),                      // Right: current question
            ])
            .split(main_layout[1]);

        render_question_list(app, frame, content_layout[0]);
        render_question_detail(app, frame, content_layout[1]);

        if app.pending == Some(PendingWork::Scoring) {
            render_waiting(
                frame,
                calculate_overlay_area(frame.area()),
                PendingWork::Scoring.message(),
            );
        }
    }

    // Render result overlay on top if visible
    if app.show_result_overlay {
        render_result_overlay(app, frame);
    }

    render_status_bar(app, frame, main_layout[2]);

    // Set cursor position if editing
    if app.is_editing
        && let Some((cx, cy)) = app.text_area_state.screen_cursor()
    {
        frame.set_cursor_position((cx, cy));
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = match app.session.skill() {
        Some(skill) if app.view_mode == ViewMode::Assessment => match app.session.score() {
            Some(score) => format!(
                " skillcheck: {} ({}) | score {}% ",
                skill.name, skill.proficiency, score
            ),
            None => format!(" skillcheck: {} ({}) ", skill.name, skill.proficiency),
        },
        _ => " skillcheck: skill assessments ".to_string(),
    };
    let title = Paragraph::new(title)
        .style(Style::new().bold())
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

fn render_waiting(frame: &mut Frame, area: Rect, message: &str) {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let paragraph = Paragraph::new(format!("\n{}", message))
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_question_list(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title("Questions (j/k)")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let label_width = area.width.saturating_sub(8) as usize;

    let lines: Vec<Line> = app
        .session
        .questions()
        .iter()
        .enumerate()
        .map(|(index, q)| {
            let marker = if q.is_answered() { "✓" } else { " " };
            let label = truncate_to_width(&q.text, label_width);
            let content = format!("{} {:>2}. {}", marker, index + 1, label);
            if index == app.selected_question {
                Line::from(Span::styled(content, Style::default().fg(Color::Cyan).bold()))
            } else {
                Line::from(content)
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_question_detail(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(question) = app.current_question().cloned() else {
        return;
    };

    if question.question_type.is_choice() {
        render_question_text(&question, frame, area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    render_question_text(&question, frame, layout[0]);
    render_answer_input(app, &question, frame, layout[1]);
}

fn render_question_text(question: &Question, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(format!("Q{} · {}", question.id, question.question_type.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let mut lines = vec![Line::from(question.text.clone()), Line::from("")];
    for (index, choice) in question.choices().iter().enumerate() {
        let selected = question.user_answer == *choice;
        let content = format!(" {} [{}] {}", if selected { ">" } else { " " }, index + 1, choice);
        if selected {
            lines.push(Line::from(Span::styled(
                content,
                Style::default().fg(Color::Cyan).bold(),
            )));
        } else {
            lines.push(Line::from(content));
        }
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    frame.render_widget(paragraph, area);
}

fn render_answer_input(app: &mut App, question: &Question, frame: &mut Frame, area: Rect) {
    let title = "Your answer (i: edit, Esc: keep, Ctrl+S: submit)";
    let border_style = if app.is_editing {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Blue)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    if !app.is_editing {
        let answer = if question.is_answered() {
            question.user_answer.as_str()
        } else {
            "(not answered yet)"
        };
        let paragraph = Paragraph::new(answer).wrap(Wrap { trim: false }).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    clamp_textarea_scroll(&mut app.text_area_state);

    use rat_text::text_area::{TextArea, TextWrap};

    let textarea = TextArea::new()
        .block(block)
        .text_wrap(TextWrap::Word(2)) // Safer default margin; prefer near-edge wrap
        .style(Style::default());

    frame.render_stateful_widget(textarea, area, &mut app.text_area_state);
}

/// rat-text skips drawing entirely when the offset passes the last line, so clamp it
fn clamp_textarea_scroll(state: &mut TextAreaState) {
    let max_v = state.len_lines().saturating_sub(1) as usize;
    if state.vscroll.offset > max_v {
        state.vscroll.offset = max_v;
    }
    state.hscroll.offset = state.hscroll.limited_offset(state.hscroll.offset);
}

fn render_result_overlay(app: &App, frame: &mut Frame) {
    let full_area = frame.area();
    let overlay_area = calculate_overlay_area(full_area);

    // Clear a ring around the overlay so underlying text does not touch its border
    for strip in margin_ring(overlay_area, OVERLAY_MARGIN) {
        frame.render_widget(Clear, strip);
    }

    frame.render_widget(Clear, overlay_area);
    let black_background = Paragraph::new("").style(Style::default().bg(Color::Black));
    frame.render_widget(black_background, overlay_area);

    let passed = app
        .last_outcome
        .as_ref()
        .is_some_and(|outcome| outcome.attempt.passed);
    let border_color = if passed { Color::Green } else { Color::Red };

    let block = Block::default()
        .title(" Result (e: close, Shift+↑/↓ or Shift+j/k: scroll, n: retake, m: menu) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(Color::Black));

    let inner_area = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let paragraph = Paragraph::new(app.result_text())
        .wrap(Wrap { trim: false })
        .scroll((app.result_overlay_scroll, 0))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(paragraph, inner_area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::TOP);
    let status_text = format!(" {} | r: report | h: help | q: quit ", app.status_message);
    let paragraph = Paragraph::new(status_text)
        .alignment(Alignment::Right)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_report_view(app: &mut App, frame: &mut Frame) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Report
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    let summaries = app.skill_summaries();
    let badges = app.session.ledger().load_badges();
    let total_points = app.points.total_points();

    render_header(app, frame, layout[0]);
    reports::render_report(
        frame,
        layout[1],
        &summaries,
        &badges,
        total_points,
        app.report_scroll,
    );
    render_status_bar(app, frame, layout[2]);
}

fn render_menu_view(app: &mut App, frame: &mut Frame) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Menu
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    render_header(app, frame, layout[0]);

    let menu_height = (app.catalog.len() as u16).saturating_mul(2).saturating_add(4);
    let menu_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Length(menu_height),
            Constraint::Min(0),
        ])
        .split(layout[1])[1];

    let menu_area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(menu_area)[1];

    let block = Block::default()
        .title("Choose a skill")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let badges = app.session.ledger().load_badges();
    let mut menu_text = String::from("\n");
    for (i, skill) in app.catalog.skills().iter().enumerate() {
        let held = badges.iter().any(|b| b.matches(&skill.id, skill.proficiency));
        let entry = format!(
            "{} · {}{}",
            skill.name,
            skill.proficiency,
            if held { " 🏅" } else { "" }
        );
        if i == app.selected_menu_item {
            menu_text.push_str(&format!("  > {} <\n\n", entry));
        } else {
            menu_text.push_str(&format!("    {}\n\n", entry));
        }
    }

    let paragraph = Paragraph::new(menu_text)
        .block(block)
        .alignment(Alignment::Center)
        .style(Style::default());

    frame.render_widget(paragraph, menu_area);
    render_status_bar(app, frame, layout[2]);
}

fn render_help_view(app: &App, frame: &mut Frame) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Help content
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    render_header(app, frame, layout[0]);

    let help_content = help::get_help_content();
    let help_text = if help_content.is_empty() {
        "Help file not found.\n\nCreate docs/HELP.md and rebuild.".to_string()
    } else {
        help_content.to_string()
    };

    let block = Block::default()
        .title("Help (↑/↓ or j/k: scroll, h: close)")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.help_scroll, 0))
        .style(Style::default());

    frame.render_widget(paragraph, layout[1]);
    render_status_bar(app, frame, layout[2]);
}

/// Four strips (top, bottom, left, right) of width `margin` surrounding `inner`.
fn margin_ring(inner: Rect, margin: u16) -> Vec<Rect> {
    if margin == 0 {
        return Vec::new();
    }
    let outer = Rect::new(
        inner.x.saturating_sub(margin),
        inner.y.saturating_sub(margin),
        inner.width.saturating_add(margin * 2),
        inner.height.saturating_add(margin * 2),
    );
    let side_height = outer.height.saturating_sub(margin * 2);
    vec![
        Rect::new(outer.x, outer.y, outer.width, margin),
        Rect::new(outer.x, outer.bottom().saturating_sub(margin), outer.width, margin),
        Rect::new(outer.x, outer.y + margin, margin, side_height),
        Rect::new(outer.right().saturating_sub(margin), outer.y + margin, margin, side_height),
    ]
}

fn calculate_overlay_area(full_area: Rect) -> Rect {
    let margin = OVERLAY_MARGIN;

    let max_overlay_width = full_area.width.saturating_sub(margin.saturating_mul(2));
    let max_overlay_height = full_area.height.saturating_sub(margin.saturating_mul(2));

    // Keep a margin ring around the overlay and center it
    let overlay_width = full_area
        .width
        .saturating_mul(OVERLAY_SIZE_PERCENT)
        .saturating_div(100)
        .max(MIN_OVERLAY_WIDTH)
        .min(max_overlay_width);
    let overlay_height = full_area
        .height
        .saturating_mul(OVERLAY_SIZE_PERCENT)
        .saturating_div(100)
        .max(MIN_OVERLAY_HEIGHT)
        .min(max_overlay_height);
    let x = full_area.x + full_area.width.saturating_sub(overlay_width) / 2;
    let y = full_area.y + full_area.height.saturating_sub(overlay_height) / 2;

    Rect {
        x,
        y,
        width: overlay_width,
        height: overlay_height,
    }
}

/// Cuts `text` to at most `max_width` terminal columns, on grapheme
/// boundaries, marking the cut with an ellipsis.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    let text = text.lines().next().unwrap_or_default();
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if width + w + 1 > max_width {
            break;
        }
        out.push_str(grapheme);
        width += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{AssessmentApi, Evaluation};
    use crate::error::AppError;
    use crate::ledger::Ledger;
    use crate::points::PointsLog;
    use crate::session::AssessmentSession;
    use crate::skills::{Skill, SkillCatalog};
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

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
            Err(AppError::MalformedResponse("offline".to_string()))
        }
    }

    fn app() -> App {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let points = Arc::new(PointsLog::new(store.clone()));
        let ledger = Ledger::new(store, points.clone());
        let session = AssessmentSession::new(Arc::new(OfflineApi), Box::new(ledger));
        App::new(session, SkillCatalog::default(), points)
    }

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_pending_work_is_drawn() {
        let mut app = app();
        app.view_mode = ViewMode::Assessment;

        app.begin_pending(PendingWork::Generating);
        // Once in the waiting panel, once in the status bar.
        assert_eq!(screen_text(&mut app).matches("Generating questions...").count(), 2);

        let skill = app.selected_skill().unwrap().clone();
        app.session.generate_questions(skill).await;
        app.finish_pending();
        let text = screen_text(&mut app);
        assert!(!text.contains("Scoring your answers..."));
        assert!(text.contains("Questions (j/k)"));

        app.begin_pending(PendingWork::Scoring);
        assert_eq!(screen_text(&mut app).matches("Scoring your answers...").count(), 2);
    }

    #[test]
    fn test_calculate_overlay_area_standard() {
        let full_area = Rect::new(0, 0, 100, 40);
        let overlay = calculate_overlay_area(full_area);

        // 75% of 100 is 75, 75% of 40 is 30
        assert_eq!(overlay.width, 75);
        assert_eq!(overlay.height, 30);
        assert_eq!(overlay.x, 12); // (100 - 75) / 2 = 12.5 -> 12
        assert_eq!(overlay.y, 5); // (40 - 30) / 2 = 5
    }

    #[test]
    fn test_calculate_overlay_area_min_size_constraint() {
        // 75% would be 30x7, below MIN_OVERLAY_WIDTH and MIN_OVERLAY_HEIGHT
        let full_area = Rect::new(0, 0, 40, 10);
        let overlay = calculate_overlay_area(full_area);

        // Capped by the space left inside the margin ring
        assert_eq!(overlay.width, 36);
        assert_eq!(overlay.height, 6);
    }

    #[test]
    fn test_margin_ring_surrounds_overlay() {
        let inner = Rect::new(10, 5, 20, 10);
        let ring = margin_ring(inner, 2);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], Rect::new(8, 3, 24, 2));
        assert_eq!(ring[1], Rect::new(8, 15, 24, 2));
        assert_eq!(ring[2], Rect::new(8, 5, 2, 10));
        assert_eq!(ring[3], Rect::new(30, 5, 2, 10));
        assert!(ring.iter().all(|r| !r.intersects(inner)));
        assert!(margin_ring(inner, 0).is_empty());
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_to_width("a longer question", 8), "a longe…");
        assert_eq!(truncate_to_width("first line\nsecond", 20), "first line");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn test_truncate_respects_wide_characters() {
        // Each CJK character is two columns wide.
        let truncated = truncate_to_width("日本語の質問です", 7);
        assert_eq!(truncated, "日本語…");
        assert!(truncated.width() <= 7);
    }
}
