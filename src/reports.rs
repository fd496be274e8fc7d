use crate::models::{PASS_RATE, SkillBadge};
use crate::stats::{SkillSummary, badges_newest_first};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

const BAR_WIDTH: usize = 20;

pub fn render_report(
    frame: &mut Frame,
    area: Rect,
    summaries: &[SkillSummary],
    badges: &[SkillBadge],
    total_points: u32,
    scroll: u16,
) {
    let block = Block::default()
        .title("Report (↑/↓ or j/k: scroll, r: close)")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = create_report_text(summaries, badges, total_points);
    let paragraph = Paragraph::new(text).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

pub fn create_report_text(
    summaries: &[SkillSummary],
    badges: &[SkillBadge],
    total_points: u32,
) -> Text<'static> {
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled("Points: ", Style::default().bold()),
        Span::styled(total_points.to_string(), Style::default().fg(Color::Yellow)),
    ]));
    lines.push(Line::from(""));

    lines.push(Line::from(vec![Span::styled(
        "Best score per skill",
        Style::default().bold(),
    )]));
    lines.push(Line::from(""));

    let name_width = summaries
        .iter()
        .map(|s| s.skill_name.chars().count())
        .max()
        .unwrap_or(0);

    for summary in summaries {
        lines.push(create_skill_line(summary, name_width));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Legend: "),
        Span::styled("█", Style::default().fg(Color::Green)),
        Span::raw(format!(" ≥{}%  ", PASS_RATE)),
        Span::styled("█", Style::default().fg(Color::Yellow)),
        Span::raw(format!(" <{}%  ", PASS_RATE)),
        Span::styled("·", Style::default().fg(Color::DarkGray)),
        Span::raw(" not attempted"),
    ]));

    lines.push(Line::from(""));
    lines.push(Line::from(vec![Span::styled(
        format!("Badges ({})", badges.len()),
        Style::default().bold(),
    )]));
    if badges.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No badges yet. Pass an assessment to earn one.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for badge in badges_newest_first(badges) {
        lines.push(Line::from(vec![
            Span::raw(format!("  {} ", badge.get_icon())),
            Span::styled(badge.get_display_text(), Style::default().fg(Color::Green)),
            Span::raw(format!("  {}", badge.date_earned.format("%Y-%m-%d"))),
        ]));
    }

    Text::from(lines)
}

fn create_skill_line(summary: &SkillSummary, name_width: usize) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(
        "{:<width$}  ",
        summary.skill_name,
        width = name_width
    ))];

    match summary.best_score {
        Some(best) => {
            let filled = best as usize * BAR_WIDTH / 100;
            let color = if best >= PASS_RATE {
                Color::Green
            } else {
                Color::Yellow
            };
            spans.push(Span::styled("█".repeat(filled), Style::default().fg(color)));
            spans.push(Span::raw(" ".repeat(BAR_WIDTH - filled)));
            spans.push(Span::raw(format!(" {:>3}%", best)));
            spans.push(Span::raw(format!(
                "  {} attempt{}, {} passed",
                summary.attempts,
                if summary.attempts == 1 { "" } else { "s" },
                summary.passed
            )));
            if let Some(rate) = summary.pass_rate() {
                spans.push(Span::raw(format!(" ({:.0}%)", rate)));
            }
            if let Some(date) = summary.latest_date {
                spans.push(Span::styled(
                    format!("  last {}", date.format("%Y-%m-%d")),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        None => {
            spans.push(Span::styled(
                "·".repeat(BAR_WIDTH),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    if summary.has_badge {
        spans.push(Span::raw("  🏅"));
    }

    Line::from(spans)
}
