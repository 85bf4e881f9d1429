//! Feed card stack and playback bar.
//!
//! Renders the vertically-paged feed: a sliver of the previous and next
//! cards around the active one, with the playback gauge, repeat pass,
//! and engagement counters inside the active card.

use crate::app::App;
use crate::gateway::Article;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    if app.sequencer.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.card_border)
            .title(" Feed ");
        let text = if app.fetch_in_flight {
            "loading stories..."
        } else if app.selection.is_empty() {
            "no categories selected (pick some on the Categories tab)"
        } else {
            "no stories in the selected categories"
        };
        let paragraph = Paragraph::new(Line::styled(text, app.theme.form_hint))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(area);

    let active = app.sequencer.active_index();
    let items = app.sequencer.items();

    render_neighbor(f, app, chunks[0], active.checked_sub(1).and_then(|i| items.get(i)));
    render_active_card(f, app, chunks[1]);
    render_neighbor(f, app, chunks[2], items.get(active + 1));
}

/// Sliver of the previous or next card.
fn render_neighbor(f: &mut Frame, app: &App, area: Rect, article: Option<&Article>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border);

    let line = match article {
        Some(article) => Line::styled(
            truncate(&article.title, area.width.saturating_sub(4) as usize),
            app.theme.card_title,
        ),
        None => Line::from(""),
    };
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn render_active_card(f: &mut Frame, app: &App, area: Rect) {
    let Some(article) = app.sequencer.active_item() else {
        return;
    };

    let position = format!(
        " {}/{} ",
        app.sequencer.active_index() + 1,
        app.sequencer.len()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border_active)
        .title(position);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // category
            Constraint::Min(1),    // title
            Constraint::Length(1), // gauge
            Constraint::Length(1), // time / pass / state
            Constraint::Length(1), // engagement
        ])
        .split(inner);

    let category = category_name(app, &article.category_id);
    f.render_widget(
        Paragraph::new(Line::styled(category, app.theme.card_category)),
        rows[0],
    );

    f.render_widget(
        Paragraph::new(Line::styled(
            article.title.as_str(),
            app.theme.card_title_active,
        ))
        .wrap(ratatui::widgets::Wrap { trim: true }),
        rows[1],
    );

    render_gauge(f, app, rows[2]);
    render_transport_line(f, app, rows[3]);

    let engagement = app.active_engagement();
    f.render_widget(
        Paragraph::new(Line::styled(
            format!("♥ {}   ↗ {}", engagement.likes, engagement.shares),
            app.theme.player_counter,
        )),
        rows[4],
    );
}

fn render_gauge(f: &mut Frame, app: &App, area: Rect) {
    let elapsed = app.controller.elapsed();
    let duration = app.controller.duration().unwrap_or(Duration::ZERO);
    let ratio = if duration.is_zero() {
        0.0
    } else {
        (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
    };

    let gauge = Gauge::default()
        .gauge_style(app.theme.player_gauge)
        .style(app.theme.player_gauge_track)
        .ratio(ratio)
        .label("");
    f.render_widget(gauge, area);
}

fn render_transport_line(f: &mut Frame, app: &App, area: Rect) {
    let elapsed = app.controller.elapsed();
    let duration = app.controller.duration();

    let state = if app.controller.is_playing() {
        "▶"
    } else if app.pending_autoplay.is_some() {
        "…"
    } else if app.controller.is_loaded() {
        "⏸"
    } else {
        "✖ (Enter to retry)"
    };

    let time = match duration {
        Some(d) => format!("{} / {}", format_time(elapsed), format_time(d)),
        None => format_time(elapsed),
    };
    let pass = format!(
        "pass {}/{}",
        app.sequencer.repeat_count() + 1,
        app.sequencer.replay_limit()
    );

    let style = if app.controller.is_playing() {
        app.theme.player_time
    } else {
        app.theme.player_paused
    };
    f.render_widget(
        Paragraph::new(Line::styled(format!("{state}  {time}   {pass}"), style)),
        area,
    );
}

fn category_name(app: &App, category_id: &str) -> String {
    app.categories
        .iter()
        .find(|c| c.id == category_id)
        .map(|c| c.name.to_uppercase())
        .unwrap_or_default()
}

/// mm:ss, spilling into hours only when needed.
pub(super) fn format_time(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Truncate to a display width, appending an ellipsis when cut.
fn truncate(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_renders_minutes_and_seconds() {
        assert_eq!(format_time(Duration::from_secs(0)), "0:00");
        assert_eq!(format_time(Duration::from_secs(65)), "1:05");
        assert_eq!(format_time(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("short", 20), "short");
        let cut = truncate("a very long headline indeed", 10);
        assert!(cut.ends_with('…'));
    }
}
