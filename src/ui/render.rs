//! Screen rendering dispatch.

use crate::app::{App, Screen, Tab};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

use super::{categories, help, login, player, register, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 12;

/// Frames of the loading spinner animation.
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    match app.screen {
        Screen::Loading => render_loading(f, app),
        Screen::Login => login::render(f, app),
        Screen::Register => register::render(f, app),
        Screen::Categories => render_picker_screen(f, app),
        Screen::Home => render_home(f, app),
    }

    if app.show_help {
        help::render(f, app);
    }

    if app.alert.is_some() {
        render_alert_overlay(f, app);
    }
}

fn render_loading(f: &mut Frame, app: &App) {
    let area = f.area();
    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];
    let lines = vec![
        Line::from(""),
        Line::styled(format!("{spinner} hark"), app.theme.spinner),
        Line::from(""),
        Line::styled("checking session...", app.theme.form_hint),
    ];
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    f.render_widget(paragraph, centered_rect(area, 30, 6));
}

/// First-run category picker with its own status line.
fn render_picker_screen(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    categories::render(f, app, chunks[0], true);
    status::render(f, app, chunks[1]);
}

fn render_home(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_tab_bar(f, app, chunks[0]);

    match app.tab {
        Tab::Feed => player::render(f, app, chunks[1]),
        Tab::Categories => categories::render(f, app, chunks[1], false),
        Tab::Saved => render_placeholder(
            f,
            app,
            chunks[1],
            "Saved",
            "Saved stories will show up here.",
        ),
        Tab::Settings => render_settings(f, app, chunks[1]),
    }

    status::render(f, app, chunks[2]);
}

fn render_tab_bar(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let selected = Tab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_normal)
        .highlight_style(app.theme.tab_active)
        .divider("|");
    f.render_widget(tabs, area);
}

fn render_placeholder(f: &mut Frame, app: &App, area: Rect, title: &str, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border)
        .title(title);
    let paragraph = Paragraph::new(Line::styled(text, app.theme.form_hint))
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn render_settings(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border)
        .title("Settings");

    let username = app
        .session
        .as_ref()
        .map(|s| s.username().to_string())
        .unwrap_or_default();

    let lines = vec![
        Line::from(""),
        Line::styled(format!("  Signed in as {username}"), app.theme.form_label),
        Line::styled(
            format!("  Server: {}", app.gateway.base_url()),
            app.theme.form_hint,
        ),
        Line::from(""),
        Line::styled(
            format!("  t   Toggle theme (current: {})", app.theme_variant.name()),
            app.theme.category_normal,
        ),
        Line::styled("  o   Log out", app.theme.category_normal),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_alert_overlay(f: &mut Frame, app: &App) {
    let Some(text) = &app.alert else { return };

    let area = centered_rect(f.area(), 50, 8);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.alert_border)
        .title("Error");

    let lines = vec![
        Line::from(""),
        Line::styled(text.as_str(), app.theme.alert_text),
        Line::from(""),
        Line::styled("press Enter to dismiss", app.theme.form_hint),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, area);
}

/// Center a `width` x `height` rect inside `area`, clamped to fit.
pub(super) fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
