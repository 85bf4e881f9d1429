//! Login form widget.

use crate::app::{App, LoginField};
use ratatui::{
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::render::centered_rect;

pub(super) fn render(f: &mut Frame, app: &App) {
    let form = &app.login_form;
    let area = centered_rect(f.area(), 44, 14);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border_active)
        .title(" hark · sign in ");

    let mut lines = Vec::new();
    lines.push(Line::from(""));

    push_field(
        &mut lines,
        app,
        "Phone number",
        &form.phone,
        form.focus() == LoginField::Phone,
        form.invalid_phone,
        "enter a 10-digit phone number",
        false,
    );
    push_field(
        &mut lines,
        app,
        "Password",
        &form.password,
        form.focus() == LoginField::Password,
        form.invalid_password,
        "password is required",
        !form.show_password,
    );

    lines.push(Line::from(""));
    if form.submitting {
        lines.push(Line::styled("  signing in...", app.theme.form_hint));
    } else {
        lines.push(Line::styled("  [ Enter ] Sign in", app.theme.form_submit));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "  Tab next field · Ctrl+V show password",
        app.theme.form_hint,
    ));
    lines.push(Line::styled(
        "  Ctrl+R create account",
        app.theme.form_hint,
    ));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Push a label, value line, and (when invalid) an inline error.
#[allow(clippy::too_many_arguments)]
pub(super) fn push_field<'a>(
    lines: &mut Vec<Line<'a>>,
    app: &App,
    label: &'a str,
    value: &str,
    focused: bool,
    invalid: bool,
    error: &'a str,
    mask: bool,
) {
    lines.push(Line::styled(format!("  {label}"), app.theme.form_label));

    let shown = if mask {
        "•".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let cursor = if focused { "▏" } else { "" };
    let style = if invalid {
        app.theme.form_invalid
    } else if focused {
        app.theme.form_input_focused
    } else {
        app.theme.form_input
    };
    lines.push(Line::styled(format!("  {shown}{cursor}"), style));

    if invalid {
        lines.push(Line::styled(format!("  {error}"), app.theme.form_invalid));
    } else {
        lines.push(Line::from(""));
    }
}
