//! Registration form widget.

use crate::app::{App, RegisterField};
use ratatui::{
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::login::push_field;
use super::render::centered_rect;

pub(super) fn render(f: &mut Frame, app: &App) {
    let form = &app.register_form;
    let area = centered_rect(f.area(), 44, 20);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border_active)
        .title(" hark · create account ");

    let mut lines = Vec::new();
    lines.push(Line::from(""));

    push_field(
        &mut lines,
        app,
        "Name",
        &form.name,
        form.focus == RegisterField::Name,
        form.invalid_name,
        "name is required",
        false,
    );
    push_field(
        &mut lines,
        app,
        "Phone number",
        &form.phone,
        form.focus == RegisterField::Phone,
        form.invalid_phone,
        "enter a 10-digit phone number",
        false,
    );
    push_field(
        &mut lines,
        app,
        "Password",
        &form.password,
        form.focus == RegisterField::Password,
        form.invalid_password,
        "at least 6 characters",
        true,
    );
    push_field(
        &mut lines,
        app,
        "Confirm password",
        &form.confirm,
        form.focus == RegisterField::Confirm,
        form.invalid_confirm,
        "passwords do not match",
        true,
    );

    lines.push(Line::from(""));
    if form.submitting {
        lines.push(Line::styled("  creating account...", app.theme.form_hint));
    } else {
        lines.push(Line::styled("  [ Enter ] Create account", app.theme.form_submit));
    }
    lines.push(Line::styled(
        "  Tab next field · Esc back to sign in",
        app.theme.form_hint,
    ));

    f.render_widget(Paragraph::new(lines).block(block), area);
}
