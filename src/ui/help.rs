//! Help overlay listing the key map.

use crate::app::App;
use ratatui::{
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::render::centered_rect;

const BINDINGS: &[(&str, &str)] = &[
    ("j / ↓", "next story"),
    ("k / ↑", "previous story"),
    ("g / G", "first / last story"),
    ("Space", "play / pause"),
    ("← / →", "seek 5s"),
    ("l", "like"),
    ("s", "share"),
    ("r", "refresh stories"),
    ("Enter", "retry failed audio"),
    ("Tab / 1-4", "switch tab"),
    ("t", "toggle theme (Settings)"),
    ("o", "log out"),
    ("?", "toggle this help"),
    ("q", "quit"),
];

pub(super) fn render(f: &mut Frame, app: &App) {
    let height = BINDINGS.len() as u16 + 4;
    let area = centered_rect(f.area(), 44, height);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border_active)
        .title(" Keys ");

    let mut lines = vec![Line::from("")];
    for (key, action) in BINDINGS {
        lines.push(Line::styled(
            format!("  {key:<10} {action}"),
            app.theme.category_normal,
        ));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}
