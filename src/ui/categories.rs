//! Category picker widget.
//!
//! Used both as the first-run full-screen picker and as the Categories
//! tab on the Home screen. Toggles on the Home tab refilter the feed
//! immediately.

use crate::app::App;
use ratatui::{
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub(super) fn render(f: &mut Frame, app: &App, area: Rect, first_run: bool) {
    let title = if first_run {
        " Pick your categories "
    } else {
        " Categories "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.card_border_active)
        .title(title);

    if app.categories.is_empty() {
        let text = if app.fetch_in_flight {
            "loading categories..."
        } else {
            "no categories available"
        };
        let paragraph = Paragraph::new(Line::styled(text, app.theme.form_hint)).block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .categories
        .iter()
        .map(|category| {
            let checked = app.selection.contains(&category.id);
            let marker = if checked { "[x]" } else { "[ ]" };
            let style = if checked {
                app.theme.category_selected
            } else {
                app.theme.category_normal
            };
            ListItem::new(Line::styled(
                format!(" {marker} {}", category.name),
                style,
            ))
        })
        .collect();

    let hint = if first_run {
        " Space toggle · Enter continue "
    } else {
        " Space toggle · Enter back to feed "
    };

    let list = List::new(items)
        .block(block.title_bottom(Line::styled(hint, app.theme.form_hint)))
        .highlight_style(app.theme.category_cursor);

    let mut state = ListState::default();
    state.select(Some(app.category_cursor));
    f.render_stateful_widget(list, area, &mut state);
}
