//! Status bar widget.

use crate::app::{App, Screen, Tab};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Cow avoids allocations for the static hint strings.
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.fetch_in_flight {
        Cow::Borrowed("Loading...")
    } else {
        match app.screen {
            Screen::Categories => Cow::Borrowed("[Space]toggle [Enter]continue [q]uit"),
            Screen::Home => match app.tab {
                Tab::Feed => Cow::Borrowed(
                    "[j/k]scroll [Space]play/pause [←/→]seek [l]ike [s]hare [r]efresh [?]help [q]uit",
                ),
                Tab::Categories => Cow::Borrowed("[Space]toggle [Enter]feed [Tab]switch [q]uit"),
                Tab::Saved | Tab::Settings => Cow::Borrowed("[Tab]switch [?]help [q]uit"),
            },
            _ => Cow::Borrowed(""),
        }
    };

    f.render_widget(Paragraph::new(text).style(app.theme.status_bar), area);
}
