//! Theme system for the TUI.
//!
//! Semantic color roles mapped to ratatui `Style` values. `ThemeVariant`
//! selects between Dark and Light palettes; the variant name comes from
//! config.

use ratatui::style::{Color, Modifier, Style};

/// Brand accent shared by both palettes.
const ACCENT: Color = Color::Rgb(231, 41, 103);

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Build the `ColorPalette` for this variant.
    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette — semantic roles to Style
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Forms (login / register) --
    pub form_label: Style,
    pub form_input: Style,
    pub form_input_focused: Style,
    pub form_invalid: Style,
    pub form_hint: Style,
    pub form_submit: Style,

    // -- Tab bar --
    pub tab_normal: Style,
    pub tab_active: Style,

    // -- Feed cards --
    pub card_title: Style,
    pub card_title_active: Style,
    pub card_category: Style,
    pub card_border: Style,
    pub card_border_active: Style,

    // -- Player --
    pub player_gauge: Style,
    pub player_gauge_track: Style,
    pub player_time: Style,
    pub player_paused: Style,
    pub player_counter: Style,

    // -- Category picker --
    pub category_normal: Style,
    pub category_selected: Style,
    pub category_cursor: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub status_error: Style,
    pub alert_border: Style,
    pub alert_text: Style,
    pub spinner: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            form_label: Style::default().fg(Color::Gray),
            form_input: Style::default(),
            form_input_focused: Style::default().fg(ACCENT),
            form_invalid: Style::default().fg(Color::Red),
            form_hint: Style::default().fg(Color::DarkGray),
            form_submit: Style::default()
                .fg(Color::White)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),

            tab_normal: Style::default().fg(Color::Gray),
            tab_active: Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),

            card_title: Style::default().add_modifier(Modifier::BOLD),
            card_title_active: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            card_category: Style::default().fg(Color::Cyan),
            card_border: Style::default().fg(Color::DarkGray),
            card_border_active: Style::default().fg(ACCENT),

            player_gauge: Style::default().fg(ACCENT),
            player_gauge_track: Style::default().fg(Color::DarkGray),
            player_time: Style::default().fg(Color::Gray),
            player_paused: Style::default().fg(Color::Yellow),
            player_counter: Style::default().fg(Color::Gray),

            category_normal: Style::default(),
            category_selected: Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            category_cursor: Style::default().bg(Color::DarkGray).fg(Color::White),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_error: Style::default().bg(Color::DarkGray).fg(Color::Red),
            alert_border: Style::default().fg(Color::Red),
            alert_text: Style::default(),
            spinner: Style::default().fg(ACCENT),
        }
    }

    fn light() -> Self {
        Self {
            form_label: Style::default().fg(Color::DarkGray),
            form_input: Style::default().fg(Color::Black),
            form_input_focused: Style::default().fg(ACCENT),
            form_invalid: Style::default().fg(Color::Red),
            form_hint: Style::default().fg(Color::Gray),
            form_submit: Style::default()
                .fg(Color::White)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),

            tab_normal: Style::default().fg(Color::DarkGray),
            tab_active: Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),

            card_title: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            card_title_active: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            card_category: Style::default().fg(Color::Blue),
            card_border: Style::default().fg(Color::Gray),
            card_border_active: Style::default().fg(ACCENT),

            player_gauge: Style::default().fg(ACCENT),
            player_gauge_track: Style::default().fg(Color::Gray),
            player_time: Style::default().fg(Color::DarkGray),
            player_paused: Style::default().fg(Color::Magenta),
            player_counter: Style::default().fg(Color::DarkGray),

            category_normal: Style::default().fg(Color::Black),
            category_selected: Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            category_cursor: Style::default().bg(Color::Blue).fg(Color::White),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_error: Style::default().bg(Color::White).fg(Color::Red),
            alert_border: Style::default().fg(Color::Red),
            alert_text: Style::default().fg(Color::Black),
            spinner: Style::default().fg(ACCENT),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
