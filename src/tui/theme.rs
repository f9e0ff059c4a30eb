use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use crate::tmux::ResourceKind;

/// Semantic colour theme for the entire TUI.
///
/// Every colour used by the renderer is stored here so the user can
/// override any of them via `[theme]` in `config.toml`.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Borders ───────────────────────────────────────────────
    pub border_focused: Color,
    pub border_unfocused: Color,

    // ── Text ──────────────────────────────────────────────────
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_accent: Color,

    // ── Tree nodes, by resource kind ──────────────────────────
    pub node_session: Color,
    pub node_window: Color,
    pub node_pane: Color,

    // ── Tables ────────────────────────────────────────────────
    pub table_header: Color,
    pub selection_indicator: Color,
    pub row_active: Color,

    // ── Modals / status line ──────────────────────────────────
    pub modal_border: Color,
    pub modal_title: Color,
    pub status_error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_focused: Color::Cyan,
            border_unfocused: Color::DarkGray,

            text_primary: Color::White,
            text_secondary: Color::DarkGray,
            text_accent: Color::Cyan,

            node_session: Color::Blue,
            node_window: Color::Blue,
            node_pane: Color::Gray,

            table_header: Color::Yellow,
            selection_indicator: Color::Cyan,
            row_active: Color::Green,

            modal_border: Color::LightYellow,
            modal_title: Color::Cyan,
            status_error: Color::Red,
        }
    }
}

impl Theme {
    /// Style for a focused panel border.
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    /// Style for an unfocused panel border.
    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.border_unfocused)
    }

    /// Colour of a tree node label, by resource kind.
    pub fn node_color(&self, kind: ResourceKind) -> Color {
        match kind {
            ResourceKind::Session => self.node_session,
            ResourceKind::Window => self.node_window,
            ResourceKind::Pane => self.node_pane,
        }
    }

    /// Style for the selected row in the focused widget.
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.selection_indicator)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.table_header)
    }
}

// ── Config deserialization ────────────────────────────────────────────

/// All-optional mirror of [`Theme`] for `config.toml` `[theme]` section.
///
/// Only `Some` fields override the default; everything else keeps its default.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ThemeOverrides {
    pub border_focused: Option<String>,
    pub border_unfocused: Option<String>,

    pub text_primary: Option<String>,
    pub text_secondary: Option<String>,
    pub text_accent: Option<String>,

    pub node_session: Option<String>,
    pub node_window: Option<String>,
    pub node_pane: Option<String>,

    pub table_header: Option<String>,
    pub selection_indicator: Option<String>,
    pub row_active: Option<String>,

    pub modal_border: Option<String>,
    pub modal_title: Option<String>,
    pub status_error: Option<String>,
}

/// Parse a colour string into a ratatui `Color`.
///
/// Supports named colours (`"cyan"`, `"red"`, `"dark_gray"`, etc.) and
/// `"rgb(R,G,B)"` syntax.
fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    // Try rgb(R,G,B)
    if let Some(inner) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() == 3 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            return Some(Color::Rgb(r, g, b));
        }
        return None;
    }

    // Named colours (case-insensitive, with underscore tolerance)
    let lower = s.to_lowercase().replace('-', "_");
    match lower.as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "light_red" | "lightred" => Some(Color::LightRed),
        "light_green" | "lightgreen" => Some(Color::LightGreen),
        "light_yellow" | "lightyellow" => Some(Color::LightYellow),
        "light_blue" | "lightblue" => Some(Color::LightBlue),
        "light_magenta" | "lightmagenta" => Some(Color::LightMagenta),
        "light_cyan" | "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

/// Apply an optional config field: if the string parses to a valid colour,
/// overwrite `target`.
fn apply(target: &mut Color, source: Option<&String>) {
    if let Some(s) = source
        && let Some(color) = parse_color(s)
    {
        *target = color;
    }
}

impl ThemeOverrides {
    /// Build a `Theme` starting from defaults, overriding any fields that were
    /// set in the config file.
    pub fn build(&self) -> Theme {
        let mut t = Theme::default();

        apply(&mut t.border_focused, self.border_focused.as_ref());
        apply(&mut t.border_unfocused, self.border_unfocused.as_ref());
        apply(&mut t.text_primary, self.text_primary.as_ref());
        apply(&mut t.text_secondary, self.text_secondary.as_ref());
        apply(&mut t.text_accent, self.text_accent.as_ref());
        apply(&mut t.node_session, self.node_session.as_ref());
        apply(&mut t.node_window, self.node_window.as_ref());
        apply(&mut t.node_pane, self.node_pane.as_ref());
        apply(&mut t.table_header, self.table_header.as_ref());
        apply(
            &mut t.selection_indicator,
            self.selection_indicator.as_ref(),
        );
        apply(&mut t.row_active, self.row_active.as_ref());
        apply(&mut t.modal_border, self.modal_border.as_ref());
        apply(&mut t.modal_title, self.modal_title.as_ref());
        apply(&mut t.status_error, self.status_error.as_ref());

        t
    }
}
