use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};

use crate::tmux::format_unix;

use super::app::{App, Focus, InputMode, View};

/// Column width for names and paths in the panel tables.
const CELL_LIMIT: usize = 30;

pub fn draw(frame: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_title_bar(frame, app, outer[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(outer[1]);

    match app.view {
        View::Tree => draw_tree(frame, app, main[0]),
        View::Panel => draw_panel(frame, app, main[0]),
    }
    draw_preview(frame, app, main[1]);
    draw_status_bar(frame, app, outer[2]);

    match app.input_mode {
        InputMode::ConfirmKill => draw_confirm(frame, app),
        InputMode::Rename | InputMode::NewSession => draw_editor(frame, app),
        InputMode::Help => draw_help(frame, app),
        InputMode::Normal => {}
    }
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let view_label = match app.view {
        View::Tree => "tree",
        View::Panel => "panel",
    };
    let title = Line::from(vec![
        Span::styled(
            " muxman ",
            Style::default()
                .fg(app.theme.text_accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("[{view_label}]"),
            Style::default().fg(app.theme.text_secondary),
        ),
        Span::raw("  "),
        Span::styled(
            "?:cheatsheet  Left/Right:cycle views  q:quit",
            Style::default().fg(app.theme.text_secondary),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

// ── Tree view ────────────────────────────────────────────────────────

fn draw_tree(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Tree ")
        .borders(Borders::ALL)
        .border_style(app.theme.focused_border());

    if app.tree.is_empty() {
        let msg = Paragraph::new("  No sessions.\n  Press 'a' to create one.")
            .style(Style::default().fg(app.theme.text_secondary))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = app
        .tree
        .visible()
        .iter()
        .filter_map(|row| {
            let node = app.tree.get(&row.key)?;
            let selected = app.tree.selected.as_ref() == Some(&row.key);
            let marker = if selected { "▸ " } else { "  " };
            let indent = "  ".repeat(row.depth);
            let style = if selected {
                app.theme.selected_style()
            } else {
                Style::default().fg(app.theme.node_color(node.resource.kind()))
            };
            Some(ListItem::new(Line::from(vec![
                Span::styled(marker.to_string(), app.theme.selected_style()),
                Span::raw(indent),
                Span::styled(node.title.clone(), style),
            ])))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

// ── Panel view ───────────────────────────────────────────────────────

fn draw_panel(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    draw_sessions_table(frame, app, rows[0]);
    draw_windows_table(frame, app, rows[1]);
    draw_panes_table(frame, app, rows[2]);
}

fn table_block(app: &App, title: &'static str, focused: bool) -> Block<'static> {
    let border = if focused {
        app.theme.focused_border()
    } else {
        app.theme.unfocused_border()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn row_style(app: &App, selected: bool, focused: bool) -> Style {
    if selected && focused {
        app.theme.selected_style()
    } else if selected {
        Style::default()
            .fg(app.theme.text_primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(app.theme.text_primary)
    }
}

fn draw_sessions_table(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sessions;
    let rows: Vec<Row> = app
        .panel
        .sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let selected = i == app.panel.session_sel;
            let style = if s.attached && !selected {
                Style::default().fg(app.theme.row_active)
            } else {
                row_style(app, selected, focused)
            };
            Row::new(vec![
                truncate_front(&s.name, CELL_LIMIT),
                format_unix(s.last_attached),
                format_unix(s.created),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ],
    )
    .header(Row::new(vec!["Name", "Last Attached", "Created"]).style(app.theme.header_style()))
    .block(table_block(app, " Sessions ", focused));
    frame.render_widget(table, area);
}

fn draw_windows_table(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Windows;
    let rows: Vec<Row> = app
        .panel
        .windows
        .iter()
        .enumerate()
        .map(|(i, w)| {
            Row::new(vec![
                w.id.clone(),
                w.index.to_string(),
                truncate_front(&w.name, CELL_LIMIT),
                format_unix(w.activity),
                yes_no(w.active),
                w.active_clients.to_string(),
                format!("{} x {}", w.width, w.height),
            ])
            .style(row_style(app, i == app.panel.window_sel, focused))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(10),
            Constraint::Length(13),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["ID", "Index", "Name", "Activity", "Active", "# Clients", "Size"])
            .style(app.theme.header_style()),
    )
    .block(table_block(app, " Windows ", focused));
    frame.render_widget(table, area);
}

fn draw_panes_table(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Panes;
    let rows: Vec<Row> = app
        .panel
        .panes
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Row::new(vec![
                p.current_command.clone(),
                p.pid.to_string(),
                truncate_front(&p.current_path, CELL_LIMIT),
                p.title.clone(),
                yes_no(p.active),
                format!("{} x {}", p.width, p.height),
            ])
            .style(row_style(app, i == app.panel.pane_sel, focused))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Percentage(40),
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Command", "PID", "Path", "Title", "Active", "Size"])
            .style(app.theme.header_style()),
    )
    .block(table_block(app, " Panes ", focused));
    frame.render_widget(table, area);
}

// ── Preview ──────────────────────────────────────────────────────────

fn draw_preview(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Preview ")
        .borders(Borders::ALL)
        .border_style(app.theme.unfocused_border());
    let preview = Paragraph::new(app.preview.as_str()).block(block);
    frame.render_widget(preview, area);
}

// ── Status bar ───────────────────────────────────────────────────────

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = if !app.status_message.is_empty() {
        Line::from(Span::styled(
            format!(" {}", app.status_message),
            Style::default()
                .fg(app.theme.status_error)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        let hint = match app.view {
            View::Tree => " j/k:navigate  w:expand  Enter:attach  D:kill  r:rename  a:new",
            View::Panel => " j/k:navigate  space:focus  Enter:attach  D:kill  r:rename  a:new",
        };
        Line::from(Span::styled(
            hint,
            Style::default().fg(app.theme.text_secondary),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

// ── Modals ───────────────────────────────────────────────────────────

fn draw_confirm(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.confirm_prompt() else {
        return;
    };
    let width = (prompt.chars().count() as u16 + 6).max(44);
    let area = centered(frame.area(), width, 5);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {prompt} "))
        .title_style(Style::default().fg(app.theme.modal_title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.modal_border));
    let body = Paragraph::new("\nEnter/y - Confirm  |  Esc/n - Cancel")
        .centered()
        .block(block);
    frame.render_widget(body, area);
}

fn draw_editor(frame: &mut Frame, app: &App) {
    let area = centered(frame.area(), 44, 5);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {} ", app.editor_title()))
        .title_style(Style::default().fg(app.theme.modal_title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.modal_border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Line::from(vec![
        Span::styled("> ", Style::default().fg(app.theme.text_accent)),
        Span::raw(app.input_buffer.as_str()),
        Span::styled("█", Style::default().fg(app.theme.text_accent)),
    ]);
    let vcenter = Rect::new(inner.x + 1, inner.y + 1, inner.width.saturating_sub(2), 1);
    frame.render_widget(Paragraph::new(input), vcenter);
}

fn draw_help(frame: &mut Frame, app: &App) {
    let set = match app.view {
        View::Tree => super::keymap::BindingSet::Tree,
        View::Panel => super::keymap::BindingSet::Panel,
    };
    let entries = app.keymap.help_entries(set);

    let height = (entries.len() as u16 + 4).min(frame.area().height.saturating_sub(2));
    let area = centered(frame.area(), 56, height);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(" Cheatsheet ")
        .title_style(Style::default().fg(app.theme.modal_title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.modal_border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|e| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("  {:<12}", e.label),
                    Style::default().fg(app.theme.text_accent),
                ),
                Span::styled(e.description, Style::default().fg(app.theme.text_primary)),
            ]))
        })
        .collect();
    let list_area = Rect::new(inner.x, inner.y + 1, inner.width, inner.height.saturating_sub(1));
    frame.render_widget(List::new(items), list_area);
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Center a `width` x `height` rect inside `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

fn yes_no(b: bool) -> String {
    if b { "Yes" } else { "No" }.to_string()
}

/// Keep the tail of an overlong string; paths and names stay recognizable by
/// their endings.
fn truncate_front(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - max).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_front_keeps_short_strings() {
        assert_eq!(truncate_front("abc", 5), "abc");
        assert_eq!(truncate_front("abcde", 5), "abcde");
    }

    #[test]
    fn truncate_front_keeps_the_tail() {
        assert_eq!(truncate_front("/very/long/path/to/dir", 6), "...to/dir");
    }

    #[test]
    fn centered_rect_is_clamped_to_area() {
        let r = centered(Rect::new(0, 0, 10, 4), 40, 20);
        assert_eq!(r, Rect::new(0, 0, 10, 4));
        let r = centered(Rect::new(0, 0, 80, 24), 40, 6);
        assert_eq!(r, Rect::new(20, 9, 40, 6));
    }
}
