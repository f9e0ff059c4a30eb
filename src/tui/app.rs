use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::config::Config;
use crate::queue::TaskQueue;
use crate::tmux::{Resource, TmuxClient};

use super::event::{self, AppEvent};
use super::keymap::{Action, BindingSet, KeyMap};
use super::panel::Panel;
use super::theme::Theme;
use super::tree::{NodeKey, Tree};
use super::ui;

/// Which presentation of the hierarchy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Tree,
    Panel,
}

/// Which level's table holds focus in the panel presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sessions,
    Windows,
    Panes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    ConfirmKill,
    Rename,
    NewSession,
    Help,
}

/// A mutation staged behind a modal prompt.
#[derive(Debug, Clone)]
enum PendingAction {
    Kill(Resource),
    Rename(Resource),
}

/// An operation the key handler cannot perform itself because it needs the
/// terminal (suspend-for-attach); the run loop executes it.
pub enum UiRequest {
    Attach(String),
}

pub struct App {
    client: Arc<dyn TmuxClient>,
    queue: TaskQueue,
    pub keymap: KeyMap,
    pub theme: Theme,

    pub should_quit: bool,
    pub view: View,
    pub focus: Focus,
    pub input_mode: InputMode,

    pub tree: Tree,
    pub panel: Panel,

    /// Captured contents of the active leaf pane.
    pub preview: String,
    pub status_message: String,

    /// Single-line editor buffer for the rename / new-session modals.
    pub input_buffer: String,
    pending: Option<PendingAction>,

    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    tick_rate: Duration,
}

impl App {
    pub fn new(client: Arc<dyn TmuxClient>, config: &Config) -> Result<Self> {
        let queue = TaskQueue::new(config.queue.capacity, config.queue.workers)?;
        let (events_tx, events_rx) = mpsc::channel();

        Ok(App {
            client,
            queue,
            keymap: KeyMap::default_keymap(),
            theme: config.theme.build(),
            should_quit: false,
            view: View::Tree,
            focus: Focus::Sessions,
            input_mode: InputMode::Normal,
            tree: Tree::new(),
            panel: Panel::new(),
            preview: String::new(),
            status_message: String::new(),
            input_buffer: String::new(),
            pending: None,
            events_tx,
            events_rx,
            tick_rate: Duration::from_millis(config.refresh_interval_ms.max(50)),
        })
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.refresh();

        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            match event::poll(self.tick_rate, &self.events_rx)? {
                AppEvent::Key(key) => {
                    if let Some(UiRequest::Attach(name)) = self.handle_key(key.code, key.modifiers) {
                        self.attach_now(terminal, &name);
                    }
                }
                AppEvent::Refresh | AppEvent::Tick => self.refresh(),
                AppEvent::Attach(name) => self.attach_now(terminal, &name),
                AppEvent::Status(message) => self.status_message = message,
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Re-sync the active presentation from a fresh provider snapshot and
    /// re-derive the preview leaf.
    pub fn refresh(&mut self) {
        match self.view {
            View::Tree => {
                self.tree.reconcile(self.client.as_ref());
                self.refresh_tree_preview();
            }
            View::Panel => {
                let leaf = self.panel.sync_sessions(self.client.as_ref());
                self.set_preview(leaf.map(|p| p.id));
            }
        }
    }

    fn refresh_tree_preview(&mut self) {
        let pane_id = self
            .tree
            .selected
            .as_ref()
            .and_then(|key| self.tree.leaf_pane_of(key))
            .map(|pane| pane.id.clone());
        self.set_preview(pane_id);
    }

    fn set_preview(&mut self, pane_id: Option<String>) {
        self.preview = match pane_id {
            Some(id) => match self.client.capture_pane(&id) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("capture-pane {id} failed: {e:#}");
                    String::new()
                }
            },
            None => String::new(),
        };
    }

    /// Prompt text for the confirm modal, when one is pending.
    pub fn confirm_prompt(&self) -> Option<String> {
        match &self.pending {
            Some(PendingAction::Kill(resource)) => {
                Some(format!("Kill this {}?", resource.type_name()))
            }
            _ => None,
        }
    }

    /// Title for the editor modal in the current input mode.
    pub fn editor_title(&self) -> String {
        match (self.input_mode, &self.pending) {
            (InputMode::Rename, Some(PendingAction::Rename(resource))) => {
                format!("New {} name", resource.type_name())
            }
            (InputMode::NewSession, _) => "New session name".to_string(),
            _ => String::new(),
        }
    }

    // ── Key handling ─────────────────────────────────────────────────

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<UiRequest> {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(code, modifiers),
            InputMode::ConfirmKill => {
                self.handle_confirm_key(code);
                None
            }
            InputMode::Rename | InputMode::NewSession => {
                self.handle_editor_key(code);
                None
            }
            InputMode::Help => {
                self.input_mode = InputMode::Normal;
                None
            }
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<UiRequest> {
        self.status_message.clear();

        let set = match self.view {
            View::Tree => BindingSet::Tree,
            View::Panel => BindingSet::Panel,
        };
        match self.keymap.dispatch(set, code, modifiers) {
            Some(action) => self.execute_action(action),
            // Unmatched (and documentation-only) keys fall through to the
            // default navigation path: Left/Right cycles the presentation.
            None => {
                if matches!(code, KeyCode::Left | KeyCode::Right) {
                    self.toggle_view();
                }
                None
            }
        }
    }

    fn execute_action(&mut self, action: Action) -> Option<UiRequest> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ShowHelp => self.input_mode = InputMode::Help,
            Action::Refresh => self.refresh(),

            Action::MoveDown => self.move_selection(1),
            Action::MoveUp => self.move_selection(-1),
            Action::FocusNext => self.cycle_focus(1),
            Action::FocusPrev => self.cycle_focus(-1),
            Action::ToggleExpand => {
                if self.view == View::Tree {
                    self.tree.toggle_expanded();
                }
            }

            Action::Attach => {
                if let Some(name) = self.attach_target() {
                    return Some(UiRequest::Attach(name));
                }
            }
            Action::Kill => {
                if let Some(resource) = self.selected_resource() {
                    self.pending = Some(PendingAction::Kill(resource));
                    self.input_mode = InputMode::ConfirmKill;
                }
            }
            Action::Rename => {
                if let Some(resource) = self.selected_resource() {
                    let Some(current) = resource.display_name().map(str::to_string) else {
                        // Panes carry no renameable name.
                        return None;
                    };
                    self.input_buffer = current;
                    self.pending = Some(PendingAction::Rename(resource));
                    self.input_mode = InputMode::Rename;
                }
            }
            Action::NewSession => {
                self.input_buffer.clear();
                self.input_mode = InputMode::NewSession;
            }
        }
        None
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Char('y') => {
                if let Some(PendingAction::Kill(resource)) = self.pending.take() {
                    self.submit_kill(resource);
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc | KeyCode::Char('n') => {
                self.pending = None;
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                let name = std::mem::take(&mut self.input_buffer);
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                if name.is_empty() {
                    self.pending = None;
                    return;
                }
                match mode {
                    InputMode::Rename => {
                        if let Some(PendingAction::Rename(resource)) = self.pending.take() {
                            self.submit_rename(resource, name);
                        }
                    }
                    InputMode::NewSession => self.submit_create(name),
                    _ => {}
                }
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.pending = None;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    fn move_selection(&mut self, delta: isize) {
        match self.view {
            View::Tree => {
                if delta > 0 {
                    self.tree.select_next();
                } else {
                    self.tree.select_prev();
                }
                self.refresh_tree_preview();
            }
            View::Panel => self.panel_move(delta),
        }
    }

    /// A selection change at one level forces a re-sync of every level below
    /// it, down to the preview.
    fn panel_move(&mut self, delta: isize) {
        match self.focus {
            Focus::Sessions => {
                if !self.panel.sessions.is_empty() {
                    self.panel.session_sel =
                        step(self.panel.session_sel, delta, self.panel.sessions.len());
                    let leaf = self.panel.sync_windows_down(self.client.as_ref());
                    self.set_preview(leaf.map(|p| p.id));
                }
            }
            Focus::Windows => {
                if !self.panel.windows.is_empty() {
                    self.panel.window_sel =
                        step(self.panel.window_sel, delta, self.panel.windows.len());
                    let leaf = self.panel.sync_panes_down(self.client.as_ref());
                    self.set_preview(leaf.map(|p| p.id));
                }
            }
            Focus::Panes => {
                if !self.panel.panes.is_empty() {
                    self.panel.pane_sel = step(self.panel.pane_sel, delta, self.panel.panes.len());
                    let id = self.panel.selected_pane().map(|p| p.id.clone());
                    self.set_preview(id);
                }
            }
        }
    }

    fn cycle_focus(&mut self, delta: isize) {
        if self.view != View::Panel {
            return;
        }
        self.focus = match (self.focus, delta > 0) {
            (Focus::Sessions, true) => Focus::Windows,
            (Focus::Windows, true) => Focus::Panes,
            (Focus::Panes, true) => Focus::Sessions,
            (Focus::Sessions, false) => Focus::Panes,
            (Focus::Windows, false) => Focus::Sessions,
            (Focus::Panes, false) => Focus::Windows,
        };
    }

    fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Tree => View::Panel,
            View::Panel => View::Tree,
        };
        self.refresh();
    }

    /// The resource under the cursor in the active presentation.
    fn selected_resource(&self) -> Option<Resource> {
        match self.view {
            View::Tree => self.tree.selected_node().map(|n| n.resource.clone()),
            View::Panel => match self.focus {
                Focus::Sessions => self.panel.selected_session().cloned().map(Resource::Session),
                Focus::Windows => self.panel.selected_window().cloned().map(Resource::Window),
                Focus::Panes => self.panel.selected_pane().cloned().map(Resource::Pane),
            },
        }
    }

    /// Clients attach to sessions; windows and panes resolve to their owner.
    fn attach_target(&self) -> Option<String> {
        match self.view {
            View::Tree => self
                .tree
                .selected
                .as_ref()
                .and_then(|key| self.tree.session_of(key)),
            View::Panel => self.panel.selected_session().map(|s| s.name.clone()),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    fn submit_kill(&mut self, resource: Resource) {
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.queue.submit(move || {
            if let Err(e) = client.kill(&resource) {
                tracing::error!("kill {} {} failed: {e:#}", resource.type_name(), resource.key());
                let _ = tx.send(AppEvent::Status(format!(
                    "kill {} failed: {e:#}",
                    resource.type_name()
                )));
            }
            let _ = tx.send(AppEvent::Refresh);
        });
    }

    fn submit_rename(&mut self, resource: Resource, new_name: String) {
        // Sessions are looked up by name, so the rename changes the identity
        // key. Rewrite the selection to the new key now, before any refresh
        // can race against the provider; never re-match by the old name.
        if let Resource::Session(session) = &resource {
            let old_key = NodeKey::session(&session.name);
            if self.tree.selected.as_ref() == Some(&old_key) {
                self.tree.selected = Some(NodeKey::session(&new_name));
            }
            if self
                .panel
                .selected_session()
                .is_some_and(|s| s.name == session.name)
            {
                self.panel.retarget_session(&new_name);
            }
        }

        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.queue.submit(move || {
            if let Err(e) = client.rename(&resource, &new_name) {
                tracing::error!(
                    "rename {} {} failed: {e:#}",
                    resource.type_name(),
                    resource.key()
                );
                let _ = tx.send(AppEvent::Status(format!(
                    "rename {} failed: {e:#}",
                    resource.type_name()
                )));
            }
            let _ = tx.send(AppEvent::Refresh);
        });
    }

    fn submit_create(&mut self, name: String) {
        let client = Arc::clone(&self.client);
        let tx = self.events_tx.clone();
        self.queue.submit(move || {
            match client.create_session(&name) {
                Ok(session) => {
                    let _ = tx.send(AppEvent::Attach(session.name));
                }
                Err(e) => {
                    tracing::error!("create session {name} failed: {e:#}");
                    let _ = tx.send(AppEvent::Status(format!("create session failed: {e:#}")));
                }
            }
            let _ = tx.send(AppEvent::Refresh);
        });
    }

    /// Yield the terminal to a blocking `tmux attach` and re-sync on return.
    fn attach_now(&mut self, terminal: &mut DefaultTerminal, name: &str) {
        let result = super::suspend(terminal, || self.client.attach(name));
        if let Err(e) = result {
            tracing::error!("attach {name} failed: {e:#}");
            self.status_message = format!("attach {name} failed: {e:#}");
        }
        self.refresh();
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    current.saturating_add_signed(delta).min(len - 1)
}

// ── Tests ────────────────────────────────────────────────────────────
