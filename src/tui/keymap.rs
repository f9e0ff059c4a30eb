use crossterm::event::{KeyCode, KeyModifiers};

// ── Actions ──────────────────────────────────────────────────────────

/// Every discrete action the TUI can perform in response to a key press.
///
/// Actions are context-free identifiers; the *execution* code in `App`
/// decides what actually happens based on the current view / selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ShowHelp,
    Refresh,

    // Navigation
    MoveUp,
    MoveDown,
    FocusNext,
    FocusPrev,
    ToggleExpand,

    // Mutations
    Attach,
    Kill,
    Rename,
    NewSession,
}

/// Which command list is active. The tree and the flat panel presentation
/// each register their own ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSet {
    Tree,
    Panel,
}

// ── Keybinding ───────────────────────────────────────────────────────

/// A single key → action mapping with metadata for the help overlay.
///
/// `action: None` marks a documentation-only entry: it appears in the help
/// listing but dispatches as a no-op, for behaviors implemented by the
/// surrounding view's default input path.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Option<Action>,
    /// Human-readable key label shown in help (e.g. `"Ctrl+J"`).
    pub label: &'static str,
    /// Short description shown next to the label in the help overlay.
    pub description: &'static str,
}

/// A single row in the help overlay.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub label: &'static str,
    pub description: &'static str,
}

// ── KeyMap ───────────────────────────────────────────────────────────

/// Declarative registry of every key binding in the TUI.
///
/// Bindings are evaluated in registration order and the first match wins;
/// the help overlay is derived from the same lists, so it cannot drift out
/// of sync with the actual dispatch.
pub struct KeyMap {
    pub tree: Vec<KeyBinding>,
    pub panel: Vec<KeyBinding>,
}

impl KeyMap {
    /// Build the default key map encoding all current bindings.
    pub fn default_keymap() -> Self {
        Self {
            tree: default_tree_bindings(),
            panel: default_panel_bindings(),
        }
    }

    /// Dispatch a key event against the given binding set.
    ///
    /// Returns the first matching binding's action. Documentation-only
    /// matches and unmatched events both yield `None`, leaving the event to
    /// the view's default navigation path.
    pub fn dispatch(&self, set: BindingSet, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        let bindings = match set {
            BindingSet::Tree => &self.tree,
            BindingSet::Panel => &self.panel,
        };
        // Shifted characters arrive as Char('D') + SHIFT; the char already
        // encodes the shift, so it is stripped before comparison.
        let modifiers = if matches!(code, KeyCode::Char(_)) {
            modifiers.difference(KeyModifiers::SHIFT)
        } else {
            modifiers
        };
        bindings
            .iter()
            .find(|kb| kb.code == code && kb.modifiers == modifiers)
            .and_then(|kb| kb.action)
    }

    /// Generate help entries for the given binding set, in registration
    /// order. Entries with an empty description (alias keys) are folded into
    /// the entry that documents them.
    pub fn help_entries(&self, set: BindingSet) -> Vec<HelpEntry> {
        let bindings = match set {
            BindingSet::Tree => &self.tree,
            BindingSet::Panel => &self.panel,
        };

        let mut entries: Vec<HelpEntry> = Vec::new();
        for kb in bindings {
            if !kb.description.is_empty() && !entries.iter().any(|e| e.label == kb.label) {
                entries.push(HelpEntry {
                    label: kb.label,
                    description: kb.description,
                });
            }
        }
        entries
    }
}

// ── Default tree-view bindings ───────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_tree_bindings() -> Vec<KeyBinding> {
    use Action::*;

    vec![
        KeyBinding {
            code: KeyCode::Char('?'),
            modifiers: KeyModifiers::NONE,
            action: Some(ShowHelp),
            label: "?",
            description: "Toggle cheatsheet",
        },
        KeyBinding {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            action: Some(MoveDown),
            label: "j/k",
            description: "Navigate up/down",
        },
        KeyBinding {
            code: KeyCode::Char('k'),
            modifiers: KeyModifiers::NONE,
            action: Some(MoveUp),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Down,
            modifiers: KeyModifiers::NONE,
            action: Some(MoveDown),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            action: Some(MoveUp),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Char('w'),
            modifiers: KeyModifiers::NONE,
            action: Some(ToggleExpand),
            label: "w",
            description: "Toggle collapse/expand",
        },
        KeyBinding {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            action: Some(Attach),
            label: "Enter",
            description: "Attach to item",
        },
        KeyBinding {
            code: KeyCode::Char('D'),
            modifiers: KeyModifiers::NONE,
            action: Some(Kill),
            label: "D",
            description: "Kill item",
        },
        KeyBinding {
            code: KeyCode::Char('r'),
            modifiers: KeyModifiers::NONE,
            action: Some(Rename),
            label: "r",
            description: "Rename this item (sessions and windows only)",
        },
        KeyBinding {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            action: Some(NewSession),
            label: "a",
            description: "Create a new session",
        },
        KeyBinding {
            code: KeyCode::Char('R'),
            modifiers: KeyModifiers::NONE,
            action: Some(Refresh),
            label: "R",
            description: "Refresh",
        },
        // Cycling between presentations is handled by the view's default
        // input path; this entry only documents it.
        KeyBinding {
            code: KeyCode::Left,
            modifiers: KeyModifiers::NONE,
            action: None,
            label: "Left/Right",
            description: "Cycle views",
        },
        KeyBinding {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            action: Some(Quit),
            label: "q",
            description: "Quit",
        },
        KeyBinding {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            action: Some(Quit),
            label: "",
            description: "",
        },
    ]
}

// ── Default panel-view bindings ──────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_panel_bindings() -> Vec<KeyBinding> {
    use Action::*;

    vec![
        KeyBinding {
            code: KeyCode::Char('?'),
            modifiers: KeyModifiers::NONE,
            action: Some(ShowHelp),
            label: "?",
            description: "Toggle cheatsheet",
        },
        KeyBinding {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            action: Some(MoveDown),
            label: "j/k",
            description: "Navigate up/down",
        },
        KeyBinding {
            code: KeyCode::Char('k'),
            modifiers: KeyModifiers::NONE,
            action: Some(MoveUp),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Down,
            modifiers: KeyModifiers::NONE,
            action: Some(MoveDown),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            action: Some(MoveUp),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            action: Some(Attach),
            label: "Enter",
            description: "Attach to session",
        },
        KeyBinding {
            code: KeyCode::Char(' '),
            modifiers: KeyModifiers::NONE,
            action: Some(FocusNext),
            label: "space",
            description: "Focus next table",
        },
        KeyBinding {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::CONTROL,
            action: Some(FocusNext),
            label: "Ctrl+J/K",
            description: "Move table focus",
        },
        KeyBinding {
            code: KeyCode::Char('k'),
            modifiers: KeyModifiers::CONTROL,
            action: Some(FocusPrev),
            label: "",
            description: "",
        },
        KeyBinding {
            code: KeyCode::Esc,
            modifiers: KeyModifiers::NONE,
            action: Some(FocusPrev),
            label: "esc",
            description: "Go back",
        },
        KeyBinding {
            code: KeyCode::Char('D'),
            modifiers: KeyModifiers::NONE,
            action: Some(Kill),
            label: "D",
            description: "Kill selected item",
        },
        KeyBinding {
            code: KeyCode::Char('r'),
            modifiers: KeyModifiers::NONE,
            action: Some(Rename),
            label: "r",
            description: "Rename selected session/window",
        },
        KeyBinding {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            action: Some(NewSession),
            label: "a",
            description: "Create new session",
        },
        KeyBinding {
            code: KeyCode::Char('R'),
            modifiers: KeyModifiers::NONE,
            action: Some(Refresh),
            label: "R",
            description: "Refresh",
        },
        KeyBinding {
            code: KeyCode::Left,
            modifiers: KeyModifiers::NONE,
            action: None,
            label: "Left/Right",
            description: "Cycle views",
        },
        KeyBinding {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            action: Some(Quit),
            label: "q",
            description: "Quit",
        },
        KeyBinding {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            action: Some(Quit),
            label: "",
            description: "",
        },
    ]
}

// ── Tests ────────────────────────────────────────────────────────────
