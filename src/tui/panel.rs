use anyhow::Result;

use crate::tmux::{Pane, Session, TmuxClient, Window};

/// Flat-list presentation state: one ordered list per hierarchy level plus a
/// selected index for each.
///
/// Every sync replaces a level's list wholesale (no incremental diff; there
/// is no expansion state to preserve here) and cascades downward, so after
/// any sync call the three lists are mutually consistent: the windows belong
/// to the selected session, the panes to the selected window. Selection is
/// preserved by identity when the previously selected item is still present,
/// otherwise the index clamps to the new length.
#[derive(Debug, Default)]
pub struct Panel {
    pub sessions: Vec<Session>,
    pub windows: Vec<Window>,
    pub panes: Vec<Pane>,

    pub session_sel: usize,
    pub window_sel: usize,
    pub pane_sel: usize,
}

impl Panel {
    pub fn new() -> Self {
        Panel::default()
    }

    pub fn selected_session(&self) -> Option<&Session> {
        self.sessions.get(self.session_sel)
    }

    pub fn selected_window(&self) -> Option<&Window> {
        self.windows.get(self.window_sel)
    }

    pub fn selected_pane(&self) -> Option<&Pane> {
        self.panes.get(self.pane_sel)
    }

    /// Full cascade from the top. Returns the new leaf pane for the preview.
    pub fn sync_sessions(&mut self, client: &dyn TmuxClient) -> Option<Pane> {
        let fresh = fetch_or_empty(client.list_sessions(), "sessions");
        let prev = self.selected_session().map(|s| s.name.clone());
        self.sessions = fresh;
        self.session_sel = restore_selection(
            self.session_sel,
            prev.as_deref(),
            |s: &Session| s.name.as_str(),
            &self.sessions,
        );
        self.sync_windows_down(client)
    }

    /// Re-sync windows for the currently selected session, then cascade.
    pub fn sync_windows_down(&mut self, client: &dyn TmuxClient) -> Option<Pane> {
        let fresh = match self.selected_session() {
            Some(session) => fetch_or_empty(client.list_windows(&session.name), "windows"),
            None => Vec::new(),
        };
        let prev = self.selected_window().map(|w| w.id.clone());
        self.windows = fresh;
        self.window_sel = restore_selection(
            self.window_sel,
            prev.as_deref(),
            |w: &Window| w.id.as_str(),
            &self.windows,
        );
        self.sync_panes_down(client)
    }

    /// Re-sync panes for the currently selected window and return the new
    /// leaf selection.
    pub fn sync_panes_down(&mut self, client: &dyn TmuxClient) -> Option<Pane> {
        let fresh = match self.selected_window() {
            Some(window) => fetch_or_empty(client.list_panes(&window.id), "panes"),
            None => Vec::new(),
        };
        let prev = self.selected_pane().map(|p| p.id.clone());
        self.panes = fresh;
        self.pane_sel = restore_selection(
            self.pane_sel,
            prev.as_deref(),
            |p: &Pane| p.id.as_str(),
            &self.panes,
        );
        self.selected_pane().cloned()
    }

    /// Rewrite the selected session's identity in the local snapshot after a
    /// rename has been issued, so the next sync re-finds it by its new name
    /// instead of re-matching the stale one.
    pub fn retarget_session(&mut self, new_name: &str) {
        if let Some(session) = self.sessions.get_mut(self.session_sel) {
            session.name = new_name.to_string();
        }
    }
}

/// Identity-preferring selection restore: if the previously selected key is
/// still present, follow it to its new index; otherwise clamp the old index.
fn restore_selection<T>(
    old_index: usize,
    prev_key: Option<&str>,
    key_of: impl Fn(&T) -> &str,
    items: &[T],
) -> usize {
    if let Some(prev) = prev_key
        && let Some(pos) = items.iter().position(|item| key_of(item) == prev)
    {
        return pos;
    }
    if items.is_empty() {
        0
    } else {
        old_index.min(items.len() - 1)
    }
}

/// Fail-soft fetch, same policy as the tree reconciler.
fn fetch_or_empty<T>(result: Result<Vec<T>>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("failed to list {what}: {e:#}");
            Vec::new()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::testing::{FakeTmux, pane, session, window};

    fn two_session_layout(fake: &FakeTmux) {
        fake.set(vec![
            (
                session("alpha"),
                vec![
                    (window("@1", 0, "a1"), vec![pane("%1", "vim"), pane("%2", "sh")]),
                    (window("@2", 1, "a2"), vec![pane("%3", "top")]),
                ],
            ),
            (
                session("beta"),
                vec![(window("@3", 0, "b1"), vec![pane("%4", "sh")])],
            ),
        ]);
    }

    #[test]
    fn cascade_keeps_levels_consistent() {
        let fake = FakeTmux::default();
        two_session_layout(&fake);

        let mut panel = Panel::new();
        let leaf = panel.sync_sessions(&fake);

        assert_eq!(panel.sessions.len(), 2);
        assert_eq!(panel.selected_session().unwrap().name, "alpha");
        assert_eq!(panel.windows.len(), 2);
        assert_eq!(panel.panes.len(), 2);
        assert_eq!(leaf.unwrap().id, "%1");

        // Selecting the second session must swap both lower levels.
        panel.session_sel = 1;
        let leaf = panel.sync_windows_down(&fake);
        assert_eq!(panel.windows.len(), 1);
        assert_eq!(panel.windows[0].id, "@3");
        assert_eq!(panel.panes.len(), 1);
        assert_eq!(leaf.unwrap().id, "%4");
    }

    #[test]
    fn window_selection_drives_pane_list() {
        let fake = FakeTmux::default();
        two_session_layout(&fake);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);

        panel.window_sel = 1;
        let leaf = panel.sync_panes_down(&fake);
        assert_eq!(panel.panes.len(), 1);
        assert_eq!(leaf.unwrap().id, "%3");
    }

    #[test]
    fn selection_follows_identity_across_reorder() {
        let fake = FakeTmux::default();
        two_session_layout(&fake);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);
        panel.session_sel = 1; // beta
        panel.sync_windows_down(&fake);

        // Same membership, reversed order: beta is now index 0.
        fake.set(vec![
            (
                session("beta"),
                vec![(window("@3", 0, "b1"), vec![pane("%4", "sh")])],
            ),
            (session("alpha"), vec![]),
        ]);
        panel.sync_sessions(&fake);

        assert_eq!(panel.session_sel, 0);
        assert_eq!(panel.selected_session().unwrap().name, "beta");
        assert_eq!(panel.windows.len(), 1);
    }

    #[test]
    fn vanished_selection_clamps_index() {
        let fake = FakeTmux::default();
        fake.set(vec![
            (session("a"), vec![]),
            (session("b"), vec![]),
            (session("c"), vec![]),
        ]);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);
        panel.session_sel = 2;
        panel.sync_windows_down(&fake);

        fake.set(vec![(session("a"), vec![])]);
        panel.sync_sessions(&fake);
        assert_eq!(panel.session_sel, 0);
        assert_eq!(panel.selected_session().unwrap().name, "a");
    }

    #[test]
    fn empty_parent_empties_descendant_lists() {
        let fake = FakeTmux::default();
        two_session_layout(&fake);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);
        assert!(!panel.panes.is_empty());

        fake.set(vec![]);
        let leaf = panel.sync_sessions(&fake);
        assert!(panel.sessions.is_empty());
        assert!(panel.windows.is_empty());
        assert!(panel.panes.is_empty());
        assert!(leaf.is_none());
    }

    #[test]
    fn fetch_failure_is_an_empty_level_not_an_abort() {
        let fake = FakeTmux::default();
        two_session_layout(&fake);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);

        fake.fail_windows_for
            .lock()
            .unwrap()
            .insert("alpha".to_string());
        let leaf = panel.sync_sessions(&fake);

        // Sessions list survives, windows/panes drain for the failing parent.
        assert_eq!(panel.sessions.len(), 2);
        assert!(panel.windows.is_empty());
        assert!(panel.panes.is_empty());
        assert!(leaf.is_none());
    }

    #[test]
    fn retarget_session_follows_rename_identity() {
        let fake = FakeTmux::default();
        fake.set(vec![(session("old"), vec![]), (session("zzz"), vec![])]);

        let mut panel = Panel::new();
        panel.sync_sessions(&fake);
        assert_eq!(panel.selected_session().unwrap().name, "old");

        // Rename issued: local identity is rewritten before any refresh.
        panel.retarget_session("renamed");

        fake.set(vec![(session("renamed"), vec![]), (session("zzz"), vec![])]);
        panel.sync_sessions(&fake);
        assert_eq!(panel.selected_session().unwrap().name, "renamed");
        assert_eq!(panel.session_sel, 0);
    }
}
