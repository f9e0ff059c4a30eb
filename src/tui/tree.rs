use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::tmux::{Pane, Resource, ResourceKind, Session, TmuxClient, Window};

/// Identity of a [`ViewNode`]: resource kind plus the stable key within the
/// parent scope (session name, window id, pane id). Independent of every
/// mutable field of the attached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub kind: ResourceKind,
    pub key: String,
}

impl NodeKey {
    pub fn session(name: &str) -> Self {
        NodeKey {
            kind: ResourceKind::Session,
            key: name.to_string(),
        }
    }

    pub fn window(id: &str) -> Self {
        NodeKey {
            kind: ResourceKind::Window,
            key: id.to_string(),
        }
    }

    pub fn pane(id: &str) -> Self {
        NodeKey {
            kind: ResourceKind::Pane,
            key: id.to_string(),
        }
    }
}

/// Persistent representation of one resource within the displayed hierarchy.
///
/// Reconciliation mutates the node in place (resource value, title, child
/// list); `expanded` is a UI-only attribute that survives every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub resource: Resource,
    pub title: String,
    pub expanded: bool,
    pub children: Vec<NodeKey>,
}

impl ViewNode {
    fn new(resource: Resource, children: Vec<NodeKey>) -> Self {
        ViewNode {
            title: resource.display_title(),
            resource,
            expanded: false,
            children,
        }
    }
}

/// One row of the flattened tree, in display order.
#[derive(Debug, Clone)]
pub struct VisibleRow {
    pub key: NodeKey,
    pub depth: usize,
}

/// The session/window/pane hierarchy as an arena of [`ViewNode`]s keyed by
/// identity, with children stored as ordered key lists.
///
/// [`Tree::reconcile`] patches the arena against a fresh provider snapshot:
/// matched nodes are updated in place and keep their position, vanished
/// subtrees are removed, new subtrees are built fully and appended. A fetch
/// failure at any level yields empty children for that subtree only.
pub struct Tree {
    nodes: HashMap<NodeKey, ViewNode>,
    roots: Vec<NodeKey>,
    pub selected: Option<NodeKey>,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: HashMap::new(),
            roots: Vec::new(),
            selected: None,
        }
    }

    pub fn get(&self, key: &NodeKey) -> Option<&ViewNode> {
        self.nodes.get(key)
    }

    pub fn selected_node(&self) -> Option<&ViewNode> {
        self.selected.as_ref().and_then(|k| self.nodes.get(k))
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sync the tree against a fresh full snapshot pulled through `client`.
    pub fn reconcile(&mut self, client: &dyn TmuxClient) {
        // Remember where the selection sat so it can be clamped if its node
        // disappears in this pass.
        let selected_pos = self
            .selected
            .as_ref()
            .and_then(|sel| self.visible().iter().position(|row| &row.key == sel));

        let sessions = fetch_or_empty(client.list_sessions(), "sessions");

        let fresh_names: HashSet<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        let old_roots = std::mem::take(&mut self.roots);
        let mut matched: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(old_roots.len());
        for key in old_roots {
            if fresh_names.contains(key.key.as_str()) && self.nodes.contains_key(&key) {
                matched.insert(key.key.clone());
                kept.push(key);
            } else {
                self.remove_subtree(&key);
            }
        }

        for session in sessions {
            if matched.contains(&session.name) {
                let key = NodeKey::session(&session.name);
                let windows = fetch_or_empty(client.list_windows(&session.name), "windows");
                if let Some(node) = self.nodes.get_mut(&key) {
                    node.resource = Resource::Session(session);
                    node.title = node.resource.display_title();
                }
                self.reconcile_windows(&key, windows, client);
            } else {
                kept.push(self.build_session(session, client));
            }
        }

        self.roots = kept;
        self.repair_selection(selected_pos);
    }

    fn reconcile_windows(&mut self, session_key: &NodeKey, fresh: Vec<Window>, client: &dyn TmuxClient) {
        let fresh_ids: HashSet<&str> = fresh.iter().map(|w| w.id.as_str()).collect();
        let old_children = match self.nodes.get_mut(session_key) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };

        let mut matched: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(old_children.len());
        for key in old_children {
            if fresh_ids.contains(key.key.as_str()) && self.nodes.contains_key(&key) {
                matched.insert(key.key.clone());
                kept.push(key);
            } else {
                self.remove_subtree(&key);
            }
        }

        for window in fresh {
            if matched.contains(&window.id) {
                let key = NodeKey::window(&window.id);
                let panes = fetch_or_empty(client.list_panes(&window.id), "panes");
                if let Some(node) = self.nodes.get_mut(&key) {
                    node.resource = Resource::Window(window);
                    node.title = node.resource.display_title();
                }
                self.reconcile_panes(&key, panes);
            } else {
                kept.push(self.build_window(window, client));
            }
        }

        if let Some(node) = self.nodes.get_mut(session_key) {
            node.children = kept;
        }
    }

    fn reconcile_panes(&mut self, window_key: &NodeKey, fresh: Vec<Pane>) {
        let fresh_ids: HashSet<&str> = fresh.iter().map(|p| p.id.as_str()).collect();
        let old_children = match self.nodes.get_mut(window_key) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };

        let mut matched: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(old_children.len());
        for key in old_children {
            if fresh_ids.contains(key.key.as_str()) && self.nodes.contains_key(&key) {
                matched.insert(key.key.clone());
                kept.push(key);
            } else {
                self.remove_subtree(&key);
            }
        }

        for pane in fresh {
            if matched.contains(&pane.id) {
                let key = NodeKey::pane(&pane.id);
                if let Some(node) = self.nodes.get_mut(&key) {
                    node.resource = Resource::Pane(pane);
                    node.title = node.resource.display_title();
                }
            } else {
                kept.push(self.build_pane(pane));
            }
        }

        if let Some(node) = self.nodes.get_mut(window_key) {
            node.children = kept;
        }
    }

    fn build_session(&mut self, session: Session, client: &dyn TmuxClient) -> NodeKey {
        let key = NodeKey::session(&session.name);
        let windows = fetch_or_empty(client.list_windows(&session.name), "windows");
        let children: Vec<NodeKey> = windows
            .into_iter()
            .map(|w| self.build_window(w, client))
            .collect();
        self.nodes
            .insert(key.clone(), ViewNode::new(Resource::Session(session), children));
        key
    }

    fn build_window(&mut self, window: Window, client: &dyn TmuxClient) -> NodeKey {
        let key = NodeKey::window(&window.id);
        let panes = fetch_or_empty(client.list_panes(&window.id), "panes");
        let children: Vec<NodeKey> = panes.into_iter().map(|p| self.build_pane(p)).collect();
        self.nodes
            .insert(key.clone(), ViewNode::new(Resource::Window(window), children));
        key
    }

    fn build_pane(&mut self, pane: Pane) -> NodeKey {
        let key = NodeKey::pane(&pane.id);
        self.nodes
            .insert(key.clone(), ViewNode::new(Resource::Pane(pane), Vec::new()));
        key
    }

    fn remove_subtree(&mut self, key: &NodeKey) {
        if let Some(node) = self.nodes.remove(key) {
            for child in &node.children {
                self.remove_subtree(child);
            }
        }
    }

    /// The selection must reference a present node or be unset; a vanished
    /// selection clamps to the nearest surviving visible position.
    fn repair_selection(&mut self, previous_pos: Option<usize>) {
        let rows = self.visible();
        if rows.is_empty() {
            self.selected = None;
            return;
        }
        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|sel| rows.iter().any(|row| &row.key == sel));
        if !still_present {
            let pos = previous_pos.unwrap_or(0).min(rows.len() - 1);
            self.selected = Some(rows[pos].key.clone());
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Flatten the tree into display order, honoring expansion state.
    /// Keys whose node vanished mid-pass are skipped.
    pub fn visible(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        for root in &self.roots {
            self.push_visible(root, 0, &mut rows);
        }
        rows
    }

    fn push_visible(&self, key: &NodeKey, depth: usize, rows: &mut Vec<VisibleRow>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        rows.push(VisibleRow {
            key: key.clone(),
            depth,
        });
        if node.expanded {
            for child in &node.children {
                self.push_visible(child, depth + 1, rows);
            }
        }
    }

    pub fn select_next(&mut self) {
        self.select_offset(1);
    }

    pub fn select_prev(&mut self) {
        self.select_offset(-1);
    }

    fn select_offset(&mut self, delta: isize) {
        let rows = self.visible();
        if rows.is_empty() {
            self.selected = None;
            return;
        }
        let pos = self
            .selected
            .as_ref()
            .and_then(|sel| rows.iter().position(|row| &row.key == sel));
        let next = match pos {
            Some(p) => p.saturating_add_signed(delta).min(rows.len() - 1),
            None => 0,
        };
        self.selected = Some(rows[next].key.clone());
    }

    /// Invert the expansion of the selected node.
    pub fn toggle_expanded(&mut self) {
        if let Some(sel) = self.selected.clone()
            && let Some(node) = self.nodes.get_mut(&sel)
        {
            node.expanded = !node.expanded;
        }
    }

    /// The session that owns the given node (itself, for session nodes).
    pub fn session_of(&self, key: &NodeKey) -> Option<String> {
        if key.kind == ResourceKind::Session {
            return Some(key.key.clone());
        }
        for root in &self.roots {
            if self.subtree_contains(root, key) {
                return Some(root.key.clone());
            }
        }
        None
    }

    fn subtree_contains(&self, root: &NodeKey, target: &NodeKey) -> bool {
        if root == target {
            return true;
        }
        let Some(node) = self.nodes.get(root) else {
            return false;
        };
        node.children.iter().any(|c| self.subtree_contains(c, target))
    }

    /// Resolve the preview leaf for a node: a pane maps to itself, a window
    /// to its first pane, a session to the first pane of its first window.
    pub fn leaf_pane_of(&self, key: &NodeKey) -> Option<&Pane> {
        let node = self.nodes.get(key)?;
        match &node.resource {
            Resource::Pane(pane) => Some(pane),
            Resource::Window(_) | Resource::Session(_) => {
                let first = node.children.first()?;
                self.leaf_pane_of(first)
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail-soft fetch: a provider error at any level means empty children for
/// that subtree, never an aborted pass.
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

    #[test]
    fn builds_full_subtree_into_empty_tree() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w1"), vec![pane("%1", "vim"), pane("%2", "zsh")])],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        assert_eq!(tree.roots, vec![NodeKey::session("s1")]);
        let s1 = tree.get(&NodeKey::session("s1")).unwrap();
        assert_eq!(s1.children, vec![NodeKey::window("@1")]);
        assert!(!s1.expanded);
        let w1 = tree.get(&NodeKey::window("@1")).unwrap();
        assert_eq!(w1.children, vec![NodeKey::pane("%1"), NodeKey::pane("%2")]);
        assert!(!w1.expanded);
        assert!(tree.get(&NodeKey::pane("%2")).is_some());
        // Initial selection lands on the first visible row.
        assert_eq!(tree.selected, Some(NodeKey::session("s1")));
    }

    #[test]
    fn removal_deletes_exactly_the_vanished_subtree() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w1"), vec![pane("%1", "vim"), pane("%2", "zsh")])],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        // %1 goes away; everything else must survive untouched.
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w1"), vec![pane("%2", "zsh")])],
        )]);
        tree.reconcile(&fake);

        assert!(tree.get(&NodeKey::pane("%1")).is_none());
        assert!(tree.get(&NodeKey::pane("%2")).is_some());
        let w1 = tree.get(&NodeKey::window("@1")).unwrap();
        assert_eq!(w1.children, vec![NodeKey::pane("%2")]);
    }

    #[test]
    fn reorder_preserves_identity_expansion_and_position() {
        let fake = FakeTmux::default();
        fake.set(vec![
            (session("alpha"), vec![(window("@1", 0, "w"), vec![])]),
            (session("beta"), vec![(window("@2", 0, "w"), vec![])]),
        ]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);
        tree.selected = Some(NodeKey::session("alpha"));
        tree.toggle_expanded();
        assert!(tree.get(&NodeKey::session("alpha")).unwrap().expanded);

        // Same membership, reversed fetch order.
        fake.set(vec![
            (session("beta"), vec![(window("@2", 0, "w"), vec![])]),
            (session("alpha"), vec![(window("@1", 0, "w"), vec![])]),
        ]);
        tree.reconcile(&fake);

        // Matched nodes keep their original position and UI attributes.
        assert_eq!(
            tree.roots,
            vec![NodeKey::session("alpha"), NodeKey::session("beta")]
        );
        assert!(tree.get(&NodeKey::session("alpha")).unwrap().expanded);
        assert!(!tree.get(&NodeKey::session("beta")).unwrap().expanded);
    }

    #[test]
    fn insertion_appends_collapsed_after_matched() {
        let fake = FakeTmux::default();
        fake.set(vec![(session("s1"), vec![])]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        fake.set(vec![
            (session("s0"), vec![(window("@9", 0, "w"), vec![pane("%9", "sh")])]),
            (session("s1"), vec![]),
        ]);
        tree.reconcile(&fake);

        // s0 sorts first in the fetch but is appended after the matched s1.
        assert_eq!(tree.roots, vec![NodeKey::session("s1"), NodeKey::session("s0")]);
        let s0 = tree.get(&NodeKey::session("s0")).unwrap();
        assert!(!s0.expanded);
        assert_eq!(s0.children, vec![NodeKey::window("@9")]);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let fake = FakeTmux::default();
        fake.set(vec![
            (
                session("s1"),
                vec![
                    (window("@1", 0, "a"), vec![pane("%1", "vim")]),
                    (window("@2", 1, "b"), vec![]),
                ],
            ),
            (session("s2"), vec![]),
        ]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);
        let roots = tree.roots.clone();
        let nodes = tree.nodes.clone();

        tree.reconcile(&fake);
        assert_eq!(tree.roots, roots);
        assert_eq!(tree.nodes, nodes);
    }

    #[test]
    fn attribute_update_mutates_node_in_place() {
        let fake = FakeTmux::default();
        fake.set(vec![(session("s1"), vec![(window("@1", 0, "old"), vec![])])]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);
        tree.selected = Some(NodeKey::window("@1"));
        // Not reachable through navigation while collapsed, but expansion is
        // a per-node attribute and must survive the update regardless.
        if let Some(node) = tree.nodes.get_mut(&NodeKey::window("@1")) {
            node.expanded = true;
        }

        fake.set(vec![(session("s1"), vec![(window("@1", 0, "new"), vec![])])]);
        tree.reconcile(&fake);

        let w = tree.get(&NodeKey::window("@1")).unwrap();
        assert_eq!(w.title, "0 - new");
        assert!(w.expanded);
    }

    #[test]
    fn fetch_failure_empties_only_that_subtree() {
        let fake = FakeTmux::default();
        fake.set(vec![
            (session("ok"), vec![(window("@1", 0, "w"), vec![pane("%1", "sh")])]),
            (session("bad"), vec![(window("@2", 0, "w"), vec![pane("%2", "sh")])]),
        ]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        fake.fail_windows_for.lock().unwrap().insert("bad".to_string());
        tree.reconcile(&fake);

        // The failing session's children are gone, the sibling is intact.
        let bad = tree.get(&NodeKey::session("bad")).unwrap();
        assert!(bad.children.is_empty());
        let ok = tree.get(&NodeKey::session("ok")).unwrap();
        assert_eq!(ok.children, vec![NodeKey::window("@1")]);
        assert!(tree.get(&NodeKey::pane("%1")).is_some());
        assert!(tree.get(&NodeKey::pane("%2")).is_none());
    }

    #[test]
    fn session_fetch_failure_empties_the_tree_until_recovery() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w"), vec![pane("%1", "sh")])],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);
        assert!(!tree.is_empty());

        // Root-level failure reads as an empty snapshot: provider state wins.
        *fake.fail_sessions.lock().unwrap() = true;
        tree.reconcile(&fake);
        assert!(tree.is_empty());
        assert_eq!(tree.selected, None);

        *fake.fail_sessions.lock().unwrap() = false;
        tree.reconcile(&fake);
        assert!(!tree.is_empty());
        assert_eq!(tree.selected, Some(NodeKey::session("s1")));
    }

    #[test]
    fn vanished_selection_clamps_to_surviving_row() {
        let fake = FakeTmux::default();
        fake.set(vec![
            (session("a"), vec![]),
            (session("b"), vec![]),
            (session("c"), vec![]),
        ]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);
        tree.selected = Some(NodeKey::session("c"));

        fake.set(vec![(session("a"), vec![]), (session("b"), vec![])]);
        tree.reconcile(&fake);

        // Index 2 clamps to the new last row.
        assert_eq!(tree.selected, Some(NodeKey::session("b")));

        fake.set(vec![]);
        tree.reconcile(&fake);
        assert_eq!(tree.selected, None);
    }

    #[test]
    fn visible_honors_expansion() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w"), vec![pane("%1", "sh")])],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        assert_eq!(tree.visible().len(), 1);

        tree.selected = Some(NodeKey::session("s1"));
        tree.toggle_expanded();
        let rows = tree.visible();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].key, NodeKey::window("@1"));
        assert_eq!(rows[1].depth, 1);

        tree.selected = Some(NodeKey::window("@1"));
        tree.toggle_expanded();
        assert_eq!(tree.visible().len(), 3);
    }

    #[test]
    fn selection_moves_over_visible_rows_and_clamps_at_ends() {
        let fake = FakeTmux::default();
        fake.set(vec![(session("a"), vec![]), (session("b"), vec![])]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        assert_eq!(tree.selected, Some(NodeKey::session("a")));
        tree.select_prev();
        assert_eq!(tree.selected, Some(NodeKey::session("a")));
        tree.select_next();
        assert_eq!(tree.selected, Some(NodeKey::session("b")));
        tree.select_next();
        assert_eq!(tree.selected, Some(NodeKey::session("b")));
    }

    #[test]
    fn session_of_resolves_owning_root() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![(window("@1", 0, "w"), vec![pane("%1", "sh")])],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        assert_eq!(tree.session_of(&NodeKey::pane("%1")), Some("s1".to_string()));
        assert_eq!(tree.session_of(&NodeKey::window("@1")), Some("s1".to_string()));
        assert_eq!(tree.session_of(&NodeKey::session("s1")), Some("s1".to_string()));
        assert_eq!(tree.session_of(&NodeKey::pane("%404")), None);
    }

    #[test]
    fn leaf_pane_resolution_walks_first_children() {
        let fake = FakeTmux::default();
        fake.set(vec![(
            session("s1"),
            vec![
                (window("@1", 0, "w"), vec![pane("%1", "vim"), pane("%2", "sh")]),
                (window("@2", 1, "x"), vec![pane("%3", "top")]),
            ],
        )]);

        let mut tree = Tree::new();
        tree.reconcile(&fake);

        assert_eq!(
            tree.leaf_pane_of(&NodeKey::session("s1")).map(|p| p.id.as_str()),
            Some("%1")
        );
        assert_eq!(
            tree.leaf_pane_of(&NodeKey::window("@2")).map(|p| p.id.as_str()),
            Some("%3")
        );
        assert_eq!(
            tree.leaf_pane_of(&NodeKey::pane("%2")).map(|p| p.id.as_str()),
            Some("%2")
        );
    }
}
