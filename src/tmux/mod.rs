use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use chrono::{Local, TimeZone};

/// A tmux session. Identity key is the session name: unique at any instant,
/// but reused across renames (see `Resource::key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub created: i64,
    pub last_attached: i64,
    pub activity: i64,
    pub attached: bool,
}

/// A tmux window. Identity key is the server-assigned id (`@n`), stable for
/// the window's lifetime regardless of renames or index moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: String,
    pub index: u32,
    pub name: String,
    pub active: bool,
    pub activity: i64,
    pub width: u32,
    pub height: u32,
    pub active_clients: u32,
}

/// A tmux pane. Identity key is the server-assigned id (`%n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub id: String,
    pub pid: u32,
    pub current_command: String,
    pub current_path: String,
    pub title: String,
    pub active: bool,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Session,
    Window,
    Pane,
}

/// One resource of any level, as a closed variant. Everything that depends on
/// the resource kind (identity, titles, kill/rename targets) matches on this
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Session(Session),
    Window(Window),
    Pane(Pane),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Session(_) => ResourceKind::Session,
            Resource::Window(_) => ResourceKind::Window,
            Resource::Pane(_) => ResourceKind::Pane,
        }
    }

    /// The stable identity key within the parent scope.
    pub fn key(&self) -> &str {
        match self {
            Resource::Session(s) => &s.name,
            Resource::Window(w) => &w.id,
            Resource::Pane(p) => &p.id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Resource::Session(_) => "session",
            Resource::Window(_) => "window",
            Resource::Pane(_) => "pane",
        }
    }

    /// The name shown in the rename editor. Panes carry no renameable name.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Resource::Session(s) => Some(&s.name),
            Resource::Window(w) => Some(&w.name),
            Resource::Pane(_) => None,
        }
    }

    /// One-line title for the tree view.
    pub fn display_title(&self) -> String {
        match self {
            Resource::Session(s) => {
                format!("({}) - {}", format_unix(s.activity), s.name)
            }
            Resource::Window(w) => {
                let active = if w.active { " (active)" } else { "" };
                format!("{} - {}{}", w.index, w.name, active)
            }
            Resource::Pane(p) => {
                let active = if p.active { " (active)" } else { "" };
                format!("{}{}", p.current_command, active)
            }
        }
    }
}

/// Format a unix-seconds timestamp for display. Zero (never attached etc.)
/// and out-of-range values render as a dash.
pub fn format_unix(ts: i64) -> String {
    if ts <= 0 {
        return "-".to_string();
    }
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map_or_else(|| "-".to_string(), |dt| dt.format("%d %b %H:%M").to_string())
}

// ── Provider trait ───────────────────────────────────────────────────

/// The external resource provider. The TUI only ever talks to tmux through
/// this seam; tests substitute an in-memory fake.
pub trait TmuxClient: Send + Sync {
    fn list_sessions(&self) -> Result<Vec<Session>>;
    fn list_windows(&self, session_name: &str) -> Result<Vec<Window>>;
    fn list_panes(&self, window_id: &str) -> Result<Vec<Pane>>;
    fn kill(&self, target: &Resource) -> Result<()>;
    fn rename(&self, target: &Resource, new_name: &str) -> Result<()>;
    fn create_session(&self, name: &str) -> Result<Session>;
    /// Blocking: transfers terminal control until the user detaches.
    fn attach(&self, session_name: &str) -> Result<()>;
    fn capture_pane(&self, pane_id: &str) -> Result<String>;
}

// ── Shell implementation ─────────────────────────────────────────────

const SESSION_FORMAT: &str = "#{session_name}\t#{session_created}\t#{session_last_attached}\t#{session_activity}\t#{session_attached}";
const WINDOW_FORMAT: &str = "#{window_id}\t#{window_index}\t#{window_name}\t#{window_active}\t#{window_activity}\t#{window_width}\t#{window_height}\t#{window_active_clients}";
const PANE_FORMAT: &str = "#{pane_id}\t#{pane_pid}\t#{pane_current_command}\t#{pane_current_path}\t#{pane_title}\t#{pane_active}\t#{pane_width}\t#{pane_height}";

/// `TmuxClient` backed by the `tmux` binary.
pub struct ShellTmux;

impl ShellTmux {
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("tmux")
            .args(args)
            .output()
            .with_context(|| format!("failed to run tmux {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "tmux {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TmuxClient for ShellTmux {
    fn list_sessions(&self) -> Result<Vec<Session>> {
        let out = self.run(&["list-sessions", "-F", SESSION_FORMAT])?;
        out.lines().map(parse_session_line).collect()
    }

    fn list_windows(&self, session_name: &str) -> Result<Vec<Window>> {
        let out = self.run(&["list-windows", "-t", session_name, "-F", WINDOW_FORMAT])?;
        out.lines().map(parse_window_line).collect()
    }

    fn list_panes(&self, window_id: &str) -> Result<Vec<Pane>> {
        let out = self.run(&["list-panes", "-t", window_id, "-F", PANE_FORMAT])?;
        out.lines().map(parse_pane_line).collect()
    }

    fn kill(&self, target: &Resource) -> Result<()> {
        match target {
            Resource::Session(s) => self.run(&["kill-session", "-t", &s.name])?,
            Resource::Window(w) => self.run(&["kill-window", "-t", &w.id])?,
            Resource::Pane(p) => self.run(&["kill-pane", "-t", &p.id])?,
        };
        Ok(())
    }

    fn rename(&self, target: &Resource, new_name: &str) -> Result<()> {
        match target {
            Resource::Session(s) => {
                self.run(&["rename-session", "-t", &s.name, new_name])?;
            }
            Resource::Window(w) => {
                self.run(&["rename-window", "-t", &w.id, new_name])?;
            }
            Resource::Pane(_) => bail!("panes cannot be renamed"),
        }
        Ok(())
    }

    fn create_session(&self, name: &str) -> Result<Session> {
        let out = self.run(&["new-session", "-d", "-s", name, "-P", "-F", SESSION_FORMAT])?;
        let line = out
            .lines()
            .next()
            .context("tmux new-session printed no session info")?;
        parse_session_line(line)
    }

    fn attach(&self, session_name: &str) -> Result<()> {
        // Inherits the real terminal; blocks until the client detaches.
        let status = Command::new("tmux")
            .args(["attach-session", "-t", session_name])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .context("failed to run tmux attach-session")?;

        if !status.success() {
            bail!("tmux attach-session -t {session_name} exited with {status}");
        }
        Ok(())
    }

    fn capture_pane(&self, pane_id: &str) -> Result<String> {
        self.run(&["capture-pane", "-p", "-t", pane_id])
    }
}

// ── Format-line parsing ──────────────────────────────────────────────

fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != expected {
        bail!(
            "expected {expected} tab-separated fields, got {}: {line:?}",
            fields.len()
        );
    }
    Ok(fields)
}

fn parse_flag(s: &str) -> bool {
    // tmux renders flags as "1"/"0"; session_attached counts clients.
    s.parse::<u32>().unwrap_or(0) > 0
}

fn parse_session_line(line: &str) -> Result<Session> {
    let f = split_fields(line, 5)?;
    Ok(Session {
        name: f[0].to_string(),
        created: f[1].parse().unwrap_or(0),
        last_attached: f[2].parse().unwrap_or(0),
        activity: f[3].parse().unwrap_or(0),
        attached: parse_flag(f[4]),
    })
}

fn parse_window_line(line: &str) -> Result<Window> {
    let f = split_fields(line, 8)?;
    Ok(Window {
        id: f[0].to_string(),
        index: f[1].parse().with_context(|| format!("bad window index in {line:?}"))?,
        name: f[2].to_string(),
        active: parse_flag(f[3]),
        activity: f[4].parse().unwrap_or(0),
        width: f[5].parse().unwrap_or(0),
        height: f[6].parse().unwrap_or(0),
        active_clients: f[7].parse().unwrap_or(0),
    })
}

fn parse_pane_line(line: &str) -> Result<Pane> {
    let f = split_fields(line, 8)?;
    Ok(Pane {
        id: f[0].to_string(),
        pid: f[1].parse().with_context(|| format!("bad pane pid in {line:?}"))?,
        current_command: f[2].to_string(),
        current_path: f[3].to_string(),
        title: f[4].to_string(),
        active: parse_flag(f[5]),
        width: f[6].parse().unwrap_or(0),
        height: f[7].parse().unwrap_or(0),
    })
}

// ── Test support ─────────────────────────────────────────────────────

/// In-memory `TmuxClient` used across the crate's unit tests: a nested
/// session/window/pane layout, per-target failure injection, and a log of
/// issued mutations.
#[cfg(test)]
pub mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use anyhow::bail;

    use super::*;

    #[derive(Default)]
    pub struct FakeTmux {
        sessions: Mutex<Vec<Session>>,
        windows: Mutex<HashMap<String, Vec<Window>>>,
        panes: Mutex<HashMap<String, Vec<Pane>>>,
        pub fail_sessions: Mutex<bool>,
        pub fail_windows_for: Mutex<HashSet<String>>,
        pub mutations: Mutex<Vec<String>>,
    }

    impl FakeTmux {
        /// Replace the whole layout: sessions with their windows and panes.
        pub fn set(&self, layout: Vec<(Session, Vec<(Window, Vec<Pane>)>)>) {
            let mut sessions = self.sessions.lock().unwrap();
            let mut windows = self.windows.lock().unwrap();
            let mut panes = self.panes.lock().unwrap();
            sessions.clear();
            windows.clear();
            panes.clear();
            for (session, wins) in layout {
                let mut ws = Vec::new();
                for (window, ps) in wins {
                    panes.insert(window.id.clone(), ps);
                    ws.push(window);
                }
                windows.insert(session.name.clone(), ws);
                sessions.push(session);
            }
        }
    }

    impl TmuxClient for FakeTmux {
        fn list_sessions(&self) -> Result<Vec<Session>> {
            if *self.fail_sessions.lock().unwrap() {
                bail!("no server running");
            }
            Ok(self.sessions.lock().unwrap().clone())
        }

        fn list_windows(&self, session_name: &str) -> Result<Vec<Window>> {
            if self.fail_windows_for.lock().unwrap().contains(session_name) {
                bail!("no server running");
            }
            Ok(self
                .windows
                .lock()
                .unwrap()
                .get(session_name)
                .cloned()
                .unwrap_or_default())
        }

        fn list_panes(&self, window_id: &str) -> Result<Vec<Pane>> {
            Ok(self
                .panes
                .lock()
                .unwrap()
                .get(window_id)
                .cloned()
                .unwrap_or_default())
        }

        fn kill(&self, target: &Resource) -> Result<()> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("kill {} {}", target.type_name(), target.key()));
            Ok(())
        }

        fn rename(&self, target: &Resource, new_name: &str) -> Result<()> {
            self.mutations.lock().unwrap().push(format!(
                "rename {} {} -> {new_name}",
                target.type_name(),
                target.key()
            ));
            Ok(())
        }

        fn create_session(&self, name: &str) -> Result<Session> {
            self.mutations.lock().unwrap().push(format!("create {name}"));
            Ok(session(name))
        }

        fn attach(&self, session_name: &str) -> Result<()> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("attach {session_name}"));
            Ok(())
        }

        fn capture_pane(&self, pane_id: &str) -> Result<String> {
            Ok(format!("contents of {pane_id}"))
        }
    }

    pub fn session(name: &str) -> Session {
        Session {
            name: name.to_string(),
            created: 100,
            last_attached: 200,
            activity: 300,
            attached: false,
        }
    }

    pub fn window(id: &str, index: u32, name: &str) -> Window {
        Window {
            id: id.to_string(),
            index,
            name: name.to_string(),
            active: false,
            activity: 0,
            width: 80,
            height: 24,
            active_clients: 0,
        }
    }

    pub fn pane(id: &str, command: &str) -> Pane {
        Pane {
            id: id.to_string(),
            pid: 1,
            current_command: command.to_string(),
            current_path: "/".to_string(),
            title: String::new(),
            active: false,
            width: 80,
            height: 24,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_session() {
        let s = parse_session_line("main\t1700000000\t1700001000\t1700002000\t1").unwrap();
        assert_eq!(s.name, "main");
        assert_eq!(s.created, 1_700_000_000);
        assert_eq!(s.last_attached, 1_700_001_000);
        assert_eq!(s.activity, 1_700_002_000);
        assert!(s.attached);
    }

    #[test]
    fn parse_session_never_attached() {
        let s = parse_session_line("scratch\t1700000000\t\t1700000000\t0").unwrap();
        assert_eq!(s.last_attached, 0);
        assert!(!s.attached);
    }

    #[test]
    fn parse_window() {
        let w = parse_window_line("@3\t1\tvim\t1\t1700002000\t120\t40\t2").unwrap();
        assert_eq!(w.id, "@3");
        assert_eq!(w.index, 1);
        assert_eq!(w.name, "vim");
        assert!(w.active);
        assert_eq!((w.width, w.height), (120, 40));
        assert_eq!(w.active_clients, 2);
    }

    #[test]
    fn parse_pane() {
        let p = parse_pane_line("%7\t4242\tzsh\t/home/me/src\tshell\t0\t120\t40").unwrap();
        assert_eq!(p.id, "%7");
        assert_eq!(p.pid, 4242);
        assert_eq!(p.current_command, "zsh");
        assert_eq!(p.current_path, "/home/me/src");
        assert!(!p.active);
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert!(parse_session_line("just-a-name").is_err());
        assert!(parse_window_line("@1\t0\tname").is_err());
    }

    #[test]
    fn resource_keys() {
        let s = Resource::Session(Session {
            name: "main".into(),
            created: 0,
            last_attached: 0,
            activity: 0,
            attached: false,
        });
        assert_eq!(s.key(), "main");
        assert_eq!(s.kind(), ResourceKind::Session);
        assert_eq!(s.type_name(), "session");
    }

    #[test]
    fn window_title_marks_active() {
        let w = Resource::Window(Window {
            id: "@1".into(),
            index: 2,
            name: "logs".into(),
            active: true,
            activity: 0,
            width: 80,
            height: 24,
            active_clients: 0,
        });
        assert_eq!(w.display_title(), "2 - logs (active)");
    }

    #[test]
    fn pane_title_is_command() {
        let p = Resource::Pane(Pane {
            id: "%1".into(),
            pid: 1,
            current_command: "htop".into(),
            current_path: "/".into(),
            title: String::new(),
            active: false,
            width: 80,
            height: 24,
        });
        assert_eq!(p.display_title(), "htop");
        assert!(p.display_name().is_none());
    }
}
