mod config;
mod queue;
mod tmux;
mod tui;

use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::tmux::{Resource, ShellTmux, TmuxClient};

#[derive(Parser)]
#[command(name = "muxman", version = env!("MUXMAN_VERSION"), about = "Browse and manage tmux sessions, windows and panes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI dashboard (default)
    Dashboard,
    /// List sessions with their windows and panes
    Ls,
    /// Create a new detached session
    New {
        /// Session name
        name: String,
    },
    /// Kill a session
    KillSession {
        /// Session name
        name: String,
    },
    /// Rename a session
    RenameSession {
        /// Current session name
        name: String,
        /// New session name
        new_name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ShellTmux;

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Ls => {
            let sessions = client.list_sessions()?;
            if sessions.is_empty() {
                println!("No sessions.");
                return Ok(());
            }
            for session in &sessions {
                let attached = if session.attached { " (attached)" } else { "" };
                println!("{}{attached}", session.name);
                for window in client.list_windows(&session.name)? {
                    println!("  {} {} - {}", window.id, window.index, window.name);
                    for pane in client.list_panes(&window.id)? {
                        println!("    {} {}", pane.id, pane.current_command);
                    }
                }
            }
            Ok(())
        }
        Commands::New { name } => {
            let session = client.create_session(&name)?;
            println!("Created session '{}'", session.name);
            Ok(())
        }
        Commands::KillSession { name } => {
            let session = find_session(&client, &name)?;
            client.kill(&Resource::Session(session))?;
            println!("Killed session '{name}'");
            Ok(())
        }
        Commands::RenameSession { name, new_name } => {
            let session = find_session(&client, &name)?;
            client.rename(&Resource::Session(session), &new_name)?;
            println!("Renamed session '{name}' to '{new_name}'");
            Ok(())
        }
        Commands::Dashboard => {
            config::ensure_dirs()?;
            init_logging()?;
            let cfg = config::load()?;
            tui::run(Arc::new(ShellTmux), &cfg)
        }
    }
}

/// Route tracing output to ~/.muxman/muxman.log; the terminal belongs to the
/// dashboard.
fn init_logging() -> Result<()> {
    let path = config::log_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .init();
    Ok(())
}

fn find_session(client: &ShellTmux, name: &str) -> Result<tmux::Session> {
    let sessions = client.list_sessions()?;
    sessions
        .into_iter()
        .find(|s| s.name == name)
        .with_context(|| format!("session '{name}' not found"))
}
