mod app;
mod event;
mod keymap;
mod panel;
pub mod theme;
mod tree;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use ratatui::DefaultTerminal;

use crate::config::Config;
use crate::tmux::TmuxClient;

pub fn run(client: Arc<dyn TmuxClient>, config: &Config) -> Result<()> {
    let mut terminal = ratatui::init();
    let mut app = app::App::new(client, config)?;
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}

/// Yield terminal control to a blocking foreground operation (attach) and
/// re-enter the TUI afterwards.
pub fn suspend<T>(terminal: &mut DefaultTerminal, f: impl FnOnce() -> T) -> T {
    ratatui::restore();
    let value = f();
    *terminal = ratatui::init();
    value
}
