use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};

pub enum AppEvent {
    Key(KeyEvent),
    /// A background task finished a mutation; re-sync the active view.
    Refresh,
    /// A background task wants the named session attached. The takeover has
    /// to happen on the UI thread, where the terminal can be suspended.
    Attach(String),
    /// A background task reports a user-visible message (mutation failures).
    Status(String),
    Tick,
}

/// Wait for the next event: background-task messages first, then terminal
/// input, falling back to a tick when `tick_rate` elapses idle.
///
/// Input polling runs in short slices so queued task messages are picked up
/// promptly even while blocked waiting on the keyboard.
pub fn poll(tick_rate: Duration, rx: &Receiver<AppEvent>) -> Result<AppEvent> {
    let deadline = Instant::now() + tick_rate;
    loop {
        if let Ok(ev) = rx.try_recv() {
            return Ok(ev);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(AppEvent::Tick);
        }
        let slice = (deadline - now).min(Duration::from_millis(50));
        if event::poll(slice)?
            && let Event::Key(key) = event::read()?
        {
            return Ok(AppEvent::Key(key));
        }
    }
}
