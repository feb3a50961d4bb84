//! Live view: terminal setup, key handling and the session observer.
//!
//! The session loop owns the thread. This app is its observer: each redraw
//! tick hands over a fresh window snapshot, and keys are polled between reads
//! through `stop_requested`.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use chamberlog_core::{SessionCounts, SessionObserver, WindowSnapshot};

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct LiveView {
    pub source: String,
    pub log_path: Option<PathBuf>,
    pub snapshot: WindowSnapshot,
    pub counts: SessionCounts,
    pub last_export: Option<PathBuf>,
    /// Set once the input has ended; the view stays up until the user quits.
    pub ended: bool,
}

pub struct LiveApp {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    view: LiveView,
    quit: bool,
    restored: bool,
}

impl LiveApp {
    /// Switch the terminal to raw mode on the alternate screen.
    pub fn enter(source: String, log_path: Option<PathBuf>) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        // Restore the terminal before the panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let mut app = Self {
            terminal,
            view: LiveView {
                source,
                log_path,
                ..LiveView::default()
            },
            quit: false,
            restored: false,
        };
        app.draw()?;
        Ok(app)
    }

    /// Leave the alternate screen. Safe to call more than once.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;
        Ok(())
    }

    /// Keep the final frame on screen until the user quits.
    pub fn wait_for_quit(&mut self, stop: &AtomicBool) -> io::Result<()> {
        self.view.ended = true;
        self.draw()?;
        while !self.quit && !stop.load(Ordering::SeqCst) {
            self.poll_keys(Duration::from_millis(100))?;
        }
        Ok(())
    }

    pub fn last_export(&self) -> Option<&PathBuf> {
        self.view.last_export.as_ref()
    }

    fn draw(&mut self) -> io::Result<()> {
        let view = &self.view;
        self.terminal.draw(|f| super::ui::draw(f, view))?;
        Ok(())
    }

    /// Handle every key that arrives within `timeout`.
    fn poll_keys(&mut self, timeout: Duration) -> io::Result<()> {
        let mut wait = timeout;
        while event::poll(wait)? {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key)?;
            }
            wait = Duration::ZERO;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> io::Result<()> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char('s') => {
                match export_snapshot(&self.view) {
                    Ok(path) => self.view.last_export = Some(path),
                    Err(e) => log::warn!("snapshot export failed: {e}"),
                }
                self.draw()?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl SessionObserver for LiveApp {
    fn redraw(&mut self, snapshot: &WindowSnapshot, counts: &SessionCounts) -> io::Result<()> {
        self.view.snapshot = snapshot.clone();
        self.view.counts = *counts;
        self.draw()
    }

    fn stop_requested(&mut self) -> bool {
        if let Err(e) = self.poll_keys(Duration::ZERO) {
            log::warn!("reading terminal events: {e}");
        }
        self.quit
    }
}

impl Drop for LiveApp {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Write the current window and counts as pretty JSON in the working directory.
fn export_snapshot(view: &LiveView) -> io::Result<PathBuf> {
    let json = serde_json::json!({
        "source": view.source,
        "log_path": view.log_path,
        "counts": view.counts,
        "first_index": view.snapshot.first_index,
        "samples": view.snapshot.samples,
    });

    let epoch = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = PathBuf::from(format!("chamberlog-snapshot-{epoch}.json"));
    std::fs::write(&path, serde_json::to_string_pretty(&json)?)?;
    Ok(path)
}
