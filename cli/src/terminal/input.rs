use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watches the terminal for `q` (or Ctrl-C, which raw mode swallows) and
/// raises the scan's cancel flag. Raw mode is left again on drop.
pub struct KeyListener {
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    pub fn start(cancel: Arc<AtomicBool>) -> Self {
        let done: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
        let done_clone: Arc<AtomicBool> = Arc::clone(&done);

        let handle = thread::spawn(move || {
            if let Err(e) = enable_raw_mode() {
                debug!("Key listener disabled: {e}");
                return;
            }
            while !done_clone.load(Ordering::Relaxed) {
                if !matches!(event::poll(POLL_INTERVAL), Ok(true)) {
                    continue;
                }
                if let Ok(Event::Key(key)) = event::read()
                    && is_interrupt(&key)
                {
                    cancel.store(true, Ordering::Relaxed);
                    break;
                }
            }
            let _ = disable_raw_mode();
        });

        Self { done, handle: Some(handle) }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = disable_raw_mode();
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    let is_q: bool = key.code == KeyCode::Char('q');
    let is_ctrl_c: bool = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
    (is_q || is_ctrl_c) && key.kind == KeyEventKind::Press
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_and_ctrl_c_interrupt() {
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(is_interrupt(&q));
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&plain_c));
    }
}
