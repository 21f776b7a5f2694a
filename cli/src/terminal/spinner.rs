use std::io::{self, Write};
use std::sync::OnceLock;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

const TIP_DURATION: Duration = Duration::from_secs(2);
const MESSAGE_READ_TIME: Duration = Duration::from_secs(1);
const MIN_TIP_VISIBILITY: Duration = Duration::from_millis(750);
const TIPS: &[&str] = &["You can press 'q' to stop early and keep finished results"];

pub struct SpinnerHandle {
    spinner: ProgressBar,
    tx: Sender<String>,
}

impl SpinnerHandle {
    pub fn send_to_queue(&self, message: String) {
        let _ = self.tx.send(message);
    }

    pub fn println(&self, msg: &str) {
        self.spinner.println(msg);
    }

    pub fn is_active(&self) -> bool {
        !self.spinner.is_finished() && !self.spinner.is_hidden()
    }

    pub fn finish_and_clear(&self) {
        self.spinner.finish_and_clear();
    }
}

static SPINNER: OnceLock<SpinnerHandle> = OnceLock::new();

/// Starts the shared spinner. Later calls return the one already running.
pub fn start(show_tips: bool) -> &'static SpinnerHandle {
    SPINNER.get_or_init(|| init_spinner(show_tips))
}

pub fn stop() {
    if let Some(handle) = SPINNER.get() {
        handle.finish_and_clear();
    }
}

fn init_spinner(show_tips: bool) -> SpinnerHandle {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel::<String>();
    let pb_clone = pb.clone();

    thread::spawn(move || {
        let mut tip_index: usize = 0;
        let mut next_tip_time: Instant = Instant::now() + TIP_DURATION;
        let mut showing_tip_since: Option<Instant> = None;

        loop {
            if pb_clone.is_finished() {
                break;
            }

            let wait_time: Duration = next_tip_time.saturating_duration_since(Instant::now());

            match rx.recv_timeout(wait_time) {
                Ok(mut msg) => {
                    if let Some(since) = showing_tip_since.take() {
                        thread::sleep(MIN_TIP_VISIBILITY.saturating_sub(since.elapsed()));
                    }
                    while let Ok(newer_msg) = rx.try_recv() {
                        msg = newer_msg;
                    }
                    pb_clone.set_message(msg);
                    next_tip_time = Instant::now() + MESSAGE_READ_TIME;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if show_tips {
                        let tip: &str = TIPS[tip_index % TIPS.len()];
                        pb_clone.set_message(format!("{}", tip.italic().white()));
                        tip_index += 1;
                        showing_tip_since = Some(Instant::now());
                    }
                    next_tip_time = Instant::now() + TIP_DURATION;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    SpinnerHandle { spinner: pb, tx }
}

pub fn progress_message(completed: usize, total: usize) -> String {
    format!(
        "{} of {} probes completed...",
        completed.to_string().green().bold(),
        total.to_string().bold()
    )
}

pub fn report_progress(completed: usize, total: usize) {
    if let Some(handle) = SPINNER.get() {
        handle.send_to_queue(progress_message(completed, total));
    }
}

/// Log sink that prints above a running spinner and falls back to stderr.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match SPINNER.get() {
            Some(handle) if handle.is_active() => {
                let msg = String::from_utf8_lossy(buf);
                handle.println(msg.trim_end());
            }
            _ => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
