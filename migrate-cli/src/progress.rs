//! Terminal progress rendering (out of scope for `migrate-core`, §1): a
//! thin `ProgressSink` that prints one overwriting status line per stage.

use std::io::Write as _;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use migrate_core::ProgressSink;

pub struct TerminalProgressSink {
    stage: String,
    printed_anything: AtomicBool,
}

impl TerminalProgressSink {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            printed_anything: AtomicBool::new(false),
        }
    }
}

impl ProgressSink for TerminalProgressSink {
    fn on_progress(&self, done: usize, total: usize, item_info: &str) {
        self.printed_anything.store(true, Ordering::Relaxed);
        tracing::debug!(stage = %self.stage, done, total, item_info, "progress");
        eprint!("\r{}: {done}/{total} {item_info}\u{1b}[K", self.stage);
        let _ = std::io::stderr().flush();
    }
}

impl Drop for TerminalProgressSink {
    fn drop(&mut self) {
        if self.printed_anything.load(Ordering::Relaxed) {
            eprintln!();
        }
    }
}
