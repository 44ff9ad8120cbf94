use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sortbox_core::ProgressReporter;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan: spinner over top-level items
/// - Apply / undo: bar, total known from the plan or log
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICKS);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn counted(label: &str, total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let template =
        format!("  {{spinner:.cyan}} {label} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {{msg}}");
    let style = ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICKS);
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.guard();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.guard().take() {
            pb.finish_and_clear();
        }
    }

    fn advance(&self, done: usize, current: &str) {
        if let Some(pb) = self.guard().as_ref() {
            pb.set_position(done as u64);
            pb.set_message(current.to_string());
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, total_entries: usize) {
        self.set_bar(spinner(&format!("Scanning {} items...", total_entries)));
    }

    fn on_scan_progress(&self, entries_done: usize, current: &str) {
        if let Some(pb) = self.guard().as_ref() {
            pb.set_message(format!("Scanning... {} done, {}", entries_done, current));
        }
    }

    fn on_scan_complete(&self, total_entries: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} items in {:.2}s",
            total_entries, duration_secs
        );
    }

    fn on_index_complete(&self, categories: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Library indexed: {} categories in {:.2}s",
            categories, duration_secs
        );
    }

    fn on_apply_start(&self, placements: usize) {
        self.set_bar(counted("Moving", placements));
    }

    fn on_apply_progress(&self, done: usize, _total: usize, current: &str) {
        self.advance(done, current);
    }

    fn on_apply_complete(&self, moved: usize, skipped: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Apply complete: {} moved, {} skipped in {:.2}s",
            moved, skipped, duration_secs
        );
    }

    fn on_undo_start(&self, operations: usize) {
        self.set_bar(counted("Restoring", operations));
    }

    fn on_undo_progress(&self, done: usize, _total: usize, current: &str) {
        self.advance(done, current);
    }

    fn on_undo_complete(&self, restored: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Undo complete: {} restored, {} failed in {:.2}s",
            restored, failed, duration_secs
        );
    }
}
