/// Trait for reporting progress of long-running steps.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations, and implementations must tolerate calls from rayon
/// worker threads.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _total_entries: usize) {}
    fn on_scan_progress(&self, _entries_done: usize, _current: &str) {}
    fn on_scan_complete(&self, _total_entries: usize, _duration_secs: f64) {}
    fn on_index_complete(&self, _categories: usize, _duration_secs: f64) {}
    fn on_apply_start(&self, _placements: usize) {}
    fn on_apply_progress(&self, _done: usize, _total: usize, _current: &str) {}
    fn on_apply_complete(&self, _moved: usize, _skipped: usize, _duration_secs: f64) {}
    fn on_undo_start(&self, _operations: usize) {}
    fn on_undo_progress(&self, _done: usize, _total: usize, _current: &str) {}
    fn on_undo_complete(&self, _restored: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
