/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif bars. Every method has a no-op default,
/// and the per-item methods are called from worker threads.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self) {}
    fn on_hash_complete(&self, _duplicate_groups: usize, _duplicates: usize, _duration_secs: f64) {}
    fn on_quarantine_complete(&self, _moved: usize, _skipped: usize, _failed: usize) {}
    fn on_inspect_start(&self, _total: usize) {}
    fn on_inspect_progress(&self, _done: usize, _total: usize) {}
    fn on_inspect_complete(&self, _accepted: usize, _rejected: usize, _duration_secs: f64) {}
    fn on_convert_start(&self, _total: usize) {}
    fn on_convert_progress(&self, _done: usize, _total: usize) {}
    fn on_convert_complete(&self, _converted: usize, _cached: usize, _failed: usize, _duration_secs: f64) {}
    fn on_score_start(&self, _total: usize) {}
    fn on_score_progress(&self, _done: usize, _total: usize) {}
    fn on_score_complete(&self, _scored: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
