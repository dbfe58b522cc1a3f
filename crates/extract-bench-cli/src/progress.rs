use extract_bench_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan and hash phases: spinner
/// - Inspect, convert and score phases: progress bar over the known total
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.cyan} {msg}"));
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn start_bar(&self, label: &str, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            style(&format!(
                "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} ({{eta}} remaining)",
                label
            ))
            .progress_chars("━╸─"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.slot();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn advance(&self, done: usize) {
        if let Some(pb) = self.slot().as_ref() {
            pb.set_position(done as u64);
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.slot().take() {
            pb.finish_and_clear();
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars(TICK_CHARS)
}

fn done(message: String) {
    eprintln!("  \x1b[32m✓\x1b[0m {}", message);
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        self.start_spinner("Scanning files...");
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Scan complete: {} files in {:.2}s",
            total_files, duration_secs
        ));
    }

    fn on_hash_start(&self) {
        self.start_spinner("Looking for duplicates...");
    }

    fn on_hash_complete(&self, duplicate_groups: usize, duplicates: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Hash complete: {} duplicates in {} groups in {:.2}s",
            duplicates, duplicate_groups, duration_secs
        ));
    }

    fn on_quarantine_complete(&self, moved: usize, skipped: usize, failed: usize) {
        done(format!(
            "Quarantine complete: {} moved, {} skipped, {} failed",
            moved, skipped, failed
        ));
    }

    fn on_inspect_start(&self, total: usize) {
        self.start_bar("Inspecting", total);
    }

    fn on_inspect_progress(&self, done: usize, _total: usize) {
        self.advance(done);
    }

    fn on_inspect_complete(&self, accepted: usize, rejected: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Inspection complete: {} accepted, {} rejected in {:.2}s",
            accepted, rejected, duration_secs
        ));
    }

    fn on_convert_start(&self, total: usize) {
        self.start_bar("Converting", total);
    }

    fn on_convert_progress(&self, done: usize, _total: usize) {
        self.advance(done);
    }

    fn on_convert_complete(&self, converted: usize, cached: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Conversion complete: {} converted, {} cached, {} failed in {:.2}s",
            converted, cached, failed, duration_secs
        ));
    }

    fn on_score_start(&self, total: usize) {
        self.start_bar("Scoring", total);
    }

    fn on_score_progress(&self, done: usize, _total: usize) {
        self.advance(done);
    }

    fn on_score_complete(&self, scored: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!("Scoring complete: {} files in {:.2}s", scored, duration_secs));
    }
}
