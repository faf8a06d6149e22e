use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use spacescout_core::ProgressReporter;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Listing: spinner (total unknown upfront)
/// - Fingerprinting: bar (total known after listing)
/// - Commit: bar over plan entries
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn counted_bar(&self, template: &str) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap()
                .progress_chars("━╸─")
                .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn advance(&self, done: usize, total: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(done as u64);
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_list_start(&self) {
        self.spinner("Listing items...");
    }

    fn on_list_complete(&self, total_items: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Listing complete: {} items in {:.2}s",
            total_items, duration_secs
        );
    }

    fn on_fingerprint_start(&self) {
        self.counted_bar(
            "  {spinner:.cyan} Fingerprinting [{bar:30.cyan/dim}] {pos}/{len} items ({eta} remaining)",
        );
    }

    fn on_fingerprint_progress(&self, done: usize, total: usize) {
        self.advance(done, total);
    }

    fn on_fingerprint_complete(&self, skipped: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Fingerprinting complete in {:.2}s ({} unreadable, skipped)",
            duration_secs, skipped
        );
    }

    fn on_index_complete(&self, duplicate_clusters: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Clustering complete: {} duplicate groups in {:.2}s",
            duplicate_clusters, duration_secs
        );
    }

    fn on_classify_complete(&self, safe_to_delete: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Classification complete: {} items safe to delete ({:.2}s)",
            safe_to_delete, duration_secs
        );
    }

    fn on_commit_start(&self, total_items: usize) {
        self.counted_bar(
            "  {spinner:.cyan} Deleting [{bar:30.cyan/dim}] {pos}/{len} items ({eta} remaining)",
        );
        self.advance(0, total_items);
    }

    fn on_commit_progress(&self, done: usize, total: usize) {
        self.advance(done, total);
    }

    fn on_commit_complete(&self, succeeded: usize, failed: usize, bytes_freed: u64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Cleanup complete: {} deleted, {} failed, {} bytes freed",
            succeeded, failed, bytes_freed
        );
    }
}
