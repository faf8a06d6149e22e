/// Trait for reporting pipeline progress.
///
/// The CLI implements this with indicatif progress bars; embedders can plug
/// in their own. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_list_start(&self) {}
    fn on_list_complete(&self, _total_items: usize, _duration_secs: f64) {}
    fn on_fingerprint_start(&self) {}
    fn on_fingerprint_progress(&self, _done: usize, _total: usize) {}
    fn on_fingerprint_complete(&self, _skipped: usize, _duration_secs: f64) {}
    fn on_index_complete(&self, _duplicate_clusters: usize, _duration_secs: f64) {}
    fn on_classify_complete(&self, _safe_to_delete: usize, _duration_secs: f64) {}
    fn on_commit_start(&self, _total_items: usize) {}
    fn on_commit_progress(&self, _done: usize, _total: usize) {}
    fn on_commit_complete(&self, _succeeded: usize, _failed: usize, _bytes_freed: u64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
