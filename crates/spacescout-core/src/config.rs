use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Engine configuration. Thresholds and windows are product decisions,
/// so none of them are hard-coded at use sites.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum Hamming distance (out of 64 bits) at which a photo joins an
    /// existing perceptual-hash cluster instead of starting its own.
    #[serde(default = "default_phash_max_distance")]
    pub phash_max_distance: u32,
    /// Items accessed within this many days count as recently used.
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
    /// Items untouched for longer than this many days are flagged for review.
    #[serde(default = "default_stale_window_days")]
    pub stale_window_days: i64,
    /// Worker-pool width for plan commits.
    #[serde(default = "default_commit_concurrency")]
    pub commit_concurrency: usize,
    /// Per-item timeout handed to the storage mutator on commit.
    #[serde(default = "default_mutator_timeout_ms")]
    pub mutator_timeout_ms: u64,
    /// Roots the CLI filesystem source walks.
    #[serde(default)]
    pub scan_roots: Vec<String>,
    /// Glob patterns the filesystem source skips.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_phash_max_distance() -> u32 {
    10
}

fn default_recent_window_days() -> i64 {
    30
}

fn default_stale_window_days() -> i64 {
    180
}

fn default_commit_concurrency() -> usize {
    4
}

fn default_mutator_timeout_ms() -> u64 {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phash_max_distance: default_phash_max_distance(),
            recent_window_days: default_recent_window_days(),
            stale_window_days: default_stale_window_days(),
            commit_concurrency: default_commit_concurrency(),
            mutator_timeout_ms: default_mutator_timeout_ms(),
            scan_roots: vec![],
            ignore_patterns: vec![],
        }
    }
}

impl EngineConfig {
    pub fn mutator_timeout(&self) -> Duration {
        Duration::from_millis(self.mutator_timeout_ms)
    }
}

pub fn load_configuration() -> Result<EngineConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<EngineConfig>()
}

/// Remove scan roots that are nested under other roots in the list, so the
/// filesystem source never lists the same file twice.
pub fn non_overlapping_roots(roots: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    'outer: for root in roots {
        let root_path = Path::new(&root);

        for kept in &result {
            if root_path.starts_with(Path::new(kept)) {
                continue 'outer;
            }
        }

        // Keeping this root may make previously-kept subdirectories redundant.
        result.retain(|kept| !Path::new(kept).starts_with(root_path));
        result.push(root);
    }

    result
}
