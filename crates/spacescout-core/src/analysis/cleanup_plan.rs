use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::model::{CatalogEntry, PolicyTag};
use crate::progress::ProgressReporter;
use crate::source::{MutatorError, StorageMutator};

/// What the planner does to an item. Deletion is the only action today;
/// the mutator decides what that means per kind (uninstall vs file removal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanAction {
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Draft,
    Committed,
    Failed,
}

/// How a plan's items are chosen: an explicit id list, or everything
/// carrying a given policy tag.
#[derive(Debug, Clone)]
pub enum Selection {
    Items(Vec<String>),
    Tagged(PolicyTag),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub item_id: String,
    pub size_bytes: u64,
    pub action: PlanAction,
}

/// An ordered, reversible-until-commit deletion plan. A snapshot: the
/// estimate is fixed at creation time and does not track later item changes.
/// References items by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupPlan {
    pub id: u64,
    pub entries: Vec<PlanEntry>,
    pub estimated_bytes_freed: u64,
    pub status: PlanStatus,
    /// Unix timestamp (seconds) of plan creation.
    pub created_at: i64,
}

/// Outcome of one plan entry after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDisposition {
    Deleted { bytes_freed: u64 },
    Failed { error: MutatorError },
    /// Commit was cancelled before this entry was issued.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ItemCommitResult {
    pub item_id: String,
    pub disposition: CommitDisposition,
}

/// Per-item results (in plan order), true bytes freed as reported by the
/// mutator, and the final plan status. Partial success is a first-class
/// outcome.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub results: Vec<ItemCommitResult>,
    pub bytes_freed: u64,
    pub status: PlanStatus,
}

impl CommitOutcome {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.disposition, CommitDisposition::Deleted { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn deleted_item_ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| matches!(r.disposition, CommitDisposition::Deleted { .. }))
            .map(|r| r.item_id.as_str())
            .collect()
    }
}

#[derive(Clone)]
pub struct CommitOptions {
    /// Per-item timeout handed to the mutator.
    pub mutator_timeout: Duration,
    /// Worker-pool width for issuing deletions.
    pub concurrency: usize,
    /// Cooperative cancel flag: setting it stops new deletions from being
    /// issued, in-flight ones finish and are reported normally.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            mutator_timeout: Duration::from_secs(10),
            concurrency: 4,
            cancel: None,
        }
    }
}

/// Build a plan from a selection, validating against the current catalog.
/// Unknown ids reject the whole plan — no partial creation.
pub fn build_plan(
    plan_id: u64,
    selection: &Selection,
    entries: &BTreeMap<String, CatalogEntry>,
    tags: &BTreeMap<String, PolicyTag>,
    created_at: i64,
) -> Result<CleanupPlan, Error> {
    let plan_entries: Vec<PlanEntry> = match selection {
        Selection::Items(ids) => {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !entries.contains_key(*id))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(Error::UnknownItem(missing));
            }

            let mut seen = std::collections::HashSet::new();
            ids.iter()
                .filter(|id| seen.insert(id.as_str()))
                .map(|id| PlanEntry {
                    item_id: id.clone(),
                    size_bytes: entries[id].item.size_bytes,
                    action: PlanAction::Delete,
                })
                .collect()
        }
        Selection::Tagged(tag) => {
            // Biggest first, ties by id: frees the most space soonest and
            // keeps plan order deterministic.
            let mut selected: Vec<&CatalogEntry> = tags
                .iter()
                .filter(|(_, t)| **t == *tag)
                .filter_map(|(id, _)| entries.get(id))
                .collect();
            selected.sort_by(|a, b| {
                b.item
                    .size_bytes
                    .cmp(&a.item.size_bytes)
                    .then_with(|| a.item.id.cmp(&b.item.id))
            });
            selected
                .into_iter()
                .map(|e| PlanEntry {
                    item_id: e.item.id.clone(),
                    size_bytes: e.item.size_bytes,
                    action: PlanAction::Delete,
                })
                .collect()
        }
    };

    let estimated_bytes_freed = plan_entries.iter().map(|e| e.size_bytes).sum();

    debug!(
        "plan {} created: {} entries, {} bytes estimated",
        plan_id,
        plan_entries.len(),
        estimated_bytes_freed
    );

    Ok(CleanupPlan {
        id: plan_id,
        entries: plan_entries,
        estimated_bytes_freed,
        status: PlanStatus::Draft,
        created_at,
    })
}

/// Apply the plan's deletions through the mutator. Each entry targets an
/// independent item, so calls are issued on a bounded worker pool; the
/// result list still preserves plan order regardless of completion order.
/// Individual failures (including timeouts) never abort the run.
pub fn execute_plan(
    entries: &[PlanEntry],
    mutator: &dyn StorageMutator,
    options: &CommitOptions,
    reporter: &dyn ProgressReporter,
) -> Result<CommitOutcome, Error> {
    reporter.on_commit_start(entries.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.concurrency.max(1))
        .build()
        .map_err(|e| Error::Other(format!("commit worker pool: {}", e)))?;

    let done = AtomicUsize::new(0);
    let results: Vec<ItemCommitResult> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| {
                let cancelled = options
                    .cancel
                    .as_ref()
                    .map(|flag| flag.load(Ordering::Relaxed))
                    .unwrap_or(false);

                let disposition = if cancelled {
                    CommitDisposition::Cancelled
                } else {
                    match mutator.delete(&entry.item_id, options.mutator_timeout) {
                        Ok(bytes_freed) => {
                            debug!("deleted '{}' ({} bytes)", entry.item_id, bytes_freed);
                            CommitDisposition::Deleted { bytes_freed }
                        }
                        Err(error) => {
                            warn!("delete failed for '{}': {}", entry.item_id, error);
                            CommitDisposition::Failed { error }
                        }
                    }
                };

                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_commit_progress(finished, entries.len());

                ItemCommitResult {
                    item_id: entry.item_id.clone(),
                    disposition,
                }
            })
            .collect()
    });

    let bytes_freed = results
        .iter()
        .map(|r| match r.disposition {
            CommitDisposition::Deleted { bytes_freed } => bytes_freed,
            _ => 0,
        })
        .sum();

    let all_deleted = results
        .iter()
        .all(|r| matches!(r.disposition, CommitDisposition::Deleted { .. }));
    let status = if all_deleted {
        PlanStatus::Committed
    } else {
        PlanStatus::Failed
    };

    let outcome = CommitOutcome {
        results,
        bytes_freed,
        status,
    };

    reporter.on_commit_complete(outcome.succeeded(), outcome.failed(), outcome.bytes_freed);
    info!(
        "commit finished: {} deleted, {} failed, {} bytes freed",
        outcome.succeeded(),
        outcome.failed(),
        outcome.bytes_freed
    );

    Ok(outcome)
}
