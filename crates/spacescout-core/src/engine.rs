use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::aggregate;
use crate::analysis::classify::{self, PolicyWindows};
use crate::analysis::cleanup_plan::{
    self, CleanupPlan, CommitOptions, CommitOutcome, PlanStatus, Selection,
};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::fingerprint::Fingerprinter;
use crate::index::SimilarityIndex;
use crate::model::{CatalogEntry, Cluster, Item, ItemKind, PolicyTag, StorageSummary};
use crate::progress::ProgressReporter;
use crate::source::{ContentSource, DeviceCapacity, StorageMutator};

/// The engine's explicitly owned state. No ambient globals: every pipeline
/// stage takes this (or a piece of it) and produces updated derived views.
struct EngineState {
    entries: BTreeMap<String, CatalogEntry>,
    index: SimilarityIndex,
    tags: BTreeMap<String, PolicyTag>,
    summary: StorageSummary,
    capacity: Option<DeviceCapacity>,
    plans: HashMap<u64, CleanupPlan>,
    /// Plans with a commit in flight; rejects a second concurrent commit.
    committing: HashSet<u64>,
    next_plan_id: u64,
}

/// Facade over the cleanup pipeline:
/// list → fingerprint → cluster → classify → summarize, plus plan
/// creation and commit. Everything except `commit_plan` is side-effect-free
/// toward the outside world.
pub struct CleanupEngine {
    config: EngineConfig,
    fingerprinter: Fingerprinter,
    state: RwLock<EngineState>,
}

/// Timings and counters for one refresh pass.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub list_duration: Duration,
    pub fingerprint_duration: Duration,
    pub index_duration: Duration,
    pub classify_duration: Duration,
    pub items_listed: usize,
    pub items_indexed: usize,
    /// Items whose content could not be read; skipped, never classified.
    pub items_skipped: usize,
    pub duplicate_clusters: usize,
    /// Bytes currently tagged SafeToDelete.
    pub reclaimable_bytes: u64,
}

impl CleanupEngine {
    pub fn new(config: EngineConfig) -> Self {
        let phash_max_distance = config.phash_max_distance;
        Self {
            config,
            fingerprinter: Fingerprinter::new(),
            state: RwLock::new(EngineState {
                entries: BTreeMap::new(),
                index: SimilarityIndex::new(phash_max_distance),
                tags: BTreeMap::new(),
                summary: StorageSummary::default(),
                capacity: None,
                plans: HashMap::new(),
                committing: HashSet::new(),
                next_plan_id: 1,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full analysis pipeline against the content source:
    /// 1. List items per kind
    /// 2. Fingerprint in parallel (items are independent here)
    /// 3. Rebuild the similarity index with serial inserts
    /// 4. Classify and summarize
    ///
    /// Listing failures for a kind and unreadable items degrade to warnings;
    /// the resulting views are best-effort over readable items. Draft plans
    /// survive a refresh — they are snapshots by design.
    pub fn refresh(
        &self,
        source: &dyn ContentSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<RefreshOutcome, Error> {
        // Phase 1: list
        reporter.on_list_start();
        let list_start = Instant::now();
        let mut items: Vec<Item> = Vec::new();
        for kind in ItemKind::ALL {
            match source.list_items(kind) {
                Ok(mut listed) => items.append(&mut listed),
                Err(e) => warn!("listing {:?} items failed: {}", kind, e),
            }
        }
        let capacity = source.capacity();
        let list_duration = list_start.elapsed();
        let items_listed = items.len();
        reporter.on_list_complete(items_listed, list_duration.as_secs_f64());

        // Phase 2: fingerprint. No shared mutable state between items, so
        // the batch fans out across the rayon pool.
        reporter.on_fingerprint_start();
        let fp_start = Instant::now();
        let done = AtomicUsize::new(0);
        let fingerprinted: Vec<(Item, Result<crate::model::Fingerprint, Error>)> = items
            .into_par_iter()
            .map(|item| {
                let result = self.fingerprinter.fingerprint(&item, source);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_fingerprint_progress(finished, items_listed);
                (item, result)
            })
            .collect();
        let fingerprint_duration = fp_start.elapsed();

        // Phase 3: index. Cluster membership decisions depend on current
        // index state, so inserts stay serial.
        let index_start = Instant::now();
        let mut index = SimilarityIndex::new(self.config.phash_max_distance);
        let mut entries: BTreeMap<String, CatalogEntry> = BTreeMap::new();
        let mut items_skipped = 0usize;

        for (item, result) in fingerprinted {
            let fingerprint = match result {
                Ok(fp) => fp,
                Err(e) => {
                    items_skipped += 1;
                    warn!("skipping item '{}': {}", item.id, e);
                    continue;
                }
            };
            let cluster_id = index.insert(&item, fingerprint.clone())?;
            entries.insert(
                item.id.clone(),
                CatalogEntry {
                    item,
                    fingerprint,
                    cluster_id,
                },
            );
        }
        let index_duration = index_start.elapsed();
        let duplicate_clusters = index.clusters().filter(|c| c.is_duplicate_group()).count();
        reporter.on_fingerprint_complete(items_skipped, fingerprint_duration.as_secs_f64());
        reporter.on_index_complete(duplicate_clusters, index_duration.as_secs_f64());

        // Phase 4: classify + summarize
        let classify_start = Instant::now();
        let windows = PolicyWindows::from(&self.config);
        let tags = classify::assign_policy_tags(&entries, &index, &windows, Utc::now().timestamp());
        let summary = aggregate::summarize(entries.values().map(|e| &e.item), capacity);
        let classify_duration = classify_start.elapsed();

        let reclaimable_bytes: u64 = tags
            .iter()
            .filter(|(_, t)| **t == PolicyTag::SafeToDelete)
            .filter_map(|(id, _)| entries.get(id))
            .map(|e| e.item.size_bytes)
            .sum();
        let safe_to_delete = tags
            .values()
            .filter(|t| **t == PolicyTag::SafeToDelete)
            .count();
        reporter.on_classify_complete(safe_to_delete, classify_duration.as_secs_f64());

        let items_indexed = entries.len();
        debug!(
            "refresh: {} listed, {} indexed, {} skipped, {} duplicate clusters, {} bytes reclaimable",
            items_listed, items_indexed, items_skipped, duplicate_clusters, reclaimable_bytes
        );

        let mut state = self.write_state();
        state.entries = entries;
        state.index = index;
        state.tags = tags;
        state.summary = summary;
        state.capacity = capacity;

        Ok(RefreshOutcome {
            list_duration,
            fingerprint_duration,
            index_duration,
            classify_duration,
            items_listed,
            items_indexed,
            items_skipped,
            duplicate_clusters,
            reclaimable_bytes,
        })
    }

    pub fn summary(&self) -> StorageSummary {
        self.read_state().summary
    }

    /// Duplicate groups of the given kind, largest aggregate first.
    pub fn clusters(&self, kind: ItemKind) -> Vec<Cluster> {
        self.read_state()
            .index
            .duplicate_clusters(kind)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn policy_tags(&self) -> BTreeMap<String, PolicyTag> {
        self.read_state().tags.clone()
    }

    pub fn plan(&self, plan_id: u64) -> Option<CleanupPlan> {
        self.read_state().plans.get(&plan_id).cloned()
    }

    /// Create a draft plan from the selection. Fails atomically with
    /// `UnknownItem` when the selection names ids not in the catalog.
    pub fn create_plan(&self, selection: &Selection) -> Result<CleanupPlan, Error> {
        let mut state = self.write_state();
        let plan_id = state.next_plan_id;
        let plan = cleanup_plan::build_plan(
            plan_id,
            selection,
            &state.entries,
            &state.tags,
            Utc::now().timestamp(),
        )?;
        state.next_plan_id += 1;
        state.plans.insert(plan_id, plan.clone());
        Ok(plan)
    }

    /// Commit a draft plan. At most once per plan: a plan that is already
    /// finalized (or mid-commit) is rejected without touching the mutator.
    /// On return, successfully deleted items have left the catalog, their
    /// clusters have shrunk, and tags and summary are recomputed.
    pub fn commit_plan(
        &self,
        plan_id: u64,
        mutator: &dyn StorageMutator,
        options: &CommitOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<CommitOutcome, Error> {
        let entries_snapshot = {
            let mut state = self.write_state();
            if state.committing.contains(&plan_id) {
                return Err(Error::PlanAlreadyFinalized(plan_id));
            }
            let plan = state
                .plans
                .get(&plan_id)
                .ok_or(Error::UnknownPlan(plan_id))?;
            if plan.status != PlanStatus::Draft {
                return Err(Error::PlanAlreadyFinalized(plan_id));
            }
            let snapshot = plan.entries.clone();
            state.committing.insert(plan_id);
            snapshot
        };

        // No engine lock held while the mutator runs.
        let executed = cleanup_plan::execute_plan(&entries_snapshot, mutator, options, reporter);

        let mut state = self.write_state();
        state.committing.remove(&plan_id);
        let outcome = executed?;

        if let Some(plan) = state.plans.get_mut(&plan_id) {
            plan.status = outcome.status;
        }

        for item_id in outcome.deleted_item_ids() {
            state.entries.remove(item_id);
            if let Err(e) = state.index.remove(item_id) {
                warn!("index removal for '{}' failed: {}", item_id, e);
            }
        }

        if let Some(cap) = &mut state.capacity {
            cap.free_bytes = (cap.free_bytes + outcome.bytes_freed).min(cap.total_bytes);
        }

        let windows = PolicyWindows::from(&self.config);
        let tags = classify::assign_policy_tags(
            &state.entries,
            &state.index,
            &windows,
            Utc::now().timestamp(),
        );
        let summary =
            aggregate::summarize(state.entries.values().map(|e| &e.item), state.capacity);
        state.tags = tags;
        state.summary = summary;

        info!(
            "plan {} finalized as {:?}: {} bytes freed",
            plan_id, outcome.status, outcome.bytes_freed
        );
        Ok(outcome)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap()
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap()
    }
}
