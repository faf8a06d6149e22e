use std::collections::{BTreeMap, HashSet};

use crate::config::EngineConfig;
use crate::index::SimilarityIndex;
use crate::model::{CatalogEntry, Cluster, ItemKind, PolicyTag};

const SECS_PER_DAY: i64 = 86_400;

/// Recency/staleness windows in seconds, derived from the day-granular config.
#[derive(Debug, Clone, Copy)]
pub struct PolicyWindows {
    pub recent_secs: i64,
    pub stale_secs: i64,
}

impl From<&EngineConfig> for PolicyWindows {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            recent_secs: cfg.recent_window_days * SECS_PER_DAY,
            stale_secs: cfg.stale_window_days * SECS_PER_DAY,
        }
    }
}

/// Assign a policy tag to every cataloged item. Rules in precedence order:
///
/// (a) system-protected items are always Keep
/// (b) sole cluster members accessed within the recent window are Keep
/// (c) members of a multi-member cluster are SafeToDelete, except the single
///     best member (photos: highest resolution; otherwise most recently
///     accessed) which is Review
/// (d) stale items outside any multi-member cluster are Review
///
/// Ties break on lowest item id, so re-running over an unchanged set is
/// idempotent.
pub fn assign_policy_tags(
    entries: &BTreeMap<String, CatalogEntry>,
    index: &SimilarityIndex,
    windows: &PolicyWindows,
    now: i64,
) -> BTreeMap<String, PolicyTag> {
    let keepers = pick_cluster_keepers(entries, index);

    entries
        .iter()
        .map(|(id, entry)| {
            let cluster = index.cluster_of(id).and_then(|cid| index.cluster(cid));
            let in_duplicate_group = cluster.map(|c| c.is_duplicate_group()).unwrap_or(false);

            let tag = if entry.item.system_protected {
                PolicyTag::Keep
            } else if !in_duplicate_group && is_recent(entry, windows, now) {
                PolicyTag::Keep
            } else if in_duplicate_group {
                if keepers.contains(id.as_str()) {
                    PolicyTag::Review
                } else {
                    PolicyTag::SafeToDelete
                }
            } else if is_stale(entry, windows, now) {
                PolicyTag::Review
            } else {
                PolicyTag::Keep
            };

            (id.clone(), tag)
        })
        .collect()
}

fn is_recent(entry: &CatalogEntry, windows: &PolicyWindows, now: i64) -> bool {
    entry
        .item
        .last_accessed
        .map(|t| now - t <= windows.recent_secs)
        .unwrap_or(false)
}

fn is_stale(entry: &CatalogEntry, windows: &PolicyWindows, now: i64) -> bool {
    entry
        .item
        .last_accessed
        .map(|t| now - t > windows.stale_secs)
        .unwrap_or(true)
}

/// For every multi-member cluster, the one member spared from SafeToDelete.
fn pick_cluster_keepers<'a>(
    entries: &'a BTreeMap<String, CatalogEntry>,
    index: &SimilarityIndex,
) -> HashSet<&'a str> {
    let mut keepers = HashSet::new();

    for cluster in index.clusters() {
        if !cluster.is_duplicate_group() {
            continue;
        }
        if let Some(id) = best_member(cluster, entries) {
            keepers.insert(id);
        }
    }

    keepers
}

fn best_member<'a>(
    cluster: &Cluster,
    entries: &'a BTreeMap<String, CatalogEntry>,
) -> Option<&'a str> {
    cluster
        .members
        .iter()
        .filter_map(|m| entries.get_key_value(&m.item_id))
        .max_by(|(id_a, a), (id_b, b)| {
            let resolution = if cluster.kind == ItemKind::Photo {
                a.fingerprint.pixel_area().cmp(&b.fingerprint.pixel_area())
            } else {
                std::cmp::Ordering::Equal
            };
            resolution
                .then_with(|| {
                    a.item
                        .last_accessed
                        .unwrap_or(i64::MIN)
                        .cmp(&b.item.last_accessed.unwrap_or(i64::MIN))
                })
                // Lowest id wins the tie, so ordering must favor it as "max".
                .then_with(|| id_b.cmp(id_a))
        })
        .map(|(id, _)| id.as_str())
}
