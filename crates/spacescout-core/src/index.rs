use std::collections::HashMap;
use tracing::{debug, error};

use crate::error::Error;
use crate::model::{Cluster, ClusterId, ClusterMember, Fingerprint, Item, ItemKind};

/// Bucket key for fingerprint families where only exact matches group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ExactKey {
    Content(u64),
    Package(String),
}

fn exact_key(fingerprint: &Fingerprint) -> Option<ExactKey> {
    match fingerprint {
        Fingerprint::Content(h) => Some(ExactKey::Content(*h)),
        Fingerprint::Package(p) => Some(ExactKey::Package(p.clone())),
        Fingerprint::Pixels { .. } => None,
    }
}

/// Incremental map from fingerprints to clusters of near-duplicate items.
///
/// Exact fingerprint families (content hash, package identity) are bucketed
/// for O(1) insert and query. Perceptual hashes are scanned linearly against
/// cluster representatives with Hamming distance.
///
/// The index is a logically-serial resource: callers serialize writes (the
/// engine holds it behind a `RwLock`). An invariant violation — an item
/// surfacing in two clusters, or the reverse map pointing at a cluster that
/// lacks the member — poisons the index: every further write is rejected
/// with `IndexCorrupted` until it is rebuilt from scratch.
pub struct SimilarityIndex {
    clusters: HashMap<ClusterId, Cluster>,
    item_to_cluster: HashMap<String, ClusterId>,
    exact_buckets: HashMap<ExactKey, ClusterId>,
    phash_max_distance: u32,
    next_id: u64,
    poisoned: Option<String>,
}

impl SimilarityIndex {
    pub fn new(phash_max_distance: u32) -> Self {
        Self {
            clusters: HashMap::new(),
            item_to_cluster: HashMap::new(),
            exact_buckets: HashMap::new(),
            phash_max_distance,
            next_id: 0,
            poisoned: None,
        }
    }

    /// Insert an item. Joins the nearest existing cluster when its distance
    /// to the representative is within threshold, otherwise starts a new
    /// singleton cluster.
    pub fn insert(&mut self, item: &Item, fingerprint: Fingerprint) -> Result<ClusterId, Error> {
        self.check_writable()?;

        if let Some(existing) = self.item_to_cluster.get(&item.id) {
            return Err(self.poison(format!(
                "item '{}' already indexed in cluster {}",
                item.id, existing.0
            )));
        }

        let target = match exact_key(&fingerprint) {
            Some(key) => self.exact_buckets.get(&key).copied(),
            None => self
                .nearest_pixel_cluster(&fingerprint, item.kind)
                .filter(|(_, dist)| *dist <= self.phash_max_distance)
                .map(|(id, _)| id),
        };

        let cluster_id = match target {
            Some(id) => {
                self.join_cluster(id, item, &fingerprint);
                id
            }
            None => self.create_cluster(item, fingerprint),
        };

        self.item_to_cluster.insert(item.id.clone(), cluster_id);
        Ok(cluster_id)
    }

    /// All clusters comparable to the fingerprint, ordered by ascending
    /// distance (ties by cluster id).
    pub fn query(&self, fingerprint: &Fingerprint) -> Vec<(ClusterId, u32)> {
        if let Some(key) = exact_key(fingerprint) {
            return self
                .exact_buckets
                .get(&key)
                .map(|id| vec![(*id, 0)])
                .unwrap_or_default();
        }

        let mut hits: Vec<(ClusterId, u32)> = self
            .clusters
            .values()
            .filter_map(|c| fingerprint.distance(&c.representative).map(|d| (c.id, d)))
            .collect();
        hits.sort_by_key(|(id, dist)| (*dist, *id));
        hits
    }

    /// Remove an item, shrinking its cluster and deleting the cluster when
    /// the last member leaves. O(1) cluster lookup via the reverse map.
    /// Returns the cluster the item was in, or `None` if it was not indexed.
    pub fn remove(&mut self, item_id: &str) -> Result<Option<ClusterId>, Error> {
        self.check_writable()?;

        let cluster_id = match self.item_to_cluster.remove(item_id) {
            Some(id) => id,
            None => return Ok(None),
        };

        let cluster = match self.clusters.get_mut(&cluster_id) {
            Some(c) => c,
            None => {
                return Err(self.poison(format!(
                    "reverse map points item '{}' at missing cluster {}",
                    item_id, cluster_id.0
                )))
            }
        };

        let position = match cluster.members.iter().position(|m| m.item_id == item_id) {
            Some(p) => p,
            None => {
                return Err(self.poison(format!(
                    "reverse map points item '{}' at cluster {} which lacks it",
                    item_id, cluster_id.0
                )))
            }
        };

        let removed = cluster.members.remove(position);
        cluster.total_bytes = cluster.total_bytes.saturating_sub(removed.size_bytes);

        if cluster.members.is_empty() {
            let gone = self.clusters.remove(&cluster_id);
            if let Some(cluster) = gone {
                if let Some(key) = exact_key(&cluster.representative) {
                    self.exact_buckets.remove(&key);
                }
            }
            debug!("cluster {} deleted with last member '{}'", cluster_id.0, item_id);
        } else if cluster.sample_ref == removed.content_ref {
            cluster.sample_ref = cluster.members[0].content_ref.clone();
        }

        Ok(Some(cluster_id))
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn cluster_of(&self, item_id: &str) -> Option<ClusterId> {
        self.item_to_cluster.get(item_id).copied()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Clusters with more than one member — the ones presented to the user
    /// as duplicate groups. Largest aggregate first.
    pub fn duplicate_clusters(&self, kind: ItemKind) -> Vec<&Cluster> {
        let mut groups: Vec<&Cluster> = self
            .clusters
            .values()
            .filter(|c| c.kind == kind && c.is_duplicate_group())
            .collect();
        groups.sort_by_key(|c| (std::cmp::Reverse(c.total_bytes), c.id));
        groups
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn poisoned(&self) -> Option<&str> {
        self.poisoned.as_deref()
    }

    fn check_writable(&self) -> Result<(), Error> {
        match &self.poisoned {
            Some(reason) => Err(Error::IndexCorrupted(reason.clone())),
            None => Ok(()),
        }
    }

    fn poison(&mut self, reason: String) -> Error {
        error!("similarity index corrupted: {}", reason);
        self.poisoned = Some(reason.clone());
        Error::IndexCorrupted(reason)
    }

    fn nearest_pixel_cluster(
        &self,
        fingerprint: &Fingerprint,
        kind: ItemKind,
    ) -> Option<(ClusterId, u32)> {
        self.clusters
            .values()
            .filter(|c| c.kind == kind)
            .filter_map(|c| fingerprint.distance(&c.representative).map(|d| (c.id, d)))
            .min_by_key(|(id, dist)| (*dist, *id))
    }

    fn join_cluster(&mut self, id: ClusterId, item: &Item, fingerprint: &Fingerprint) {
        let cluster = self
            .clusters
            .get_mut(&id)
            .expect("join target cluster exists");

        cluster.members.push(ClusterMember {
            item_id: item.id.clone(),
            size_bytes: item.size_bytes,
            content_ref: item.content_ref.clone(),
        });
        cluster.total_bytes += item.size_bytes;

        // A higher-resolution member makes the better representative and sample.
        if fingerprint.pixel_area() > cluster.representative.pixel_area() {
            cluster.representative = fingerprint.clone();
            cluster.sample_ref = item.content_ref.clone();
        }
    }

    fn create_cluster(&mut self, item: &Item, fingerprint: Fingerprint) -> ClusterId {
        let id = ClusterId(self.next_id);
        self.next_id += 1;

        if let Some(key) = exact_key(&fingerprint) {
            self.exact_buckets.insert(key, id);
        }

        self.clusters.insert(
            id,
            Cluster {
                id,
                kind: item.kind,
                members: vec![ClusterMember {
                    item_id: item.id.clone(),
                    size_bytes: item.size_bytes,
                    content_ref: item.content_ref.clone(),
                }],
                representative: fingerprint,
                total_bytes: item.size_bytes,
                sample_ref: item.content_ref.clone(),
            },
        );
        id
    }
}
