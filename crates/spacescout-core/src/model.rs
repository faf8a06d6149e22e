use serde::{Deserialize, Serialize};

/// Semantic bucket a storage item falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    App,
    Photo,
    MediaFile,
    Other,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::App,
        ItemKind::Photo,
        ItemKind::MediaFile,
        ItemKind::Other,
    ];
}

/// Opaque handle the content source resolves to bytes or metadata.
/// For files this is a path, for apps a package identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef(pub String);

/// A storage item reported by a content source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub size_bytes: u64,
    /// Unix timestamp (seconds) of last access, when the source knows it.
    pub last_accessed: Option<i64>,
    pub content_ref: ContentRef,
    pub system_protected: bool,
}

/// Compact, comparable signature derived from an item's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fingerprint {
    /// 64-bit gradient perceptual hash over decoded pixels, plus the
    /// source dimensions (used as the resolution tie-break when picking
    /// which duplicate to keep).
    Pixels { bits: u64, width: u32, height: u32 },
    /// XxHash64 over the full content bytes.
    Content(u64),
    /// Package identity for installed apps.
    Package(String),
}

impl Fingerprint {
    /// Distance between two fingerprints. Hamming for perceptual hashes,
    /// exact match for content hashes and package identity. `None` means
    /// the fingerprints are not comparable (different families, or exact
    /// kinds that simply differ).
    pub fn distance(&self, other: &Fingerprint) -> Option<u32> {
        match (self, other) {
            (Fingerprint::Pixels { bits: a, .. }, Fingerprint::Pixels { bits: b, .. }) => {
                Some((a ^ b).count_ones())
            }
            (Fingerprint::Content(a), Fingerprint::Content(b)) if a == b => Some(0),
            (Fingerprint::Package(a), Fingerprint::Package(b)) if a == b => Some(0),
            _ => None,
        }
    }

    /// Pixel area when this is a perceptual hash, otherwise 0.
    pub fn pixel_area(&self) -> u64 {
        match self {
            Fingerprint::Pixels { width, height, .. } => u64::from(*width) * u64::from(*height),
            _ => 0,
        }
    }
}

/// Identifier of a cluster in the similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u64);

/// One member of a cluster. Sizes and refs are carried here so removal
/// can maintain the aggregate without consulting the item set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub item_id: String,
    pub size_bytes: u64,
    pub content_ref: ContentRef,
}

/// A set of near-duplicate items sharing a representative fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub kind: ItemKind,
    pub members: Vec<ClusterMember>,
    pub representative: Fingerprint,
    pub total_bytes: u64,
    /// Reference to show as the group's thumbnail/sample.
    pub sample_ref: ContentRef,
}

impl Cluster {
    pub fn is_duplicate_group(&self) -> bool {
        self.members.len() > 1
    }
}

/// Deletion policy assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyTag {
    Keep,
    Review,
    SafeToDelete,
}

/// An item together with what the refresh pipeline learned about it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub item: Item,
    pub fingerprint: Fingerprint,
    pub cluster_id: ClusterId,
}

/// Per-segment byte totals plus device capacity. Derived, recomputed on
/// demand from the item set; never persisted as source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSummary {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub app_bytes: u64,
    pub photo_bytes: u64,
    pub media_bytes: u64,
    pub other_bytes: u64,
}

impl StorageSummary {
    pub fn segment_bytes(&self, kind: ItemKind) -> u64 {
        match kind {
            ItemKind::App => self.app_bytes,
            ItemKind::Photo => self.photo_bytes,
            ItemKind::MediaFile => self.media_bytes,
            ItemKind::Other => self.other_bytes,
        }
    }
}
