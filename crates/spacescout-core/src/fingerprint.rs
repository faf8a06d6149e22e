use dashmap::DashMap;
use image::GenericImageView;
use image_hasher::{HashAlg, HasherConfig};
use std::hash::Hasher as _;
use tracing::trace;
use twox_hash::XxHash64;

use crate::error::Error;
use crate::model::{Fingerprint, Item, ItemKind};
use crate::source::ContentSource;

/// Computes content fingerprints, memoizing per (content ref, size,
/// last-accessed stamp) so a repeated refresh only re-reads content that
/// actually changed. The stamp is part of the key: an in-place edit that
/// keeps the size invalidates the entry via its new timestamp.
///
/// Fingerprints are deterministic per content reference:
/// - photos: 64-bit gradient perceptual hash over decoded pixels, so renamed
///   or re-encoded duplicates still collide (or land within Hamming range)
/// - media/other files: XxHash64 over the full bytes
/// - apps: package identity, no content read at all
pub struct Fingerprinter {
    cache: DashMap<(String, u64, Option<i64>), Fingerprint>,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    pub fn fingerprint(
        &self,
        item: &Item,
        source: &dyn ContentSource,
    ) -> Result<Fingerprint, Error> {
        if item.kind == ItemKind::App {
            return Ok(Fingerprint::Package(item.content_ref.0.clone()));
        }

        let key = (
            item.content_ref.0.clone(),
            item.size_bytes,
            item.last_accessed,
        );
        if let Some(cached) = self.cache.get(&key) {
            trace!("fingerprint cache hit for '{}'", item.id);
            return Ok(cached.clone());
        }

        let bytes = source
            .read_content(&item.content_ref)
            .map_err(|e| Error::UnreadableContent {
                item_id: item.id.clone(),
                reason: e.to_string(),
            })?;

        let fingerprint = match item.kind {
            ItemKind::Photo => {
                perceptual_hash(&bytes).map_err(|reason| Error::UnreadableContent {
                    item_id: item.id.clone(),
                    reason,
                })?
            }
            _ => Fingerprint::Content(hash_data(&bytes)),
        };

        self.cache.insert(key, fingerprint.clone());
        Ok(fingerprint)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// 8x8 gradient hash over the decoded image, packed into 64 bits.
fn perceptual_hash(bytes: &[u8]) -> Result<Fingerprint, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("image decode: {}", e))?;

    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Gradient)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&img);
    let mut bits = [0u8; 8];
    for (slot, byte) in bits.iter_mut().zip(hash.as_bytes()) {
        *slot = *byte;
    }

    let (width, height) = img.dimensions();
    Ok(Fingerprint::Pixels {
        bits: u64::from_le_bytes(bits),
        width,
        height,
    })
}

pub fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}
