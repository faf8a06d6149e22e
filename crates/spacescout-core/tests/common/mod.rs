#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use spacescout_core::model::{ContentRef, Item, ItemKind};
use spacescout_core::source::{
    ContentSource, DeviceCapacity, MutatorError, SourceError, StorageMutator,
};

pub fn item(id: &str, kind: ItemKind, size: u64, last_accessed: Option<i64>) -> Item {
    Item {
        id: id.to_string(),
        kind,
        size_bytes: size,
        last_accessed,
        content_ref: ContentRef(format!("ref://{}", id)),
        system_protected: false,
    }
}

pub fn protected(mut base: Item) -> Item {
    base.system_protected = true;
    base
}

/// In-memory content source. Items without registered content bytes are
/// unreadable (read_content returns NotFound), which is how tests exercise
/// the skip path.
pub struct MemorySource {
    items: Vec<Item>,
    contents: HashMap<ContentRef, Vec<u8>>,
    capacity: Option<DeviceCapacity>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            contents: HashMap::new(),
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, total_bytes: u64, free_bytes: u64) -> Self {
        self.capacity = Some(DeviceCapacity {
            total_bytes,
            free_bytes,
        });
        self
    }

    pub fn add(&mut self, item: Item, content: &[u8]) {
        self.contents.insert(item.content_ref.clone(), content.to_vec());
        self.items.push(item);
    }

    pub fn add_unreadable(&mut self, item: Item) {
        self.items.push(item);
    }
}

impl ContentSource for MemorySource {
    fn list_items(&self, kind: ItemKind) -> Result<Vec<Item>, SourceError> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.kind == kind)
            .cloned()
            .collect())
    }

    fn read_content(&self, content_ref: &ContentRef) -> Result<Vec<u8>, SourceError> {
        self.contents
            .get(content_ref)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(content_ref.0.clone()))
    }

    fn capacity(&self) -> Option<DeviceCapacity> {
        self.capacity
    }
}

/// Recording mutator with scriptable per-item failures. Reports the byte
/// size registered for each item as freed.
pub struct MemoryMutator {
    sizes: HashMap<String, u64>,
    failures: HashMap<String, MutatorError>,
    calls: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl MemoryMutator {
    pub fn new() -> Self {
        Self {
            sizes: HashMap::new(),
            failures: HashMap::new(),
            calls: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_item(mut self, item_id: &str, size: u64) -> Self {
        self.sizes.insert(item_id.to_string(), size);
        self
    }

    pub fn with_failure(mut self, item_id: &str, error: MutatorError) -> Self {
        self.failures.insert(item_id.to_string(), error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl StorageMutator for MemoryMutator {
    fn delete(&self, item_id: &str, _timeout: Duration) -> Result<u64, MutatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failures.get(item_id) {
            return Err(error.clone());
        }

        let size = self
            .sizes
            .get(item_id)
            .copied()
            .ok_or_else(|| MutatorError::NotFound(item_id.to_string()))?;
        self.deleted.lock().unwrap().push(item_id.to_string());
        Ok(size)
    }
}
