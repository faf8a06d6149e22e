use glob::Pattern;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{error, warn};

use spacescout_core::config::non_overlapping_roots;
use spacescout_core::model::{ContentRef, Item, ItemKind};
use spacescout_core::source::{ContentSource, MutatorError, SourceError, StorageMutator};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "m4a", "mkv", "mov", "avi", "wav", "flac", "ogg", "webm",
];

/// Content source over a local directory tree. Kinds are inferred from file
/// extension; there is no app listing on a plain filesystem. Thin adapter —
/// all grouping and policy logic lives in the core.
pub struct FsContentSource {
    roots: Vec<String>,
    ignore_patterns: Vec<Pattern>,
}

impl FsContentSource {
    pub fn new(roots: Vec<String>, ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|g| match Pattern::new(g) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", g, e);
                    None
                }
            })
            .collect();

        Self {
            roots: non_overlapping_roots(roots),
            ignore_patterns,
        }
    }

    fn kind_of(path: &Path) -> ItemKind {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some(e) if PHOTO_EXTENSIONS.contains(&e) => ItemKind::Photo,
            Some(e) if MEDIA_EXTENSIONS.contains(&e) => ItemKind::MediaFile,
            _ => ItemKind::Other,
        }
    }

    fn ignored(&self, path: &Path) -> bool {
        self.ignore_patterns.iter().any(|p| p.matches_path(path))
    }

    /// Recursive walk. Unreadable directories are tolerated with a warning;
    /// symlinks and empty files are skipped.
    fn visit(&self, dir: &Path, kind: ItemKind, out: &mut Vec<Item>) {
        if !dir.is_dir() || self.ignored(dir) {
            return;
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot read directory {}: {}", dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!("cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            if metadata.file_type().is_symlink() {
                continue;
            }
            if metadata.is_dir() {
                self.visit(&path, kind, out);
                continue;
            }
            if metadata.len() == 0 || self.ignored(&path) || Self::kind_of(&path) != kind {
                continue;
            }

            let last_accessed = metadata
                .accessed()
                .or_else(|_| metadata.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64);

            let path_str = path.to_string_lossy().into_owned();
            out.push(Item {
                id: path_str.clone(),
                kind,
                size_bytes: metadata.len(),
                last_accessed,
                content_ref: ContentRef(path_str),
                system_protected: false,
            });
        }
    }
}

impl ContentSource for FsContentSource {
    fn list_items(&self, kind: ItemKind) -> Result<Vec<Item>, SourceError> {
        if kind == ItemKind::App {
            return Ok(vec![]);
        }

        let mut items = Vec::new();
        for root in &self.roots {
            self.visit(Path::new(root), kind, &mut items);
        }
        Ok(items)
    }

    fn read_content(&self, content_ref: &ContentRef) -> Result<Vec<u8>, SourceError> {
        fs::read(&content_ref.0).map_err(|e| map_source_error(&content_ref.0, e))
    }
}

fn map_source_error(path: &str, e: io::Error) -> SourceError {
    match e.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => SourceError::PermissionDenied(path.to_string()),
        _ => SourceError::Other(format!("{}: {}", path, e)),
    }
}

/// Storage mutator that removes files from the local filesystem. Local
/// removals complete well under any sane timeout; the parameter matters for
/// remote or platform-bridge mutators.
pub struct FsMutator;

impl StorageMutator for FsMutator {
    fn delete(&self, item_id: &str, _timeout: Duration) -> Result<u64, MutatorError> {
        let size = fs::metadata(item_id)
            .map_err(|e| map_mutator_error(item_id, e))?
            .len();
        fs::remove_file(item_id).map_err(|e| map_mutator_error(item_id, e))?;
        Ok(size)
    }
}

fn map_mutator_error(path: &str, e: io::Error) -> MutatorError {
    match e.kind() {
        io::ErrorKind::NotFound => MutatorError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => MutatorError::PermissionDenied(path.to_string()),
        _ => MutatorError::Other(format!("{}: {}", path, e)),
    }
}
