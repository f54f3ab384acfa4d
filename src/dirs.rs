//! Download directory selection
//!
//! A task-supplied `TEMP_FOLDER` hint wins when it exists on disk; otherwise
//! the per-document directory from the allocation collaborator is used, again
//! only when it already exists. Neither directory is ever created here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::job::{Document, Task};

/// Directories the framework reserves for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedDirs {
    pub temp_folder: PathBuf,
    pub out_folder: PathBuf,
}

/// Deterministic directory allocation per document
pub trait DirectoryAllocator: Send + Sync {
    fn allocate_dirs(&self, document: &Document) -> AllocatedDirs;
}

/// Shards documents as `<root>/ab/cd/ef/<doc_id>` using the first six
/// characters of the document id.
#[derive(Debug, Clone)]
pub struct ShardedAllocator {
    temp_root: PathBuf,
    out_root: PathBuf,
}

impl ShardedAllocator {
    pub fn new(temp_root: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            out_root: out_root.into(),
        }
    }

    fn document_dir(root: &Path, document_id: &str) -> PathBuf {
        let chars: Vec<char> = document_id.chars().take(6).collect();
        let mut dir = root.to_path_buf();
        for chunk in chars.chunks(2) {
            dir.push(chunk.iter().collect::<String>());
        }
        dir.push(document_id);
        dir
    }
}

impl DirectoryAllocator for ShardedAllocator {
    fn allocate_dirs(&self, document: &Document) -> AllocatedDirs {
        AllocatedDirs {
            temp_folder: Self::document_dir(&self.temp_root, &document.id),
            out_folder: Self::document_dir(&self.out_root, &document.id),
        }
    }
}

#[derive(Clone)]
pub struct DownloadDirResolver {
    allocator: Arc<dyn DirectoryAllocator>,
}

impl DownloadDirResolver {
    pub fn new(allocator: Arc<dyn DirectoryAllocator>) -> Self {
        Self { allocator }
    }

    /// Existing directory to download into, or `None` when there is none.
    pub fn resolve(&self, task: &Task, document: &Document) -> Option<PathBuf> {
        if let Some(hint) = task.temp_folder_hint() {
            if hint.is_dir() {
                debug!(task_id = %task.id, dir = %hint.display(), "Using task TEMP_FOLDER hint");
                return Some(hint.clone());
            }
            warn!(task_id = %task.id, dir = %hint.display(), "TEMP_FOLDER hint does not exist");
        }

        let allocated = self.allocator.allocate_dirs(document).temp_folder;
        if allocated.is_dir() {
            debug!(
                doc_id = %document.id,
                dir = %allocated.display(),
                "Using allocated document dir"
            );
            return Some(allocated);
        }

        warn!(doc_id = %document.id, dir = %allocated.display(), "No usable download directory");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Creator, Target, TaskArgs, TaskPaths};
    use tempfile::TempDir;

    fn document(id: &str) -> Document {
        Document {
            id: id.to_string(),
            target: Target {
                id: "dummy_id_12345".to_string(),
                url: "http://dummy-url.com/dummy.mp3".to_string(),
                kind: "Video".to_string(),
            },
            creator: Creator {
                id: "UNIT TEST".to_string(),
                kind: "Organization".to_string(),
            },
        }
    }

    fn task(hint: Option<PathBuf>) -> Task {
        Task {
            id: "task-1".to_string(),
            key: "DOWNLOAD".to_string(),
            args: TaskArgs {
                paths: Some(TaskPaths {
                    temp_folder: hint,
                    out_folder: None,
                }),
            },
        }
    }

    #[test]
    fn test_sharded_allocation() {
        let allocator = ShardedAllocator::new("/mnt/dane-fs/input-dir", "/mnt/dane-fs/output-dir");
        let dirs = allocator.allocate_dirs(&document("dummy-uuid-12345-43214"));

        assert_eq!(
            dirs.temp_folder,
            PathBuf::from("/mnt/dane-fs/input-dir/du/mm/y-/dummy-uuid-12345-43214")
        );
        assert_eq!(
            dirs.out_folder,
            PathBuf::from("/mnt/dane-fs/output-dir/du/mm/y-/dummy-uuid-12345-43214")
        );
    }

    #[test]
    fn test_sharded_allocation_short_id() {
        let allocator = ShardedAllocator::new("/in", "/out");
        let dirs = allocator.allocate_dirs(&document("abc"));
        assert_eq!(dirs.temp_folder, PathBuf::from("/in/ab/c/abc"));
    }

    #[test]
    fn test_resolve_prefers_existing_hint() {
        let hint_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let allocator = ShardedAllocator::new(root.path(), root.path());
        let resolver = DownloadDirResolver::new(Arc::new(allocator));

        let hint = task(Some(hint_dir.path().to_path_buf()));
        let resolved = resolver.resolve(&hint, &document("abcdef12"));
        assert_eq!(resolved, Some(hint_dir.path().to_path_buf()));
    }

    #[test]
    fn test_resolve_falls_back_to_allocated_dir() {
        let root = TempDir::new().unwrap();
        let allocator = ShardedAllocator::new(root.path(), root.path());
        let doc = document("abcdef12");
        let allocated = allocator.allocate_dirs(&doc).temp_folder;
        std::fs::create_dir_all(&allocated).unwrap();

        let resolver = DownloadDirResolver::new(Arc::new(allocator));
        let missing_hint = root.path().join("does-not-exist");

        assert_eq!(resolver.resolve(&task(Some(missing_hint)), &doc), Some(allocated.clone()));
        assert_eq!(resolver.resolve(&task(None), &doc), Some(allocated));
    }

    #[test]
    fn test_resolve_without_existing_dir() {
        let root = TempDir::new().unwrap();
        let allocator = ShardedAllocator::new(root.path(), root.path());
        let resolver = DownloadDirResolver::new(Arc::new(allocator));

        assert_eq!(resolver.resolve(&task(None), &document("abcdef12")), None);
    }
}
