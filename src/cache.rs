use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// A cached file body together with the validator it was read under.
#[derive(Clone)]
pub struct CachedFile {
    pub content: Bytes,
    pub etag: String,
}

/// In-process lookup cache for file contents. Consulted before disk on
/// GET and never required for correctness: a miss or a validator
/// mismatch simply falls through to the filesystem.
#[derive(Default)]
pub struct LookupCache {
    entries: DashMap<PathBuf, CachedFile>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<CachedFile> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    pub fn put(&self, path: PathBuf, content: Bytes, etag: String) {
        self.entries.insert(path, CachedFile { content, etag });
    }

    /// Dropped on DELETE so a removed file cannot be served from memory.
    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache = LookupCache::new();
        let path = PathBuf::from("a.txt");

        assert!(cache.get(&path).is_none());
        cache.put(
            path.clone(),
            Bytes::from_static(b"hello"),
            "\"etag-1\"".to_string(),
        );

        let entry = cache.get(&path).unwrap();
        assert_eq!(entry.content, Bytes::from_static(b"hello"));
        assert_eq!(entry.etag, "\"etag-1\"");
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let cache = LookupCache::new();
        let path = PathBuf::from("a.txt");

        cache.put(path.clone(), Bytes::from_static(b"hello"), String::new());
        cache.invalidate(&path);
        assert!(cache.get(&path).is_none());
        assert!(cache.is_empty());
    }
}
