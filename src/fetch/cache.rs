//! Content cache keyed by a filesystem-safe slug of the URL.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::TrainsetError;

/// Longest key, digest suffix included.
const MAX_KEY_LEN: usize = 200;

/// Hex digits of the SHA-256 digest appended to every key.
const DIGEST_SUFFIX_LEN: usize = 16;

/// Turns a URL into a cache key.
///
/// Lowercase ASCII alphanumerics are kept, every other run of characters
/// becomes a single `-`, and leading/trailing dashes are trimmed. The slug
/// folds case and punctuation, so a digest of the exact URL is always
/// appended; slugs that would push the key past 200 bytes are cut first.
pub fn cache_key(url: &str) -> String {
    let mut slug = String::with_capacity(url.len());
    let mut pending_dash = false;
    for ch in url.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    let digest = Sha256::digest(url.as_bytes());
    let suffix = hex::encode(&digest[..DIGEST_SUFFIX_LEN / 2]);

    // The slug is pure ASCII, so any byte index is a char boundary.
    slug.truncate(MAX_KEY_LEN - DIGEST_SUFFIX_LEN - 1);
    let trimmed = slug.trim_end_matches('-').len();
    slug.truncate(trimmed);
    if !slug.is_empty() {
        slug.push('-');
    }
    slug.push_str(&suffix);
    slug
}

/// Storage behind the fetch cache.
pub trait CacheStore {
    fn read(&self, key: &str) -> Option<Vec<u8>>;
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), TrainsetError>;
}

/// One file per key in a directory.
#[derive(Debug)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    /// Opens (creating if needed) the cache directory.
    pub fn open(dir: &Path) -> Result<Self, TrainsetError> {
        fs::create_dir_all(dir).map_err(|source| TrainsetError::DirectorySetup {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

}

impl CacheStore for FsCache {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.dir.join(key)).ok()
    }

    /// Writes to a temporary file in the cache directory and renames it
    /// over the key, so an interrupted run never leaves a partial entry.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), TrainsetError> {
        let cache_error = |source: std::io::Error| TrainsetError::Cache {
            key: key.to_string(),
            source,
        };
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(cache_error)?;
        staged.write_all(bytes).map_err(cache_error)?;
        staged
            .persist(self.dir.join(key))
            .map_err(|err| cache_error(err.error))?;
        Ok(())
    }
}

/// In-process cache, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), TrainsetError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug_of(key: &str) -> &str {
        &key[..key.len() - DIGEST_SUFFIX_LEN]
    }

    #[test]
    fn key_is_lowercase_slug_plus_digest() {
        let key = cache_key("https://Example.org/iiif/Book_1/manifest.json");
        assert_eq!(slug_of(&key), "https-example-org-iiif-book-1-manifest-json-");
        assert!(key[key.len() - DIGEST_SUFFIX_LEN..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        assert_eq!(slug_of(&cache_key("--a//b--")), "a-b-");
        assert_eq!(cache_key("///").len(), DIGEST_SUFFIX_LEN);
    }

    #[test]
    fn urls_with_the_same_slug_get_distinct_keys() {
        let lower = "https://img.example/iiif/ucla_001/full/!1000,1000/0/default.jpg";
        let upper = "https://img.example/iiif/UCLA-001/full/!1000,1000/0/default.jpg";
        let a = cache_key(lower);
        let b = cache_key(upper);
        assert_eq!(slug_of(&a), slug_of(&b));
        assert_ne!(a, b);
        assert_eq!(a, cache_key(lower));
    }

    #[test]
    fn distinct_long_urls_do_not_collide() {
        let prefix = format!("https://example.org/{}", "x".repeat(300));
        let a = cache_key(&format!("{prefix}/a"));
        let b = cache_key(&format!("{prefix}/b"));
        assert_ne!(a, b);
        assert!(a.len() <= MAX_KEY_LEN);
        assert!(b.len() <= MAX_KEY_LEN);
    }

    #[test]
    fn fs_cache_round_trips_bytes() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let cache = FsCache::open(&temp.path().join("nested/cache")).expect("open cache");
        assert!(cache.read("k").is_none());
        cache.write("k", b"payload").expect("write");
        assert_eq!(cache.read("k").as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn fs_cache_write_replaces_entry_without_leftovers() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let cache = FsCache::open(temp.path()).expect("open cache");
        cache.write("k", b"first").expect("write");
        cache.write("k", b"second").expect("overwrite");
        assert_eq!(cache.read("k").as_deref(), Some(&b"second"[..]));

        let names: Vec<_> = fs::read_dir(temp.path())
            .expect("list cache dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("k")]);
    }

    #[test]
    fn fs_cache_write_fails_when_dir_is_gone() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("cache");
        let cache = FsCache::open(&dir).expect("open cache");
        fs::remove_dir(&dir).expect("remove cache dir");

        let err = cache.write("k", b"payload").unwrap_err();
        assert!(matches!(err, TrainsetError::Cache { ref key, .. } if key == "k"));
        assert!(cache.read("k").is_none());
    }

    #[test]
    fn fs_cache_open_fails_on_file_path() {
        let temp = tempfile::NamedTempFile::new().expect("create temp file");
        let err = FsCache::open(temp.path()).unwrap_err();
        assert!(matches!(err, TrainsetError::DirectorySetup { .. }));
    }
}
