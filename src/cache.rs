//! Incremental compilation cache.
//!
//! Artifacts are cached on disk keyed by the source content hash. Only
//! self-contained units (no imports) are cached: an import can change
//! meaning without changing the importing file's bytes.

use crate::dispatcher::Artifacts;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub hash: String,
    pub html: String,
    pub css: String,
    pub js: String,
}

pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::at(PathBuf::from(".chtl/cache"))
    }

    pub fn at(cache_dir: PathBuf) -> Self {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path
            .replace('/', "_")
            .replace('\\', "_")
            .replace(':', "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, source: &str) -> Option<Artifacts> {
        let cache_path = self.cache_path(file_path);
        if !cache_path.exists() {
            return None;
        }
        let data = fs::read_to_string(&cache_path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("cache entry for {} is corrupt: {}", file_path, e);
                fs::remove_file(cache_path).ok();
                return None;
            }
        };
        if entry.hash == Self::compute_hash(source) {
            Some(Artifacts {
                html: entry.html,
                css: entry.css,
                js: entry.js,
            })
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, artifacts: &Artifacts) {
        let entry = CacheEntry {
            hash: Self::compute_hash(source),
            html: artifacts.html.clone(),
            css: artifacts.css.clone(),
            js: artifacts.js.clone(),
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(self.cache_path(file_path), data).ok();
        }
    }
}

impl Default for IncrementalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_on_same_source_miss_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::at(dir.path().join("cache"));
        let artifacts = Artifacts {
            html: "<div></div>".to_string(),
            css: String::new(),
            js: String::new(),
        };
        cache.set("a.chtl", "div { }", &artifacts);
        assert_eq!(cache.get("a.chtl", "div { }"), Some(artifacts));
        assert_eq!(cache.get("a.chtl", "span { }"), None);
        assert_eq!(cache.get("b.chtl", "div { }"), None);
    }

    #[test]
    fn corrupt_entry_is_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::at(dir.path().join("cache"));
        cache.set("a.chtl", "div { }", &Artifacts::default());
        // Clobber the entry on disk.
        let entry_path = fs::read_dir(dir.path().join("cache"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        fs::write(&entry_path, "not json").unwrap();
        assert_eq!(cache.get("a.chtl", "div { }"), None);
        assert!(!entry_path.exists());
    }
}
