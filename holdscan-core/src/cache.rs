//! Two-tier caching of per-photo detection results.
//!
//! The first tier is an in-memory LRU keyed by photo id; the second is a
//! durable [`KeyValueStore`] supplied by the host. Entries carry the data
//! version they were computed at, and a version mismatch is treated as a
//! miss. Backing-store failures never fail a lookup or a write; the cache
//! degrades to its memory tier and logs at debug level.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Result;
use log::debug;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::hold::DetectedHold;

/// Durable string storage backing the cache's second tier.
///
/// Hosts implement this over whatever persistence they have (browser local
/// storage, a settings database, a file). All methods are fallible; the cache
/// treats failures as misses.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// One photo's cached holds plus the data version they were computed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub version: u64,
    pub holds: Vec<DetectedHold>,
}

fn holds_key(photo_id: &str) -> String {
    format!("detected_holds:{photo_id}")
}

/// Memory-over-durable cache for detection results.
///
/// Versions are compared for equality only; the cache never bumps a version
/// itself. The host decides when its data version changes.
pub struct HoldCache<S> {
    store: S,
    memory: LruCache<String, CacheEntry>,
}

impl<S: KeyValueStore> HoldCache<S> {
    pub fn new(store: S, memory_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(memory_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            memory: LruCache::new(capacity),
        }
    }

    /// Fetch cached holds for a photo if they match `version`.
    ///
    /// A memory hit at the right version never touches the backing store. A
    /// store hit at the right version re-warms the memory tier. Corrupt or
    /// unreadable store entries are misses.
    pub fn get(&mut self, photo_id: &str, version: u64) -> Option<Vec<DetectedHold>> {
        let key = holds_key(photo_id);
        if let Some(entry) = self.memory.get(&key) {
            if entry.version == version {
                return Some(entry.holds.clone());
            }
        }

        let payload = match self.store.get(&key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                debug!("hold cache read failed for {key}: {err:#}");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&payload) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("hold cache entry for {key} is corrupt: {err}");
                return None;
            }
        };
        if entry.version != version {
            return None;
        }

        let holds = entry.holds.clone();
        self.memory.put(key, entry);
        Some(holds)
    }

    /// Store holds for a photo at `version`, in both tiers.
    ///
    /// The memory tier is updated even when the durable write fails.
    pub fn set(&mut self, photo_id: &str, version: u64, holds: Vec<DetectedHold>) {
        let key = holds_key(photo_id);
        let entry = CacheEntry { version, holds };
        match serde_json::to_string(&entry) {
            Ok(payload) => {
                if let Err(err) = self.store.set(&key, &payload) {
                    debug!("hold cache write failed for {key}: {err:#}");
                }
            }
            Err(err) => debug!("hold cache entry for {key} failed to serialize: {err}"),
        }
        self.memory.put(key, entry);
    }

    /// Drop a photo's holds from both tiers.
    pub fn invalidate(&mut self, photo_id: &str) {
        let key = holds_key(photo_id);
        self.memory.pop(&key);
        if let Err(err) = self.store.remove(&key) {
            debug!("hold cache removal failed for {key}: {err:#}");
        }
    }
}

/// Loaded pixel dimensions of a photo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

fn dimensions_key(key: &str) -> String {
    format!("image_dimensions:{key}")
}

/// Durable cache of photo dimensions, so hit-testing and overlays don't need
/// to re-decode the image.
///
/// Dimensions never change for a stored photo, so entries are unversioned.
pub struct DimensionCache<S> {
    store: S,
}

impl<S: KeyValueStore> DimensionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, photo_key: &str) -> Option<ImageDimensions> {
        let key = dimensions_key(photo_key);
        match self.store.get(&key) {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(dimensions) => Some(dimensions),
                Err(err) => {
                    debug!("dimension cache entry for {key} is corrupt: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                debug!("dimension cache read failed for {key}: {err:#}");
                None
            }
        }
    }

    pub fn set(&self, photo_key: &str, dimensions: ImageDimensions) {
        let key = dimensions_key(photo_key);
        match serde_json::to_string(&dimensions) {
            Ok(payload) => {
                if let Err(err) = self.store.set(&key, &payload) {
                    debug!("dimension cache write failed for {key}: {err:#}");
                }
            }
            Err(err) => debug!("dimension cache entry for {key} failed to serialize: {err}"),
        }
    }
}
