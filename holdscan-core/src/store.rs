//! Persistence seam for holds plus the write-side cache choreography.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context, Result};
use holdscan_utils::Point;

use crate::bus::{CacheEventBus, Topic};
use crate::cache::{HoldCache, KeyValueStore};
use crate::hold::{DetectedHold, HoldShape, NewHold};

/// Persistence backend for detected holds.
///
/// `delete` returns the removed row so callers learn which photo's caches to
/// invalidate without a prior lookup.
pub trait HoldStore {
    fn create(&mut self, hold: NewHold) -> Result<DetectedHold>;
    fn create_many(&mut self, photo_id: &str, shapes: Vec<HoldShape>)
        -> Result<Vec<DetectedHold>>;
    fn update(&mut self, id: &str, polygon: Vec<Point>, center: Point) -> Result<DetectedHold>;
    fn delete(&mut self, id: &str) -> Result<DetectedHold>;
    fn delete_by_photo(&mut self, photo_id: &str) -> Result<u64>;
    fn list_by_photo(&self, photo_id: &str) -> Result<Vec<DetectedHold>>;
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// In-memory [`HoldStore`] for tests and single-session hosts.
#[derive(Debug, Default)]
pub struct MemoryHoldStore {
    holds: Vec<DetectedHold>,
    next_id: u64,
}

impl MemoryHoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("hold-{}", self.next_id)
    }

    fn insert(&mut self, photo_id: &str, shape: HoldShape) -> DetectedHold {
        let hold = DetectedHold {
            id: self.allocate_id(),
            photo_id: photo_id.to_string(),
            polygon: shape.polygon,
            center: shape.center,
            confidence: shape.confidence,
            dominant_color: shape.dominant_color,
            class: shape.class,
            created_at: now_millis(),
        };
        self.holds.push(hold.clone());
        hold
    }
}

impl HoldStore for MemoryHoldStore {
    fn create(&mut self, hold: NewHold) -> Result<DetectedHold> {
        Ok(self.insert(&hold.photo_id, hold.shape))
    }

    fn create_many(
        &mut self,
        photo_id: &str,
        shapes: Vec<HoldShape>,
    ) -> Result<Vec<DetectedHold>> {
        Ok(shapes
            .into_iter()
            .map(|shape| self.insert(photo_id, shape))
            .collect())
    }

    fn update(&mut self, id: &str, polygon: Vec<Point>, center: Point) -> Result<DetectedHold> {
        let hold = self
            .holds
            .iter_mut()
            .find(|hold| hold.id == id)
            .with_context(|| format!("no hold with id {id}"))?;
        hold.polygon = polygon;
        hold.center = center;
        Ok(hold.clone())
    }

    fn delete(&mut self, id: &str) -> Result<DetectedHold> {
        let index = self
            .holds
            .iter()
            .position(|hold| hold.id == id)
            .with_context(|| format!("no hold with id {id}"))?;
        Ok(self.holds.remove(index))
    }

    fn delete_by_photo(&mut self, photo_id: &str) -> Result<u64> {
        let before = self.holds.len();
        self.holds.retain(|hold| hold.photo_id != photo_id);
        Ok((before - self.holds.len()) as u64)
    }

    fn list_by_photo(&self, photo_id: &str) -> Result<Vec<DetectedHold>> {
        Ok(self
            .holds
            .iter()
            .filter(|hold| hold.photo_id == photo_id)
            .cloned()
            .collect())
    }
}

/// Write-side coordinator: persists hold edits, then keeps caches honest.
///
/// Every successful mutation invalidates the photo's cached holds first and
/// then announces [`Topic::DetectedHolds`] on the bus, so listeners that
/// re-read through the cache observe fresh data.
pub struct HoldWriter<S, K> {
    store: S,
    cache: HoldCache<K>,
    bus: CacheEventBus,
}

impl<S: HoldStore, K: KeyValueStore> HoldWriter<S, K> {
    pub fn new(store: S, cache: HoldCache<K>, bus: CacheEventBus) -> Self {
        Self { store, cache, bus }
    }

    /// Persist one hold, e.g. a freehand outline.
    pub fn create(&mut self, hold: NewHold) -> Result<DetectedHold> {
        ensure!(
            hold.shape.has_valid_polygon(),
            "a hold polygon needs at least 3 points"
        );
        let created = self.store.create(hold)?;
        self.after_mutation(&created.photo_id);
        Ok(created)
    }

    /// Replace a photo's holds with a fresh detection result.
    ///
    /// The new set is cached at `version` immediately; other caches of the
    /// photo's holds are told to refetch.
    pub fn replace_detection(
        &mut self,
        photo_id: &str,
        version: u64,
        shapes: Vec<HoldShape>,
    ) -> Result<Vec<DetectedHold>> {
        ensure!(
            shapes.iter().all(HoldShape::has_valid_polygon),
            "every detected hold polygon needs at least 3 points"
        );
        self.store.delete_by_photo(photo_id)?;
        let created = self.store.create_many(photo_id, shapes)?;
        self.cache.set(photo_id, version, created.clone());
        self.bus.invalidate(Topic::DetectedHolds);
        Ok(created)
    }

    /// Rewrite one hold's geometry.
    pub fn update(&mut self, id: &str, polygon: Vec<Point>, center: Point) -> Result<DetectedHold> {
        ensure!(polygon.len() >= 3, "a hold polygon needs at least 3 points");
        let updated = self.store.update(id, polygon, center)?;
        self.after_mutation(&updated.photo_id);
        Ok(updated)
    }

    /// Remove one hold, returning the deleted row.
    pub fn delete(&mut self, id: &str) -> Result<DetectedHold> {
        let deleted = self.store.delete(id)?;
        self.after_mutation(&deleted.photo_id);
        Ok(deleted)
    }

    /// Remove every hold on a photo, returning how many were deleted.
    pub fn clear_photo(&mut self, photo_id: &str) -> Result<u64> {
        let removed = self.store.delete_by_photo(photo_id)?;
        self.after_mutation(photo_id);
        Ok(removed)
    }

    /// Read a photo's holds, preferring the cache.
    ///
    /// A miss reads the store, caches the rows at `version`, and returns
    /// them.
    pub fn holds(&mut self, photo_id: &str, version: u64) -> Result<Vec<DetectedHold>> {
        if let Some(holds) = self.cache.get(photo_id, version) {
            return Ok(holds);
        }
        let rows = self.store.list_by_photo(photo_id)?;
        self.cache.set(photo_id, version, rows.clone());
        Ok(rows)
    }

    /// Read a photo's holds straight from the store, bypassing the cache.
    pub fn list(&self, photo_id: &str) -> Result<Vec<DetectedHold>> {
        self.store.list_by_photo(photo_id)
    }

    fn after_mutation(&mut self, photo_id: &str) {
        self.cache.invalidate(photo_id);
        self.bus.invalidate(Topic::DetectedHolds);
    }
}
