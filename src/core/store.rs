use std::cmp::Ordering;
use std::collections::BinaryHeap;

use uuid::Uuid;

use crate::core::types::{Band, BandId};

pub const STORE_KIND: &str = "BinaryHeap (min id first)";

// BinaryHeap is a max-heap, so the ordering is reversed to keep the
// smallest id at the root.
#[derive(Debug, Clone)]
struct MinById(Band);

impl PartialEq for MinById {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for MinById {}

impl PartialOrd for MinById {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinById {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.id.cmp(&self.0.id)
    }
}

/// The working set of bands, ordered so that the smallest id is always
/// available first.
///
/// Iteration (and [`BandStore::snapshot`]) follows the heap's internal array
/// order: only the first element is guaranteed to be the minimum, the rest
/// is not sorted.
#[derive(Debug, Clone, Default)]
pub struct BandStore {
    heap: BinaryHeap<MinById>,
}

impl BandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate ids are not rejected here; callers keep ids unique.
    pub fn insert(&mut self, band: Band) {
        self.heap.push(MinById(band));
    }

    pub fn peek_min(&self) -> Option<&Band> {
        self.heap.peek().map(|entry| &entry.0)
    }

    pub fn find_by_id(&self, id: BandId) -> Option<&Band> {
        self.iter().find(|band| band.id == id)
    }

    pub fn contains_id(&self, id: BandId) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn remove_by_id(&mut self, id: BandId) -> bool {
        self.remove_where(|band| band.id == id) > 0
    }

    /// Removes every band matching `predicate` and returns how many went.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Band) -> bool,
    {
        let before = self.heap.len();
        self.heap.retain(|entry| !predicate(&entry.0));
        before - self.heap.len()
    }

    /// Removes only the first band (in iteration order) matching `predicate`.
    pub fn remove_first_where<F>(&mut self, mut predicate: F) -> Option<Band>
    where
        F: FnMut(&Band) -> bool,
    {
        let position = self.heap.iter().position(|entry| predicate(&entry.0))?;
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let removed = entries.swap_remove(position);
        self.heap = BinaryHeap::from(entries);
        Some(removed.0)
    }

    pub fn remove_by_best_album(&mut self, album_name: &str) -> Option<Band> {
        let wanted = album_name.to_lowercase();
        self.remove_first_where(|band| {
            band.best_album
                .as_ref()
                .is_some_and(|album| album.name().to_lowercase() == wanted)
        })
    }

    pub fn remove_greater_than(&mut self, id: BandId) -> usize {
        self.remove_where(|band| band.id > id)
    }

    /// Replaces the band with the same id, inserting it even if there was
    /// nothing to replace.
    pub fn update(&mut self, band: Band) {
        let id = band.id;
        self.remove_by_id(id);
        self.insert(band);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn replace_all(&mut self, bands: impl IntoIterator<Item = Band>) {
        self.heap = bands.into_iter().map(MinById).collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Band> {
        self.heap.iter().map(|entry| &entry.0)
    }

    pub fn snapshot(&self) -> Vec<Band> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&Band) -> bool,
    {
        self.iter().filter(|band| predicate(band)).count()
    }

    pub fn count_by_participants(&self, participants: i32) -> usize {
        self.count_where(|band| band.participants == Some(participants))
    }

    /// Mean participant count over the bands that have one.
    pub fn average_participants(&self) -> Option<f64> {
        let counts: Vec<i64> = self
            .iter()
            .filter_map(|band| band.participants.map(i64::from))
            .collect();
        if counts.is_empty() {
            return None;
        }
        Some(counts.iter().sum::<i64>() as f64 / counts.len() as f64)
    }

    /// Draws a random positive id not yet present in the store.
    pub fn generate_id(&self) -> BandId {
        loop {
            let (high, _) = Uuid::new_v4().as_u64_pair();
            let id = (high & i64::MAX as u64) as i64;
            if id > 0 && !self.contains_id(id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Album, Coordinates};

    fn band(id: BandId) -> Band {
        Band::new(id, format!("band-{}", id), Coordinates::new(1, 1).unwrap())
            .with_participants(4)
            .with_best_album(Album::new(format!("album-{}", id), 10.0).unwrap())
    }

    fn store_with(ids: &[BandId]) -> BandStore {
        let mut store = BandStore::new();
        for &id in ids {
            store.insert(band(id));
        }
        store
    }

    #[test]
    fn test_peek_min() {
        let store = store_with(&[5, 2, 8]);
        assert_eq!(store.peek_min().map(|b| b.id), Some(2));
        assert!(BandStore::new().peek_min().is_none());
    }

    #[test]
    fn test_remove_by_id() {
        let mut store = store_with(&[5, 2, 8]);
        assert!(store.remove_by_id(2));
        assert!(store.find_by_id(2).is_none());
        assert!(!store.remove_by_id(2));
        assert_eq!(store.peek_min().map(|b| b.id), Some(5));
    }

    #[test]
    fn test_remove_greater_than_keeps_threshold() {
        let mut store = store_with(&[1, 5, 6, 9, 12]);
        assert_eq!(store.remove_greater_than(6), 2);
        let mut ids: Vec<_> = store.iter().map(|b| b.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 5, 6]);
    }

    #[test]
    fn test_update_missing_id_inserts() {
        let mut store = store_with(&[3]);
        store.update(band(4));
        assert_eq!(store.len(), 2);

        let renamed = Band { name: "renamed".to_string(), ..band(3) };
        store.update(renamed);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_id(3).unwrap().name, "renamed");
    }

    #[test]
    fn test_remove_by_best_album_removes_one() {
        let mut store = BandStore::new();
        for id in [1, 2, 3] {
            let b = band(id).with_best_album(Album::new("Shared", 1.0).unwrap());
            store.insert(b);
        }
        assert!(store.remove_by_best_album("sHaReD").is_some());
        assert_eq!(store.len(), 2);
        assert!(store.remove_by_best_album("missing").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_first_where_keeps_heap_order() {
        let mut store = store_with(&[7, 3, 9, 1, 4]);
        store.remove_first_where(|b| b.id == 1);
        assert_eq!(store.peek_min().map(|b| b.id), Some(3));
    }

    #[test]
    fn test_count_and_average() {
        let mut store = BandStore::new();
        store.insert(band(1).with_participants(4));
        store.insert(band(2).with_participants(4));
        store.insert(band(3).with_participants(7));
        let mut unset = band(4);
        unset.participants = None;
        store.insert(unset);

        assert_eq!(store.count_by_participants(4), 2);
        assert_eq!(store.average_participants(), Some(5.0));
        assert_eq!(BandStore::new().average_participants(), None);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = store_with(&[2, 1]);
        let snapshot = store.snapshot();
        store.clear();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_generate_id_is_positive_and_unique() {
        let store = store_with(&[1, 2, 3]);
        for _ in 0..100 {
            let id = store.generate_id();
            assert!(id > 0);
            assert!(!store.contains_id(id));
        }
    }
}
