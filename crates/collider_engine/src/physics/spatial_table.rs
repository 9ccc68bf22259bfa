//! Fixed-bucket hash table keyed by collider id
//!
//! The bucket of an entry is `id % bucket_count`. Buckets are plain vectors
//! kept free of gaps, so iteration is a straight walk over bucket then slot.

use super::collider::ColliderId;
use super::error::{PhysicsError, PhysicsResult};

/// Hash table of `T` values keyed by [`ColliderId`]
#[derive(Debug, Clone)]
pub struct SpatialTable<T> {
    buckets: Vec<Vec<(ColliderId, T)>>,
    len: usize,
}

impl<T> SpatialTable<T> {
    /// Create a table with `bucket_count` buckets (at least one)
    pub fn new(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count.max(1)).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn bucket_of(&self, id: ColliderId) -> usize {
        id.bucket(self.buckets.len())
    }

    /// Insert a new entry; an id can only be present once
    pub fn insert(&mut self, id: ColliderId, value: T) -> PhysicsResult<()> {
        if self.contains(id) {
            return Err(PhysicsError::AlreadyTracked);
        }
        let bucket = self.bucket_of(id);
        self.buckets[bucket].push((id, value));
        self.len += 1;
        Ok(())
    }

    /// Remove an entry, closing the gap it leaves in its bucket
    pub fn remove(&mut self, id: ColliderId) -> PhysicsResult<T> {
        let bucket = self.bucket_of(id);
        let slots = &mut self.buckets[bucket];
        let index = slots
            .iter()
            .position(|(existing, _)| *existing == id)
            .ok_or(PhysicsError::NotTracked(id))?;
        let (_, value) = slots.remove(index);
        self.len -= 1;
        Ok(value)
    }

    /// Look up an entry
    pub fn get(&self, id: ColliderId) -> Option<&T> {
        self.buckets[self.bucket_of(id)]
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, value)| value)
    }

    /// True if the id is present
    pub fn contains(&self, id: ColliderId) -> bool {
        self.get(id).is_some()
    }

    /// All entries in bucket-then-slot order
    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &T)> + '_ {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|(id, value)| (*id, value)))
    }

    /// Copy all entries into `out`, replacing its contents
    pub fn snapshot_into(&self, out: &mut Vec<(ColliderId, T)>)
    where
        T: Clone,
    {
        out.clear();
        out.extend(self.iter().map(|(id, value)| (id, value.clone())));
    }

    /// Remove every entry, keeping the buckets
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(Vec::clear);
        self.len = 0;
    }

    /// Check that every entry sits in its own bucket and the count agrees
    pub fn validate(&self) -> PhysicsResult<()> {
        let mut actual = 0;
        for (found, bucket) in self.buckets.iter().enumerate() {
            for (id, _) in bucket {
                let expected = self.bucket_of(*id);
                if expected != found {
                    return Err(PhysicsError::BucketMismatch { id: *id, found, expected });
                }
            }
            actual += bucket.len();
        }
        if actual != self.len {
            return Err(PhysicsError::BucketGap {
                reported: self.len,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ColliderId {
        ColliderId::new(raw)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut table = SpatialTable::new(10);
        table.insert(id(3), "a").unwrap();
        table.insert(id(13), "b").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(id(13)), Some(&"b"));

        assert_eq!(table.remove(id(3)).unwrap(), "a");
        assert_eq!(table.remove(id(3)), Err(PhysicsError::NotTracked(id(3))));
        assert!(table.contains(id(13)));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut table = SpatialTable::new(4);
        table.insert(id(1), ()).unwrap();
        assert_eq!(table.insert(id(1), ()), Err(PhysicsError::AlreadyTracked));
    }

    #[test]
    fn test_iteration_is_bucket_then_slot() {
        let mut table = SpatialTable::new(3);
        for raw in [5, 0, 3, 4, 1] {
            table.insert(id(raw), raw).unwrap();
        }
        let order: Vec<u64> = table.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(order, vec![0, 3, 4, 1, 5]);
    }

    #[test]
    fn test_round_trip_leaves_no_slots() {
        let mut table = SpatialTable::new(7);
        let ids: Vec<u64> = (0..50).collect();
        for &raw in &ids {
            table.insert(id(raw), raw).unwrap();
        }
        // Odd ids from the back, then even ids from the front
        for &raw in ids.iter().rev().step_by(2).chain(ids.iter().step_by(2)) {
            assert_eq!(table.remove(id(raw)).unwrap(), raw);
            assert!(table.validate().is_ok());
        }
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_zero_buckets_clamped() {
        let mut table = SpatialTable::new(0);
        assert_eq!(table.bucket_count(), 1);
        table.insert(id(42), ()).unwrap();
        assert!(table.contains(id(42)));
    }

    #[test]
    fn test_snapshot_into_replaces_contents() {
        let mut table = SpatialTable::new(5);
        table.insert(id(2), 20).unwrap();
        let mut out = vec![(id(99), 0)];
        table.snapshot_into(&mut out);
        assert_eq!(out, vec![(id(2), 20)]);
    }
}
