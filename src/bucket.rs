//! Open-addressing bucket storage with separate probe and stored keys.
//!
//! A standard map keyed on full k-vectors would hold every k-vector it has
//! ever seen. Here the k-vector is reduced twice instead: the bucket index
//! picks the probe start, and the fingerprint is the key actually stored and
//! compared. Distinct k-vectors that collide in both reductions share a
//! bucket; the index's exact distance filter absorbs those false positives.
//!
//! The table is sized once at construction and never rehashes. Rehashing
//! would need the bucket index of every stored entry, which is a function of
//! the original k-vector and is deliberately not kept.

use smallvec::SmallVec;

use crate::error::{LshError, Result};

/// Point ids stored per bucket. Most buckets hold a handful of points.
type PointList = SmallVec<[u32; 4]>;

#[derive(Debug, Clone)]
struct Bucket {
    fingerprint: u32,
    points: PointList,
}

/// Fixed-capacity open-addressing table keyed by (bucket index, fingerprint).
#[derive(Debug, Clone)]
pub struct BucketMap {
    slots: Vec<Option<Bucket>>,
    mask: usize,
    occupied: usize,
}

impl BucketMap {
    /// Create a map with at least `min_slots` slots, rounded up to a power
    /// of two.
    pub fn with_capacity(min_slots: usize) -> Self {
        let cap = min_slots.max(2).next_power_of_two();
        Self {
            slots: vec![None; cap],
            mask: cap - 1,
            occupied: 0,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots (distinct stored fingerprint chains).
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Whether no entry has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Triangular-quadratic probe position for `step`. Visits every slot of
    /// a power-of-two table exactly once over a full cycle.
    #[inline]
    fn probe(&self, bucket: u32, step: usize) -> usize {
        (bucket as usize + (step + step * step) / 2) & self.mask
    }

    /// Insert `point` under (`bucket`, `fingerprint`).
    ///
    /// An occupied slot with the same fingerprint extends the stored list;
    /// an occupied slot with a different fingerprint keeps probing.
    pub fn insert(&mut self, bucket: u32, fingerprint: u32, point: u32) -> Result<()> {
        for step in 0..self.slots.len() {
            let pos = self.probe(bucket, step);
            match self.slots[pos].as_mut() {
                Some(b) if b.fingerprint == fingerprint => {
                    b.points.push(point);
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    let mut points = PointList::new();
                    points.push(point);
                    self.slots[pos] = Some(Bucket {
                        fingerprint,
                        points,
                    });
                    self.occupied += 1;
                    return Ok(());
                }
            }
        }
        Err(LshError::CapacityExceeded {
            capacity: self.slots.len(),
        })
    }

    /// Look up the point list stored under (`bucket`, `fingerprint`).
    ///
    /// Probing stops at the first empty slot (a miss) or the first slot
    /// whose stored fingerprint matches. The match compares fingerprints
    /// only, so a list created by a different k-vector that collided in both
    /// reductions may be returned.
    pub fn get(&self, bucket: u32, fingerprint: u32) -> Option<&[u32]> {
        for step in 0..self.slots.len() {
            match &self.slots[self.probe(bucket, step)] {
                Some(b) if b.fingerprint == fingerprint => return Some(&b.points),
                Some(_) => {}
                None => return None,
            }
        }
        None
    }

    /// Approximate heap footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        let slot_bytes = self.slots.len() * std::mem::size_of::<Option<Bucket>>();
        let spill_bytes: usize = self
            .slots
            .iter()
            .flatten()
            .filter(|b| b.points.spilled())
            .map(|b| b.points.capacity() * std::mem::size_of::<u32>())
            .sum();
        slot_bytes + spill_bytes
    }
}
