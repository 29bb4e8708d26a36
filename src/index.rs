//! The R-near-neighbor index.
//!
//! Build wires one bucket table to each hash collection, then inserts every
//! point into every table; the per-point hash work shared across tables is
//! evaluated once through the collection's precomputation. Query probes all
//! tables, funnels candidates through a tried bitset so each point is
//! distance-checked at most once, and keeps those within the exact Euclidean
//! radius.

use rand::Rng;

use crate::bucket::BucketMap;
use crate::collection::{LshHasher, PrecomputedHashes};
use crate::distance::l2_distance_squared;
use crate::error::{LshError, Result};
use crate::modp::ModPrimeHash;

/// Index construction parameters.
#[derive(Clone, Debug)]
pub struct IndexParams {
    /// Slots per table, as a multiple of the dataset size.
    pub capacity_factor: usize,

    /// Output width of the stored fingerprint, in bits (1..=32).
    pub fingerprint_bits: u32,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            capacity_factor: 2,
            fingerprint_bits: 32,
        }
    }
}

/// One hash table: its collection, the two k-vector reductions, and the
/// bucket store.
#[derive(Debug)]
struct Table<C> {
    collection: C,
    t1: ModPrimeHash,
    t2: ModPrimeHash,
    map: BucketMap,
}

impl<C: LshHasher> Table<C> {
    /// Reduce a point to its (bucket, fingerprint) pair in this table.
    fn keys(&self, v: &[f64], pre: &PrecomputedHashes) -> Result<(u32, u32)> {
        let z = self.collection.apply_precomputed(v, pre)?;
        Ok((self.t1.hash(&z)?, self.t2.hash(&z)?))
    }
}

/// Statistics about a built index.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub num_points: usize,
    pub dimension: usize,
    pub num_tables: usize,
    /// Slots per table.
    pub slot_capacity: usize,
    /// Occupied slots summed over all tables.
    pub occupied_slots: usize,
}

/// LSH index answering R-near-neighbor queries over a borrowed dataset.
///
/// The dataset is borrowed for the index lifetime and never copied; point
/// identity is position in the slice. The index is immutable after build.
#[derive(Debug)]
pub struct LSHIndex<'p, C> {
    points: &'p [Vec<f64>],
    radius: f64,
    dimension: usize,
    tables: Vec<Table<C>>,
}

impl<'p, C: LshHasher> LSHIndex<'p, C> {
    /// Build an index with default [`IndexParams`].
    pub fn build(
        radius: f64,
        collections: Vec<C>,
        points: &'p [Vec<f64>],
        rng: &mut impl Rng,
    ) -> Result<Self> {
        Self::build_with_params(radius, collections, points, IndexParams::default(), rng)
    }

    /// Build an index: one bucket table per collection, sized to
    /// `capacity_factor · |points|`, each point inserted into every table.
    ///
    /// A single evaluation failure aborts the build.
    pub fn build_with_params(
        radius: f64,
        collections: Vec<C>,
        points: &'p [Vec<f64>],
        params: IndexParams,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if !(radius > 0.0) {
            return Err(LshError::InvalidParameters(format!(
                "radius must be positive, got {radius}"
            )));
        }
        if collections.is_empty() {
            return Err(LshError::InvalidParameters(
                "at least one collection is required".to_string(),
            ));
        }
        if params.capacity_factor == 0 {
            return Err(LshError::InvalidParameters(
                "capacity factor must be positive".to_string(),
            ));
        }
        if points.len() > u32::MAX as usize {
            return Err(LshError::InvalidParameters(format!(
                "dataset of {} points exceeds the id space",
                points.len()
            )));
        }

        let dimension = collections[0].dimension();
        let slots = points.len().saturating_mul(params.capacity_factor);

        let mut tables: Vec<Table<C>> = collections
            .into_iter()
            .map(|collection| {
                let arity = collection.arity();
                Ok(Table {
                    t1: ModPrimeHash::new(arity, rng)?,
                    t2: ModPrimeHash::with_output_bits(arity, params.fingerprint_bits, rng)?,
                    map: BucketMap::with_capacity(slots),
                    collection,
                })
            })
            .collect::<Result<_>>()?;

        for (id, point) in points.iter().enumerate() {
            if point.len() != dimension {
                return Err(LshError::InvalidDimension {
                    expected: dimension,
                    actual: point.len(),
                });
            }
            let pre = tables[0].collection.precompute(point)?;
            for table in &mut tables {
                let (bucket, fingerprint) = table.keys(point, &pre)?;
                table.map.insert(bucket, fingerprint, id as u32)?;
            }
        }

        Ok(Self {
            points,
            radius,
            dimension,
            tables,
        })
    }

    /// Point ids within `radius` of `q`, in unspecified order, each at most
    /// once.
    pub fn query(&self, q: &[f64]) -> Result<Vec<u32>> {
        if q.len() != self.dimension {
            return Err(LshError::InvalidDimension {
                expected: self.dimension,
                actual: q.len(),
            });
        }

        let pre = self.tables[0].collection.precompute(q)?;
        let mut tried = TriedSet::new(self.points.len());
        let mut results = Vec::new();
        let radius_sq = self.radius * self.radius;

        for table in &self.tables {
            let (bucket, fingerprint) = table.keys(q, &pre)?;
            let Some(candidates) = table.map.get(bucket, fingerprint) else {
                continue;
            };
            for &id in candidates {
                if !tried.insert(id as usize) {
                    continue;
                }
                if l2_distance_squared(&self.points[id as usize], q) <= radius_sq {
                    results.push(id);
                }
            }
        }

        Ok(results)
    }

    /// Near neighbors as borrowed point views.
    pub fn query_points(&self, q: &[f64]) -> Result<Vec<&'p [f64]>> {
        Ok(self
            .query(q)?
            .into_iter()
            .map(|id| self.points[id as usize].as_slice())
            .collect())
    }

    /// Query radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Point dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of hash tables.
    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Index statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_points: self.points.len(),
            dimension: self.dimension,
            num_tables: self.tables.len(),
            slot_capacity: self.tables.first().map_or(0, |t| t.map.capacity()),
            occupied_slots: self.tables.iter().map(|t| t.map.occupied()).sum(),
        }
    }

    /// Approximate index size in bytes, excluding the borrowed dataset.
    pub fn size_bytes(&self) -> usize {
        self.tables.iter().map(|t| t.map.size_bytes()).sum()
    }
}

/// Fixed-size bitset over point ids: which candidates were already
/// distance-checked during this query.
struct TriedSet {
    words: Vec<u64>,
}

impl TriedSet {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Mark `i`; returns whether it was previously unmarked.
    fn insert(&mut self, i: usize) -> bool {
        let (word, bit) = (i / 64, 1u64 << (i % 64));
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::build_g;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_2d() -> Vec<Vec<f64>> {
        let mut points = Vec::with_capacity(100);
        for i in 0..10 {
            for j in 0..10 {
                points.push(vec![i as f64, j as f64]);
            }
        }
        points
    }

    #[test]
    fn build_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = grid_2d();
        let cols = build_g(2, 4.0, 4, 5, 1.5, &mut rng).expect("valid g build");
        assert!(LSHIndex::build(0.0, cols.clone(), &points, &mut rng).is_err());
        assert!(LSHIndex::build(-1.0, cols.clone(), &points, &mut rng).is_err());
        assert!(
            LSHIndex::build(1.5, Vec::<crate::collection::HashCollection>::new(), &points, &mut rng)
                .is_err()
        );
        assert!(LSHIndex::build_with_params(
            1.5,
            cols.clone(),
            &points,
            IndexParams {
                capacity_factor: 0,
                fingerprint_bits: 32
            },
            &mut rng,
        )
        .is_err());
        assert!(LSHIndex::build_with_params(
            1.5,
            cols,
            &points,
            IndexParams {
                capacity_factor: 2,
                fingerprint_bits: 0
            },
            &mut rng,
        )
        .is_err());
    }

    #[test]
    fn build_rejects_ragged_points() {
        let mut rng = StdRng::seed_from_u64(2);
        let points = vec![vec![0.0, 0.0], vec![1.0, 1.0, 1.0]];
        let cols = build_g(2, 4.0, 4, 5, 1.0, &mut rng).expect("valid g build");
        let err = LSHIndex::build(1.0, cols, &points, &mut rng).unwrap_err();
        assert_eq!(
            err,
            LshError::InvalidDimension {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = grid_2d();
        let cols = build_g(2, 4.0, 4, 5, 1.5, &mut rng).expect("valid g build");
        let index = LSHIndex::build(1.5, cols, &points, &mut rng).expect("build");
        assert!(index.query(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn tables_are_sized_to_twice_the_dataset() {
        let mut rng = StdRng::seed_from_u64(4);
        let points = grid_2d();
        let cols = build_g(2, 4.0, 4, 5, 1.5, &mut rng).expect("valid g build");
        let index = LSHIndex::build(1.5, cols, &points, &mut rng).expect("build");
        let stats = index.stats();
        assert_eq!(stats.num_points, 100);
        assert_eq!(stats.num_tables, 5);
        assert!(stats.slot_capacity >= 200);
        assert!(stats.occupied_slots > 0);
        assert!(index.size_bytes() > 0);
    }

    #[test]
    fn empty_dataset_builds_and_misses() {
        let mut rng = StdRng::seed_from_u64(5);
        let points: Vec<Vec<f64>> = Vec::new();
        let cols = build_g(2, 4.0, 4, 5, 1.0, &mut rng).expect("valid g build");
        let index = LSHIndex::build(1.0, cols, &points, &mut rng).expect("build");
        assert_eq!(index.query(&[0.0, 0.0]).expect("query"), Vec::<u32>::new());
    }

    #[test]
    fn query_points_resolves_ids() {
        let mut rng = StdRng::seed_from_u64(6);
        let points = grid_2d();
        let cols = build_g(2, 4.0, 4, 10, 0.5, &mut rng).expect("valid g build");
        let index = LSHIndex::build(0.5, cols, &points, &mut rng).expect("build");
        let q = vec![3.0, 7.0];
        let views = index.query_points(&q).expect("query");
        assert!(views.contains(&q.as_slice()));
    }

    #[test]
    fn tried_set_reports_first_insert_only() {
        let mut tried = TriedSet::new(130);
        assert!(tried.insert(0));
        assert!(!tried.insert(0));
        assert!(tried.insert(64));
        assert!(tried.insert(129));
        assert!(!tried.insert(129));
    }
}
