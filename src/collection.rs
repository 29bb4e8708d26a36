//! k-wise hash concatenations and their shared-pool composition.
//!
//! A table's hash function is a concatenation of k independent projection
//! hashes; two points land in the same bucket only if all k components
//! agree, which sharpens the separation between near and far collision
//! probabilities to p(c)^k.
//!
//! Evaluating L independent k-concatenations costs O(L·k·d) per point. The
//! pooled scheme instead samples m half-width concatenations and forms one
//! table function per unordered pair (i, j), giving L = m(m−1)/2 tables for
//! O(m·k·d/2) projection work. The shared work is carried by
//! [`PrecomputedHashes`]: evaluate the pool once per point, then every table
//! on that pool assembles its k-vector by concatenating two cached halves.

use std::sync::Arc;

use rand::Rng;

use crate::error::{LshError, Result};
use crate::pstable::{PStableFamily, PStableHash};

/// A k-concatenation of independent projection hashes.
#[derive(Debug, Clone)]
pub struct HashCollection {
    hashes: Vec<PStableHash>,
}

impl HashCollection {
    /// Sample `arity` independent hashes from `family`.
    pub fn sample(family: &PStableFamily, arity: usize, rng: &mut impl Rng) -> Self {
        let hashes = (0..arity).map(|_| family.sample(rng)).collect();
        Self { hashes }
    }

    /// Evaluate every component, appending to `out`.
    fn eval_into(&self, v: &[f64], out: &mut Vec<i32>) -> Result<()> {
        for h in &self.hashes {
            out.push(h.eval(v)?);
        }
        Ok(())
    }

    /// Evaluate into a fresh k-vector.
    pub fn eval(&self, v: &[f64]) -> Result<Vec<i32>> {
        let mut out = Vec::with_capacity(self.hashes.len());
        self.eval_into(v, &mut out)?;
        Ok(out)
    }
}

/// Shared, immutable pool of half-width collections.
///
/// Composites hold the pool by handle; handle identity (not structural
/// equality) decides whether a precomputation belongs to a composite.
pub type HashPool = Arc<Vec<HashCollection>>;

/// Hash work evaluated once per point and reused by every table.
///
/// Direct collections need nothing beyond the point itself; pooled
/// composites cache one half-evaluation per pool member.
#[derive(Debug, Clone)]
pub enum PrecomputedHashes {
    /// The point stands for itself.
    Identity,
    /// One cached k/2-vector per pool member.
    Pool {
        pool: HashPool,
        halves: Vec<Vec<i32>>,
    },
}

/// A per-table hash function mapping a point to its k-vector.
///
/// The index is generic over this trait, so the two built-in families (and
/// test doubles) all drive the same insert/query machinery.
pub trait LshHasher {
    /// Expected point dimensionality.
    fn dimension(&self) -> usize;

    /// Length of the emitted k-vector.
    fn arity(&self) -> usize;

    /// Evaluate from the raw point.
    fn apply(&self, v: &[f64]) -> Result<Vec<i32>>;

    /// Evaluate the work shareable across tables. Called once per point;
    /// the default is the identity precomputation.
    fn precompute(&self, v: &[f64]) -> Result<PrecomputedHashes> {
        let _ = v;
        Ok(PrecomputedHashes::Identity)
    }

    /// Evaluate using a precomputation from [`LshHasher::precompute`].
    ///
    /// [`PrecomputedHashes::Identity`] always falls back to raw evaluation;
    /// a cached pool from a different family is a [`LshError::PoolMismatch`].
    fn apply_precomputed(&self, v: &[f64], pre: &PrecomputedHashes) -> Result<Vec<i32>>;
}

impl LshHasher for HashCollection {
    fn dimension(&self) -> usize {
        self.hashes.first().map_or(0, PStableHash::dimension)
    }

    fn arity(&self) -> usize {
        self.hashes.len()
    }

    fn apply(&self, v: &[f64]) -> Result<Vec<i32>> {
        self.eval(v)
    }

    fn apply_precomputed(&self, v: &[f64], pre: &PrecomputedHashes) -> Result<Vec<i32>> {
        match pre {
            PrecomputedHashes::Identity => self.eval(v),
            PrecomputedHashes::Pool { .. } => Err(LshError::PoolMismatch),
        }
    }
}

/// One table function formed from pool members `i` and `j`, with i < j.
#[derive(Debug, Clone)]
pub struct CompositeCollection {
    pool: HashPool,
    i: usize,
    j: usize,
}

impl CompositeCollection {
    /// The pool this composite draws from.
    pub fn pool(&self) -> &HashPool {
        &self.pool
    }

    /// Pool member indices of this composite.
    pub fn pair(&self) -> (usize, usize) {
        (self.i, self.j)
    }
}

impl LshHasher for CompositeCollection {
    fn dimension(&self) -> usize {
        self.pool[self.i].dimension()
    }

    fn arity(&self) -> usize {
        self.pool[self.i].arity() + self.pool[self.j].arity()
    }

    fn apply(&self, v: &[f64]) -> Result<Vec<i32>> {
        let mut out = Vec::with_capacity(self.arity());
        self.pool[self.i].eval_into(v, &mut out)?;
        self.pool[self.j].eval_into(v, &mut out)?;
        Ok(out)
    }

    fn precompute(&self, v: &[f64]) -> Result<PrecomputedHashes> {
        let halves = self
            .pool
            .iter()
            .map(|half| half.eval(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(PrecomputedHashes::Pool {
            pool: Arc::clone(&self.pool),
            halves,
        })
    }

    fn apply_precomputed(&self, v: &[f64], pre: &PrecomputedHashes) -> Result<Vec<i32>> {
        match pre {
            PrecomputedHashes::Identity => self.apply(v),
            PrecomputedHashes::Pool { pool, halves } => {
                if !Arc::ptr_eq(pool, &self.pool) {
                    return Err(LshError::PoolMismatch);
                }
                let mut out = Vec::with_capacity(self.arity());
                out.extend_from_slice(&halves[self.i]);
                out.extend_from_slice(&halves[self.j]);
                Ok(out)
            }
        }
    }
}

/// Sample `tables` independent k-concatenations, one per hash table.
pub fn build_g(
    dimension: usize,
    width: f64,
    arity: usize,
    tables: usize,
    radius: f64,
    rng: &mut impl Rng,
) -> Result<Vec<HashCollection>> {
    if arity == 0 {
        return Err(LshError::InvalidParameters(
            "arity must be positive".to_string(),
        ));
    }
    if tables == 0 {
        return Err(LshError::InvalidParameters(
            "at least one table is required".to_string(),
        ));
    }
    let family = PStableFamily::new(dimension, width, radius)?;
    Ok((0..tables)
        .map(|_| HashCollection::sample(&family, arity, rng))
        .collect())
}

/// Sample a pool of `pool_size` half-width concatenations and emit one
/// composite per unordered pair, in lexicographic (i, j) order.
///
/// Requires an even `arity` and `tables` consistent with the pool:
/// tables = pool_size·(pool_size − 1)/2.
pub fn build_u(
    dimension: usize,
    width: f64,
    arity: usize,
    tables: usize,
    radius: f64,
    pool_size: usize,
    rng: &mut impl Rng,
) -> Result<Vec<CompositeCollection>> {
    if arity == 0 || arity % 2 != 0 {
        return Err(LshError::InvalidParameters(format!(
            "arity must be positive and even for pooled collections, got {arity}"
        )));
    }
    if pool_size < 2 {
        return Err(LshError::InvalidParameters(format!(
            "pool size must be at least 2, got {pool_size}"
        )));
    }
    let expected = pool_size * (pool_size - 1) / 2;
    if tables != expected {
        return Err(LshError::InvalidParameters(format!(
            "{tables} tables inconsistent with pool size {pool_size} (expected {expected})"
        )));
    }
    let family = PStableFamily::new(dimension, width, radius)?;
    let pool: HashPool = Arc::new(
        (0..pool_size)
            .map(|_| HashCollection::sample(&family, arity / 2, rng))
            .collect(),
    );
    let mut out = Vec::with_capacity(expected);
    for i in 0..pool_size {
        for j in (i + 1)..pool_size {
            out.push(CompositeCollection {
                pool: Arc::clone(&pool),
                i,
                j,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn g_collection_emits_arity_components() {
        let mut rng = StdRng::seed_from_u64(1);
        let cols = build_g(8, 4.0, 5, 3, 1.0, &mut rng).expect("valid g build");
        assert_eq!(cols.len(), 3);
        let v = vec![0.5; 8];
        for c in &cols {
            assert_eq!(c.arity(), 5);
            assert_eq!(c.dimension(), 8);
            assert_eq!(c.apply(&v).expect("apply").len(), 5);
        }
    }

    #[test]
    fn u_builder_validates_arity_and_table_count() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(build_u(8, 4.0, 5, 10, 1.0, 5, &mut rng).is_err()); // odd arity
        assert!(build_u(8, 4.0, 6, 9, 1.0, 5, &mut rng).is_err()); // 9 != 10
        assert!(build_u(8, 4.0, 6, 0, 1.0, 1, &mut rng).is_err()); // degenerate pool
        assert!(build_u(8, 4.0, 6, 10, 1.0, 5, &mut rng).is_ok());
    }

    #[test]
    fn u_builder_emits_pairs_in_lexicographic_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let cols = build_u(10, 4.0, 6, 10, 1.0, 5, &mut rng).expect("valid u build");
        let pairs: Vec<(usize, usize)> = cols.iter().map(CompositeCollection::pair).collect();
        assert_eq!(
            pairs,
            vec![
                (0, 1),
                (0, 2),
                (0, 3),
                (0, 4),
                (1, 2),
                (1, 3),
                (1, 4),
                (2, 3),
                (2, 4),
                (3, 4)
            ]
        );
    }

    #[test]
    fn composites_share_one_pool() {
        let mut rng = StdRng::seed_from_u64(4);
        let cols = build_u(4, 4.0, 4, 3, 1.0, 3, &mut rng).expect("valid u build");
        for c in &cols[1..] {
            assert!(Arc::ptr_eq(c.pool(), cols[0].pool()));
        }
    }

    #[test]
    fn composite_concatenates_its_halves() {
        let mut rng = StdRng::seed_from_u64(5);
        let cols = build_u(4, 4.0, 6, 3, 1.0, 3, &mut rng).expect("valid u build");
        let v = [0.1, -0.2, 0.3, -0.4];
        let c = &cols[0];
        let (i, j) = c.pair();
        let mut expected = c.pool()[i].eval(&v).expect("half eval");
        expected.extend(c.pool()[j].eval(&v).expect("half eval"));
        assert_eq!(c.apply(&v).expect("apply"), expected);
        assert_eq!(c.arity(), 6);
    }

    #[test]
    fn precomputed_matches_raw_evaluation() {
        let mut rng = StdRng::seed_from_u64(6);
        let cols = build_u(6, 4.0, 8, 6, 1.0, 4, &mut rng).expect("valid u build");
        let v = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4];
        let pre = cols[0].precompute(&v).expect("precompute");
        for c in &cols {
            assert_eq!(
                c.apply(&v).expect("apply"),
                c.apply_precomputed(&v, &pre).expect("apply precomputed"),
            );
        }
    }

    #[test]
    fn foreign_pool_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let cols = build_u(4, 4.0, 4, 3, 1.0, 3, &mut rng).expect("valid u build");
        let other = build_u(4, 4.0, 4, 3, 1.0, 3, &mut rng).expect("valid u build");
        let v = [1.0, 2.0, 3.0, 4.0];
        let pre = other[0].precompute(&v).expect("precompute");
        assert_eq!(
            cols[0].apply_precomputed(&v, &pre).unwrap_err(),
            LshError::PoolMismatch
        );
    }

    #[test]
    fn identity_precomputation_falls_back_to_raw() {
        let mut rng = StdRng::seed_from_u64(8);
        let cols = build_u(4, 4.0, 4, 3, 1.0, 3, &mut rng).expect("valid u build");
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            cols[0]
                .apply_precomputed(&v, &PrecomputedHashes::Identity)
                .expect("identity fallback"),
            cols[0].apply(&v).expect("apply"),
        );
    }
}
