//! nearfield: R-near-neighbor search with p-stable Locality Sensitive Hashing.
//!
//! Given a dataset of d-dimensional `f64` vectors and a radius R, the index
//! returns, for each query point, points within Euclidean distance R: points
//! at distance ≤ R are reported with high probability, points far beyond R
//! with low probability. Every returned point is verified against the exact
//! distance, so false positives never survive a query.
//!
//! # Structure
//!
//! | Layer | Module | Role |
//! |-------|--------|------|
//! | Projection hash | [`pstable`] | ⌊(a·v)/R + b⌋ with Gaussian a (2-stable) |
//! | Concatenation | [`collection`] | k-wise g-functions, pooled u-functions |
//! | Reduction | [`modp`] | k-vector → bucket index + fingerprint, mod 2³²−5 |
//! | Storage | [`bucket`] | open addressing, probe key ≠ stored key |
//! | Index | [`index`] | L tables, dedup, exact verification |
//!
//! The pooled (u-function) family is the one to reach for at large L: it
//! computes m half-width hash vectors per point and derives L = m(m−1)/2
//! table keys from their pairs, instead of L full evaluations.
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use nearfield::{build_u, LSHIndex};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! // A 10x10 integer grid; point (x, y) has id 10*x + y.
//! let points: Vec<Vec<f64>> = (0..100)
//!     .map(|i| vec![(i / 10) as f64, (i % 10) as f64])
//!     .collect();
//!
//! // 10 tables derived from a pool of 5 half-width collections.
//! let collections = build_u(2, 4.0, 4, 10, 1.5, 5, &mut rng)?;
//! let index = LSHIndex::build(1.5, collections, &points, &mut rng)?;
//!
//! let neighbors = index.query(&[5.0, 5.0])?;
//! assert!(neighbors.contains(&55)); // the exact duplicate is always found
//! # Ok::<(), nearfield::LshError>(())
//! ```
//!
//! # Guarantees and non-guarantees
//!
//! - Every id returned by [`LSHIndex::query`] is within R of the query
//!   (exact L2, checked).
//! - Each id appears at most once per query.
//! - A point identical to the query is always returned: it shares every
//!   bucket with the query in every table.
//! - Points near the radius boundary can be missed with probability that
//!   shrinks exponentially in the number of tables.
//! - Construction is randomized; pass a seeded [`rand::rngs::StdRng`] for
//!   reproducible indexes.
//!
//! # References
//!
//! - Datar, Immorlica, Indyk, Mirrokni (2004): "Locality-sensitive hashing
//!   scheme based on p-stable distributions"
//! - Andoni, Indyk (2006): "Near-optimal hashing algorithms for approximate
//!   nearest neighbor in high dimensions"

pub mod bucket;
pub mod collection;
pub mod distance;
pub mod error;
pub mod index;
pub mod modp;
pub mod pstable;

pub use collection::{
    build_g, build_u, CompositeCollection, HashCollection, HashPool, LshHasher,
    PrecomputedHashes,
};
pub use error::{LshError, Result};
pub use index::{IndexParams, IndexStats, LSHIndex};
pub use modp::{ModPrimeHash, MODP_PRIME};
pub use pstable::{PStableFamily, PStableHash};
