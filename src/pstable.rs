//! The 2-stable projection hash for Euclidean distance.
//!
//! A single hash is h(v) = ⌊(a·v)/R + b⌋, where the projection a has i.i.d.
//! 𝒩(0, 1/w²) entries and the offset b is uniform on [0, 1). Gaussians are
//! 2-stable: a·(p − q) is distributed as ‖p − q‖₂ times a standard Gaussian
//! scaled by 1/w, so the collision probability of two points is a decreasing
//! function of their Euclidean distance. Projections are sampled through
//! [`rand_distr::StandardNormal`] (Ziggurat), which is exact in the tails.
//!
//! # References
//!
//! - Datar, Immorlica, Indyk, Mirrokni (2004): "Locality-sensitive hashing
//!   scheme based on p-stable distributions"

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{LshError, Result};

/// A single sampled projection hash. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct PStableHash {
    /// Projection vector, entries ~ 𝒩(0, 1/w²).
    a: Vec<f64>,
    /// Offset in [0, 1).
    b: f64,
    /// Bucket denominator. The query radius, not the width parameter.
    radius: f64,
}

impl PStableHash {
    /// Expected input length.
    pub fn dimension(&self) -> usize {
        self.a.len()
    }

    /// Evaluate the hash: ⌊(a·v)/R + b⌋, flooring toward −∞.
    pub fn eval(&self, v: &[f64]) -> Result<i32> {
        if v.len() != self.a.len() {
            return Err(LshError::InvalidDimension {
                expected: self.a.len(),
                actual: v.len(),
            });
        }
        let dot: f64 = self.a.iter().zip(v.iter()).map(|(ai, vi)| ai * vi).sum();
        Ok((dot / self.radius + self.b).floor() as i32)
    }
}

/// Samples independent [`PStableHash`]es sharing one (d, w, R) parameter set.
#[derive(Debug, Clone)]
pub struct PStableFamily {
    dimension: usize,
    width: f64,
    radius: f64,
}

impl PStableFamily {
    /// Create a family over `dimension`-length points with bucket width `width`
    /// and query radius `radius`.
    pub fn new(dimension: usize, width: f64, radius: f64) -> Result<Self> {
        if dimension == 0 {
            return Err(LshError::InvalidParameters(
                "dimension must be positive".to_string(),
            ));
        }
        if !(width > 0.0) {
            return Err(LshError::InvalidParameters(format!(
                "width must be positive, got {width}"
            )));
        }
        if !(radius > 0.0) {
            return Err(LshError::InvalidParameters(format!(
                "radius must be positive, got {radius}"
            )));
        }
        Ok(Self {
            dimension,
            width,
            radius,
        })
    }

    /// Point dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bucket width parameter w; the projection deviation is 1/w.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Query radius carried into every sampled hash.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Draw one hash: a[i] ∼ 𝒩(0, 1/w²), b ∼ 𝒰[0, 1).
    pub fn sample(&self, rng: &mut impl Rng) -> PStableHash {
        let sigma = 1.0 / self.width;
        let a = (0..self.dimension)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                z * sigma
            })
            .collect();
        let b: f64 = rng.random();
        PStableHash {
            a,
            b,
            radius: self.radius,
        }
    }
}
