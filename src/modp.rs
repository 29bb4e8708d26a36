//! Universal hashing modulo a prime.
//!
//! Reduces an `i32` k-vector to a single unsigned value via a random linear
//! combination mod P, with P = 2³² − 5 the largest prime below 2³². Each hash
//! table carries two of these: one picks the probe start inside the bucket
//! map, the other produces the fingerprint stored in the slot. Together they
//! replace structural comparison of k-vectors with two cheap integer keys.

use rand::Rng;

use crate::error::{LshError, Result};

/// Largest prime below 2³².
pub const MODP_PRIME: u64 = 4_294_967_291;

/// A random linear combination mod [`MODP_PRIME`], truncated to a configured
/// number of output bits.
///
/// The combination is linear: before truncation,
/// `hash(x + y) ≡ hash(x) + hash(y) (mod P)`.
#[derive(Debug, Clone)]
pub struct ModPrimeHash {
    /// Coefficients drawn uniformly from `u32`.
    coeffs: Vec<u64>,
    mask: u32,
}

impl ModPrimeHash {
    /// Create a hash over `dimension`-length inputs with full 32-bit output.
    pub fn new(dimension: usize, rng: &mut impl Rng) -> Result<Self> {
        Self::with_output_bits(dimension, 32, rng)
    }

    /// Create a hash whose output is truncated to `bits` bits (1..=32).
    pub fn with_output_bits(dimension: usize, bits: u32, rng: &mut impl Rng) -> Result<Self> {
        if !(1..=32).contains(&bits) {
            return Err(LshError::InvalidParameters(format!(
                "output bits must be 1-32, got {bits}"
            )));
        }
        let coeffs = (0..dimension).map(|_| u64::from(rng.random::<u32>())).collect();
        let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
        Ok(Self { coeffs, mask })
    }

    /// Number of coefficients, i.e. the expected input length.
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// Hash a k-vector.
    ///
    /// Each term is widened before reduction and the running sum is brought
    /// below P at every step, so the result is exact for any `i32` input.
    pub fn hash(&self, z: &[i32]) -> Result<u32> {
        if z.len() != self.coeffs.len() {
            return Err(LshError::InvalidDimension {
                expected: self.coeffs.len(),
                actual: z.len(),
            });
        }
        let mut acc: u64 = 0;
        for (&zi, &ri) in z.iter().zip(self.coeffs.iter()) {
            let residue = i64::from(zi).rem_euclid(MODP_PRIME as i64) as u64;
            let term = (u128::from(residue) * u128::from(ri) % u128::from(MODP_PRIME)) as u64;
            acc = (acc + term) % MODP_PRIME;
        }
        Ok(acc as u32 & self.mask)
    }

    /// Scalar form for 1-dimensional inputs.
    pub fn hash_scalar(&self, z: i32) -> Result<u32> {
        self.hash(&[z])
    }
}
