// src/ahrs/rsqrt.rs

//! Reciprocal square root used for every normalization in the estimator.

use serde::{Deserialize, Serialize};

/// Strategy for computing `1 / sqrt(x)`.
///
/// `Exact` is the default. `Fast` trades a relative error below 0.2% for
/// fewer cycles on targets without a hardware square root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvSqrt {
    /// `1.0 / x.sqrt()`
    #[default]
    Exact,
    /// Bit-level estimate refined by one Newton-Raphson step.
    Fast,
}

impl InvSqrt {
    /// Computes `1 / sqrt(x)` with the selected strategy.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            InvSqrt::Exact => 1.0 / x.sqrt(),
            InvSqrt::Fast => fast_inv_sqrt(x),
        }
    }
}

/// Approximate `1 / sqrt(x)` for positive `x`.
///
/// The initial guess halves the exponent by shifting the IEEE-754 bit
/// pattern and subtracting it from a magic constant, then a single
/// Newton-Raphson iteration brings the relative error under 0.2%.
#[inline]
pub fn fast_inv_sqrt(x: f32) -> f32 {
    const MAGIC: u32 = 0x5f37_59df;
    let half = 0.5 * x;
    let y = f32::from_bits(MAGIC.wrapping_sub(x.to_bits() >> 1));
    y * (1.5 - half * y * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// The fast estimate stays within 0.2% of the exact value across
    /// the magnitudes the estimator normalizes.
    #[test]
    fn test_fast_inv_sqrt_relative_error() {
        for &x in &[1e-4_f32, 0.01, 0.25, 1.0, 2.0, 9.80665, 96.17, 1234.5, 1e6] {
            let exact = 1.0 / x.sqrt();
            let fast = fast_inv_sqrt(x);
            let relative = ((fast - exact) / exact).abs();
            assert!(
                relative < 2e-3,
                "Relative error {} too large for x = {}",
                relative,
                x
            );
        }
    }

    /// The exact strategy matches the standard library.
    #[test]
    fn test_exact_strategy() {
        assert!(value_close(0.5, InvSqrt::Exact.apply(4.0)));
        assert!(value_within(0.5, InvSqrt::Fast.apply(4.0), FILTER_TOLERANCE));
    }

    /// Exact is the default strategy.
    #[test]
    fn test_default_strategy() {
        assert_eq!(InvSqrt::Exact, InvSqrt::default());
    }
}
