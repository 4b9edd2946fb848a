//! Fixed-point math utilities for deterministic simulation.
//!
//! All ratios in the simulation (attack ratios, troop densities, AI
//! thresholds) use fixed-point arithmetic so that every replica computes
//! bit-identical results. Floating-point operations can produce different
//! results on different CPUs.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Build a fraction from a whole percentage.
#[must_use]
pub fn percent(pct: u32) -> Fixed {
    Fixed::saturating_from_num(pct) / Fixed::from_num(100)
}

/// Ratio `numerator / denominator` as a fixed-point number.
///
/// Returns zero when the denominator is zero.
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::saturating_from_num(numerator) / Fixed::saturating_from_num(denominator)
}

/// Scale an integer amount by a fixed-point fraction, rounding down.
#[must_use]
pub fn scale(amount: u64, fraction: Fixed) -> u64 {
    if fraction <= Fixed::ZERO {
        return 0;
    }
    let scaled = Fixed::saturating_from_num(amount).saturating_mul(fraction);
    scaled.floor().saturating_to_num()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(50), Fixed::from_num(1) / Fixed::from_num(2));
        assert_eq!(percent(100), Fixed::ONE);
        assert_eq!(percent(0), Fixed::ZERO);
        // Larger than the integer part holds: saturates instead of panicking.
        assert_eq!(percent(u32::MAX), Fixed::MAX / Fixed::from_num(100));
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(10, 0), Fixed::ZERO);
        assert_eq!(ratio(10, 4), Fixed::from_num(2.5));
    }

    #[test]
    fn test_scale_rounds_down() {
        assert_eq!(scale(1000, percent(20)), 200);
        assert_eq!(scale(10, Fixed::from_num(1) / Fixed::from_num(3)), 3);
        assert_eq!(scale(10, Fixed::ZERO), 0);
    }
}
