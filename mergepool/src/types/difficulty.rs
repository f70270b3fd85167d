//! Difficulty type with lossless 256-bit representation.

use std::cmp::Ordering;
use std::fmt;

use bitcoin::pow::Target;

use super::target::TargetError;
use crate::u256::U256;

/// Fixed-point scale applied to fractional difficulties before the
/// integer division. `Target::MAX` occupies 224 bits, so shifting it by
/// 30 still fits in 256.
const FRACTION_BITS: usize = 30;

/// Mining difficulty.
///
/// Internally stores the corresponding target value for lossless 256-bit
/// precision. Difficulty and target have an inverse relationship:
/// ```text
/// target = MAX_TARGET / difficulty
/// difficulty = MAX_TARGET / target
/// ```
///
/// Pools set share difficulty in the primary chain's native unit divided
/// by a chain-specific share multiplier, so fractional difficulties are
/// routine here (a scrypt pool at difficulty 512 with multiplier 65536
/// checks shares against difficulty 0.0078125).
#[derive(Debug, Clone, Copy)]
pub struct Difficulty(Target);

impl Difficulty {
    /// Maximum difficulty (target of zero; no hash can satisfy it).
    pub const MAX: Self = Self(Target::ZERO);

    /// Create from a floating-point difficulty.
    ///
    /// Non-positive and non-finite values are rejected. Values too small to
    /// represent saturate at the largest 256-bit target.
    pub fn try_from_f64(value: f64) -> Result<Self, TargetError> {
        if value <= 0.0 || !value.is_finite() {
            return Err(TargetError::InvalidDifficulty(value));
        }

        let scaled = (value * (1u64 << FRACTION_BITS) as f64).round();
        if scaled < 1.0 {
            return Ok(Self(Target::from(U256::MAX)));
        }
        if scaled >= u128::MAX as f64 {
            return Ok(Self::MAX);
        }

        let numerator = U256::from(Target::MAX) << FRACTION_BITS;
        let target = numerator / U256::from(scaled as u128);
        Ok(Self(Target::from(target)))
    }

    /// Get difficulty as f64 (lossy for very large values).
    pub fn as_f64(self) -> f64 {
        self.0.difficulty_float()
    }

    /// Convert to u64, saturating at u64::MAX.
    pub fn as_u64(self) -> u64 {
        let f = self.as_f64();
        if f >= u64::MAX as f64 {
            u64::MAX
        } else if f <= 0.0 {
            0
        } else {
            f as u64
        }
    }

    /// Create difficulty from a target (lossless).
    pub fn from_target(target: Target) -> Self {
        Self(target)
    }

    /// Get the underlying target (lossless).
    pub fn to_target(self) -> Target {
        self.0
    }

    /// Difficulty actually achieved by a proof-of-work digest.
    ///
    /// The digest value is the target it met, so this is lossless.
    pub fn from_pow_digest(digest: &[u8; 32]) -> Self {
        let value = U256::from_le_bytes(*digest);
        if value == U256::ZERO {
            return Self::MAX;
        }
        Self(Target::from(value))
    }
}

impl From<u64> for Difficulty {
    fn from(diff: u64) -> Self {
        if diff == 0 {
            return Self(Target::MAX);
        }
        let max_target = U256::from(Target::MAX);
        Self(Target::from(max_target / diff))
    }
}

impl PartialEq for Difficulty {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Difficulty {}

impl PartialOrd for Difficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Difficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        // Smaller target is the higher difficulty.
        other.0.cmp(&self.0)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.as_f64();

        if value < 1.0 {
            let s = format!("{:.6}", value);
            let trimmed = s.trim_end_matches('0').trim_end_matches('.');
            return write!(f, "{}", trimmed);
        }

        let (scaled, suffix) = if value >= 1e15 {
            (value / 1e15, "P")
        } else if value >= 1e12 {
            (value / 1e12, "T")
        } else if value >= 1e9 {
            (value / 1e9, "G")
        } else if value >= 1e6 {
            (value / 1e6, "M")
        } else if value >= 1e3 {
            (value / 1e3, "K")
        } else {
            (value, "")
        };

        if scaled >= 100.0 || scaled.fract() == 0.0 {
            write!(f, "{:.0}{}", scaled, suffix)
        } else if scaled >= 10.0 {
            write!(f, "{:.1}{}", scaled, suffix)
        } else {
            write!(f, "{:.2}{}", scaled, suffix)
        }
    }
}
