//! 256-bit unsigned integer used for target arithmetic.
//!
//! `bitcoin::pow::Target` is ordered but offers no division or
//! multiplication, which difficulty conversion needs. This wrapper over
//! `ruint` converts losslessly to and from `Target` and supplies the few
//! operations the pool uses.

use std::ops::{Div, Mul, Shl};

use bitcoin::pow::Target;
use ruint::aliases::U256 as Uint256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256(Uint256);

impl U256 {
    pub const ZERO: Self = Self(Uint256::ZERO);
    pub const MAX: Self = Self(Uint256::MAX);

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(Uint256::from_be_bytes::<32>(bytes))
    }

    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(Uint256::from_le_bytes::<32>(bytes))
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0.to_le_bytes::<32>()
    }

    /// Multiply, clamping at [`U256::MAX`] instead of wrapping.
    pub fn saturating_mul(self, rhs: Self) -> Self {
        Self(self.0.saturating_mul(rhs.0))
    }

    /// Divide, returning `None` for a zero divisor.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        self.0.checked_div(rhs.0).map(Self)
    }

    /// Number of significant bits.
    pub fn bits(self) -> usize {
        self.0.bit_len()
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self(Uint256::from(value))
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self(Uint256::from(value))
    }
}

impl From<Target> for U256 {
    fn from(target: Target) -> Self {
        Self::from_be_bytes(target.to_be_bytes())
    }
}

impl From<U256> for Target {
    fn from(value: U256) -> Self {
        Target::from_be_bytes(value.to_be_bytes())
    }
}

impl Div<u64> for U256 {
    type Output = Self;

    /// Panics on a zero divisor, like the primitive integer types.
    fn div(self, rhs: u64) -> Self {
        Self(self.0 / Uint256::from(rhs))
    }
}

impl Div for U256 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self(self.0 / rhs.0)
    }
}

impl Mul<u64> for U256 {
    type Output = Self;

    /// Saturating; targets never wrap around to small values.
    fn mul(self, rhs: u64) -> Self {
        self.saturating_mul(Self::from(rhs))
    }
}

impl Shl<usize> for U256 {
    type Output = Self;

    fn shl(self, rhs: usize) -> Self {
        Self(self.0 << rhs)
    }
}
