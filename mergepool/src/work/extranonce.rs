//! Extranonce types for pool-side share handling.
//!
//! The coinbase reserves a fixed number of bytes for the extranonce. The
//! pool assigns the first part (extranonce1) per connection; the worker
//! rolls the rest (extranonce2) and reports the value it used with each
//! share. This module provides:
//!
//! - `ExtranonceLayout`: how the reservation is split between the two parts
//! - `Extranonce2`: a worker-submitted value with a fixed size (1-8 bytes)

use std::fmt;

use thiserror::Error;

/// Errors that can occur when creating extranonce types.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Extranonce2Error {
    #[error("Invalid extranonce size: {0} (must be 1-8 bytes)")]
    InvalidSize(u8),

    #[error("Value {0} exceeds maximum for size {1} bytes")]
    ValueTooLarge(u64, u8),

    #[error("Invalid extranonce2 hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Extranonce2 is {actual} bytes, expected {expected}")]
    WrongLength { expected: u8, actual: usize },
}

fn check_size(size: u8) -> Result<(), Extranonce2Error> {
    if size == 0 || size > 8 {
        return Err(Extranonce2Error::InvalidSize(size));
    }
    Ok(())
}

fn max_for_size(size: u8) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

/// Split of the coinbase extranonce reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtranonceLayout {
    extranonce1_size: u8,
    extranonce2_size: u8,
}

impl ExtranonceLayout {
    pub fn new(extranonce1_size: u8, extranonce2_size: u8) -> Result<Self, Extranonce2Error> {
        check_size(extranonce1_size)?;
        check_size(extranonce2_size)?;
        Ok(Self {
            extranonce1_size,
            extranonce2_size,
        })
    }

    pub fn extranonce1_size(&self) -> u8 {
        self.extranonce1_size
    }

    pub fn extranonce2_size(&self) -> u8 {
        self.extranonce2_size
    }

    /// Total bytes reserved in the coinbase.
    pub fn reservation(&self) -> usize {
        self.extranonce1_size as usize + self.extranonce2_size as usize
    }

    /// Extranonce1 bytes for a connection number.
    ///
    /// Big-endian so consecutive sessions are easy to tell apart in logs.
    pub fn extranonce1(&self, session: u64) -> Result<Vec<u8>, Extranonce2Error> {
        if session > max_for_size(self.extranonce1_size) {
            return Err(Extranonce2Error::ValueTooLarge(
                session,
                self.extranonce1_size,
            ));
        }
        let bytes = session.to_be_bytes();
        Ok(bytes[8 - self.extranonce1_size as usize..].to_vec())
    }
}

impl Default for ExtranonceLayout {
    /// Four bytes each, an eight-byte reservation.
    fn default() -> Self {
        Self {
            extranonce1_size: 4,
            extranonce2_size: 4,
        }
    }
}

/// A specific extranonce2 value with fixed size.
///
/// Stored as a u64 whose little-endian bytes are exactly the bytes the
/// worker placed in its coinbase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extranonce2 {
    value: u64,
    size: u8,
}

impl Extranonce2 {
    /// Create a new extranonce2 value.
    pub fn new(value: u64, size: u8) -> Result<Self, Extranonce2Error> {
        check_size(size)?;
        if value > max_for_size(size) {
            return Err(Extranonce2Error::ValueTooLarge(value, size));
        }
        Ok(Self { value, size })
    }

    /// Decode the hex a worker sent in `mining.submit`.
    pub fn from_hex(hex_value: &str, size: u8) -> Result<Self, Extranonce2Error> {
        check_size(size)?;
        let bytes = hex::decode(hex_value)?;
        if bytes.len() != size as usize {
            return Err(Extranonce2Error::WrongLength {
                expected: size,
                actual: bytes.len(),
            });
        }
        let mut padded = [0u8; 8];
        padded[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self {
            value: u64::from_le_bytes(padded),
            size,
        })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    /// Extend a vector with the serialized bytes of this extranonce2.
    pub fn extend_vec(&self, vec: &mut Vec<u8>) {
        vec.extend_from_slice(&self.value.to_le_bytes()[..self.size as usize]);
    }
}

impl From<Extranonce2> for Vec<u8> {
    fn from(ext: Extranonce2) -> Vec<u8> {
        ext.value.to_le_bytes()[..ext.size as usize].to_vec()
    }
}

impl fmt::Display for Extranonce2 {
    /// Wire form: the coinbase bytes as hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(Vec::from(*self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_default_reserves_eight_bytes() {
        let layout = ExtranonceLayout::default();
        assert_eq!(layout.reservation(), 8);
        assert_eq!(layout, ExtranonceLayout::new(4, 4).unwrap());
    }

    #[test]
    fn test_layout_rejects_bad_sizes() {
        assert_eq!(
            ExtranonceLayout::new(0, 4),
            Err(Extranonce2Error::InvalidSize(0))
        );
        assert_eq!(
            ExtranonceLayout::new(4, 9),
            Err(Extranonce2Error::InvalidSize(9))
        );
    }

    #[test]
    fn test_extranonce1_for_session() {
        let layout = ExtranonceLayout::new(2, 4).unwrap();
        assert_eq!(layout.extranonce1(0x1234).unwrap(), vec![0x12, 0x34]);
        assert_eq!(
            layout.extranonce1(0x1_0000),
            Err(Extranonce2Error::ValueTooLarge(0x1_0000, 2))
        );
    }

    #[test]
    fn test_extranonce2_new() {
        let ext = Extranonce2::new(0x1234, 4).unwrap();
        assert_eq!(ext.value(), 0x1234);
        assert_eq!(ext.size(), 4);

        assert!(matches!(
            Extranonce2::new(0x100, 1),
            Err(Extranonce2Error::ValueTooLarge(0x100, 1))
        ));
        assert!(matches!(
            Extranonce2::new(0, 0),
            Err(Extranonce2Error::InvalidSize(0))
        ));
    }

    #[test]
    fn test_extranonce2_from_hex_keeps_wire_bytes() {
        let ext = Extranonce2::from_hex("deadbeef", 4).unwrap();
        assert_eq!(Vec::<u8>::from(ext), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(ext.to_string(), "deadbeef");

        let mut coinbase = vec![0xaa];
        ext.extend_vec(&mut coinbase);
        assert_eq!(coinbase, vec![0xaa, 0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_extranonce2_from_hex_errors() {
        assert_eq!(
            Extranonce2::from_hex("dead", 4),
            Err(Extranonce2Error::WrongLength {
                expected: 4,
                actual: 2
            })
        );
        assert!(matches!(
            Extranonce2::from_hex("xyz0", 2),
            Err(Extranonce2Error::InvalidHex(_))
        ));
    }

    #[test]
    fn test_extranonce2_to_bytes_little_endian() {
        let ext = Extranonce2::new(0x1234, 4).unwrap();
        assert_eq!(Vec::<u8>::from(ext), vec![0x34, 0x12, 0, 0]);
    }
}
