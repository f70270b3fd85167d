//! Conversions between the representations of a proof-of-work target.
//!
//! Nodes hand out targets in three shapes: compact `bits` (the header
//! encoding), a 64-character big-endian hex string (getblocktemplate's
//! `target`, getauxblock's `target`), and a pool difficulty. Proof-of-work
//! digests come out of the hash function in little-endian byte order,
//! matching the consensus serialization of block hashes.

use bitcoin::pow::{CompactTarget, Target};
use thiserror::Error;

/// Errors raised while decoding targets or difficulties.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TargetError {
    #[error("Invalid target hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid target length: {0} bytes (must be 32)")]
    InvalidLength(usize),

    #[error("Invalid compact bits: {0:?}")]
    InvalidBits(String),

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(f64),

    #[error("Invalid share multiplier: {0}")]
    InvalidMultiplier(f64),
}

fn decode_target_bytes(hex_target: &str) -> Result<[u8; 32], TargetError> {
    let bytes = hex::decode(hex_target.trim())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| TargetError::InvalidLength(bytes.len()))
}

/// Parse a big-endian hex target such as getblocktemplate's `target` field.
pub fn parse_target_hex(hex_target: &str) -> Result<Target, TargetError> {
    Ok(Target::from_be_bytes(decode_target_bytes(hex_target)?))
}

/// Parse a little-endian hex target, the raw uint256 byte order that
/// getauxblock and createauxblock print in `_target`.
pub fn parse_target_hex_le(hex_target: &str) -> Result<Target, TargetError> {
    Ok(Target::from_le_bytes(decode_target_bytes(hex_target)?))
}

/// Parse compact bits as they appear in templates and `mining.notify`
/// (eight hex characters, big-endian, e.g. `"1d00ffff"`).
pub fn parse_compact_hex(bits: &str) -> Result<CompactTarget, TargetError> {
    let bits = bits.trim();
    if bits.len() != 8 {
        return Err(TargetError::InvalidBits(bits.to_string()));
    }
    u32::from_str_radix(bits, 16)
        .map(CompactTarget::from_consensus)
        .map_err(|_| TargetError::InvalidBits(bits.to_string()))
}

/// Expand compact bits to a full target.
pub fn target_from_compact(bits: CompactTarget) -> Target {
    Target::from_compact(bits)
}

/// Compress a target to compact bits, dropping low-order precision.
pub fn compact_from_target(target: Target) -> CompactTarget {
    target.to_compact_lossy()
}

/// Interpret a proof-of-work digest as a number comparable to targets.
pub fn pow_value(digest: [u8; 32]) -> Target {
    Target::from_le_bytes(digest)
}

/// Whether `value` satisfies `target`. Equality counts as a win.
pub fn meets(value: Target, target: Target) -> bool {
    value <= target
}
