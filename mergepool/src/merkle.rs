//! Merkle root and branch computation for work distribution.
//!
//! The pool and the miner split the merkle work: the pool computes the
//! branch (the siblings along the coinbase's path to the root) from the
//! template's transactions, and the miner folds its own coinbase digest
//! through that branch. Both sides must arrive at the same root.
//!
//! ```text
//!  cb  t1  t2  t3  t4     <- level 0 (t4 doubled if the count is odd)
//!   \ /     \ /   \ /
//!    A       B     C  C   <- level 1
//!     \     /       \ /
//!        D           E    <- level 2
//!         \_________/
//!              R
//!
//!  branch = [t1, B, E]
//!  fold(cb, branch) = H(H(H(cb|t1)|B)|E) = R
//! ```
//!
//! Nodes are hex strings on the wire and are hashed as their raw bytes,
//! without any byte-order adjustment. Merging is the double SHA-256 of the
//! concatenation.

use bitcoin::hashes::{Hash, sha256d};
use thiserror::Error;

/// A single hex-encoded branch node.
pub type MerkleStep = String;

/// Errors from merkle computations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MerkleError {
    #[error("Invalid hex in merkle node {index}: {source}")]
    InvalidHex {
        index: usize,
        source: hex::FromHexError,
    },
}

/// Double SHA-256.
pub fn double_digest(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

fn merge(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut joined = Vec::with_capacity(left.len() + right.len());
    joined.extend_from_slice(left);
    joined.extend_from_slice(right);
    double_digest(&joined).to_vec()
}

fn decode_nodes<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Vec<u8>>, MerkleError> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            hex::decode(id.as_ref()).map_err(|source| MerkleError::InvalidHex { index, source })
        })
        .collect()
}

/// Pad an odd level by doubling its last node.
fn pad(level: &mut Vec<Vec<u8>>) {
    if level.len() % 2 == 1 {
        if let Some(last) = level.last().cloned() {
            level.push(last);
        }
    }
}

fn next_level(level: &[Vec<u8>]) -> Vec<Vec<u8>> {
    level
        .chunks_exact(2)
        .map(|pair| merge(&pair[0], &pair[1]))
        .collect()
}

/// Compute the merkle root of an ordered list of hex transaction ids.
///
/// An empty list yields the double digest of the empty byte string. A
/// level with an odd count doubles its last node, including a lone id.
pub fn compute_merkle_root<S: AsRef<str>>(ids: &[S]) -> Result<String, MerkleError> {
    let mut level = decode_nodes(ids)?;
    if level.is_empty() {
        return Ok(hex::encode(double_digest(&[])));
    }

    if level.len() == 2 {
        return Ok(hex::encode(merge(&level[0], &level[1])));
    }

    loop {
        pad(&mut level);
        level = next_level(&level);
        if level.len() == 1 {
            return Ok(hex::encode(&level[0]));
        }
    }
}

/// Compute the branch a miner needs to rebuild the root from `ids[0]`.
///
/// `ids[0]` is the coinbase slot; its value only influences nodes on the
/// coinbase path, which are never part of the branch. The exception is a
/// single id, which is paired with itself, so the branch carries that id.
pub fn compute_merkle_branch<S: AsRef<str>>(ids: &[S]) -> Result<Vec<MerkleStep>, MerkleError> {
    let mut level = decode_nodes(ids)?;
    let mut steps = Vec::new();
    if level.is_empty() {
        return Ok(steps);
    }

    loop {
        pad(&mut level);
        steps.push(hex::encode(&level[1]));
        level = next_level(&level);
        if level.len() == 1 {
            return Ok(steps);
        }
    }
}

/// Fold a coinbase digest through a branch, producing the header root.
pub fn fold_branch<S: AsRef<str>>(
    coinbase_digest: &[u8],
    steps: &[S],
) -> Result<Vec<u8>, MerkleError> {
    let steps = decode_nodes(steps)?;
    Ok(steps
        .iter()
        .fold(coinbase_digest.to_vec(), |running, step| merge(&running, step)))
}
