//! Outbound mining work.

use bitcoin::hash_types::BlockHash;
use bitcoin::hashes::Hash;
use bitcoin::pow::CompactTarget;
use serde_json::{Value, json};

use crate::merkle::MerkleStep;

/// A job handed to workers through `mining.notify`.
///
/// On the wire this is a positional array; here every slot has a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    /// Identifier the worker echoes back with each share
    pub job_id: String,

    /// Previous block hash
    pub prev_blockhash: BlockHash,

    /// Coinbase bytes before the extranonce
    pub coinbase1: Vec<u8>,

    /// Coinbase bytes after the extranonce
    pub coinbase2: Vec<u8>,

    /// Branch the worker folds its coinbase txid through
    pub merkle_branch: Vec<MerkleStep>,

    /// Block version
    pub version: u32,

    /// Encoded network target
    pub bits: CompactTarget,

    /// Block timestamp
    pub ntime: u32,

    /// Whether workers must drop earlier jobs
    pub clean_jobs: bool,
}

impl Work {
    /// Same work with a different clean-jobs flag.
    pub fn with_clean_jobs(mut self, clean_jobs: bool) -> Self {
        self.clean_jobs = clean_jobs;
        self
    }

    /// `mining.notify` parameters:
    /// `[job_id, prevhash, coinb1, coinb2, merkle_branch, version, nbits, ntime, clean_jobs]`.
    pub fn to_stratum_params(&self) -> Value {
        json!([
            self.job_id,
            stratum_prevhash(&self.prev_blockhash),
            hex::encode(&self.coinbase1),
            hex::encode(&self.coinbase2),
            self.merkle_branch,
            format!("{:08x}", self.version),
            format!("{:08x}", self.bits.to_consensus()),
            format!("{:08x}", self.ntime),
            self.clean_jobs,
        ])
    }
}

/// Stratum's prevhash: internal byte order with each 32-bit word swapped.
fn stratum_prevhash(hash: &BlockHash) -> String {
    let mut bytes = hash.to_byte_array();
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
    hex::encode(bytes)
}
