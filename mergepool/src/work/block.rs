//! Block templates and header reconstruction.

use std::str::FromStr;

use bitcoin::block::{Header, Version};
use bitcoin::hash_types::{BlockHash, TxMerkleNode, Txid};
use bitcoin::hashes::Hash;
use bitcoin::pow::{CompactTarget, Target};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extranonce::ExtranonceLayout;
use super::job::Work;
use super::submission::SubmitSlots;
use crate::merkle::{self, MerkleError, MerkleStep};
use crate::types::{TargetError, parse_compact_hex, parse_target_hex, parse_target_hex_le};

/// Magic bytes opening a merged-mining commitment in the coinbase.
pub const MERGED_MINING_HEADER: [u8; 4] = [0xfa, 0xbe, 0x6d, 0x6d];

/// Aux merkle tree size (1, a single aux chain) and nonce (0), both
/// little-endian u32.
pub const MERGED_MINING_TRAILER: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Errors assembling a header from a share.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HeaderError {
    #[error("Extranonce is {actual} bytes, expected {expected}")]
    ExtranonceLength { expected: usize, actual: usize },

    #[error("Invalid merkle branch: {0}")]
    Merkle(#[from] MerkleError),

    #[error("Merkle root is {0} bytes (must be 32)")]
    MerkleRootLength(usize),

    #[error("Invalid previous block hash: {0:?}")]
    PrevHash(String),

    #[error("Invalid transaction id: {0:?}")]
    Txid(String),

    #[error("Invalid template target: {0}")]
    Target(#[from] TargetError),
}

/// A transaction as listed by getblocktemplate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateTransaction {
    /// Transaction id in display (reversed) byte order.
    pub txid: String,

    /// Raw transaction hex.
    #[serde(default)]
    pub data: String,
}

impl TemplateTransaction {
    /// The txid in internal byte order, the order merkle nodes hash in.
    pub fn merkle_id(&self) -> Result<String, HeaderError> {
        let txid = Txid::from_str(&self.txid).map_err(|_| HeaderError::Txid(self.txid.clone()))?;
        Ok(hex::encode(txid.to_byte_array()))
    }
}

/// Snapshot of a chain's next-block candidate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockTemplate {
    pub height: u64,

    pub version: u32,

    /// Previous block hash in display order.
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,

    /// Compact network target, eight hex characters.
    pub bits: String,

    /// Full network target, big-endian hex.
    pub target: String,

    #[serde(rename = "curtime")]
    pub cur_time: u32,

    #[serde(rename = "coinbasevalue", default)]
    pub coinbase_value: u64,

    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
}

impl BlockTemplate {
    /// The network target a block must meet.
    pub fn target(&self) -> Result<Target, TargetError> {
        parse_target_hex(&self.target)
    }

    pub fn compact_target(&self) -> Result<CompactTarget, TargetError> {
        parse_compact_hex(&self.bits)
    }

    pub fn prev_blockhash(&self) -> Result<BlockHash, HeaderError> {
        BlockHash::from_str(&self.previous_block_hash)
            .map_err(|_| HeaderError::PrevHash(self.previous_block_hash.clone()))
    }

    /// Branch the miner folds its coinbase txid through.
    ///
    /// With no transactions besides the coinbase the header commits to the
    /// coinbase txid itself, so the branch is empty.
    pub fn coinbase_merkle_branch(&self) -> Result<Vec<MerkleStep>, HeaderError> {
        if self.transactions.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(self.transactions.len() + 1);
        ids.push(hex::encode([0u8; 32]));
        for tx in &self.transactions {
            ids.push(tx.merkle_id()?);
        }
        Ok(merkle::compute_merkle_branch(&ids)?)
    }
}

/// An auxiliary chain's block candidate, as returned by getauxblock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuxBlock {
    /// Aux block hash the commitment binds to.
    pub hash: String,

    #[serde(rename = "chainid", default)]
    pub chain_id: u32,

    pub height: u64,

    /// Aux network target, little-endian hex.
    #[serde(rename = "_target")]
    pub target: String,
}

impl AuxBlock {
    pub fn target(&self) -> Result<Target, TargetError> {
        parse_target_hex_le(&self.target)
    }

    /// Merged-mining commitment for the primary coinbase:
    /// magic, aux block hash, tree size, nonce.
    pub fn commitment(&self) -> Result<Vec<u8>, hex::FromHexError> {
        let hash = hex::decode(&self.hash)?;
        let mut commitment = Vec::with_capacity(
            MERGED_MINING_HEADER.len() + hash.len() + MERGED_MINING_TRAILER.len(),
        );
        commitment.extend_from_slice(&MERGED_MINING_HEADER);
        commitment.extend_from_slice(&hash);
        commitment.extend_from_slice(&MERGED_MINING_TRAILER);
        Ok(commitment)
    }
}

/// A primary template bound to a concrete coinbase split.
///
/// Produced by the work generator. Everything a share needs to rebuild the
/// header it hashed lives here: the coinbase halves around the extranonce
/// reservation, the merkle branch, and the slot table for decoding
/// `mining.submit`.
#[derive(Debug, Clone)]
pub struct PrimaryBlock {
    pub template: BlockTemplate,

    /// Coinbase bytes before the extranonce.
    pub coinbase1: Vec<u8>,

    /// Coinbase bytes after the extranonce.
    pub coinbase2: Vec<u8>,

    pub merkle_branch: Vec<MerkleStep>,

    pub extranonce: ExtranonceLayout,

    pub submit_slots: SubmitSlots,

    prev_blockhash: BlockHash,
    bits: CompactTarget,
}

impl PrimaryBlock {
    /// Bind a template to a coinbase split.
    ///
    /// Fails if the template's previous hash or bits cannot be parsed, so a
    /// bad template is rejected at refresh time rather than per share.
    pub fn new(
        template: BlockTemplate,
        coinbase1: Vec<u8>,
        coinbase2: Vec<u8>,
        merkle_branch: Vec<MerkleStep>,
        extranonce: ExtranonceLayout,
    ) -> Result<Self, HeaderError> {
        let prev_blockhash = template.prev_blockhash()?;
        let bits = template.compact_target()?;
        Ok(Self {
            template,
            coinbase1,
            coinbase2,
            merkle_branch,
            extranonce,
            submit_slots: SubmitSlots::default(),
            prev_blockhash,
            bits,
        })
    }

    /// Use a non-standard `mining.submit` layout.
    pub fn with_submit_slots(mut self, slots: SubmitSlots) -> Self {
        self.submit_slots = slots;
        self
    }

    pub fn height(&self) -> u64 {
        self.template.height
    }

    pub fn prev_blockhash(&self) -> BlockHash {
        self.prev_blockhash
    }

    pub fn bits(&self) -> CompactTarget {
        self.bits
    }

    /// Full coinbase transaction for a given extranonce.
    pub fn coinbase(&self, extranonce: &[u8]) -> Result<Vec<u8>, HeaderError> {
        let expected = self.extranonce.reservation();
        if extranonce.len() != expected {
            return Err(HeaderError::ExtranonceLength {
                expected,
                actual: extranonce.len(),
            });
        }

        let mut coinbase =
            Vec::with_capacity(self.coinbase1.len() + extranonce.len() + self.coinbase2.len());
        coinbase.extend_from_slice(&self.coinbase1);
        coinbase.extend_from_slice(extranonce);
        coinbase.extend_from_slice(&self.coinbase2);
        Ok(coinbase)
    }

    /// Rebuild the header a worker hashed.
    pub fn header(&self, extranonce: &[u8], nonce: u32, ntime: u32) -> Result<Header, HeaderError> {
        let coinbase = self.coinbase(extranonce)?;
        let coinbase_txid = merkle::double_digest(&coinbase);
        let root = merkle::fold_branch(&coinbase_txid, &self.merkle_branch)?;
        let root: [u8; 32] = root
            .as_slice()
            .try_into()
            .map_err(|_| HeaderError::MerkleRootLength(root.len()))?;

        Ok(Header {
            version: Version::from_consensus(self.template.version as i32),
            prev_blockhash: self.prev_blockhash,
            merkle_root: TxMerkleNode::from_byte_array(root),
            time: ntime,
            bits: self.bits,
            nonce,
        })
    }

    /// Outbound work for this block.
    pub fn work(&self, job_id: impl Into<String>, clean_jobs: bool) -> Work {
        Work {
            job_id: job_id.into(),
            prev_blockhash: self.prev_blockhash,
            coinbase1: self.coinbase1.clone(),
            coinbase2: self.coinbase2.clone(),
            merkle_branch: self.merkle_branch.clone(),
            version: self.template.version,
            bits: self.bits,
            ntime: self.template.cur_time,
            clean_jobs,
        }
    }
}
