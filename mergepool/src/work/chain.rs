//! Per-chain parameters for share verification.

use std::fmt;
use std::sync::Arc;

use crate::merkle::double_digest;

/// Proof-of-work function applied to a serialized 80-byte header.
///
/// The digest is returned in little-endian numeric order, the same order
/// block hashes are serialized in.
pub trait ProofOfWork: Send + Sync {
    fn pow_digest(&self, header: &[u8]) -> [u8; 32];
}

/// Double SHA-256, the proof-of-work of Bitcoin and its direct forks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleSha256;

impl ProofOfWork for DoubleSha256 {
    fn pow_digest(&self, header: &[u8]) -> [u8; 32] {
        double_digest(header)
    }
}

/// What the pool needs to know about the chain it mines primarily.
#[derive(Clone)]
pub struct ChainParams {
    /// Name used for logging and passed to the submitter.
    pub name: String,

    /// Header hash used for share and block validation.
    pub pow: Arc<dyn ProofOfWork>,

    /// Factor between pool share difficulty and the chain's native
    /// difficulty unit.
    ///
    /// Pool difficulty is divided by this before conversion to a target.
    /// SHA-256 chains use 1; scrypt chains conventionally use 65536.
    pub share_multiplier: f64,
}

impl ChainParams {
    pub fn new(name: impl Into<String>, pow: Arc<dyn ProofOfWork>, share_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            pow,
            share_multiplier,
        }
    }

    /// A double SHA-256 chain with multiplier 1.
    pub fn sha256d(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(DoubleSha256), 1.0)
    }
}

impl fmt::Debug for ChainParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainParams")
            .field("name", &self.name)
            .field("share_multiplier", &self.share_multiplier)
            .finish_non_exhaustive()
    }
}
