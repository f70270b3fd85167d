//! Seams to the node, the coinbase builder, and block submission.
//!
//! The pipeline drives these but never implements them. Implementations
//! talk JSON-RPC to nodes and build wallet-specific coinbases; tests swap in
//! in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;
use bitcoin::block::Header;

use crate::work::{AuxBlock, BlockTemplate, ExtranonceLayout, PrimaryBlock, Submission, Work};

/// Source of fresh block candidates, typically a node's
/// getblocktemplate and getauxblock.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch_template(&self, chain: &str) -> Result<BlockTemplate>;

    /// Current aux candidate, or `None` when the aux node has nothing to
    /// offer. Errors do not stop primary work from being built.
    async fn fetch_aux_block(&self, chain: &str) -> Result<Option<AuxBlock>>;
}

/// Everything the work generator needs to build a job.
#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub template: BlockTemplate,

    /// Aux candidate the coinbase commits to, if merge mining
    pub aux: Option<AuxBlock>,

    /// Primary chain name
    pub chain: String,

    /// Bytes the coinbase carries after the height: the pool signature
    /// followed by the merged-mining commitment, if any
    pub signature_extras: Vec<u8>,

    /// Output script paid by the coinbase
    pub reward_script: Vec<u8>,

    /// Extranonce split the coinbase must reserve room for
    pub extranonce: ExtranonceLayout,

    pub job_id: String,
}

/// Builds the coinbase split and the outbound job for a template.
#[async_trait]
pub trait WorkGenerator: Send + Sync {
    async fn generate_work(&self, request: WorkRequest) -> Result<(PrimaryBlock, Work)>;
}

/// A share good enough to be a block on at least one chain.
#[derive(Debug, Clone)]
pub struct BlockCandidate {
    /// Reconstructed primary header
    pub header: Header,

    /// Full coinbase transaction, extranonce included
    pub coinbase: Vec<u8>,

    /// The share as the worker sent it
    pub submission: Submission,
}

/// Hands solved blocks to their chains.
#[async_trait]
pub trait BlockSubmitter: Send + Sync {
    /// Submit the aux proof (primary coinbase, branch, and header) for `aux`.
    async fn submit_aux_block(
        &self,
        primary: &PrimaryBlock,
        aux: &AuxBlock,
        candidate: &BlockCandidate,
        chain: &str,
    ) -> Result<()>;

    async fn submit_primary_block(
        &self,
        primary: &PrimaryBlock,
        candidate: &BlockCandidate,
        chain: &str,
    ) -> Result<()>;
}
