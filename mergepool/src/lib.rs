//! Share verification and merkle core for a merge-mining pool.
//!
//! Workers hash headers built from pool-issued work; every share they send
//! back is rebuilt into that header and classified against the pool's share
//! target, the primary chain's network target and, when merge mining, an
//! auxiliary chain's target. Node RPC, the stratum transport, and coinbase
//! construction stay outside and plug in through the traits in
//! [`pipeline::collaborators`].

pub mod config;
pub mod merkle;
pub mod pipeline;
pub mod share;
pub mod tracing;
pub mod types;
pub mod u256;
pub mod work;

pub use config::{ConfigError, PoolSettings};
pub use pipeline::{ClientInfo, PoolError, ShareReport, WorkPipeline};
pub use share::ShareStatus;
