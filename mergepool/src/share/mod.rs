//! Share verification.

pub mod status;

pub use status::{ShareStatus, classify_share, pool_target};
