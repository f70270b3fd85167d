//! Work handed to workers and the shares they send back.
//!
//! A `PrimaryBlock` is the pool-side view of a job: the template and the
//! coinbase split around the extranonce. `Work` is what goes out in
//! `mining.notify`; `Submission` is what comes back in `mining.submit`.

pub mod block;
pub mod chain;
pub mod extranonce;
pub mod job;
pub mod messages;
pub mod submission;

pub use block::{AuxBlock, BlockTemplate, HeaderError, PrimaryBlock, TemplateTransaction};
pub use chain::{ChainParams, DoubleSha256, ProofOfWork};
pub use extranonce::{Extranonce2, Extranonce2Error, ExtranonceLayout};
pub use job::Work;
pub use messages::{StratumRequest, mining_notify, mining_set_difficulty, mining_set_extranonce};
pub use submission::{SubmitError, SubmitSlots, Submission};
