//! Target math shared by the verifier and the pipeline.

mod difficulty;
pub mod target;

pub use difficulty::Difficulty;
pub use target::{
    TargetError, compact_from_target, meets, parse_compact_hex, parse_target_hex,
    parse_target_hex_le, pow_value, target_from_compact,
};
