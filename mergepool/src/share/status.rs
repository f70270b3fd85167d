//! Three-way share classification.

use bitcoin::pow::Target;

use crate::types::{Difficulty, TargetError, meets};

/// Outcome of checking one share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ShareStatus {
    /// Does not meet the pool target.
    Invalid,

    /// Meets the pool target only.
    Valid,

    /// Meets the primary chain's target and no aux chain is configured.
    PrimaryCandidate,

    /// Meets the aux chain's target but not the primary's.
    Aux1Candidate,

    /// Meets the primary target with an aux chain configured. The aux
    /// target is never harder than the primary's in practice, so the aux
    /// block is submitted too.
    DualCandidate,
}

impl ShareStatus {
    /// Whether the worker earns pool credit.
    pub fn is_credited(self) -> bool {
        self != ShareStatus::Invalid
    }

    pub fn is_aux_candidate(self) -> bool {
        matches!(self, ShareStatus::Aux1Candidate | ShareStatus::DualCandidate)
    }

    pub fn is_primary_candidate(self) -> bool {
        matches!(
            self,
            ShareStatus::PrimaryCandidate | ShareStatus::DualCandidate
        )
    }
}

/// Target for a pool share difficulty expressed in units scaled by the
/// chain's share multiplier.
pub fn pool_target(pool_difficulty: f64, share_multiplier: f64) -> Result<Target, TargetError> {
    if share_multiplier <= 0.0 || !share_multiplier.is_finite() {
        return Err(TargetError::InvalidMultiplier(share_multiplier));
    }
    if pool_difficulty <= 0.0 || !pool_difficulty.is_finite() {
        return Err(TargetError::InvalidDifficulty(pool_difficulty));
    }
    Ok(Difficulty::try_from_f64(pool_difficulty / share_multiplier)?.to_target())
}

/// Classify a proof-of-work value.
///
/// `pow` is the header digest read as a number (see
/// [`pow_value`](crate::types::pow_value)). Chain targets are checked
/// from hardest to easiest, so a share reports the best outcome it
/// reached. Difficulty and multiplier are validated even when a chain
/// target is met.
pub fn classify_share(
    pow: Target,
    primary_target: Target,
    aux_target: Option<Target>,
    pool_difficulty: f64,
    share_multiplier: f64,
) -> Result<ShareStatus, TargetError> {
    let pool_target = pool_target(pool_difficulty, share_multiplier)?;

    if meets(pow, primary_target) {
        return Ok(if aux_target.is_some() {
            ShareStatus::DualCandidate
        } else {
            ShareStatus::PrimaryCandidate
        });
    }

    if let Some(aux_target) = aux_target {
        if meets(pow, aux_target) {
            return Ok(ShareStatus::Aux1Candidate);
        }
    }

    if meets(pow, pool_target) {
        Ok(ShareStatus::Valid)
    } else {
        Ok(ShareStatus::Invalid)
    }
}
