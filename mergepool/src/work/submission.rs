//! Inbound shares (`mining.submit`).
//!
//! Stratum shares arrive as positional string arrays. `SubmitSlots` maps
//! each field to its index so the positional layout is written down in
//! one place, and `Submission` is the decoded, typed share.

use serde_json::Value;
use thiserror::Error;

use super::extranonce::{Extranonce2, Extranonce2Error};

/// Errors decoding `mining.submit` parameters.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("Share has no {field} at slot {slot}")]
    MissingSlot { field: &'static str, slot: usize },

    #[error("Share {field} at slot {slot} is not a string")]
    NotAString { field: &'static str, slot: usize },

    #[error("Invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error(transparent)]
    Extranonce2(#[from] Extranonce2Error),
}

impl SubmitError {
    /// True when the share's shape disagrees with the slot layout, as
    /// opposed to a field that is present but malformed.
    pub fn is_slot_mismatch(&self) -> bool {
        matches!(
            self,
            SubmitError::MissingSlot { .. }
                | SubmitError::NotAString { .. }
                | SubmitError::Extranonce2(Extranonce2Error::WrongLength { .. })
        )
    }
}

/// Slot index of each `mining.submit` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitSlots {
    pub worker: usize,
    pub job_id: usize,
    pub extranonce2: usize,
    pub ntime: usize,
    pub nonce: usize,
}

impl Default for SubmitSlots {
    /// Stratum v1: `[worker, job_id, extranonce2, ntime, nonce]`.
    fn default() -> Self {
        Self {
            worker: 0,
            job_id: 1,
            extranonce2: 2,
            ntime: 3,
            nonce: 4,
        }
    }
}

impl SubmitSlots {
    fn len(&self) -> usize {
        [
            self.worker,
            self.job_id,
            self.extranonce2,
            self.ntime,
            self.nonce,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// A decoded share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Worker name as authorized
    pub worker: String,

    /// Job ID this share is for
    pub job_id: String,

    /// Extranonce2 the worker rolled
    pub extranonce2: Extranonce2,

    /// Block timestamp
    pub ntime: u32,

    /// Nonce that solves the work
    pub nonce: u32,
}

fn slot_str<'a>(
    params: &'a [Value],
    slot: usize,
    field: &'static str,
) -> Result<&'a str, SubmitError> {
    params
        .get(slot)
        .ok_or(SubmitError::MissingSlot { field, slot })?
        .as_str()
        .ok_or(SubmitError::NotAString { field, slot })
}

/// Parse an eight-character big-endian hex u32 (ntime, nonce).
fn parse_u32_hex(field: &'static str, value: &str) -> Result<u32, SubmitError> {
    let invalid = || SubmitError::InvalidField {
        field,
        value: value.to_string(),
    };
    if value.len() != 8 {
        return Err(invalid());
    }
    u32::from_str_radix(value, 16).map_err(|_| invalid())
}

impl Submission {
    /// Read only the job id, to find the job a share belongs to before
    /// decoding the rest with that job's layout.
    pub fn job_id_from_params<'a>(
        params: &'a [Value],
        slots: &SubmitSlots,
    ) -> Result<&'a str, SubmitError> {
        slot_str(params, slots.job_id, "job_id")
    }

    /// Decode `mining.submit` parameters.
    pub fn from_stratum_params(
        params: &[Value],
        slots: &SubmitSlots,
        extranonce2_size: u8,
    ) -> Result<Self, SubmitError> {
        let worker = slot_str(params, slots.worker, "worker")?;
        let job_id = slot_str(params, slots.job_id, "job_id")?;
        let extranonce2 = slot_str(params, slots.extranonce2, "extranonce2")?;
        let ntime = slot_str(params, slots.ntime, "ntime")?;
        let nonce = slot_str(params, slots.nonce, "nonce")?;

        Ok(Self {
            worker: worker.to_string(),
            job_id: job_id.to_string(),
            extranonce2: Extranonce2::from_hex(extranonce2, extranonce2_size)?,
            ntime: parse_u32_hex("ntime", ntime)?,
            nonce: parse_u32_hex("nonce", nonce)?,
        })
    }

    /// Encode back to positional parameters in the given layout.
    pub fn to_stratum_params(&self, slots: &SubmitSlots) -> Vec<Value> {
        let mut params = vec![Value::Null; slots.len()];
        params[slots.worker] = Value::from(self.worker.as_str());
        params[slots.job_id] = Value::from(self.job_id.as_str());
        params[slots.extranonce2] = Value::from(self.extranonce2.to_string());
        params[slots.ntime] = Value::from(format!("{:08x}", self.ntime));
        params[slots.nonce] = Value::from(format!("{:08x}", self.nonce));
        params
    }
}
