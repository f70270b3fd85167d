//! Server-to-worker stratum notifications.
//!
//! Only the payloads are built here. Framing, ids for requests that expect
//! a response, and the transport belong to the session layer.

use serde::Serialize;
use serde_json::{Value, json};

use super::job::Work;

/// A JSON-RPC request as stratum puts it on the wire.
///
/// Notifications carry a null id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl StratumRequest {
    fn notification(method: &str, params: Value) -> Self {
        Self {
            id: None,
            method: method.to_string(),
            params,
        }
    }

    /// Serialize as a single line of JSON.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// `mining.notify` for a job.
pub fn mining_notify(work: &Work) -> StratumRequest {
    StratumRequest::notification("mining.notify", work.to_stratum_params())
}

/// `mining.set_difficulty`, in the pool's share difficulty unit.
pub fn mining_set_difficulty(difficulty: f64) -> StratumRequest {
    StratumRequest::notification("mining.set_difficulty", json!([difficulty]))
}

/// `mining.set_extranonce`: a new extranonce1 and the extranonce2 size.
pub fn mining_set_extranonce(extranonce1: &[u8], extranonce2_size: u8) -> StratumRequest {
    StratumRequest::notification(
        "mining.set_extranonce",
        json!([hex::encode(extranonce1), extranonce2_size]),
    )
}
