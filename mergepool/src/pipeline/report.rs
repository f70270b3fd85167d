//! Per-share outcome returned to the session layer.

use std::fmt;

use crate::share::ShareStatus;
use crate::types::Difficulty;

/// The worker connection a share arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Name used in logs and reports, usually the authorized worker
    pub name: String,

    /// Extranonce1 assigned to the session
    pub extranonce1: Vec<u8>,
}

impl ClientInfo {
    pub fn new(name: impl Into<String>, extranonce1: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            extranonce1,
        }
    }
}

/// What happened to one share.
///
/// `Display` renders the one-line status a pool operator reads: which
/// chains accepted a block, at what height, from whom.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareReport {
    pub status: ShareStatus,
    pub client: String,
    pub worker: String,
    pub job_id: String,

    /// Difficulty the share actually reached
    pub achieved: Difficulty,

    pub primary_chain: String,
    pub primary_height: u64,
    pub primary_submitted: bool,

    pub aux_chain: Option<String>,
    pub aux_height: Option<u64>,
    pub aux_submitted: bool,

    /// Why the aux chain refused the block, if it did
    pub aux_error: Option<String>,
}

impl ShareReport {
    pub fn is_credited(&self) -> bool {
        self.status.is_credited()
    }
}

impl fmt::Display for ShareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aux_chain = self.aux_chain.as_deref().unwrap_or("aux");
        let aux_height = self.aux_height.unwrap_or_default();

        match (self.aux_submitted, self.primary_submitted) {
            (true, true) => write!(
                f,
                "Dual block found: {} {} and {} {} by {}",
                self.primary_chain, self.primary_height, aux_chain, aux_height, self.client
            )?,
            (false, true) => write!(
                f,
                "Primary block found: {} {} by {}",
                self.primary_chain, self.primary_height, self.client
            )?,
            (true, false) => write!(
                f,
                "Aux1 block found: {} {} by {}",
                aux_chain, aux_height, self.client
            )?,
            (false, false) => write!(
                f,
                "{} share from {} (job {}, difficulty {})",
                self.status, self.client, self.job_id, self.achieved
            )?,
        }

        if let Some(error) = &self.aux_error {
            write!(f, "; {aux_chain} rejected block: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn report(status: ShareStatus, aux: bool, primary: bool) -> ShareReport {
        ShareReport {
            status,
            client: "alice".to_string(),
            worker: "alice.rig1".to_string(),
            job_id: "2a".to_string(),
            achieved: Difficulty::from(1000),
            primary_chain: "litecoin".to_string(),
            primary_height: 100,
            primary_submitted: primary,
            aux_chain: Some("dogecoin".to_string()),
            aux_height: aux.then_some(200),
            aux_submitted: aux,
            aux_error: None,
        }
    }

    #[test_case(ShareStatus::DualCandidate, true, true, "Dual block found: litecoin 100 and dogecoin 200 by alice")]
    #[test_case(ShareStatus::PrimaryCandidate, false, true, "Primary block found: litecoin 100 by alice")]
    #[test_case(ShareStatus::Aux1Candidate, true, false, "Aux1 block found: dogecoin 200 by alice")]
    fn test_block_status_lines(status: ShareStatus, aux: bool, primary: bool, expected: &str) {
        assert_eq!(report(status, aux, primary).to_string(), expected);
    }

    #[test]
    fn test_plain_share_line() {
        let line = report(ShareStatus::Valid, false, false).to_string();
        assert!(line.starts_with("valid share from alice (job 2a"), "{line}");
    }

    #[test]
    fn test_aux_rejection_is_appended() {
        let mut report = report(ShareStatus::DualCandidate, false, true);
        report.aux_error = Some("high-hash".to_string());
        assert_eq!(
            report.to_string(),
            "Primary block found: litecoin 100 by alice; dogecoin rejected block: high-hash"
        );
    }
}
