//! Pool settings.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::work::{ChainParams, DoubleSha256, Extranonce2Error, ExtranonceLayout};

const ENV_PREFIX: &str = "MERGEPOOL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Invalid extranonce layout: {0}")]
    Extranonce(#[from] Extranonce2Error),

    #[error("Pool difficulty must be positive and finite, got {0}")]
    PoolDifficulty(f64),

    #[error("Share multiplier must be positive and finite, got {0}")]
    ShareMultiplier(f64),
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Chain whose templates workers hash.
    pub primary_chain: String,

    /// Chain merge-mined through the primary coinbase, if any.
    pub aux_chain: Option<String>,

    /// Share difficulty, in the pool's unit. Divided by the share
    /// multiplier before comparing against hashes.
    pub pool_difficulty: f64,

    /// Factor between pool difficulty and the primary chain's native unit.
    pub share_multiplier: f64,

    /// Tag written into every coinbase ahead of the merged-mining
    /// commitment.
    pub block_signature: Vec<u8>,

    /// Output script the coinbase pays.
    pub reward_script: Vec<u8>,

    /// Bytes of extranonce assigned per session.
    pub extranonce1_size: u8,

    /// Bytes of extranonce each worker rolls.
    pub extranonce2_size: u8,

    /// Upper bound on a single block submission.
    pub submission_timeout: Duration,

    /// How often work is rebuilt from fresh templates.
    pub refresh_interval: Duration,

    /// Generations of work a share may still reference. Shares for older
    /// jobs are stale.
    pub retained_jobs: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            primary_chain: "bitcoin".to_string(),
            aux_chain: None,
            pool_difficulty: 512.0,
            share_multiplier: 1.0,
            block_signature: b"/mergepool/".to_vec(),
            reward_script: Vec::new(),
            extranonce1_size: 4,
            extranonce2_size: 4,
            submission_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(5),
            retained_jobs: 4,
        }
    }
}

fn parse<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl PoolSettings {
    /// Defaults overlaid with `MERGEPOOL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by full variable
    /// name (`MERGEPOOL_POOL_DIFFICULTY` and so on).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| {
            let var = format!("{ENV_PREFIX}{key}");
            lookup(&var).map(|value| (var, value))
        };

        if let Some((_, value)) = get("PRIMARY_CHAIN") {
            settings.primary_chain = value;
        }
        if let Some((_, value)) = get("AUX_CHAIN") {
            settings.aux_chain = Some(value).filter(|chain| !chain.is_empty());
        }
        if let Some((var, value)) = get("POOL_DIFFICULTY") {
            settings.pool_difficulty = parse(&var, &value)?;
        }
        if let Some((var, value)) = get("SHARE_MULTIPLIER") {
            settings.share_multiplier = parse(&var, &value)?;
        }
        if let Some((_, value)) = get("BLOCK_SIGNATURE") {
            settings.block_signature = value.into_bytes();
        }
        if let Some((var, value)) = get("REWARD_SCRIPT") {
            settings.reward_script =
                hex::decode(value.trim()).map_err(|e| ConfigError::InvalidValue {
                    var,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some((var, value)) = get("EXTRANONCE1_SIZE") {
            settings.extranonce1_size = parse(&var, &value)?;
        }
        if let Some((var, value)) = get("EXTRANONCE2_SIZE") {
            settings.extranonce2_size = parse(&var, &value)?;
        }
        if let Some((var, value)) = get("SUBMISSION_TIMEOUT_MS") {
            settings.submission_timeout = Duration::from_millis(parse(&var, &value)?);
        }
        if let Some((var, value)) = get("REFRESH_INTERVAL_MS") {
            settings.refresh_interval = Duration::from_millis(parse(&var, &value)?);
        }
        if let Some((var, value)) = get("RETAINED_JOBS") {
            settings.retained_jobs = parse(&var, &value)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_difficulty <= 0.0 || !self.pool_difficulty.is_finite() {
            return Err(ConfigError::PoolDifficulty(self.pool_difficulty));
        }
        if self.share_multiplier <= 0.0 || !self.share_multiplier.is_finite() {
            return Err(ConfigError::ShareMultiplier(self.share_multiplier));
        }
        self.extranonce_layout()?;
        Ok(())
    }

    pub fn extranonce_layout(&self) -> Result<ExtranonceLayout, Extranonce2Error> {
        ExtranonceLayout::new(self.extranonce1_size, self.extranonce2_size)
    }

    /// Parameters for a double SHA-256 primary chain. Chains with another
    /// proof-of-work build `ChainParams` directly.
    pub fn chain_params(&self) -> ChainParams {
        ChainParams::new(
            self.primary_chain.clone(),
            Arc::new(DoubleSha256),
            self.share_multiplier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = PoolSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.extranonce_layout().unwrap().reservation(), 8);
        assert!(settings.aux_chain.is_none());
    }

    #[test]
    fn test_overlay() {
        let settings = PoolSettings::from_lookup(lookup(&[
            ("MERGEPOOL_PRIMARY_CHAIN", "litecoin"),
            ("MERGEPOOL_AUX_CHAIN", "dogecoin"),
            ("MERGEPOOL_POOL_DIFFICULTY", "1024"),
            ("MERGEPOOL_SHARE_MULTIPLIER", "65536"),
            ("MERGEPOOL_REWARD_SCRIPT", "76a914"),
            ("MERGEPOOL_EXTRANONCE2_SIZE", "8"),
            ("MERGEPOOL_SUBMISSION_TIMEOUT_MS", "2500"),
            ("MERGEPOOL_RETAINED_JOBS", "10"),
        ]))
        .unwrap();

        assert_eq!(settings.primary_chain, "litecoin");
        assert_eq!(settings.aux_chain.as_deref(), Some("dogecoin"));
        assert_eq!(settings.pool_difficulty, 1024.0);
        assert_eq!(settings.reward_script, vec![0x76, 0xa9, 0x14]);
        assert_eq!(settings.extranonce2_size, 8);
        assert_eq!(settings.submission_timeout, Duration::from_millis(2500));
        assert_eq!(settings.retained_jobs, 10);
        // Untouched values keep their defaults.
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));

        let chain = settings.chain_params();
        assert_eq!(chain.name, "litecoin");
        assert_eq!(chain.share_multiplier, 65536.0);
    }

    #[test]
    fn test_empty_aux_chain_disables_merge_mining() {
        let settings = PoolSettings::from_lookup(lookup(&[("MERGEPOOL_AUX_CHAIN", "")])).unwrap();
        assert!(settings.aux_chain.is_none());
    }

    #[test]
    fn test_unparsable_value_names_variable() {
        let err = PoolSettings::from_lookup(lookup(&[("MERGEPOOL_POOL_DIFFICULTY", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("MERGEPOOL_POOL_DIFFICULTY"));
    }

    #[test]
    fn test_rejects_unusable_values() {
        assert!(matches!(
            PoolSettings::from_lookup(lookup(&[("MERGEPOOL_POOL_DIFFICULTY", "0")])),
            Err(ConfigError::PoolDifficulty(_))
        ));
        assert!(matches!(
            PoolSettings::from_lookup(lookup(&[("MERGEPOOL_EXTRANONCE1_SIZE", "9")])),
            Err(ConfigError::Extranonce(_))
        ));
        assert!(matches!(
            PoolSettings::from_lookup(lookup(&[("MERGEPOOL_REWARD_SCRIPT", "xyz")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
