//! Work distribution and share intake.
//!
//! The pipeline keeps a short history of work snapshots built from fresh
//! templates and checks incoming shares against the snapshot that issued
//! their job:
//!
//! ```text
//!  TemplateSource --> WorkGenerator --> WorkCache (newest first)
//!                                           |
//!  mining.submit --> decode --> header --> classify --> BlockSubmitter
//!                                                   \--> ShareReport
//! ```
//!
//! Nothing here retries. A failed refresh keeps the previous work; a failed
//! aux submission is recorded in the report; a failed primary submission is
//! returned to the caller.

mod cache;
pub mod collaborators;
mod report;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::PoolSettings;
use crate::share::classify_share;
use crate::tracing::prelude::*;
use crate::types::{Difficulty, TargetError, pow_value};
use crate::work::{AuxBlock, ChainParams, HeaderError, SubmitError, Submission, Work};

pub use cache::{WorkCache, WorkSnapshot};
pub use collaborators::{BlockCandidate, BlockSubmitter, TemplateSource, WorkGenerator, WorkRequest};
pub use report::{ClientInfo, ShareReport};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No work available yet")]
    NotReady,

    #[error("Unknown or stale job {0:?}")]
    StaleJob(String),

    #[error("Share does not match the job's submit layout: {0}")]
    SlotMismatch(SubmitError),

    #[error("Malformed share: {0}")]
    Decode(SubmitError),

    #[error("Cannot assemble header: {0}")]
    HeaderAssembly(#[from] HeaderError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("Fetching work from {chain} failed: {reason}")]
    Fetch { chain: String, reason: String },

    #[error("Work generation failed: {0}")]
    WorkGeneration(String),

    #[error("Submitting block to {chain} failed: {reason}")]
    Submission { chain: String, reason: String },
}

impl From<SubmitError> for PoolError {
    fn from(err: SubmitError) -> Self {
        if err.is_slot_mismatch() {
            PoolError::SlotMismatch(err)
        } else {
            PoolError::Decode(err)
        }
    }
}

pub struct WorkPipeline {
    settings: PoolSettings,
    chain: ChainParams,
    templates: Arc<dyn TemplateSource>,
    generator: Arc<dyn WorkGenerator>,
    submitter: Arc<dyn BlockSubmitter>,
    cache: WorkCache,

    /// Serializes refreshes so generations are published in order.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl WorkPipeline {
    pub fn new(
        settings: PoolSettings,
        chain: ChainParams,
        templates: Arc<dyn TemplateSource>,
        generator: Arc<dyn WorkGenerator>,
        submitter: Arc<dyn BlockSubmitter>,
    ) -> Self {
        let cache = WorkCache::new(settings.retained_jobs);
        Self {
            settings,
            chain,
            templates,
            generator,
            submitter,
            cache,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn chain(&self) -> &ChainParams {
        &self.chain
    }

    /// Latest snapshot, if any work has been built.
    pub fn snapshot(&self) -> Option<Arc<WorkSnapshot>> {
        self.cache.current()
    }

    /// Build a new generation of work from fresh templates.
    ///
    /// On any failure the cache is left as it was.
    pub async fn refresh_work_cache(&self) -> Result<Arc<WorkSnapshot>, PoolError> {
        let _guard = self.refresh_lock.lock().await;

        let template = self
            .templates
            .fetch_template(&self.chain.name)
            .await
            .map_err(|e| PoolError::Fetch {
                chain: self.chain.name.clone(),
                reason: format!("{e:#}"),
            })?;

        let aux = self.fetch_aux_block().await;

        let mut signature_extras = self.settings.block_signature.clone();
        if let Some((_, commitment)) = &aux {
            signature_extras.extend_from_slice(commitment);
        }
        let aux = aux.map(|(aux, _)| aux);

        let extranonce = self
            .settings
            .extranonce_layout()
            .map_err(|e| PoolError::WorkGeneration(e.to_string()))?;
        let generation = self.cache.next_generation();
        let job_id = format!("{generation:x}");

        let request = WorkRequest {
            template,
            aux: aux.clone(),
            chain: self.chain.name.clone(),
            signature_extras,
            reward_script: self.settings.reward_script.clone(),
            extranonce,
            job_id: job_id.clone(),
        };
        let (primary, mut work) = self
            .generator
            .generate_work(request)
            .await
            .map_err(|e| PoolError::WorkGeneration(format!("{e:#}")))?;
        primary.template.target()?;

        // Shares are matched to snapshots by this id.
        work.job_id = job_id.clone();

        let snapshot = self.cache.publish(WorkSnapshot {
            generation,
            job_id,
            primary,
            aux,
            work,
        });

        info!(
            height = snapshot.primary.height(),
            job_id = %snapshot.job_id,
            aux_height = snapshot.aux.as_ref().map(|aux| aux.height),
            "New work"
        );
        Ok(snapshot)
    }

    /// Fetch the aux candidate and its coinbase commitment.
    ///
    /// Any aux problem is logged and the work is built without merge
    /// mining.
    async fn fetch_aux_block(&self) -> Option<(AuxBlock, Vec<u8>)> {
        let aux_chain = self.settings.aux_chain.as_ref()?;

        let aux = match self.templates.fetch_aux_block(aux_chain).await {
            Ok(Some(aux)) => aux,
            Ok(None) => {
                debug!(chain = %aux_chain, "No aux block offered");
                return None;
            }
            Err(e) => {
                warn!(
                    chain = %aux_chain,
                    error = %format!("{e:#}"),
                    "Aux block fetch failed, building work without it"
                );
                return None;
            }
        };

        if let Err(e) = aux.target() {
            warn!(
                chain = %aux_chain,
                height = aux.height,
                error = %e,
                "Aux block has an unusable target"
            );
            return None;
        }

        match aux.commitment() {
            Ok(commitment) => Some((aux, commitment)),
            Err(e) => {
                warn!(
                    chain = %aux_chain,
                    height = aux.height,
                    error = %e,
                    "Aux block has an unusable hash"
                );
                None
            }
        }
    }

    /// Current job for `mining.notify`.
    pub fn current_work(&self, clean_jobs: bool) -> Result<Work, PoolError> {
        let snapshot = self.cache.current().ok_or(PoolError::NotReady)?;
        Ok(snapshot.work.clone().with_clean_jobs(clean_jobs))
    }

    /// Verify a share and submit any blocks it solves.
    pub async fn receive_share(
        &self,
        params: &[serde_json::Value],
        client: &ClientInfo,
    ) -> Result<ShareReport, PoolError> {
        let current = self.cache.current().ok_or(PoolError::NotReady)?;
        let job_id = Submission::job_id_from_params(params, &current.primary.submit_slots)?;
        let snapshot = self
            .cache
            .find(job_id)
            .ok_or_else(|| PoolError::StaleJob(job_id.to_string()))?;
        drop(current);

        let primary = &snapshot.primary;
        let submission = Submission::from_stratum_params(
            params,
            &primary.submit_slots,
            primary.extranonce.extranonce2_size(),
        )?;

        let mut extranonce = client.extranonce1.clone();
        submission.extranonce2.extend_vec(&mut extranonce);
        let header = primary.header(&extranonce, submission.nonce, submission.ntime)?;

        let digest = self
            .chain
            .pow
            .pow_digest(&bitcoin::consensus::serialize(&header));
        let aux_target = snapshot.aux.as_ref().map(AuxBlock::target).transpose()?;
        let status = classify_share(
            pow_value(digest),
            primary.template.target()?,
            aux_target,
            self.settings.pool_difficulty,
            self.chain.share_multiplier,
        )?;

        let mut report = ShareReport {
            status,
            client: client.name.clone(),
            worker: submission.worker.clone(),
            job_id: snapshot.job_id.clone(),
            achieved: Difficulty::from_pow_digest(&digest),
            primary_chain: self.chain.name.clone(),
            primary_height: primary.height(),
            primary_submitted: false,
            aux_chain: self.settings.aux_chain.clone(),
            aux_height: None,
            aux_submitted: false,
            aux_error: None,
        };

        if !status.is_aux_candidate() && !status.is_primary_candidate() {
            trace!(client = %client.name, job_id = %snapshot.job_id, %status, "Share checked");
            return Ok(report);
        }

        let candidate = BlockCandidate {
            header,
            coinbase: primary.coinbase(&extranonce)?,
            submission,
        };

        if status.is_aux_candidate() {
            if let (Some(aux), Some(aux_chain)) = (&snapshot.aux, &self.settings.aux_chain) {
                let submitted = self
                    .bounded(
                        self.submitter
                            .submit_aux_block(primary, aux, &candidate, aux_chain),
                    )
                    .await;
                match submitted {
                    Ok(()) => {
                        report.aux_submitted = true;
                        report.aux_height = Some(aux.height);
                    }
                    Err(reason) => {
                        warn!(
                            chain = %aux_chain,
                            height = aux.height,
                            client = %client.name,
                            %reason,
                            "Aux block submission failed"
                        );
                        report.aux_error = Some(reason);
                    }
                }
            }
        }

        if status.is_primary_candidate() {
            self.bounded(
                self.submitter
                    .submit_primary_block(primary, &candidate, &self.chain.name),
            )
            .await
            .map_err(|reason| {
                error!(
                    chain = %self.chain.name,
                    height = primary.height(),
                    client = %client.name,
                    %reason,
                    "Block submission failed"
                );
                PoolError::Submission {
                    chain: self.chain.name.clone(),
                    reason,
                }
            })?;
            report.primary_submitted = true;
        }

        info!(height = primary.height(), client = %client.name, "{report}");
        Ok(report)
    }

    /// Refresh work every `refresh_interval` until shut down.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.refresh_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Work pipeline stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.refresh_work_cache().await {
                        warn!(error = %e, "Work refresh failed, keeping previous work");
                    }
                }
            }
        }
    }

    /// Run a submission under the configured timeout.
    async fn bounded<F>(&self, submission: F) -> Result<(), String>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        match tokio::time::timeout(self.settings.submission_timeout, submission).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(_) => Err(format!(
                "timed out after {:?}",
                self.settings.submission_timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use bitcoin::pow::Target;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use crate::share::ShareStatus;
    use crate::work::block::test_blocks;
    use crate::work::{BlockTemplate, PrimaryBlock};

    struct StaticSource {
        template: Mutex<Option<BlockTemplate>>,
        aux: Option<AuxBlock>,
        aux_down: AtomicBool,
    }

    impl StaticSource {
        fn new(template: BlockTemplate, aux: Option<AuxBlock>) -> Arc<Self> {
            Arc::new(Self {
                template: Mutex::new(Some(template)),
                aux,
                aux_down: AtomicBool::new(false),
            })
        }

        /// Make later fetches fail.
        fn go_offline(&self) {
            *self.template.lock() = None;
        }

        /// Make later aux fetches fail.
        fn take_aux_offline(&self) {
            self.aux_down.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TemplateSource for StaticSource {
        async fn fetch_template(&self, _chain: &str) -> Result<BlockTemplate> {
            self.template
                .lock()
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))
        }

        async fn fetch_aux_block(&self, _chain: &str) -> Result<Option<AuxBlock>> {
            if self.aux_down.load(Ordering::SeqCst) {
                return Err(anyhow!("aux node down"));
            }
            Ok(self.aux.clone())
        }
    }

    /// Splits the genesis coinbase around the extranonce.
    #[derive(Default)]
    struct GenesisGenerator {
        requests: Mutex<Vec<WorkRequest>>,
    }

    #[async_trait]
    impl WorkGenerator for GenesisGenerator {
        async fn generate_work(&self, request: WorkRequest) -> Result<(PrimaryBlock, Work)> {
            let branch = request.template.coinbase_merkle_branch()?;
            let primary = PrimaryBlock::new(
                request.template.clone(),
                hex::decode(test_blocks::COINBASE1)?,
                hex::decode(test_blocks::COINBASE2)?,
                branch,
                request.extranonce,
            )?;
            let work = primary.work(request.job_id.clone(), true);
            self.requests.lock().push(request);
            Ok((primary, work))
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        aux_calls: AtomicUsize,
        primary_calls: AtomicUsize,
        fail_aux: bool,
        fail_primary: bool,
        stall: Option<Duration>,
        headers: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlockSubmitter for RecordingSubmitter {
        async fn submit_aux_block(
            &self,
            _primary: &PrimaryBlock,
            _aux: &AuxBlock,
            candidate: &BlockCandidate,
            _chain: &str,
        ) -> Result<()> {
            self.aux_calls.fetch_add(1, Ordering::SeqCst);
            self.headers
                .lock()
                .push(candidate.header.block_hash().to_string());
            if self.fail_aux {
                return Err(anyhow!("aux node rejected block"));
            }
            Ok(())
        }

        async fn submit_primary_block(
            &self,
            _primary: &PrimaryBlock,
            candidate: &BlockCandidate,
            _chain: &str,
        ) -> Result<()> {
            self.primary_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            self.headers
                .lock()
                .push(candidate.header.block_hash().to_string());
            if self.fail_primary {
                return Err(anyhow!("primary node rejected block"));
            }
            Ok(())
        }
    }

    fn aux_block(target: Target) -> AuxBlock {
        AuxBlock {
            hash: "ab".repeat(32),
            chain_id: 98,
            height: 4242,
            target: hex::encode(target.to_le_bytes()),
        }
    }

    struct Harness {
        pipeline: Arc<WorkPipeline>,
        source: Arc<StaticSource>,
        generator: Arc<GenesisGenerator>,
        submitter: Arc<RecordingSubmitter>,
    }

    fn harness(
        mut settings: PoolSettings,
        template: BlockTemplate,
        aux: Option<AuxBlock>,
        submitter: RecordingSubmitter,
    ) -> Harness {
        if aux.is_some() {
            settings.aux_chain = Some("auxcoin".to_string());
        }
        let source = StaticSource::new(template, aux);
        let generator = Arc::new(GenesisGenerator::default());
        let submitter = Arc::new(submitter);
        let pipeline = Arc::new(WorkPipeline::new(
            settings.clone(),
            settings.chain_params(),
            source.clone(),
            generator.clone(),
            submitter.clone(),
        ));
        Harness {
            pipeline,
            source,
            generator,
            submitter,
        }
    }

    fn genesis_harness(aux: Option<AuxBlock>, submitter: RecordingSubmitter) -> Harness {
        harness(
            PoolSettings::default(),
            test_blocks::template(),
            aux,
            submitter,
        )
    }

    fn client() -> ClientInfo {
        ClientInfo::new("alice", hex::decode(test_blocks::EXTRANONCE1).unwrap())
    }

    /// The share that mined the genesis block.
    fn genesis_share(job_id: &str) -> Vec<Value> {
        vec![
            json!("alice.rig1"),
            json!(job_id),
            json!(test_blocks::EXTRANONCE2),
            json!(format!("{:08x}", test_blocks::NTIME)),
            json!(format!("{:08x}", test_blocks::NONCE)),
        ]
    }

    /// Template whose target is far harder than the genesis block hash.
    fn hard_template() -> BlockTemplate {
        let mut template = test_blocks::template();
        template.target = format!("{}ffff{}", "00".repeat(10), "00".repeat(20));
        template
    }

    #[tokio::test]
    async fn test_share_before_refresh_is_not_ready() {
        let h = genesis_harness(None, RecordingSubmitter::default());

        let result = h.pipeline.receive_share(&genesis_share("1"), &client()).await;

        assert!(matches!(result, Err(PoolError::NotReady)));
        assert!(matches!(
            h.pipeline.current_work(true),
            Err(PoolError::NotReady)
        ));
        assert_eq!(h.submitter.primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.submitter.aux_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_genesis_share_is_primary_block() {
        let h = genesis_harness(None, RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();

        assert_eq!(report.status, ShareStatus::PrimaryCandidate);
        assert!(report.primary_submitted);
        assert!(!report.aux_submitted);
        assert_eq!(
            h.submitter.headers.lock().as_slice(),
            [test_blocks::BLOCK_HASH.to_string()]
        );
        assert_eq!(
            report.to_string(),
            "Primary block found: bitcoin 0 by alice"
        );
    }

    #[tokio::test]
    async fn test_dual_candidate_survives_aux_failure() {
        let h = genesis_harness(
            Some(aux_block(Target::MAX)),
            RecordingSubmitter {
                fail_aux: true,
                ..Default::default()
            },
        );
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();

        assert_eq!(report.status, ShareStatus::DualCandidate);
        assert_eq!(h.submitter.aux_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.submitter.primary_calls.load(Ordering::SeqCst), 1);
        assert!(report.primary_submitted);
        assert!(!report.aux_submitted);
        assert!(report.aux_error.as_deref().unwrap().contains("rejected"));
        assert!(report.is_credited());
    }

    #[tokio::test]
    async fn test_dual_candidate_submits_both() {
        let h = genesis_harness(Some(aux_block(Target::MAX)), RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();

        assert!(report.aux_submitted && report.primary_submitted);
        assert_eq!(report.aux_height, Some(4242));
        assert_eq!(
            report.to_string(),
            "Dual block found: bitcoin 0 and auxcoin 4242 by alice"
        );
    }

    #[tokio::test]
    async fn test_aux_only_candidate() {
        let h = harness(
            PoolSettings::default(),
            hard_template(),
            Some(aux_block(Target::MAX)),
            RecordingSubmitter::default(),
        );
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();

        assert_eq!(report.status, ShareStatus::Aux1Candidate);
        assert_eq!(h.submitter.aux_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.submitter.primary_calls.load(Ordering::SeqCst), 0);
        assert!(report.is_credited());
    }

    #[tokio::test]
    async fn test_primary_failure_is_returned() {
        let h = genesis_harness(
            None,
            RecordingSubmitter {
                fail_primary: true,
                ..Default::default()
            },
        );
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let err = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap_err();

        match err {
            PoolError::Submission { chain, reason } => {
                assert_eq!(chain, "bitcoin");
                assert!(reason.contains("rejected"));
            }
            other => panic!("expected Submission, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_submission_times_out() {
        let h = genesis_harness(
            None,
            RecordingSubmitter {
                stall: Some(Duration::from_secs(60)),
                ..Default::default()
            },
        );
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let err = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap_err();

        assert!(
            matches!(&err, PoolError::Submission { reason, .. } if reason.contains("timed out")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_pool_share_and_invalid_share() {
        let settings = PoolSettings {
            pool_difficulty: 1.0,
            ..Default::default()
        };
        let h = harness(settings, hard_template(), None, RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();
        assert_eq!(report.status, ShareStatus::Valid);

        let mut miss = genesis_share(&snapshot.job_id);
        miss[4] = json!("00000000");
        let report = h.pipeline.receive_share(&miss, &client()).await.unwrap();
        assert_eq!(report.status, ShareStatus::Invalid);
        assert!(!report.is_credited());

        assert_eq!(h.submitter.primary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retained_and_stale_jobs() {
        let settings = PoolSettings {
            retained_jobs: 2,
            ..Default::default()
        };
        let h = harness(
            settings,
            test_blocks::template(),
            None,
            RecordingSubmitter::default(),
        );
        for _ in 0..3 {
            h.pipeline.refresh_work_cache().await.unwrap();
        }
        assert_eq!(h.pipeline.snapshot().unwrap().job_id, "3");

        let report = h
            .pipeline
            .receive_share(&genesis_share("2"), &client())
            .await
            .unwrap();
        assert_eq!(report.job_id, "2");

        let err = h
            .pipeline
            .receive_share(&genesis_share("1"), &client())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::StaleJob(id) if id == "1"));
    }

    #[tokio::test]
    async fn test_malformed_shares() {
        let h = genesis_harness(None, RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();

        let share = genesis_share(&snapshot.job_id);
        assert!(matches!(
            h.pipeline.receive_share(&share[..4], &client()).await,
            Err(PoolError::SlotMismatch(_))
        ));

        let mut bad_nonce = genesis_share(&snapshot.job_id);
        bad_nonce[4] = json!("nonce!!!");
        assert!(matches!(
            h.pipeline.receive_share(&bad_nonce, &client()).await,
            Err(PoolError::Decode(_))
        ));

        let short_session = ClientInfo::new("bob", vec![0x01]);
        assert!(matches!(
            h.pipeline
                .receive_share(&genesis_share(&snapshot.job_id), &short_session)
                .await,
            Err(PoolError::HeaderAssembly(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_builds_merged_mining_request() {
        let h = genesis_harness(Some(aux_block(Target::MAX)), RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.job_id, "1");
        assert_eq!(snapshot.work.job_id, "1");

        let requests = h.generator.requests.lock();
        let request = &requests[0];
        let signature = PoolSettings::default().block_signature;
        let commitment = aux_block(Target::MAX).commitment().unwrap();
        assert_eq!(request.signature_extras[..signature.len()], signature[..]);
        assert_eq!(request.signature_extras[signature.len()..], commitment[..]);
        assert_eq!(request.extranonce.reservation(), 8);
        assert_eq!(request.chain, "bitcoin");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_work() {
        let h = genesis_harness(None, RecordingSubmitter::default());
        h.pipeline.refresh_work_cache().await.unwrap();
        h.source.go_offline();

        let err = h.pipeline.refresh_work_cache().await.unwrap_err();
        assert!(matches!(err, PoolError::Fetch { .. }));

        let work = h.pipeline.current_work(false).unwrap();
        assert_eq!(work.job_id, "1");
        assert!(!work.clean_jobs);
    }

    #[tokio::test]
    async fn test_aux_outage_still_publishes_primary_work() {
        let h = genesis_harness(Some(aux_block(Target::MAX)), RecordingSubmitter::default());
        h.source.take_aux_offline();

        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();
        assert!(snapshot.aux.is_none());
        assert_eq!(h.pipeline.current_work(true).unwrap().job_id, "1");

        let signature = PoolSettings::default().block_signature;
        assert_eq!(h.generator.requests.lock()[0].signature_extras, signature);

        // Without an aux block the genesis share only wins the primary chain.
        let report = h
            .pipeline
            .receive_share(&genesis_share(&snapshot.job_id), &client())
            .await
            .unwrap();
        assert_eq!(report.status, ShareStatus::PrimaryCandidate);
        assert_eq!(h.submitter.aux_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unusable_aux_block_is_skipped() {
        let mut aux = aux_block(Target::MAX);
        aux.target = "beef".to_string();
        let h = genesis_harness(Some(aux), RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();
        assert!(snapshot.aux.is_none());

        let mut aux = aux_block(Target::MAX);
        aux.hash = "not hex".to_string();
        let h = genesis_harness(Some(aux), RecordingSubmitter::default());
        let snapshot = h.pipeline.refresh_work_cache().await.unwrap();
        assert!(snapshot.aux.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_until_shutdown() {
        let h = genesis_harness(None, RecordingSubmitter::default());
        let shutdown = CancellationToken::new();

        let pipeline = h.pipeline.clone();
        let token = shutdown.clone();
        let task = tokio::spawn(async move { pipeline.run(token).await });

        tokio::time::sleep(Duration::from_secs(12)).await;
        shutdown.cancel();
        task.await.unwrap();

        let generation = h.pipeline.snapshot().unwrap().generation;
        assert!(generation >= 2, "generation {generation}");
    }
}
