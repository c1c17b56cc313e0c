// src/pipeline/run.rs

//! Drift detection run.
//!
//! One pass walks a fixed sequence, each step gating the next:
//!
//! ```text
//! fetch → extract → save latest ─┬─ no baseline → init baseline → done
//!                                └─ load baseline → diff → format → notify → promote → done
//! ```
//!
//! Any failure before the diff completes aborts the run with the baseline
//! untouched. A delivery failure is logged and the run still promotes; any
//! other error raised while notifying aborts the run.

use crate::error::Result;
use crate::models::{Config, RunOutcome, RunReport};
use crate::services::{
    DiffEngine, Extractor, HttpSpecSource, Notifier, ProcessDiffEngine, ReportFormatter,
    SpecSource, WebhookNotifier,
};
use crate::storage::{BaselineStore, LocalBaselineStore, RunLock};
use crate::utils::http;

/// The pipeline controller, wired to its collaborators.
pub struct DriftPipeline<'a> {
    pub source: &'a dyn SpecSource,
    pub extractor: &'a Extractor,
    pub store: &'a dyn BaselineStore,
    pub engine: &'a dyn DiffEngine,
    pub formatter: &'a ReportFormatter,
    pub notifier: &'a dyn Notifier,
}

impl DriftPipeline<'_> {
    /// Execute a single pass.
    pub async fn run_once(&self) -> Result<RunReport> {
        log::info!("Fetching carrier payload...");
        let carrier = self.source.fetch().await?;

        log::info!("Extracting embedded document...");
        let latest = self.extractor.extract(&carrier)?;
        let latest_fingerprint = latest.fingerprint();
        log::info!(
            "Observed {} v{} ({} operations, {})",
            latest.title().unwrap_or("<untitled>"),
            latest.version().unwrap_or("?"),
            latest.operation_count(),
            &latest_fingerprint[..12]
        );

        self.store.save_latest(&latest).await?;

        if !self.store.has_baseline().await? {
            self.store.init_baseline().await?;
            log::info!("No baseline found; observed document accepted as baseline");
            return Ok(RunReport {
                outcome: RunOutcome::Bootstrapped,
                baseline_fingerprint: latest_fingerprint.clone(),
                latest_fingerprint,
            });
        }

        let baseline = self.store.load_baseline().await?;
        let baseline_fingerprint = baseline.fingerprint();
        if baseline_fingerprint == latest_fingerprint {
            log::debug!("Baseline and latest are identical; consulting engine anyway");
        }

        log::info!("Diffing baseline against latest...");
        let result = self.engine.diff(&baseline, &latest).await?;

        let report = self.formatter.format(&result);
        let outcome = match report.text() {
            None => {
                log::info!("No differences detected");
                RunOutcome::Unchanged
            }
            Some(text) => {
                log::info!("Drift detected; notifying channel");
                let notified = match self.notifier.notify(text).await {
                    Ok(()) => true,
                    Err(e) if !e.is_fatal() => {
                        log::warn!("Notification failed, change will not be re-sent: {}", e);
                        false
                    }
                    Err(e) => return Err(e),
                };
                RunOutcome::Changed { notified }
            }
        };

        self.store.promote_latest_to_baseline().await?;
        log::info!("Latest promoted to baseline");

        Ok(RunReport {
            outcome,
            baseline_fingerprint,
            latest_fingerprint,
        })
    }
}

/// Run one pass with the production collaborators built from `config`.
///
/// The storage directory is locked for the whole run.
pub async fn run_pipeline(config: &Config) -> Result<RunReport> {
    config.validate()?;
    let storage_dir = config.storage_dir()?;

    let _lock = RunLock::acquire(storage_dir, config.storage.lock_stale_after())?;

    let source_client =
        http::create_client(&config.source.user_agent, config.source.timeout_secs)?;
    let notify_client =
        http::create_client(&config.source.user_agent, config.notify.timeout_secs)?;

    let source = HttpSpecSource::new(source_client, config.source_url()?);
    let extractor = Extractor::from_config(&config.source)?;
    let store = LocalBaselineStore::from_config(storage_dir, &config.storage).await?;
    let engine = ProcessDiffEngine::from_config(&config.diff);
    let formatter = ReportFormatter::from_config(&config.notify);
    let notifier = WebhookNotifier::new(notify_client, config.webhook_url()?);

    let pipeline = DriftPipeline {
        source: &source,
        extractor: &extractor,
        store: &store,
        engine: &engine,
        formatter: &formatter,
        notifier: &notifier,
    };

    let report = pipeline.run_once().await?;
    log::info!("Run finished: {}", report.outcome);
    Ok(report)
}
