// src/pipeline/status.rs

//! Stored state inspection.

use crate::error::Result;
use crate::models::Config;
use crate::storage::{BaselineStore, LocalBaselineStore, SlotInfo, StoreStatus};

/// Describe the baseline and latest slots of the configured store.
pub async fn run_status(config: &Config) -> Result<StoreStatus> {
    let store = LocalBaselineStore::from_config(config.storage_dir()?, &config.storage).await?;
    let status = store.status().await?;

    log_slot("Baseline", status.baseline.as_ref());
    log_slot("Latest", status.latest.as_ref());
    if status.pending_drift() {
        log::info!("Latest differs from baseline; the next run will compare them");
    }
    Ok(status)
}

fn log_slot(name: &str, slot: Option<&SlotInfo>) {
    let Some(slot) = slot else {
        log::info!("{name}: not found");
        return;
    };
    log::info!(
        "{name}: {} v{} ({} operations)",
        slot.title.as_deref().unwrap_or("<untitled>"),
        slot.version.as_deref().unwrap_or("?"),
        slot.operations
    );
    log::info!("    location: {}", slot.location);
    log::info!("    sha256:   {}", slot.fingerprint);
    if let Some(modified) = slot.modified {
        log::info!("    updated:  {}", modified.to_rfc3339());
    }
}
