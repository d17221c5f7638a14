//! Startup reconciliation and conversion of leftover raw sources.

use std::sync::Arc;

use serde::Serialize;

use hf_core::{AssetState, Result, VideoName};

use crate::engine::TranscodeEngine;

/// Counts from one [`BootstrapSweep::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Videos that were already ready on disk.
    pub already_ready: usize,
    /// Raw sources found next to a committed playlist and removed.
    pub leftovers_removed: usize,
    pub converted: usize,
    pub failed: usize,
}

/// Drains raw sources left over from a previous run.
pub struct BootstrapSweep {
    engine: Arc<TranscodeEngine>,
}

impl BootstrapSweep {
    pub fn new(engine: Arc<TranscodeEngine>) -> Self {
        Self { engine }
    }

    /// Seed the registry from disk and return the raw sources still pending.
    ///
    /// A raw source beside a committed playlist belongs to a conversion that
    /// finished before the source could be removed; it is removed now.
    pub async fn reconcile(&self, summary: &mut SweepSummary) -> Result<Vec<VideoName>> {
        let store = self.engine.store();
        let registry = self.engine.registry();

        for name in store.list_ready().await? {
            registry.set(&name, AssetState::Ready);
            summary.already_ready += 1;
        }

        let mut pending = Vec::new();
        for name in store.list_raw().await? {
            if store.ready_exists(&name) {
                if store.remove_raw(&name)? {
                    summary.leftovers_removed += 1;
                    tracing::info!(name = %name, "Removed raw source of already converted video");
                }
                continue;
            }
            registry.set(&name, AssetState::Raw);
            pending.push(name);
        }
        Ok(pending)
    }

    /// Reconcile, then convert every pending raw source one after another.
    ///
    /// Never fails: errors are logged and counted.
    pub async fn run(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let pending = match self.reconcile(&mut summary).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Startup sweep could not scan storage");
                return summary;
            }
        };

        if !pending.is_empty() {
            tracing::info!("Converting {} leftover raw file(s)", pending.len());
        }

        for name in pending {
            match self.engine.convert(&name).await {
                Ok(_) => summary.converted += 1,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Startup conversion failed");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            ready = summary.already_ready,
            converted = summary.converted,
            failed = summary.failed,
            leftovers_removed = summary.leftovers_removed,
            "Startup sweep complete"
        );
        summary
    }
}
