//! Batch deletion of raw and derived assets.

use std::sync::Arc;

use serde::Serialize;

use hf_core::{AssetState, Error, Result, VideoName};

use crate::registry::AssetRegistry;
use crate::store::AssetStore;

/// Outcome of [`LifecycleManager::delete_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    /// Names that no longer have any raw or derived data (including names
    /// that never existed).
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A name that could not be deleted.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    pub name: String,
    pub error: String,
}

/// Removes videos from both stores.
pub struct LifecycleManager {
    store: Arc<dyn AssetStore>,
    registry: Arc<AssetRegistry>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn AssetStore>, registry: Arc<AssetRegistry>) -> Self {
        Self { store, registry }
    }

    /// Delete every name in `names`, best-effort.
    ///
    /// Each name is processed under its lock, so a delete that races an
    /// in-flight conversion runs after it. Missing data is not an error.
    /// Failures for individual names are collected in the report and do not
    /// stop the batch.
    ///
    /// # Errors
    ///
    /// [`Error::EmptySelection`] if `names` is empty.
    pub async fn delete_all<S: AsRef<str>>(&self, names: &[S]) -> Result<DeleteReport> {
        if names.is_empty() {
            return Err(Error::EmptySelection);
        }

        let mut report = DeleteReport::default();
        for raw in names {
            let raw = raw.as_ref();
            let result = match VideoName::new(raw) {
                Ok(name) => self.delete_one(&name).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.deleted.push(raw.to_string()),
                Err(e) => {
                    tracing::warn!(name = %raw, error = %e, "Failed to delete video");
                    report.failed.push(DeleteFailure {
                        name: raw.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Delete batch finished"
        );
        Ok(report)
    }

    /// Deleted is terminal, so the name's registry record is dropped rather
    /// than kept as a tombstone; a later status reads `Unknown`.
    async fn delete_one(&self, name: &VideoName) -> Result<()> {
        let _guard = self.registry.lock(name).await;
        let had_derived = self.store.remove_derived(name).await?;
        let had_raw = self.store.remove_raw(name)?;
        let previous = self.registry.remove(name).map(|entry| entry.state);

        if had_derived || had_raw || previous.is_some() {
            tracing::info!(
                name = %name,
                had_derived,
                had_raw,
                from = ?previous,
                to = %AssetState::Deleted,
                "Video deleted"
            );
        }
        Ok(())
    }
}
