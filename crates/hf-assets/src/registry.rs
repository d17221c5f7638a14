//! Explicit lifecycle state and per-name locking.
//!
//! The filesystem stays the durable record (a committed playlist means
//! ready). States the disk cannot express live here and are rebuilt from
//! disk on startup by [`BootstrapSweep`](crate::BootstrapSweep).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use hf_core::{AssetState, VideoName};

/// Registry record for one video.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub state: AssetState,
    /// Message of the last failed conversion; cleared on any other transition.
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

type LockTable = DashMap<VideoName, Arc<Mutex<()>>>;

/// In-memory state table plus the per-name lock table.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    entries: DashMap<VideoName, AssetEntry>,
    locks: Arc<LockTable>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &VideoName) -> Option<AssetEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    pub fn state(&self, name: &VideoName) -> Option<AssetState> {
        self.entries.get(name).map(|e| e.state)
    }

    /// Record a transition to `state`.
    pub fn set(&self, name: &VideoName, state: AssetState) {
        self.entries.insert(
            name.clone(),
            AssetEntry {
                state,
                last_error: None,
                updated_at: Utc::now(),
            },
        );
    }

    /// Record a failed conversion.
    pub fn fail(&self, name: &VideoName, error: impl Into<String>) {
        self.entries.insert(
            name.clone(),
            AssetEntry {
                state: AssetState::Failed,
                last_error: Some(error.into()),
                updated_at: Utc::now(),
            },
        );
    }

    /// Forget `name`, returning its last record.
    pub fn remove(&self, name: &VideoName) -> Option<AssetEntry> {
        self.entries.remove(name).map(|(_, entry)| entry)
    }

    /// Number of names with a registry record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait for exclusive access to `name`.
    ///
    /// Conversion, installing an upload, and deletion of the same
    /// name all hold this lock, so they never interleave. Different names
    /// never contend. The lock is not re-entrant.
    pub async fn lock(&self, name: &VideoName) -> NameGuard {
        let mutex = Arc::clone(
            &self
                .locks
                .entry(name.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let guard = mutex.lock_owned().await;
        NameGuard {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            name: name.clone(),
        }
    }

    /// Number of names currently locked or waited on.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one video name, released on drop.
///
/// The lock table entry is removed once the last holder or waiter is gone.
#[derive(Debug)]
pub struct NameGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
    name: VideoName,
}

impl NameGuard {
    pub fn name(&self) -> &VideoName {
        &self.name
    }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table itself still references the mutex: nobody is waiting.
        self.locks
            .remove_if(&self.name, |_, m| Arc::strong_count(m) == 1);
    }
}
