//! # hf-assets
//!
//! Asset lifecycle management for hlsforge.
//!
//! This crate provides:
//!
//! - **[`AssetStore`]** -- the only component that touches the raw and derived
//!   directories, with [`FsAssetStore`] as the filesystem implementation.
//! - **[`AssetRegistry`]** -- explicit in-memory lifecycle state per video
//!   plus the per-name lock table that serializes conversions, uploads, and
//!   deletions of the same video.
//! - **[`TranscodeEngine`]** -- idempotent raw → ready conversion through an
//!   [`hf_av::Encoder`].
//! - **[`IngestionPipeline`]** -- validate, persist, and convert an upload.
//! - **[`LifecycleManager`]** -- best-effort batch deletion.
//! - **[`BootstrapSweep`]** -- startup reconciliation and conversion of
//!   leftover raw files.

pub mod bootstrap;
pub mod engine;
pub mod ingest;
pub mod lifecycle;
pub mod registry;
pub mod services;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at the crate root.
pub use bootstrap::{BootstrapSweep, SweepSummary};
pub use engine::TranscodeEngine;
pub use ingest::{IngestReceipt, IngestionPipeline};
pub use lifecycle::{DeleteFailure, DeleteReport, LifecycleManager};
pub use registry::{AssetEntry, AssetRegistry, NameGuard};
pub use services::AssetServices;
pub use store::{AssetStore, FsAssetStore, StagedUpload};
