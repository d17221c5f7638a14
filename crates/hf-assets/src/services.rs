//! Wiring of the asset components around one store, encoder, and registry.

use std::sync::Arc;

use hf_av::Encoder;

use crate::bootstrap::BootstrapSweep;
use crate::engine::TranscodeEngine;
use crate::ingest::IngestionPipeline;
use crate::lifecycle::LifecycleManager;
use crate::registry::AssetRegistry;
use crate::store::AssetStore;

/// The asset components sharing a single store and lock table.
///
/// Cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AssetServices {
    pub engine: Arc<TranscodeEngine>,
    pub ingest: Arc<IngestionPipeline>,
    pub lifecycle: Arc<LifecycleManager>,
}

impl AssetServices {
    /// Build every component over `store` and `encoder`.
    ///
    /// `extensions` are the accepted upload extensions, lowercased.
    pub fn new(
        store: Arc<dyn AssetStore>,
        encoder: Arc<dyn Encoder>,
        extensions: Vec<String>,
    ) -> Self {
        let registry = Arc::new(AssetRegistry::new());
        let engine = Arc::new(TranscodeEngine::new(
            Arc::clone(&store),
            encoder,
            Arc::clone(&registry),
        ));
        let ingest = Arc::new(IngestionPipeline::new(Arc::clone(&engine), extensions));
        let lifecycle = Arc::new(LifecycleManager::new(store, registry));

        Self {
            engine,
            ingest,
            lifecycle,
        }
    }

    /// The startup sweep over this engine.
    pub fn sweep(&self) -> BootstrapSweep {
        BootstrapSweep::new(Arc::clone(&self.engine))
    }
}
