//! Application context shared by all route handlers via axum state.

use std::sync::Arc;

use hf_assets::{AssetServices, AssetStore};
use hf_av::{Encoder, ToolRegistry};
use hf_core::config::Config;

/// Application context shared by all request handlers.
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Engine, ingestion, and lifecycle over one store and lock table.
    pub services: AssetServices,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: Arc<dyn AssetStore>,
        encoder: Arc<dyn Encoder>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let services =
            AssetServices::new(store, encoder, config.storage.normalized_extensions());
        Self {
            config: Arc::new(config),
            services,
            tools,
        }
    }
}
