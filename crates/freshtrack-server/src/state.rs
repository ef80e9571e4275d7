use std::sync::Arc;

use freshtrack_core::ExpiryPipeline;
use freshtrack_store::ProductStore;

/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Product persistence, shared with the pipeline
    pub store: Arc<dyn ProductStore>,

    /// Same pipeline the daily scheduler runs; used by the on-demand route
    pub pipeline: Arc<ExpiryPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ExpiryPipeline>) -> Arc<Self> {
        Arc::new(Self {
            store: pipeline.store().clone(),
            pipeline,
        })
    }
}
