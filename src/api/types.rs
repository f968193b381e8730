//! Shared types for the API layer.

use std::sync::Arc;

use crate::pipeline::InsightOrchestrator;

/// Shared context for all API routes. The routing layer receives
/// already-authenticated requests; auth itself lives outside this service.
#[derive(Clone)]
pub struct ApiContext {
    pub insights: Arc<InsightOrchestrator>,
}

impl ApiContext {
    pub fn new(insights: Arc<InsightOrchestrator>) -> Self {
        Self { insights }
    }
}
