pub mod analysis;
pub mod orchestrator;

pub use orchestrator::{FetchOutcome, InsightOrchestrator, OrchestratorError, StatusView};
