pub mod client;
pub mod types;

pub use client::{AnalysisClient, HttpAnalysisClient};
pub use types::{AnalysisContext, AnalysisError, AnalysisRequest, AnalysisResult};
