use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AbnormalFinding, RiskAssessment, SourceFile, StructuredData};

/// Optional context forwarded to the engine on a forced refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    pub attachment_url: Option<String>,
    pub test_type: Option<String>,
    pub findings: Option<String>,
}

/// Single outbound request to the analysis engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub test_result_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
}

impl AnalysisRequest {
    pub fn new(test_result_id: &str, context: &AnalysisContext) -> Self {
        Self {
            test_result_id: test_result_id.to_string(),
            attachment_url: context.attachment_url.clone(),
            test_type: context.test_type.clone(),
            findings: context.findings.clone(),
        }
    }
}

/// Engine response envelope: `{success, message?, data?}`.
#[derive(Debug, Deserialize)]
pub struct EngineEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AnalysisResult>,
}

/// Successful analysis payload. Every field the engine may omit defaults
/// to its empty/neutral value — an omission is never an error, only a
/// non-success envelope or transport failure is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub structured_data: StructuredData,
    #[serde(default)]
    pub abnormal_findings: Vec<AbnormalFinding>,
    #[serde(default)]
    pub ai_summary: String,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    #[serde(default)]
    pub analysis_model: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub source_file: Option<SourceFile>,
}

/// Errors from the analysis engine adapter.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Cannot reach analysis engine at {0}")]
    Connection(String),

    #[error("Analysis request timed out after {0}s")]
    Timeout(u64),

    #[error("Analysis engine returned HTTP {status}: {body}")]
    EngineStatus { status: u16, body: String },

    #[error("Analysis rejected: {0}")]
    Rejected(String),

    #[error("Cannot parse engine response: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
