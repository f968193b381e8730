use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ProcessingStatus, Severity};

/// Freshness window: a record untouched for longer than this is stale.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Cached analysis of one diagnostic test result. One record per
/// `test_result_id`; result fields stay empty until a background
/// computation completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    pub id: Uuid,
    pub test_result_id: String,
    pub extracted_text: String,
    pub structured_data: StructuredData,
    pub abnormal_findings: Vec<AbnormalFinding>,
    pub ai_summary: String,
    pub risk_assessment: RiskAssessment,
    pub processing_status: ProcessingStatus,
    pub processing_error: Option<String>,
    pub analysis_model: String,
    pub confidence: f32,
    pub source_file: Option<SourceFile>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Structured values extracted from the report, plus subject/test metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default)]
    pub test_values: Vec<TestValue>,
    #[serde(default)]
    pub patient_info: Option<PatientInfo>,
    #[serde(default)]
    pub laboratory_info: Option<LaboratoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestValue {
    pub parameter: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub is_abnormal: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub test_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaboratoryInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// An out-of-range value the analysis engine flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbnormalFinding {
    pub parameter: String,
    pub value: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: Severity,
    #[serde(default)]
    pub description: String,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            level: Severity::Low,
            description: String::new(),
        }
    }
}

/// Metadata about the source document the engine processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl InsightRecord {
    /// Fresh record in `pending` state, result fields empty.
    pub fn new_pending(test_result_id: &str, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_result_id: test_result_id.to_string(),
            extracted_text: String::new(),
            structured_data: StructuredData::default(),
            abnormal_findings: Vec::new(),
            ai_summary: String::new(),
            risk_assessment: RiskAssessment::default(),
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            analysis_model: String::new(),
            confidence: 0.0,
            source_file: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the record has not been touched within the freshness window.
    /// Evaluated against `updated_at` only, independent of status — a record
    /// stuck in `processing` for over 24h is stale too.
    pub fn is_stale(&self, now: NaiveDateTime) -> bool {
        now - self.updated_at > Duration::hours(FRESHNESS_WINDOW_HOURS)
    }
}

/// Drop findings that reference a parameter absent from the structured
/// test values (case-insensitive). Consistency filter applied on write,
/// not a user-facing error.
pub fn retain_consistent_findings(
    findings: Vec<AbnormalFinding>,
    structured: &StructuredData,
) -> Vec<AbnormalFinding> {
    let known: Vec<String> = structured
        .test_values
        .iter()
        .map(|tv| tv.parameter.to_lowercase())
        .collect();
    findings
        .into_iter()
        .filter(|f| known.contains(&f.parameter.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn value(parameter: &str) -> TestValue {
        TestValue {
            parameter: parameter.into(),
            value: "5.1".into(),
            unit: Some("mmol/L".into()),
            reference_range: Some("3.5 - 5.0".into()),
            is_abnormal: true,
        }
    }

    fn finding(parameter: &str) -> AbnormalFinding {
        AbnormalFinding {
            parameter: parameter.into(),
            value: "5.1".into(),
            severity: Severity::Moderate,
            description: "Slightly elevated".into(),
            recommendation: "Recheck in 2 weeks".into(),
        }
    }

    #[test]
    fn new_pending_has_empty_results() {
        let rec = InsightRecord::new_pending("tr-1", Utc::now().naive_utc());
        assert_eq!(rec.processing_status, ProcessingStatus::Pending);
        assert!(rec.extracted_text.is_empty());
        assert!(rec.structured_data.test_values.is_empty());
        assert!(rec.abnormal_findings.is_empty());
        assert!(rec.processing_error.is_none());
        assert_eq!(rec.confidence, 0.0);
        assert_eq!(rec.created_at, rec.updated_at);
    }

    #[test]
    fn stale_after_24_hours() {
        let now = Utc::now().naive_utc();
        let mut rec = InsightRecord::new_pending("tr-1", now);

        rec.updated_at = now - Duration::hours(23);
        assert!(!rec.is_stale(now));

        rec.updated_at = now - Duration::hours(25);
        assert!(rec.is_stale(now));
    }

    #[test]
    fn staleness_ignores_status() {
        let now = Utc::now().naive_utc();
        let mut rec = InsightRecord::new_pending("tr-1", now);
        rec.processing_status = ProcessingStatus::Processing;
        rec.updated_at = now - Duration::hours(48);
        assert!(rec.is_stale(now));
    }

    #[test]
    fn consistency_filter_drops_unknown_parameters() {
        let structured = StructuredData {
            test_values: vec![value("Potassium"), value("Sodium")],
            ..Default::default()
        };
        let findings = vec![finding("potassium"), finding("Glucose")];

        let kept = retain_consistent_findings(findings, &structured);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].parameter, "potassium");
    }

    #[test]
    fn consistency_filter_with_no_test_values_drops_everything() {
        let kept =
            retain_consistent_findings(vec![finding("Potassium")], &StructuredData::default());
        assert!(kept.is_empty());
    }

    #[test]
    fn structured_data_deserializes_with_missing_fields() {
        let sd: StructuredData = serde_json::from_str("{}").unwrap();
        assert!(sd.test_values.is_empty());
        assert!(sd.patient_info.is_none());

        let sd: StructuredData = serde_json::from_str(
            r#"{"testValues":[{"parameter":"Hb","value":"13.5"}]}"#,
        )
        .unwrap();
        assert_eq!(sd.test_values.len(), 1);
        assert!(sd.test_values[0].unit.is_none());
        assert!(!sd.test_values[0].is_abnormal);
    }

    #[test]
    fn risk_assessment_defaults_to_low() {
        let risk = RiskAssessment::default();
        assert_eq!(risk.level, Severity::Low);
        assert!(risk.description.is_empty());
    }
}
