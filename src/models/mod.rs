pub mod enums;
pub mod insight;

pub use enums::{ProcessingStatus, Severity};
pub use insight::{
    AbnormalFinding, InsightRecord, LaboratoryInfo, PatientInfo, RiskAssessment, SourceFile,
    StructuredData, TestValue, FRESHNESS_WINDOW_HOURS,
};
