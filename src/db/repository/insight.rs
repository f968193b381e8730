use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::insight::retain_consistent_findings;
use crate::models::{InsightRecord, ProcessingStatus, Severity, SourceFile};
use crate::pipeline::analysis::types::AnalysisResult;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_ts() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Look up the insight record for a test result.
pub fn find_by_test_result(
    conn: &Connection,
    test_result_id: &str,
) -> Result<Option<InsightRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, test_result_id, extracted_text, structured_data, abnormal_findings,
                ai_summary, risk_level, risk_description, processing_status, processing_error,
                analysis_model, confidence, source_file, created_at, updated_at
         FROM insight_records
         WHERE test_result_id = ?1
         LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![test_result_id], row_to_insight)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Insert a fresh `pending` record if none exists; return the stored record.
///
/// Atomic insert-if-absent: two concurrent calls on a brand-new key can
/// never produce two rows, and an existing record (whatever its status)
/// is returned unchanged.
pub fn upsert_pending(
    conn: &Connection,
    test_result_id: &str,
) -> Result<InsightRecord, DatabaseError> {
    let fresh = InsightRecord::new_pending(test_result_id, now_ts());
    conn.execute(
        "INSERT INTO insight_records (id, test_result_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(test_result_id) DO NOTHING",
        params![
            fresh.id.to_string(),
            fresh.test_result_id,
            fmt_ts(fresh.created_at)
        ],
    )?;
    find_by_test_result(conn, test_result_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "insight_record".into(),
        id: test_result_id.into(),
    })
}

/// Re-arm a record for a forced refresh: insert if absent, otherwise force
/// status back to `pending` and clear the last error. Prior completed
/// payload fields are left intact.
pub fn reset_pending(
    conn: &Connection,
    test_result_id: &str,
) -> Result<InsightRecord, DatabaseError> {
    let fresh = InsightRecord::new_pending(test_result_id, now_ts());
    conn.execute(
        "INSERT INTO insight_records (id, test_result_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(test_result_id) DO UPDATE SET
           processing_status = 'pending',
           processing_error = NULL,
           updated_at = excluded.updated_at",
        params![
            fresh.id.to_string(),
            fresh.test_result_id,
            fmt_ts(fresh.created_at)
        ],
    )?;
    find_by_test_result(conn, test_result_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "insight_record".into(),
        id: test_result_id.into(),
    })
}

/// Move a record into `processing`. Affects 0 rows if the record was
/// deleted in the meantime — the background worker treats that as a no-op
/// rather than resurrecting the row.
pub fn mark_processing(conn: &Connection, test_result_id: &str) -> Result<u64, DatabaseError> {
    let affected = conn.execute(
        "UPDATE insight_records
         SET processing_status = 'processing', updated_at = ?2
         WHERE test_result_id = ?1",
        params![test_result_id, fmt_ts(now_ts())],
    )?;
    Ok(affected as u64)
}

/// Write a completed analysis. Applies the consistency filter (findings
/// must reference a known parameter) and clamps confidence to [0, 1].
pub fn mark_completed(
    conn: &Connection,
    test_result_id: &str,
    result: &AnalysisResult,
    elapsed_ms: u64,
) -> Result<u64, DatabaseError> {
    let findings =
        retain_consistent_findings(result.abnormal_findings.clone(), &result.structured_data);
    let confidence = result.confidence.clamp(0.0, 1.0);
    let source_file = result.source_file.clone().unwrap_or(SourceFile {
        file_name: "unknown".into(),
        file_type: "unknown".into(),
        file_size: 0,
        processing_time_ms: elapsed_ms,
    });

    let affected = conn.execute(
        "UPDATE insight_records
         SET extracted_text = ?2,
             structured_data = ?3,
             abnormal_findings = ?4,
             ai_summary = ?5,
             risk_level = ?6,
             risk_description = ?7,
             processing_status = 'completed',
             processing_error = NULL,
             analysis_model = ?8,
             confidence = ?9,
             source_file = ?10,
             updated_at = ?11
         WHERE test_result_id = ?1",
        params![
            test_result_id,
            result.extracted_text,
            serde_json::to_string(&result.structured_data).unwrap_or_else(|_| "{}".into()),
            serde_json::to_string(&findings).unwrap_or_else(|_| "[]".into()),
            result.ai_summary,
            result.risk_assessment.level.as_str(),
            result.risk_assessment.description,
            result.analysis_model,
            confidence as f64,
            serde_json::to_string(&source_file).ok(),
            fmt_ts(now_ts()),
        ],
    )?;
    Ok(affected as u64)
}

/// Record a failed analysis. Only status, error and timestamp change; a
/// previously completed payload survives the failure.
pub fn mark_failed(
    conn: &Connection,
    test_result_id: &str,
    message: &str,
) -> Result<u64, DatabaseError> {
    let affected = conn.execute(
        "UPDATE insight_records
         SET processing_status = 'failed', processing_error = ?2, updated_at = ?3
         WHERE test_result_id = ?1",
        params![test_result_id, message, fmt_ts(now_ts())],
    )?;
    Ok(affected as u64)
}

/// Remove the record for a test result. Returns true if one existed.
pub fn delete_insight(conn: &Connection, test_result_id: &str) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM insight_records WHERE test_result_id = ?1",
        params![test_result_id],
    )?;
    Ok(affected > 0)
}

fn row_to_insight(row: &rusqlite::Row) -> Result<InsightRecord, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let structured_str: String = row.get(3)?;
    let findings_str: String = row.get(4)?;
    let risk_level_str: String = row.get(6)?;
    let status_str: String = row.get(8)?;
    let confidence: f64 = row.get(11)?;
    let source_file_str: Option<String> = row.get(12)?;
    let created_str: String = row.get(13)?;
    let updated_str: String = row.get(14)?;

    Ok(InsightRecord {
        id: Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        test_result_id: row.get(1)?,
        extracted_text: row.get(2)?,
        structured_data: serde_json::from_str(&structured_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        abnormal_findings: serde_json::from_str(&findings_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        ai_summary: row.get(5)?,
        risk_assessment: crate::models::RiskAssessment {
            level: Severity::from_str(&risk_level_str).unwrap_or(Severity::Low),
            description: row.get(7)?,
        },
        processing_status: ProcessingStatus::from_str(&status_str)
            .unwrap_or(ProcessingStatus::Pending),
        processing_error: row.get(9)?,
        analysis_model: row.get(10)?,
        confidence: confidence as f32,
        source_file: source_file_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: NaiveDateTime::parse_from_str(&created_str, TS_FORMAT).unwrap_or_default(),
        updated_at: NaiveDateTime::parse_from_str(&updated_str, TS_FORMAT).unwrap_or_default(),
    })
}
