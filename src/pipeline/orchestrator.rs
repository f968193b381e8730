//! Insight orchestrator — the cache state machine.
//!
//! Decides cache-hit vs. cache-miss vs. forced-refresh, keeps exactly one
//! record per test result, and hands the slow analysis-engine call to a
//! detached worker thread so callers always return immediately.
//!
//! States: `pending` → `processing` → `completed` | `failed`. Terminal
//! states re-enter the machine only through a forced refresh (reset to
//! `pending`) or through staleness (a record untouched for 24 h is treated
//! as a miss regardless of status).

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::core_state::{CoreError, CoreState};
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::models::{InsightRecord, ProcessingStatus};

use super::analysis::{AnalysisClient, AnalysisContext, AnalysisRequest};

/// Errors surfaced synchronously to the facade. Upstream analysis failures
/// never appear here — they land in the record as `failed` status.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Test result ID is required")]
    MissingKey,

    #[error("No analysis found for test result {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl From<CoreError> for OrchestratorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => Self::Storage(e),
        }
    }
}

/// Result of a fetch-or-initiate call.
#[derive(Debug)]
pub struct FetchOutcome {
    pub record: InsightRecord,
    /// True only when a fresh completed record was served without
    /// launching any computation.
    pub cached: bool,
}

/// Lightweight polling view of a record's state-machine fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: ProcessingStatus,
    pub error: Option<String>,
    pub updated_at: NaiveDateTime,
}

pub struct InsightOrchestrator {
    state: Arc<CoreState>,
    client: Arc<dyn AnalysisClient>,
}

impl InsightOrchestrator {
    pub fn new(state: Arc<CoreState>, client: Arc<dyn AnalysisClient>) -> Self {
        Self { state, client }
    }

    /// Serve a fresh completed record as a cache hit; otherwise ensure a
    /// record exists and report a miss, launching background work unless a
    /// fresh computation is already in flight for this key.
    pub fn fetch_or_initiate(
        &self,
        test_result_id: &str,
    ) -> Result<FetchOutcome, OrchestratorError> {
        let key = validate_key(test_result_id)?;
        let conn = self.state.open_db()?;
        let now = Utc::now().naive_utc();

        if let Some(record) = repo::find_by_test_result(&conn, key)? {
            let fresh = !record.is_stale(now);

            if fresh && record.processing_status == ProcessingStatus::Completed {
                tracing::debug!(key, "Insight cache hit");
                return Ok(FetchOutcome {
                    record,
                    cached: true,
                });
            }

            // Work already in flight: report the miss without re-triggering.
            if fresh
                && matches!(
                    record.processing_status,
                    ProcessingStatus::Pending | ProcessingStatus::Processing
                )
            {
                tracing::debug!(key, "Analysis already in flight");
                return Ok(FetchOutcome {
                    record,
                    cached: false,
                });
            }

            // Failed, stale completed, or orphaned in-flight record (the
            // process that started it is gone): relaunch.
            tracing::info!(key, status = record.processing_status.as_str(), "Insight cache miss, relaunching analysis");
            let _ = self.spawn_analysis(key.to_string(), AnalysisContext::default());
            return Ok(FetchOutcome {
                record,
                cached: false,
            });
        }

        let record = repo::upsert_pending(&conn, key)?;
        tracing::info!(key, "Insight analysis initiated");
        let _ = self.spawn_analysis(key.to_string(), AnalysisContext::default());
        Ok(FetchOutcome {
            record,
            cached: false,
        })
    }

    /// Unconditionally re-arm the record to `pending`, clear the last
    /// error, and launch a computation with the supplied context.
    pub fn force_refresh(
        &self,
        test_result_id: &str,
        context: AnalysisContext,
    ) -> Result<InsightRecord, OrchestratorError> {
        let key = validate_key(test_result_id)?;
        let conn = self.state.open_db()?;

        let record = repo::reset_pending(&conn, key)?;
        tracing::info!(key, "Forced insight refresh");
        let _ = self.spawn_analysis(key.to_string(), context);
        Ok(record)
    }

    pub fn status(&self, test_result_id: &str) -> Result<StatusView, OrchestratorError> {
        let key = validate_key(test_result_id)?;
        let conn = self.state.open_db()?;

        let record = repo::find_by_test_result(&conn, key)?
            .ok_or_else(|| OrchestratorError::NotFound(key.to_string()))?;
        Ok(StatusView {
            status: record.processing_status,
            error: record.processing_error,
            updated_at: record.updated_at,
        })
    }

    pub fn delete(&self, test_result_id: &str) -> Result<(), OrchestratorError> {
        let key = validate_key(test_result_id)?;
        let conn = self.state.open_db()?;

        if repo::delete_insight(&conn, key)? {
            tracing::info!(key, "Insight record deleted");
            Ok(())
        } else {
            Err(OrchestratorError::NotFound(key.to_string()))
        }
    }

    /// Detached background computation. The caller never awaits it; the
    /// handle is returned only so tests can observe the spawn.
    fn spawn_analysis(&self, key: String, context: AnalysisContext) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let client = Arc::clone(&self.client);
        std::thread::spawn(move || {
            if let Err(e) = run_analysis(&state, client.as_ref(), &key, &context) {
                tracing::error!(key = %key, error = %e, "Background analysis task aborted");
            }
        })
    }
}

/// One full background computation: mark `processing`, call the engine,
/// write the terminal state. Engine failures (including timeout) are
/// absorbed into the record, never propagated.
fn run_analysis(
    state: &CoreState,
    client: &dyn AnalysisClient,
    key: &str,
    context: &AnalysisContext,
) -> Result<(), OrchestratorError> {
    let started = Instant::now();
    let conn = state.open_db()?;

    if repo::mark_processing(&conn, key)? == 0 {
        // Record deleted between trigger and start; do not resurrect it.
        tracing::debug!(key, "Record gone before analysis started, skipping");
        return Ok(());
    }

    let request = AnalysisRequest::new(key, context);
    match client.analyze(&request) {
        Ok(result) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            repo::mark_completed(&conn, key, &result, elapsed_ms)?;
            tracing::info!(key, elapsed_ms, "Insight analysis completed");
        }
        Err(e) => {
            repo::mark_failed(&conn, key, &e.to_string())?;
            tracing::warn!(key, error = %e, "Insight analysis failed");
        }
    }
    Ok(())
}

fn validate_key(test_result_id: &str) -> Result<&str, OrchestratorError> {
    let key = test_result_id.trim();
    if key.is_empty() {
        return Err(OrchestratorError::MissingKey);
    }
    Ok(key)
}
