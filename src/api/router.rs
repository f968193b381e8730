//! Insight API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Authentication is handled upstream;
//! this service receives already-authenticated requests carrying a
//! `test_result_id` path segment.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the insight API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn insights_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/insights/:test_result_id",
            get(endpoints::insights::fetch).delete(endpoints::insights::remove),
        )
        .route(
            "/insights/:test_result_id/analyze",
            post(endpoints::insights::analyze),
        )
        .route(
            "/insights/:test_result_id/status",
            get(endpoints::insights::status),
        )
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_state::CoreState;
    use crate::pipeline::analysis::client::MockAnalysisClient;
    use crate::pipeline::analysis::types::AnalysisResult;
    use crate::pipeline::InsightOrchestrator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router(mock: Arc<MockAnalysisClient>) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(CoreState::new(dir.path().join("insights.db")));
        let orch = Arc::new(InsightOrchestrator::new(state, mock));
        (insights_router(ApiContext::new(orch)), dir)
    }

    fn succeeding_mock() -> Arc<MockAnalysisClient> {
        Arc::new(MockAnalysisClient::succeeding(AnalysisResult {
            ai_summary: "All values within range.".into(),
            confidence: 0.9,
            ..Default::default()
        }))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn first_fetch_returns_202_pending() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(Request::get("/api/insights/T1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["cached"], false);
        assert_eq!(json["data"]["testResultId"], "T1");
        // May already be processing by the time the row is re-read
        let status = json["data"]["processingStatus"].as_str().unwrap();
        assert!(status == "pending" || status == "processing");
    }

    #[tokio::test]
    async fn completed_fetch_returns_200_cached() {
        let (router, _dir) = test_router(succeeding_mock());

        let response = router
            .clone()
            .oneshot(Request::get("/api/insights/T1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        // Poll the status endpoint until the mock engine finishes
        let mut completed = false;
        for _ in 0..200 {
            let response = router
                .clone()
                .oneshot(
                    Request::get("/api/insights/T1/status")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            let json = body_json(response).await;
            if json["status"] == "completed" {
                completed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(completed, "analysis never completed");

        let response = router
            .oneshot(Request::get("/api/insights/T1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["cached"], true);
        assert_eq!(json["data"]["aiSummary"], "All values within range.");
    }

    #[tokio::test]
    async fn analyze_returns_202_with_reset_record() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(
                Request::post("/api/insights/T2/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"attachmentUrl": "https://files.example/r.pdf", "testType": "blood"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["processingStatus"], "pending");
    }

    #[tokio::test]
    async fn analyze_accepts_empty_body() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(
                Request::post("/api/insights/T2/analyze")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn status_of_unknown_key_returns_404() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(
                Request::get("/api/insights/missing/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_unknown_returns_404_then_existing_returns_200() {
        let (router, _dir) = test_router(succeeding_mock());

        let response = router
            .clone()
            .oneshot(
                Request::delete("/api/insights/T4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        router
            .clone()
            .oneshot(Request::get("/api/insights/T4").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(
                Request::delete("/api/insights/T4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Status after delete is a 404 again
        let response = router
            .oneshot(
                Request::get("/api/insights/T4/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_key_returns_400() {
        let (router, _dir) = test_router(succeeding_mock());
        let response = router
            .oneshot(
                Request::get("/api/insights/%20%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }
}
