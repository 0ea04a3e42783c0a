//! In-process HTTP tests for the predictor router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{config_in, spread_grade, students_csv};
use student_pass_predictor::api::{self, MODEL_NOT_LOADED};
use student_pass_predictor::{trainer, ArtifactPaths, PredictorContext};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Train into a fresh temp dir and build a router over the loaded artifacts.
fn trained_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path(), &students_csv(200, spread_grade));
    trainer::run(&cfg).unwrap();
    let ctx = PredictorContext::load(&ArtifactPaths::from_config(&cfg));
    assert!(ctx.is_ready());
    (dir, api::router(Arc::new(ctx)))
}

fn unready_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PredictorContext::load(&ArtifactPaths::in_dir(dir.path()));
    (dir, api::router(Arc::new(ctx)))
}

async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn json_body(v: Value) -> Body {
    Body::from(serde_json::to_vec(&v).unwrap())
}

fn assert_percent(s: &str) {
    let number = s.strip_suffix('%').expect("percent sign");
    let (_, decimals) = number.split_once('.').expect("decimal point");
    assert_eq!(decimals.len(), 2, "{s}");
    let v: f64 = number.parse().unwrap();
    assert!((50.0..=100.0).contains(&v), "{s}");
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn high_grade_record_passes() {
    let (_dir, app) = trained_app();
    let (status, body) = post_predict(
        app,
        json_body(json!({"PreviousGrade": 95, "AttendanceRate": 90, "StudyHoursPerWeek": 20})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Pass");
    assert_percent(body["confidence"].as_str().unwrap());
}

#[tokio::test]
async fn low_grade_record_fails() {
    let (_dir, app) = trained_app();
    let (status, body) = post_predict(app, json_body(json!({"PreviousGrade": "12", "Gender": "female"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Fail");
}

#[tokio::test]
async fn default_record_is_stable() {
    let (_dir, app) = trained_app();
    let (s1, first) = post_predict(app.clone(), json_body(json!({}))).await;
    let (s2, second) = post_predict(
        app,
        json_body(json!({
            "AttendanceRate": 80,
            "StudyHoursPerWeek": 15,
            "PreviousGrade": 70,
            "Gender": "other",
            "ExtracurricularActivities": "no",
            "ParentalSupport": "medium",
            "Online Classes Taken": 0
        })),
    )
    .await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(first, second);
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let (_dir, app) = trained_app();
    let (status, body) = post_predict(app, "{\"PreviousGrade\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn non_object_body_is_a_client_error() {
    let (_dir, app) = trained_app();
    let (status, body) = post_predict(app, json_body(json!([1, 2, 3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unready_service_reports_model_not_loaded() {
    let (_dir, app) = unready_app();
    let (status, body) = post_predict(app, json_body(json!({"PreviousGrade": 95}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": MODEL_NOT_LOADED}));
}

#[tokio::test]
async fn unready_check_precedes_body_parsing() {
    let (_dir, app) = unready_app();
    let (status, body) = post_predict(app, "garbage").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], MODEL_NOT_LOADED);
}

#[tokio::test]
async fn health_reflects_state() {
    async fn health(app: Router) -> Value {
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    let (_dir, app) = unready_app();
    assert_eq!(health(app).await, json!({"status": "unready"}));
    let (_dir, app) = trained_app();
    assert_eq!(health(app).await, json!({"status": "ready"}));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (_dir, app) = trained_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("origin", "http://example.com")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
