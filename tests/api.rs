//! End-to-end tests of the HTTP API against artifacts on disk

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use student_performance::{
    config::{AppConfig, ArtifactsConfig, DatasetConfig},
    metrics::ServiceMetrics,
    schema::{FeatureDomainConfig, FeatureKind},
    server::{router, AppState},
    PredictorContext,
};
use tempfile::TempDir;
use tower::ServiceExt;

fn write_artifacts(dir: &Path) {
    fs::write(
        dir.join("feature_names.json"),
        r#"["attendance_percentage", "part_time_job"]"#,
    )
    .unwrap();
    fs::write(
        dir.join("scaler.json"),
        r#"{"mean": [50.0, 0.5], "scale": [25.0, 0.5]}"#,
    )
    .unwrap();
    fs::write(dir.join("encoder.json"), r#"{"classes": ["Average", "Good"]}"#).unwrap();
    fs::write(
        dir.join("model.json"),
        r#"{"n_features": 2, "n_classes": 2, "trees": [{"nodes": [
            {"type": "split", "feature": 0, "threshold": 0.0, "left": 1, "right": 2},
            {"type": "leaf", "value": [3.0, 1.0]},
            {"type": "leaf", "value": [0.0, 4.0]}
        ]}]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("class_metadata.json"),
        r##"{
            "Average": {"range": "2.0 - 3.0", "description": "Satisfactory performance", "color": "#f39c12"},
            "Good": {"range": "3.0 - 3.7", "description": "Above average performance", "color": "#27ae60"},
            "Poor": {"range": "0.0 - 2.0", "description": "Below average performance", "color": "#e74c3c"}
        }"##,
    )
    .unwrap();
    fs::write(
        dir.join("students.csv"),
        "attendance_percentage,part_time_job,final_gpa_category\n\
         90,0,Good\n\
         70,1,Average\n\
         80,0,Good\n",
    )
    .unwrap();
}

fn app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());

    let features = HashMap::from([
        (
            "attendance_percentage".to_string(),
            FeatureDomainConfig {
                kind: FeatureKind::Continuous,
                min: Some(0.0),
                max: Some(100.0),
                step: None,
            },
        ),
        (
            "part_time_job".to_string(),
            FeatureDomainConfig {
                kind: FeatureKind::Binary,
                min: Some(0.0),
                max: Some(1.0),
                step: None,
            },
        ),
    ]);
    let config = AppConfig {
        artifacts: ArtifactsConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        },
        dataset: DatasetConfig {
            path: dir.path().join("students.csv"),
        },
        features,
        ..Default::default()
    };

    let context = Arc::new(PredictorContext::load(&config).unwrap());
    let state = AppState::new(context, Arc::new(ServiceMetrics::new()));
    (router(state), dir)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_form(app: Router, form: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_predict_valid_form() {
    let (app, _dir) = app();
    let (status, body) = post_form(app, "attendance_percentage=78&part_time_job=0&name=x").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Good");
    assert_eq!(
        body["probabilities"],
        json!({"Average": "0.0%", "Good": "100.0%"})
    );
    assert_eq!(
        body["features_used"],
        json!({"attendance_percentage": 78.0, "part_time_job": 0})
    );
    assert_eq!(body["valid_ranges"]["attendance_percentage"]["max"], 100);
}

#[tokio::test]
async fn test_predict_reports_every_invalid_feature() {
    let (app, _dir) = app();
    let (status, body) = post_form(app, "attendance_percentage=150&part_time_job=2").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "error": "Validation failed",
            "details": [
                "attendance_percentage must be between 0 and 100, got 150",
                "part_time_job must be 0 or 1, got 2"
            ]
        })
    );
}

#[tokio::test]
async fn test_predict_repeated_field_uses_first_value() {
    let (app, _dir) = app();
    let (status, body) = post_form(
        app,
        "attendance_percentage=150&attendance_percentage=50&part_time_job=0",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        json!(["attendance_percentage must be between 0 and 100, got 150"])
    );
}

#[tokio::test]
async fn test_predict_without_form_reports_missing_values() {
    let (app, _dir) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        json!([
            "Missing value for attendance_percentage",
            "Missing value for part_time_job"
        ])
    );
}

#[tokio::test]
async fn test_schema_introspection() {
    let (app, _dir) = app();

    let (status, ranges) = get_json(app.clone(), "/ranges").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ranges,
        json!({
            "attendance_percentage": {"min": 0, "max": 100},
            "part_time_job": {"min": 0, "max": 1}
        })
    );

    let (_, classes) = get_json(app.clone(), "/classes").await;
    assert_eq!(classes, json!({"classes": ["Average", "Good"]}));

    let (_, gpa) = get_json(app.clone(), "/gpa_info").await;
    let known: Vec<&String> = gpa.as_object().unwrap().keys().collect();
    assert_eq!(known, vec!["Average", "Good"]);

    let (_, sample) = get_json(app.clone(), "/sample").await;
    assert_eq!(sample, json!({"attendance_percentage": 78, "part_time_job": 0}));

    let (_, index) = get_json(app, "/").await;
    assert_eq!(index["classes"], json!(["Average", "Good"]));
    assert!(index["ranges"].is_object());
    assert!(index["gpa_info"].is_object());
}

#[tokio::test]
async fn test_dataset_stats() {
    let (app, _dir) = app();
    let (status, stats) = get_json(app, "/dataset_stats").await;

    assert_eq!(status, StatusCode::OK);
    let attendance = &stats["attendance_percentage"];
    assert_eq!(attendance["min"], 70.0);
    assert_eq!(attendance["max"], 90.0);
    assert_eq!(attendance["mean"], 80.0);
    assert_eq!(attendance["median"], 80.0);
    assert_eq!(attendance["std"], 10.0);
}

#[tokio::test]
async fn test_dataset_stats_without_dataset() {
    let (app, dir) = app();
    fs::remove_file(dir.path().join("students.csv")).unwrap();

    let (status, body) = get_json(app, "/dataset_stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let (app, _dir) = app();
    post_form(app.clone(), "attendance_percentage=20&part_time_job=1").await;
    post_form(app.clone(), "attendance_percentage=abc&part_time_job=1").await;

    let (status, metrics) = get_json(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["predictions"], 1);
    assert_eq!(metrics["validation_failures"], 1);
    assert_eq!(metrics["predictions_by_class"]["Average"], 1);
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[test]
fn test_missing_artifacts_fail_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        artifacts: ArtifactsConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(PredictorContext::load(&config).is_err());
}
