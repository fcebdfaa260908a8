//! Request handlers

use super::AppState;
use crate::error::PredictError;
use crate::types::prediction::{ErrorResponse, PredictionResponse};
use crate::types::request::RawRequest;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Validate the submitted form and classify it.
pub async fn predict(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id);
    let start = Instant::now();

    span.in_scope(|| {
        let raw = match form {
            Ok(Form(pairs)) => pairs.into_iter().collect::<RawRequest>(),
            Err(rejection) => {
                warn!(error = %rejection, "Undecodable form, treating as empty");
                RawRequest::default()
            }
        };

        match state.context.predict(&raw) {
            Ok(prediction) => {
                let elapsed = start.elapsed();
                state
                    .metrics
                    .record_prediction(&prediction.result.label, elapsed);
                info!(
                    prediction = %prediction.result.label,
                    processing_time_us = elapsed.as_micros(),
                    "Prediction served"
                );

                let body = PredictionResponse::new(
                    state.context.schema(),
                    &prediction.features,
                    &prediction.result,
                );
                (StatusCode::OK, Json(body)).into_response()
            }
            Err(PredictError::Validation(errors)) => {
                state.metrics.record_validation_failure(start.elapsed());
                let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
                info!(failures = details.len(), "Request rejected by validation");

                let body = ErrorResponse::new("Validation failed").with_details(details);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Err(PredictError::Inference(e)) => {
                state.metrics.record_error();
                error!(error = %e, "Inference failed");
                internal_error(e.to_string())
            }
        }
    })
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

pub async fn ranges(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.context.valid_ranges())
}

pub async fn classes(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "classes": state.context.classes() }))
}

pub async fn gpa_info(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.context.gpa_info())
}

pub async fn sample(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.context.sample_request())
}

/// Descriptive statistics of the training dataset; the CSV is re-read on
/// every call.
pub async fn dataset_stats(State(state): State<AppState>) -> Response {
    let context = state.context.clone();
    let stats = match tokio::task::spawn_blocking(move || context.dataset_stats()).await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Dataset statistics task failed");
            return internal_error(e.to_string());
        }
    };

    match stats {
        Ok(stats) => {
            let body: Map<String, Value> = stats
                .into_iter()
                .map(|(name, s)| (name, json!(s)))
                .collect();
            Json(body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to compute dataset statistics");
            internal_error(e.to_string())
        }
    }
}

/// Overview of the service: classes, ranges and GPA metadata
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let context = &state.context;
    Json(json!({
        "classes": context.classes(),
        "ranges": context.valid_ranges(),
        "gpa_info": context.gpa_info(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.metrics.snapshot()))
}

pub async fn health() -> &'static str {
    "OK"
}
