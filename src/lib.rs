//! Student Performance Predictor Library
//!
//! Validates untrusted form input against a declared feature schema and
//! classifies students into GPA categories with a pre-trained model.

pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod server;
pub mod types;
pub mod validator;

pub use config::AppConfig;
pub use context::PredictorContext;
pub use models::inference::InferenceEngine;
pub use schema::FeatureSchema;
pub use types::{prediction::PredictionResult, request::RawRequest};
pub use validator::{validate, ValidationOutcome};
