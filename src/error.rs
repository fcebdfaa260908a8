//! Error types for the prediction service.
//!
//! Validation failures are not errors in this sense: they are collected as
//! data by [`crate::validator`] and only wrapped here once a request is
//! rejected as a whole.

use crate::validator::ValidationError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the declared feature schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("feature list is empty")]
    Empty,

    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("domain declared for unknown feature: {0}")]
    UnknownFeature(String),

    #[error("range for {0} must declare both min and max")]
    IncompleteRange(String),

    #[error("invalid range for {feature}: min {min} exceeds max {max}")]
    InvertedRange { feature: String, min: f64, max: f64 },
}

/// Failures while loading or checking a model artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {artifact}: {reason}")]
    Invalid { artifact: String, reason: String },
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures while running inference on an already validated vector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature vector has {got} values, expected {expected}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("classifier returned {got} probabilities for {expected} classes")]
    ClassCountMismatch { expected: usize, got: usize },

    #[error("classifier returned an invalid probability distribution")]
    InvalidDistribution,

    #[error("class index {0} has no label")]
    UnknownClass(usize),

    #[error("classifier failed: {0}")]
    Classifier(String),
}

/// Failures while computing statistics over the training dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Outcome of a rejected prediction request.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Validation failed")]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
