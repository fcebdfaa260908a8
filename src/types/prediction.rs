//! Prediction results and the JSON bodies returned to callers

use crate::schema::{FeatureKind, FeatureSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Probability assigned to a single class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f64,
}

/// Classification of one validated feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class name
    pub label: String,

    /// Index of the predicted class in the decoder's ordering
    pub class_index: usize,

    /// Per-class probabilities in the decoder's class order
    pub probabilities: Vec<ClassProbability>,
}

impl PredictionResult {
    /// Probability of a class by name
    pub fn probability(&self, class: &str) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|p| p.class == class)
            .map(|p| p.probability)
    }

    /// Probabilities rendered as percentages with one decimal (`"45.7%"`)
    pub fn formatted_probabilities(&self) -> Map<String, Value> {
        self.probabilities
            .iter()
            .map(|p| (p.class.clone(), json!(format_percent(p.probability))))
            .collect()
    }
}

fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Body of a successful `/predict` response.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub probabilities: Map<String, Value>,
    pub features_used: Map<String, Value>,
    pub valid_ranges: Map<String, Value>,
}

impl PredictionResponse {
    /// Assemble the response for a validated vector and its prediction.
    ///
    /// Binary features are reported as integers, continuous ones as floats.
    pub fn new(schema: &FeatureSchema, vector: &[f64], result: &PredictionResult) -> Self {
        let features_used = schema
            .features()
            .zip(vector.iter().copied())
            .map(|((name, domain), value)| {
                let value = match domain.kind {
                    FeatureKind::Binary => json!(value as i64),
                    FeatureKind::Continuous => json!(value),
                };
                (name.to_string(), value)
            })
            .collect();

        Self {
            prediction: result.label.clone(),
            probabilities: result.formatted_probabilities(),
            features_used,
            valid_ranges: schema.ranges_json(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Error carrying one message per failing feature
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}
