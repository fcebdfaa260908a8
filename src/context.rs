//! Immutable prediction context shared by all requests

use crate::config::AppConfig;
use crate::dataset::{dataset_stats, FeatureStats};
use crate::error::{ArtifactError, DatasetError, PredictError};
use crate::metadata::ClassMetadata;
use crate::models::inference::InferenceEngine;
use crate::models::loader::{ArtifactLoader, Artifacts};
use crate::schema::{student_sample, FeatureSchema};
use crate::types::prediction::PredictionResult;
use crate::types::request::RawRequest;
use crate::validator::validate;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

/// A validated vector together with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Coerced feature values in schema order
    pub features: Vec<f64>,
    pub result: PredictionResult,
}

/// Schema, model and metadata, loaded once at startup.
pub struct PredictorContext {
    schema: FeatureSchema,
    engine: InferenceEngine,
    class_metadata: ClassMetadata,
    dataset_path: PathBuf,
}

impl PredictorContext {
    /// Assemble a context; the schema and the engine must agree on the
    /// number of features.
    pub fn new(
        schema: FeatureSchema,
        engine: InferenceEngine,
        class_metadata: ClassMetadata,
        dataset_path: PathBuf,
    ) -> Result<Self, ArtifactError> {
        if schema.feature_count() != engine.feature_count() {
            return Err(ArtifactError::invalid(
                "model",
                format!(
                    "schema has {} features, model expects {}",
                    schema.feature_count(),
                    engine.feature_count()
                ),
            ));
        }

        Ok(Self {
            schema,
            engine,
            class_metadata,
            dataset_path,
        })
    }

    /// Load all artifacts named by the configuration.
    ///
    /// Any failure here is fatal for the service.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let Artifacts {
            feature_names,
            scaler,
            decoder,
            classifier,
            class_metadata,
        } = ArtifactLoader::new(config.artifacts.clone())
            .load_all()
            .context("Failed to load model artifacts (run the training job first)")?;

        let schema = FeatureSchema::from_config(feature_names, &config.features)
            .context("Feature declarations do not match the trained feature list")?;
        let engine = InferenceEngine::new(scaler, classifier, decoder)
            .context("Model artifacts are inconsistent")?;

        let context = Self::new(
            schema,
            engine,
            class_metadata,
            config.dataset.path.clone(),
        )?;

        info!(
            features = context.schema.feature_count(),
            classes = ?context.classes(),
            "Predictor context initialized"
        );
        Ok(context)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Known class names
    pub fn classes(&self) -> &[String] {
        self.engine.classes()
    }

    /// GPA metadata for the known classes, in class order
    pub fn gpa_info(&self) -> Map<String, Value> {
        self.class_metadata.for_classes(self.classes())
    }

    /// Declared feature ranges
    pub fn valid_ranges(&self) -> Map<String, Value> {
        self.schema.ranges_json()
    }

    /// Canned example request, restricted to the schema's features
    pub fn sample_request(&self) -> Map<String, Value> {
        let mut sample = student_sample();
        sample.retain(|name, _| self.schema.feature_domain(name).is_some());
        sample
    }

    /// Descriptive statistics of the training dataset, read from disk
    pub fn dataset_stats(&self) -> Result<Vec<(String, FeatureStats)>, DatasetError> {
        dataset_stats(&self.dataset_path, self.schema.feature_names())
    }

    /// Validate a raw request and classify it.
    pub fn predict(&self, raw: &RawRequest) -> Result<Prediction, PredictError> {
        let features = validate(raw, &self.schema)
            .into_result()
            .map_err(PredictError::Validation)?;
        let result = self.engine.infer(&features)?;
        Ok(Prediction { features, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::encoder::LabelDecoder;
    use crate::models::forest::{DecisionTree, RandomForest, TreeNode};
    use crate::models::scaler::StandardScaler;
    use crate::schema::{FeatureDomain, ValueRange};

    fn context() -> PredictorContext {
        let schema = FeatureSchema::new(
            vec!["attendance_percentage".into(), "part_time_job".into()],
            [
                (
                    "attendance_percentage".to_string(),
                    FeatureDomain::continuous(Some(ValueRange::new(0.0, 100.0))),
                ),
                ("part_time_job".to_string(), FeatureDomain::binary()),
            ],
        )
        .unwrap();

        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    value: vec![3.0, 1.0],
                },
                TreeNode::Leaf {
                    value: vec![0.0, 4.0],
                },
            ],
        };
        let engine = InferenceEngine::new(
            StandardScaler::new(vec![50.0, 0.5], vec![25.0, 0.5]).unwrap(),
            Box::new(RandomForest::new(2, 2, vec![tree]).unwrap()),
            LabelDecoder::new(vec!["Average".into(), "Good".into()]).unwrap(),
        )
        .unwrap();

        PredictorContext::new(
            schema,
            engine,
            ClassMetadata::student_default(),
            PathBuf::from("absent.csv"),
        )
        .unwrap()
    }

    fn request(pairs: &[(&str, &str)]) -> RawRequest {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_predict_valid_request() {
        let prediction = context()
            .predict(&request(&[
                ("attendance_percentage", "78"),
                ("part_time_job", "0"),
            ]))
            .unwrap();

        assert_eq!(prediction.features, vec![78.0, 0.0]);
        assert_eq!(prediction.result.label, "Good");
        assert_eq!(prediction.result.probability("Good"), Some(1.0));
    }

    #[test]
    fn test_predict_low_attendance() {
        let prediction = context()
            .predict(&request(&[
                ("attendance_percentage", "20"),
                ("part_time_job", "1"),
            ]))
            .unwrap();
        assert_eq!(prediction.result.label, "Average");
        assert_eq!(prediction.result.probability("Average"), Some(0.75));
    }

    #[test]
    fn test_predict_collects_validation_errors() {
        let err = context()
            .predict(&request(&[
                ("attendance_percentage", "150"),
                ("part_time_job", "2"),
            ]))
            .unwrap_err();

        match err {
            PredictError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_introspection() {
        let context = context();
        let gpa: Vec<String> = context.gpa_info().keys().cloned().collect();
        assert_eq!(gpa, vec!["Average", "Good"]);

        let sample = context.sample_request();
        assert_eq!(sample.len(), 2);
        assert!(sample.contains_key("part_time_job"));

        assert_eq!(context.valid_ranges().len(), 2);
        assert!(context.dataset_stats().is_err());
    }

    #[test]
    fn test_schema_and_engine_must_agree() {
        let engine = context().engine;
        let schema = FeatureSchema::student();
        assert!(PredictorContext::new(
            schema,
            engine,
            ClassMetadata::default(),
            PathBuf::new()
        )
        .is_err());
    }
}
