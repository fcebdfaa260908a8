//! Inference adapter: scale, classify, decode

use crate::error::{ArtifactError, InferenceError};
use crate::models::classifier::Classifier;
use crate::models::encoder::LabelDecoder;
use crate::models::scaler::StandardScaler;
use crate::types::prediction::{ClassProbability, PredictionResult};
use tracing::debug;

/// Tolerance for classifier outputs that should already sum to one
const SUM_TOLERANCE: f64 = 1e-3;

/// Runs the trained classifier on validated feature vectors.
///
/// Holds no mutable state; a single engine serves all requests.
pub struct InferenceEngine {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
    decoder: LabelDecoder,
}

impl InferenceEngine {
    /// Create an engine, checking that the artifacts agree on shape
    pub fn new(
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
        decoder: LabelDecoder,
    ) -> Result<Self, ArtifactError> {
        if let Some(n) = classifier.feature_count() {
            if n != scaler.feature_count() {
                return Err(ArtifactError::invalid(
                    "model",
                    format!(
                        "classifier expects {n} features, scaler was fitted on {}",
                        scaler.feature_count()
                    ),
                ));
            }
        }
        if classifier.class_count() != decoder.class_count() {
            return Err(ArtifactError::invalid(
                "model",
                format!(
                    "classifier scores {} classes, encoder knows {}",
                    classifier.class_count(),
                    decoder.class_count()
                ),
            ));
        }

        Ok(Self {
            scaler,
            classifier,
            decoder,
        })
    }

    /// Number of features expected in every vector
    pub fn feature_count(&self) -> usize {
        self.scaler.feature_count()
    }

    /// Known class names, in decoder order
    pub fn classes(&self) -> &[String] {
        self.decoder.classes()
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify one validated feature vector.
    ///
    /// A mis-sized vector is a caller error; vectors must come from a
    /// successful validation against the same schema.
    pub fn infer(&self, vector: &[f64]) -> Result<PredictionResult, InferenceError> {
        if vector.len() != self.feature_count() {
            return Err(InferenceError::FeatureCountMismatch {
                expected: self.feature_count(),
                got: vector.len(),
            });
        }

        let scaled = self.scaler.transform(vector);
        let raw = self.classifier.predict_proba(&scaled)?;
        let proba = normalize(raw, self.decoder.class_count())?;

        let class_index = argmax(&proba).ok_or(InferenceError::InvalidDistribution)?;
        let label = self
            .decoder
            .decode(class_index)
            .ok_or(InferenceError::UnknownClass(class_index))?
            .to_string();

        debug!(
            classifier = self.classifier.name(),
            label = %label,
            probabilities = ?proba,
            "Inference complete"
        );

        let probabilities = self
            .decoder
            .classes()
            .iter()
            .zip(proba)
            .map(|(class, probability)| ClassProbability {
                class: class.clone(),
                probability,
            })
            .collect();

        Ok(PredictionResult {
            label,
            class_index,
            probabilities,
        })
    }
}

/// Check a classifier distribution and rescale it to sum to exactly one.
fn normalize(proba: Vec<f64>, n_classes: usize) -> Result<Vec<f64>, InferenceError> {
    if proba.len() != n_classes {
        return Err(InferenceError::ClassCountMismatch {
            expected: n_classes,
            got: proba.len(),
        });
    }
    if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(InferenceError::InvalidDistribution);
    }

    let total: f64 = proba.iter().sum();
    if (total - 1.0).abs() > SUM_TOLERANCE {
        return Err(InferenceError::InvalidDistribution);
    }

    Ok(proba.into_iter().map(|p| p / total).collect())
}

/// Index of the largest value; the lowest index wins ties.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classifier returning a fixed distribution
    struct FixedClassifier {
        proba: Vec<f64>,
        n_features: Option<usize>,
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn feature_count(&self) -> Option<usize> {
            self.n_features
        }

        fn class_count(&self) -> usize {
            self.proba.len()
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(self.proba.clone())
        }
    }

    /// Echoes the scaled input as the distribution
    struct EchoClassifier;

    impl Classifier for EchoClassifier {
        fn name(&self) -> &str {
            "echo"
        }

        fn feature_count(&self) -> Option<usize> {
            None
        }

        fn class_count(&self) -> usize {
            2
        }

        fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(features.to_vec())
        }
    }

    fn decoder(classes: &[&str]) -> LabelDecoder {
        LabelDecoder::new(classes.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    fn engine(proba: Vec<f64>) -> InferenceEngine {
        let classes = ["Average", "Excellent", "Good", "Poor"];
        InferenceEngine::new(
            StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap(),
            Box::new(FixedClassifier {
                proba,
                n_features: Some(2),
            }),
            decoder(&classes),
        )
        .unwrap()
    }

    #[test]
    fn test_infer_decodes_most_probable_class() {
        let result = engine(vec![0.1, 0.2, 0.6, 0.1]).infer(&[1.0, 2.0]).unwrap();
        assert_eq!(result.label, "Good");
        assert_eq!(result.class_index, 2);
        assert!((result.probability("Poor").unwrap() - 0.1).abs() < 1e-12);
        let classes: Vec<&str> = result
            .probabilities
            .iter()
            .map(|p| p.class.as_str())
            .collect();
        assert_eq!(classes, vec!["Average", "Excellent", "Good", "Poor"]);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let result = engine(vec![0.1, 0.4, 0.4, 0.1]).infer(&[0.0, 0.0]).unwrap();
        assert_eq!(result.label, "Excellent");
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let result = engine(vec![0.2, 0.2, 0.2, 0.4000001])
            .infer(&[0.0, 0.0])
            .unwrap();
        let total: f64 = result.probabilities.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(result
            .probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.probability)));
    }

    #[test]
    fn test_mis_sized_vector_is_precondition_error() {
        assert_eq!(
            engine(vec![0.25; 4]).infer(&[1.0]).unwrap_err(),
            InferenceError::FeatureCountMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_vector_is_scaled_before_classification() {
        let engine = InferenceEngine::new(
            StandardScaler::new(vec![10.0, 10.0], vec![10.0, 20.0]).unwrap(),
            Box::new(EchoClassifier),
            decoder(&["Average", "Good"]),
        )
        .unwrap();

        // (12 - 10) / 10 = 0.2, (26 - 10) / 20 = 0.8
        let result = engine.infer(&[12.0, 26.0]).unwrap();
        assert_eq!(result.label, "Good");
        assert!((result.probability("Good").unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_distributions() {
        assert_eq!(
            engine(vec![0.5, 0.5, f64::NAN, 0.0]).infer(&[0.0, 0.0]),
            Err(InferenceError::InvalidDistribution)
        );
        assert_eq!(
            engine(vec![0.9, 0.9, 0.0, 0.0]).infer(&[0.0, 0.0]),
            Err(InferenceError::InvalidDistribution)
        );
        assert_eq!(
            normalize(vec![1.0], 2),
            Err(InferenceError::ClassCountMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_artifact_shapes_must_agree() {
        let mismatched_classes = InferenceEngine::new(
            StandardScaler::new(vec![0.0], vec![1.0]).unwrap(),
            Box::new(FixedClassifier {
                proba: vec![0.5, 0.5],
                n_features: None,
            }),
            decoder(&["Average", "Good", "Poor"]),
        );
        assert!(mismatched_classes.is_err());

        let mismatched_features = InferenceEngine::new(
            StandardScaler::new(vec![0.0], vec![1.0]).unwrap(),
            Box::new(FixedClassifier {
                proba: vec![0.5, 0.5],
                n_features: Some(3),
            }),
            decoder(&["Average", "Good"]),
        );
        assert!(mismatched_features.is_err());
    }
}
