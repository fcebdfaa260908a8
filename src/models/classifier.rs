//! Classifier seam between the inference adapter and model backends

use crate::error::InferenceError;

/// A trained multi-class classifier.
///
/// Implementations receive an already scaled feature vector and return one
/// probability per class, in the label decoder's class order.
pub trait Classifier: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Number of input features, when the model records it
    fn feature_count(&self) -> Option<usize>;

    /// Number of classes the model scores
    fn class_count(&self) -> usize;

    /// Class probability distribution for one sample
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;
}
