//! Fitted per-feature standardization

use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

/// Standard scaler fitted on the training data: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParams")]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// On-disk representation, checked before use.
#[derive(Deserialize)]
struct ScalerParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<ScalerParams> for StandardScaler {
    type Error = ArtifactError;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        Self::new(params.mean, params.scale)
    }
}

impl StandardScaler {
    /// Create a scaler from fitted parameters.
    ///
    /// A zero scale (constant training column) is replaced by 1.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        if mean.len() != scale.len() {
            return Err(ArtifactError::invalid(
                "scaler",
                format!(
                    "mean has {} entries but scale has {}",
                    mean.len(),
                    scale.len()
                ),
            ));
        }
        if mean.iter().chain(&scale).any(|v| !v.is_finite()) {
            return Err(ArtifactError::invalid("scaler", "non-finite parameter"));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on
    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one sample; the caller guarantees the length.
    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        debug_assert_eq!(features.len(), self.feature_count());
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }
}
