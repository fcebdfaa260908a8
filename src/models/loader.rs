//! Loader for the pre-built model artifacts

use crate::config::ArtifactsConfig;
use crate::error::ArtifactError;
use crate::metadata::ClassMetadata;
use crate::models::classifier::Classifier;
use crate::models::encoder::LabelDecoder;
use crate::models::forest::RandomForest;
use crate::models::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Everything the training job hands over to the service.
pub struct Artifacts {
    /// Canonical feature order
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub decoder: LabelDecoder,
    pub classifier: Box<dyn Classifier>,
    pub class_metadata: ClassMetadata,
}

/// Loader for model artifacts in a directory
pub struct ArtifactLoader {
    config: ArtifactsConfig,
}

impl ArtifactLoader {
    pub fn new(config: ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Paths of all five artifacts, as `(name, path)`
    pub fn artifact_paths(&self) -> [(&'static str, PathBuf); 5] {
        [
            ("model", self.config.model_path()),
            ("scaler", self.config.scaler_path()),
            ("encoder", self.config.encoder_path()),
            ("feature_names", self.config.feature_names_path()),
            ("class_metadata", self.config.class_metadata_path()),
        ]
    }

    /// Load every artifact. There is no partial mode: any missing or
    /// malformed artifact fails the whole load.
    pub fn load_all(&self) -> Result<Artifacts, ArtifactError> {
        info!(dir = %self.config.dir.display(), "Loading model artifacts");

        let mut first_missing = None;
        for (name, path) in self.artifact_paths() {
            if !path.exists() {
                error!(artifact = name, path = %path.display(), "Artifact file not found");
                first_missing.get_or_insert(path);
            }
        }
        if let Some(path) = first_missing {
            return Err(ArtifactError::Missing(path));
        }

        let feature_names: Vec<String> = read_json(&self.config.feature_names_path())?;
        if feature_names.is_empty() {
            return Err(ArtifactError::invalid("feature names", "list is empty"));
        }

        let scaler: StandardScaler = read_json(&self.config.scaler_path())?;
        if scaler.feature_count() != feature_names.len() {
            return Err(ArtifactError::invalid(
                "scaler",
                format!(
                    "fitted on {} features, feature list has {}",
                    scaler.feature_count(),
                    feature_names.len()
                ),
            ));
        }

        let decoder: LabelDecoder = read_json(&self.config.encoder_path())?;
        let classifier = self.load_classifier(decoder.class_count())?;
        let class_metadata: ClassMetadata = read_json(&self.config.class_metadata_path())?;

        info!(
            features = feature_names.len(),
            classes = ?decoder.classes(),
            classifier = classifier.name(),
            "Model artifacts loaded successfully"
        );

        Ok(Artifacts {
            feature_names,
            scaler,
            decoder,
            classifier,
            class_metadata,
        })
    }

    fn load_classifier(&self, n_classes: usize) -> Result<Box<dyn Classifier>, ArtifactError> {
        let path = self.config.model_path();
        let is_onnx = path.extension().is_some_and(|ext| ext == "onnx");

        if is_onnx {
            return self.load_onnx(&path, n_classes);
        }

        let forest: RandomForest = read_json(&path)?;
        info!(
            path = %path.display(),
            trees = forest.tree_count(),
            "Random forest loaded"
        );
        Ok(Box::new(forest))
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path, n_classes: usize) -> Result<Box<dyn Classifier>, ArtifactError> {
        let model =
            crate::models::onnx::OnnxClassifier::load(path, n_classes, self.config.onnx_threads)?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: &Path, _n_classes: usize) -> Result<Box<dyn Classifier>, ArtifactError> {
        Err(ArtifactError::invalid(
            "model",
            format!(
                "{} is an ONNX model but the service was built without the `onnx` feature",
                path.display()
            ),
        ))
    }
}

/// Read and deserialize a JSON artifact
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
