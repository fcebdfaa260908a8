//! ONNX Runtime classifier backend (cargo feature `onnx`)

use crate::error::{ArtifactError, InferenceError};
use crate::models::classifier::Classifier;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier exported to ONNX (e.g. via skl2onnx).
pub struct OnnxClassifier {
    /// ONNX Runtime session; running it needs exclusive access
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for probabilities
    output_name: String,
    n_classes: usize,
}

fn onnx_error(e: ort::Error) -> ArtifactError {
    ArtifactError::invalid("onnx model", e.to_string())
}

fn run_error(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::Classifier(e.to_string())
}

impl OnnxClassifier {
    /// Load an ONNX model scoring `n_classes` classes
    pub fn load<P: AsRef<Path>>(
        path: P,
        n_classes: usize,
        threads: usize,
    ) -> Result<Self, ArtifactError> {
        let path = path.as_ref();

        ort::init().commit().map_err(onnx_error)?;
        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(onnx_error)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output_probability".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_classes,
        })
    }

    /// Extract the class distribution from model outputs.
    ///
    /// Handles tensor outputs and the `seq(map(int64, float))` outputs that
    /// scikit-learn converters emit for classifiers.
    fn extract_distribution(&self, outputs: &SessionOutputs) -> Result<Vec<f64>, InferenceError> {
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| run_error(format!("missing output {}", self.output_name)))?;

        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            let proba: Vec<f64> = data.iter().take(self.n_classes).map(|&p| p as f64).collect();
            debug!(proba = ?proba, "Extracted from tensor");
            return Ok(proba);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(run_error("unsupported probability output type"))
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<Vec<f64>, InferenceError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(run_error)?;
        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(run_error)?;
        let first = maps.first().ok_or_else(|| run_error("empty sequence"))?;
        let pairs = first.try_extract_key_values::<i64, f32>().map_err(run_error)?;

        let mut proba = vec![0.0; self.n_classes];
        for (class_id, p) in pairs {
            let idx = usize::try_from(class_id)
                .ok()
                .filter(|&i| i < self.n_classes)
                .ok_or(InferenceError::UnknownClass(class_id.max(0) as usize))?;
            proba[idx] = p as f64;
        }
        Ok(proba)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn feature_count(&self) -> Option<usize> {
        None
    }

    fn class_count(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&x| x as f32).collect();
        let input = Tensor::from_array((shape, data)).map_err(run_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| run_error(format!("Lock error: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(run_error)?;

        self.extract_distribution(&outputs)
    }
}
