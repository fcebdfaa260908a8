//! Model artifacts and the inference adapter

pub mod classifier;
pub mod encoder;
pub mod forest;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;

pub use classifier::Classifier;
pub use encoder::LabelDecoder;
pub use forest::RandomForest;
pub use inference::InferenceEngine;
pub use loader::{ArtifactLoader, Artifacts};
pub use scaler::StandardScaler;
