//! Type definitions for the prediction pipeline

pub mod prediction;
pub mod request;

pub use prediction::{ClassProbability, PredictionResult};
pub use request::RawRequest;
