//! Label decoder mapping class indices to class names

use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bidirectional mapping between class index and class name.
///
/// The class order is the one the classifier was trained with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderParams")]
pub struct LabelDecoder {
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct EncoderParams {
    classes: Vec<String>,
}

impl TryFrom<EncoderParams> for LabelDecoder {
    type Error = ArtifactError;

    fn try_from(params: EncoderParams) -> Result<Self, Self::Error> {
        Self::new(params.classes)
    }
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.len() < 2 {
            return Err(ArtifactError::invalid(
                "label encoder",
                "at least two classes are required",
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactError::invalid(
                "label encoder",
                format!("duplicate class {dup}"),
            ));
        }

        Ok(Self { classes })
    }

    /// Class names in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class name for an index
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Index for a class name
    pub fn encode(&self, class: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == class)
    }
}
