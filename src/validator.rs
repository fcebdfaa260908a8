//! Validation and normalization of raw form values.
//!
//! Every feature in the schema is checked, in schema order, so a caller sees
//! all failures of a request at once. Each feature fails for at most one
//! reason, tested in this order: missing, wrong type, out of range.

use crate::schema::{FeatureDomain, FeatureKind, FeatureSchema};
use crate::types::request::RawRequest;
use std::fmt;

/// Why a single feature was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value absent or empty
    Missing { feature: String },
    /// Value is not a finite number
    InvalidValue { feature: String, raw: String },
    /// Binary feature truncated to something other than 0 or 1
    NotBinary { feature: String, raw: String },
    /// Coerced value outside the declared inclusive range
    OutOfRange {
        feature: String,
        min: f64,
        max: f64,
        raw: String,
    },
}

impl ValidationError {
    /// Name of the rejected feature
    pub fn feature(&self) -> &str {
        match self {
            Self::Missing { feature }
            | Self::InvalidValue { feature, .. }
            | Self::NotBinary { feature, .. }
            | Self::OutOfRange { feature, .. } => feature,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { feature } => write!(f, "Missing value for {feature}"),
            Self::InvalidValue { feature, raw } => {
                write!(f, "Invalid value for {feature}: {raw}")
            }
            Self::NotBinary { feature, raw } => {
                write!(f, "{feature} must be 0 or 1, got {raw}")
            }
            Self::OutOfRange {
                feature,
                min,
                max,
                raw,
            } => write!(f, "{feature} must be between {min} and {max}, got {raw}"),
        }
    }
}

/// Result of validating one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// One coerced value per feature, in schema order
    Valid(Vec<f64>),
    /// One error per failing feature, in schema order
    Invalid(Vec<ValidationError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> Result<Vec<f64>, Vec<ValidationError>> {
        match self {
            Self::Valid(vector) => Ok(vector),
            Self::Invalid(errors) => Err(errors),
        }
    }

    /// Human-readable error messages; empty when valid
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Valid(_) => Vec::new(),
            Self::Invalid(errors) => errors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Validate a raw request against the schema.
pub fn validate(raw: &RawRequest, schema: &FeatureSchema) -> ValidationOutcome {
    let mut vector = Vec::with_capacity(schema.feature_count());
    let mut errors = Vec::new();

    for (name, domain) in schema.features() {
        match check_feature(name, domain, raw.get(name)) {
            Ok(value) => vector.push(value),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        ValidationOutcome::Valid(vector)
    } else {
        ValidationOutcome::Invalid(errors)
    }
}

fn check_feature(
    name: &str,
    domain: &FeatureDomain,
    raw: Option<&str>,
) -> Result<f64, ValidationError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return Err(ValidationError::Missing {
                feature: name.to_string(),
            })
        }
    };

    let parsed = parse_number(raw).ok_or_else(|| ValidationError::InvalidValue {
        feature: name.to_string(),
        raw: raw.to_string(),
    })?;

    let value = match domain.kind {
        FeatureKind::Continuous => parsed,
        FeatureKind::Binary => match parsed.trunc() {
            // trunc maps (-1, 0) to -0.0
            v if v == 0.0 => 0.0,
            v if v == 1.0 => 1.0,
            _ => {
                return Err(ValidationError::NotBinary {
                    feature: name.to_string(),
                    raw: raw.to_string(),
                })
            }
        },
    };

    if let Some(range) = domain.range {
        if !range.contains(value) {
            return Err(ValidationError::OutOfRange {
                feature: name.to_string(),
                min: range.min,
                max: range.max,
                raw: raw.to_string(),
            });
        }
    }

    Ok(value)
}

/// Parse a finite floating-point number, ignoring surrounding whitespace.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
