//! Feature schema: canonical column order and per-feature value domains.
//!
//! The column order comes from the training artifacts and must match the
//! order the classifier was fitted with. Domains (kind and optional range)
//! are declared separately and attached by name.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// How a raw value is coerced before range checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Any finite floating-point number
    #[default]
    Continuous,
    /// Truncated to an integer that must be 0 or 1
    Binary,
}

/// Inclusive numeric range with an optional input step for form display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Whether `value` lies within `[min, max]`, bounds included.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// JSON form with whole-number bounds written as integers
    /// (`{"min": 0, "max": 100, "step": 1}`).
    pub fn to_json(&self) -> Value {
        let mut range = Map::new();
        range.insert("min".into(), bound_json(self.min));
        range.insert("max".into(), bound_json(self.max));
        if let Some(step) = self.step {
            range.insert("step".into(), bound_json(step));
        }
        Value::Object(range)
    }
}

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn bound_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Declared domain of a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureDomain {
    pub kind: FeatureKind,
    /// `None` accepts any value of the feature's kind
    pub range: Option<ValueRange>,
}

impl FeatureDomain {
    pub fn continuous(range: Option<ValueRange>) -> Self {
        Self {
            kind: FeatureKind::Continuous,
            range,
        }
    }

    pub fn binary() -> Self {
        Self {
            kind: FeatureKind::Binary,
            range: Some(ValueRange::new(0.0, 1.0).with_step(1.0)),
        }
    }
}

/// Domain declaration as written in configuration files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureDomainConfig {
    #[serde(default)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

impl FeatureDomainConfig {
    fn into_domain(self, name: &str) -> Result<FeatureDomain, SchemaError> {
        let range = match (self.min, self.max) {
            (Some(min), Some(max)) => {
                if min > max {
                    return Err(SchemaError::InvertedRange {
                        feature: name.to_string(),
                        min,
                        max,
                    });
                }
                Some(ValueRange {
                    min,
                    max,
                    step: self.step,
                })
            }
            (None, None) => None,
            _ => return Err(SchemaError::IncompleteRange(name.to_string())),
        };

        Ok(FeatureDomain {
            kind: self.kind,
            range,
        })
    }
}

/// Ordered feature list with the domain of every feature.
///
/// Immutable once built; shared read-only by all requests.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    domains: Vec<FeatureDomain>,
}

impl FeatureSchema {
    /// Build a schema from the canonical feature order and a table of
    /// declared domains.
    ///
    /// Every declared name must appear in `feature_names`; features without a
    /// declaration are continuous and unbounded.
    pub fn new<I>(feature_names: Vec<String>, declared: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (String, FeatureDomain)>,
    {
        if feature_names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateFeature(name.clone()));
            }
        }

        let mut table: HashMap<String, FeatureDomain> = HashMap::new();
        for (name, domain) in declared {
            if !seen.contains(name.as_str()) {
                return Err(SchemaError::UnknownFeature(name));
            }
            if let Some(range) = domain.range {
                if range.min > range.max {
                    return Err(SchemaError::InvertedRange {
                        feature: name,
                        min: range.min,
                        max: range.max,
                    });
                }
            }
            table.insert(name, domain);
        }

        let domains = feature_names
            .iter()
            .map(|name| table.get(name).copied().unwrap_or_default())
            .collect();

        Ok(Self {
            names: feature_names,
            domains,
        })
    }

    /// Build a schema from configuration-file declarations.
    pub fn from_config(
        feature_names: Vec<String>,
        declared: &HashMap<String, FeatureDomainConfig>,
    ) -> Result<Self, SchemaError> {
        let mut domains = Vec::with_capacity(declared.len());
        for (name, config) in declared {
            domains.push((name.clone(), config.clone().into_domain(name)?));
        }
        Self::new(feature_names, domains)
    }

    /// The student-performance schema with its built-in ranges, in training
    /// column order.
    pub fn student() -> Self {
        let names = STUDENT_FEATURES.iter().map(|n| n.to_string()).collect();
        let declared = STUDENT_FEATURES
            .iter()
            .filter_map(|name| student_domain(name).map(|d| (name.to_string(), d)));
        // The built-in table only references its own feature list.
        match Self::new(names, declared) {
            Ok(schema) => schema,
            Err(e) => unreachable!("built-in student schema is invalid: {e}"),
        }
    }

    /// Canonical column order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn feature_count(&self) -> usize {
        self.names.len()
    }

    pub fn feature_domain(&self, name: &str) -> Option<&FeatureDomain> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.domains[idx])
    }

    /// Features paired with their domains, in canonical order.
    pub fn features(&self) -> impl Iterator<Item = (&str, &FeatureDomain)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.domains.iter())
    }

    /// Declared ranges keyed by feature name, in canonical order.
    pub fn ranges_json(&self) -> Map<String, Value> {
        self.features()
            .filter_map(|(name, domain)| {
                domain
                    .range
                    .map(|range| (name.to_string(), range.to_json()))
            })
            .collect()
    }
}

/// Training column order of the student-performance dataset.
pub const STUDENT_FEATURES: [&str; 10] = [
    "attendance_percentage",
    "sleep_time_hours",
    "study_hours_per_week",
    "total_credits",
    "high_credit_modules",
    "low_credit_modules",
    "repeat_module_credits",
    "lab_credits",
    "part_time_job",
    "internet_access",
];

/// Built-in domain of a student-performance feature.
pub fn student_domain(name: &str) -> Option<FeatureDomain> {
    let bounded = |min: f64, max: f64, step: f64| {
        FeatureDomain::continuous(Some(ValueRange::new(min, max).with_step(step)))
    };

    let domain = match name {
        "attendance_percentage" => bounded(0.0, 100.0, 1.0),
        "sleep_time_hours" => bounded(0.0, 24.0, 0.1),
        "study_hours_per_week" => bounded(0.0, 50.0, 1.0),
        "total_credits" => bounded(0.0, 40.0, 1.0),
        "high_credit_modules" | "low_credit_modules" => bounded(0.0, 10.0, 1.0),
        "repeat_module_credits" | "lab_credits" => bounded(0.0, 20.0, 1.0),
        "part_time_job" | "internet_access" => FeatureDomain::binary(),
        _ => return None,
    };
    Some(domain)
}

/// Built-in domain table in configuration form.
pub fn student_domain_config() -> HashMap<String, FeatureDomainConfig> {
    STUDENT_FEATURES
        .iter()
        .filter_map(|name| {
            student_domain(name).map(|domain| {
                let range = domain.range;
                (
                    name.to_string(),
                    FeatureDomainConfig {
                        kind: domain.kind,
                        min: range.map(|r| r.min),
                        max: range.map(|r| r.max),
                        step: range.and_then(|r| r.step),
                    },
                )
            })
        })
        .collect()
}

/// Canned, realistic example request for the student-performance form.
pub fn student_sample() -> Map<String, Value> {
    let mut sample = Map::new();
    sample.insert("attendance_percentage".into(), json!(78));
    sample.insert("sleep_time_hours".into(), json!(6.5));
    sample.insert("study_hours_per_week".into(), json!(25));
    sample.insert("total_credits".into(), json!(30));
    sample.insert("high_credit_modules".into(), json!(3));
    sample.insert("low_credit_modules".into(), json!(2));
    sample.insert("repeat_module_credits".into(), json!(0));
    sample.insert("lab_credits".into(), json!(6));
    sample.insert("part_time_job".into(), json!(0));
    sample.insert("internet_access".into(), json!(1));
    sample
}
