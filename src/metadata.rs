//! Display metadata attached to each GPA category

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// GPA interpretation of a class; informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpaInfo {
    /// GPA interval, e.g. `"3.0 - 3.7"`
    pub range: String,
    pub description: String,
    /// CSS color used by the form
    pub color: String,
}

impl GpaInfo {
    fn new(range: &str, description: &str, color: &str) -> Self {
        Self {
            range: range.to_string(),
            description: description.to_string(),
            color: color.to_string(),
        }
    }
}

/// Class name to GPA metadata table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMetadata {
    entries: HashMap<String, GpaInfo>,
}

impl ClassMetadata {
    pub fn get(&self, class: &str) -> Option<&GpaInfo> {
        self.entries.get(class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata for the given classes, in their order.
    ///
    /// Classes without metadata are left out.
    pub fn for_classes(&self, classes: &[String]) -> Map<String, Value> {
        classes
            .iter()
            .filter_map(|class| {
                self.entries
                    .get(class)
                    .map(|info| (class.clone(), json!(info)))
            })
            .collect()
    }

    /// The usual four-band grading scale.
    pub fn student_default() -> Self {
        let entries = [
            (
                "Poor",
                GpaInfo::new("0.0 - 2.0", "Below average performance", "#e74c3c"),
            ),
            (
                "Average",
                GpaInfo::new("2.0 - 3.0", "Satisfactory performance", "#f39c12"),
            ),
            (
                "Good",
                GpaInfo::new("3.0 - 3.7", "Above average performance", "#27ae60"),
            ),
            (
                "Excellent",
                GpaInfo::new("3.7 - 4.0", "Outstanding performance", "#2980b9"),
            ),
        ]
        .into_iter()
        .map(|(class, info)| (class.to_string(), info))
        .collect();

        Self { entries }
    }
}

impl FromIterator<(String, GpaInfo)> for ClassMetadata {
    fn from_iter<T: IntoIterator<Item = (String, GpaInfo)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
