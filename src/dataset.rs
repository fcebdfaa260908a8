//! Descriptive statistics over the training dataset.
//!
//! The CSV is read on demand; nothing is cached between calls.

use crate::error::DatasetError;
use serde::Serialize;
use std::path::Path;

/// Summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Middle value; mean of the two middle values for even counts
    pub median: f64,
    /// Sample standard deviation (n - 1); `None` with fewer than two values
    pub std: Option<f64>,
}

impl FeatureStats {
    /// Computes statistics from unsorted values.
    ///
    /// Returns `None` for an empty dataset.
    ///
    /// ```
    /// # use student_performance::dataset::FeatureStats;
    /// let stats = FeatureStats::new([4.0, 1.0, 3.0, 2.0]).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.median, 2.5);
    /// ```
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);

        let min = *values.first()?;
        let max = *values.last()?;
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;

        let mid = n / 2;
        let median = if n % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        let std = (n > 1).then(|| {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        });

        Some(Self {
            min,
            max,
            mean,
            median,
            std,
        })
    }
}

/// Statistics for each of `features` found as a CSV column, in the order of
/// `features`.
///
/// Empty, non-numeric and absent cells (short rows) are skipped; columns
/// without any numeric value are left out.
pub fn dataset_stats<P: AsRef<Path>>(
    path: P,
    features: &[String],
) -> Result<Vec<(String, FeatureStats)>, DatasetError> {
    let path = path.as_ref();
    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let columns: Vec<(usize, &String)> = features
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .map(|idx| (idx, name))
        })
        .collect();

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for ((idx, _), column) in columns.iter().zip(values.iter_mut()) {
            if let Some(v) = record
                .get(*idx)
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
            {
                column.push(v);
            }
        }
    }

    Ok(columns
        .into_iter()
        .zip(values)
        .filter_map(|((_, name), column)| FeatureStats::new(column).map(|s| (name.clone(), s)))
        .collect())
}
