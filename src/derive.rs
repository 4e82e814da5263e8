//! Per-row derived fields: stress scores, threshold splits and composite labels.
//!
//! Thresholds are always computed over the whole working subset before any
//! row is labeled, so every row in a subset is compared against the same value.

use tracing::debug;

use crate::error::DeckError;
use crate::models::{Record, StressLevel, StudentRecord, StudentRow};

pub fn classify_stress(level: &str) -> Result<f64, DeckError> {
    level.parse::<StressLevel>().map(|stress| stress.score())
}

/// Attaches a validated stress level to each record; records with a stress
/// value outside Low/Moderate/High are dropped.
pub fn classify_rows<'a>(records: &[&'a StudentRecord]) -> Vec<StudentRow<'a>> {
    let mut rows = Vec::with_capacity(records.len());
    let mut rejected = 0usize;

    for &record in records {
        match classify_stress(record.stress_level.as_deref().unwrap_or_default()) {
            Ok(score) => rows.push(StudentRow::new(record, StressLevel::from_mean_score(score))),
            Err(err) => {
                rejected += 1;
                debug!("skipping row: {err}");
            }
        }
    }

    if rejected > 0 {
        debug!(rejected, "excluded rows with invalid stress levels");
    }
    rows
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// `High <name>` when strictly above the threshold, otherwise `Low <name>`.
pub fn split_label(value: f64, threshold: f64, name: &str) -> String {
    if value > threshold {
        format!("High {name}")
    } else {
        format!("Low {name}")
    }
}

pub fn combine_labels(a: &str, b: &str) -> String {
    format!("{a} & {b}")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cut {
    Median,
    Quantile(f64),
}

/// Computes one threshold for `measure` over all rows, then writes a
/// `High/Low <name>` label into `output` on every row. Returns the threshold,
/// or `None` if no row holds the measure.
pub fn assign_split(
    rows: &mut [StudentRow<'_>],
    measure: &str,
    cut: Cut,
    name: &str,
    output: &str,
) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|row| row.measure(measure)).collect();
    let threshold = match cut {
        Cut::Median => median(&values),
        Cut::Quantile(q) => quantile(&values, q),
    }?;

    for row in rows.iter_mut() {
        if let Some(value) = row.measure(measure) {
            row.set_label(output, split_label(value, threshold, name));
        }
    }
    Some(threshold)
}

/// Joins two existing labels into `output` on every row that has both.
pub fn assign_combined(rows: &mut [StudentRow<'_>], left: &str, right: &str, output: &str) {
    for row in rows.iter_mut() {
        let combined = match (row.label(left), row.label(right)) {
            (Some(a), Some(b)) => combine_labels(a, b),
            _ => continue,
        };
        row.set_label(output, combined);
    }
}
