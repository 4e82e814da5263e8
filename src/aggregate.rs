use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DeckError;
use crate::models::Record;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMeans {
    pub category: String,
    pub rows: usize,
    /// Aligned with `Aggregation::measures`.
    pub means: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub group_by: String,
    pub measures: Vec<String>,
    pub groups: Vec<GroupMeans>,
}

impl Aggregation {
    #[cfg(test)]
    pub fn mean(&self, category: &str, measure: &str) -> Option<f64> {
        let column = self.measures.iter().position(|m| m == measure)?;
        self.groups
            .iter()
            .find(|group| group.category == category)
            .map(|group| group.means[column])
    }

    /// Categories from the requested order that had no rows.
    pub fn empty_categories(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|group| group.rows == 0)
            .map(|group| group.category.as_str())
            .collect()
    }

    #[cfg(test)]
    pub fn all_means(&self) -> impl Iterator<Item = f64> + '_ {
        self.groups.iter().flat_map(|group| group.means.iter().copied())
    }
}

/// Mean of each measure per category, in `order`. Categories with no rows
/// (or no values for a measure) are filled with 0. Rows whose category is not
/// listed in `order` are ignored.
pub fn aggregate<R: Record>(
    rows: &[R],
    group_by: &str,
    measures: &[&str],
    order: &[String],
) -> Aggregation {
    let mut sums: Vec<(usize, Vec<(f64, usize)>)> =
        vec![(0, vec![(0.0, 0); measures.len()]); order.len()];

    for row in rows {
        let Some(category) = row.category(group_by) else {
            continue;
        };
        let Some(slot) = order.iter().position(|c| c == category) else {
            continue;
        };
        let entry = &mut sums[slot];
        entry.0 += 1;
        for (index, measure) in measures.iter().enumerate() {
            if let Some(value) = row.measure(measure) {
                entry.1[index].0 += value;
                entry.1[index].1 += 1;
            }
        }
    }

    let groups = order
        .iter()
        .zip(sums)
        .map(|(category, (count, totals))| GroupMeans {
            category: category.clone(),
            rows: count,
            means: totals
                .into_iter()
                .map(|(total, n)| if n == 0 { 0.0 } else { total / n as f64 })
                .collect(),
        })
        .collect();

    Aggregation {
        group_by: group_by.to_string(),
        measures: measures.iter().map(|m| m.to_string()).collect(),
        groups,
    }
}

/// Maps internal measure columns to the names shown to an audience.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenameTable(BTreeMap<String, String>);

impl RenameTable {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn display_name(&self, column: &str) -> Result<&str, DeckError> {
        self.0
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| DeckError::UnmappedMeasure {
                column: column.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub category: String,
    pub measure: String,
    pub value: f64,
    /// Rows behind `value`; 0 marks a filled-in category.
    pub rows: usize,
}

/// One row per category x measure, measure-major, using display names.
pub fn melt(aggregation: &Aggregation, renames: &RenameTable) -> Result<Vec<LongRow>, DeckError> {
    let mut long = Vec::with_capacity(aggregation.measures.len() * aggregation.groups.len());
    for (index, measure) in aggregation.measures.iter().enumerate() {
        let display = renames.display_name(measure)?;
        for group in &aggregation.groups {
            long.push(LongRow {
                category: group.category.clone(),
                measure: display.to_string(),
                value: group.means[index],
                rows: group.rows,
            });
        }
    }
    Ok(long)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub label: String,
    /// Aligned with `Pivot::categories`.
    pub values: Vec<f64>,
}

impl PivotRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub categories: Vec<String>,
    pub rows: Vec<PivotRow>,
}

/// Turns long rows back into one row per measure with a column per
/// category. Measures keep first-seen order; missing cells are 0.
pub fn pivot(long: &[LongRow], categories: &[String]) -> Pivot {
    let mut rows: Vec<PivotRow> = Vec::new();
    for entry in long {
        let Some(column) = categories.iter().position(|c| *c == entry.category) else {
            continue;
        };
        let index = match rows.iter().position(|row| row.label == entry.measure) {
            Some(index) => index,
            None => {
                rows.push(PivotRow {
                    label: entry.measure.clone(),
                    values: vec![0.0; categories.len()],
                });
                rows.len() - 1
            }
        };
        rows[index].values[column] = entry.value;
    }
    Pivot {
        categories: categories.to_vec(),
        rows,
    }
}

/// Orders rows by descending total. Ties keep their prior order.
pub fn sort_by_total_desc(rows: &mut [PivotRow]) {
    rows.sort_by(|a, b| b.total().total_cmp(&a.total()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Row {
        labels: HashMap<&'static str, &'static str>,
        values: HashMap<&'static str, f64>,
    }

    impl Record for Row {
        fn category(&self, column: &str) -> Option<&str> {
            self.labels.get(column).copied()
        }

        fn measure(&self, column: &str) -> Option<f64> {
            self.values.get(column).copied()
        }
    }

    fn row(stress: &'static str, hours: f64, social: f64) -> Row {
        Row {
            labels: HashMap::from([("stress", stress)]),
            values: HashMap::from([("hours", hours), ("social", social)]),
        }
    }

    fn order(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn absent_categories_fill_with_zero_in_given_order() {
        let rows = vec![row("Low", 2.0, 1.0), row("Low", 4.0, 3.0)];
        let result = aggregate(&rows, "stress", &["hours"], &order(&["Low", "Moderate", "High"]));

        assert_eq!(result.groups.len(), 3);
        let categories: Vec<&str> = result.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, ["Low", "Moderate", "High"]);
        assert_eq!(result.mean("Low", "hours"), Some(3.0));
        assert_eq!(result.mean("Moderate", "hours"), Some(0.0));
        assert_eq!(result.mean("High", "hours"), Some(0.0));
        assert_eq!(result.empty_categories(), ["Moderate", "High"]);
    }

    #[test]
    fn output_follows_supplied_order_not_discovery_order() {
        let rows = vec![row("High", 1.0, 0.0), row("Low", 5.0, 0.0), row("Stray", 9.0, 0.0)];
        let result = aggregate(&rows, "stress", &["hours"], &order(&["Moderate", "High", "Low"]));
        let categories: Vec<&str> = result.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, ["Moderate", "High", "Low"]);
        assert_eq!(result.groups[1].means, vec![1.0]);
        assert_eq!(result.groups[2].means, vec![5.0]);
    }

    #[test]
    fn empty_input_still_yields_every_category() {
        let rows: Vec<Row> = Vec::new();
        let result = aggregate(&rows, "stress", &["hours", "social"], &order(&["Low", "High"]));
        assert_eq!(result.groups.len(), 2);
        assert!(result.all_means().all(|m| m == 0.0));
    }

    #[test]
    fn melt_requires_an_explicit_display_name() {
        let rows = vec![row("Low", 2.0, 1.0)];
        let result = aggregate(&rows, "stress", &["hours", "social"], &order(&["Low", "High"]));

        let partial = RenameTable::new([("hours", "Physical Activity")]);
        assert!(matches!(
            melt(&result, &partial),
            Err(DeckError::UnmappedMeasure { column }) if column == "social"
        ));

        let renames = RenameTable::new([("hours", "Physical Activity"), ("social", "Social Activity")]);
        let long = melt(&result, &renames).unwrap();
        assert_eq!(long.len(), 4);
        assert_eq!(long[0].measure, "Physical Activity");
        assert_eq!(long[0].category, "Low");
        assert_eq!(long[1].category, "High");
        assert_eq!((long[0].rows, long[1].rows), (1, 0));
        assert_eq!(long[2].measure, "Social Activity");
    }

    #[test]
    fn pivot_sorts_by_total_and_keeps_ties_stable() {
        let long = vec![
            LongRow { category: "Low".into(), measure: "A".into(), value: 1.0, rows: 1 },
            LongRow { category: "High".into(), measure: "A".into(), value: 1.0, rows: 1 },
            LongRow { category: "Low".into(), measure: "B".into(), value: 5.0, rows: 1 },
            LongRow { category: "Low".into(), measure: "C".into(), value: 2.0, rows: 1 },
        ];
        let mut table = pivot(&long, &order(&["Low", "High"]));
        assert_eq!(table.rows[0].values, vec![1.0, 1.0]);
        assert_eq!(table.rows[1].values, vec![5.0, 0.0]);

        sort_by_total_desc(&mut table.rows);
        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["B", "A", "C"]);
    }
}
