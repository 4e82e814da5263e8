use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DeckError;

pub const STUDY_HOURS: &str = "Study_Hours_Per_Day";
pub const EXTRACURRICULAR_HOURS: &str = "Extracurricular_Hours_Per_Day";
pub const SLEEP_HOURS: &str = "Sleep_Hours_Per_Day";
pub const SOCIAL_HOURS: &str = "Social_Hours_Per_Day";
pub const PHYSICAL_HOURS: &str = "Physical_Activity_Hours_Per_Day";
pub const GPA: &str = "GPA";
pub const STRESS_LEVEL: &str = "Stress_Level";
pub const NUMERIC_STRESS: &str = "Numeric_Stress";

/// One line of the lifestyle CSV. Unparseable or non-finite numeric cells load as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Student_ID", default, deserialize_with = "csv::invalid_option")]
    pub student_id: Option<u32>,
    #[serde(rename = "Study_Hours_Per_Day", default, deserialize_with = "finite_option")]
    pub study_hours: Option<f64>,
    #[serde(
        rename = "Extracurricular_Hours_Per_Day",
        default,
        deserialize_with = "finite_option"
    )]
    pub extracurricular_hours: Option<f64>,
    #[serde(rename = "Sleep_Hours_Per_Day", default, deserialize_with = "finite_option")]
    pub sleep_hours: Option<f64>,
    #[serde(rename = "Social_Hours_Per_Day", default, deserialize_with = "finite_option")]
    pub social_hours: Option<f64>,
    #[serde(
        rename = "Physical_Activity_Hours_Per_Day",
        default,
        deserialize_with = "finite_option"
    )]
    pub physical_hours: Option<f64>,
    #[serde(rename = "GPA", default, deserialize_with = "finite_option")]
    pub gpa: Option<f64>,
    #[serde(rename = "Stress_Level", default)]
    pub stress_level: Option<String>,
}

/// Like `csv::invalid_option`, but `NaN` and infinite cells also load as missing.
fn finite_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(csv::invalid_option::<D, f64>(deserializer)?.filter(|value| value.is_finite()))
}

impl StudentRecord {
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            STUDY_HOURS => self.study_hours,
            EXTRACURRICULAR_HOURS => self.extracurricular_hours,
            SLEEP_HOURS => self.sleep_hours,
            SOCIAL_HOURS => self.social_hours,
            PHYSICAL_HOURS => self.physical_hours,
            GPA => self.gpa,
            _ => None,
        }
    }

    /// True when every named column holds a value.
    pub fn has_all(&self, columns: &[&str]) -> bool {
        columns.iter().all(|column| match *column {
            STRESS_LEVEL => self
                .stress_level
                .as_deref()
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false),
            "Student_ID" => self.student_id.is_some(),
            other => self.numeric(other).is_some(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

impl StressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "Low",
            StressLevel::Moderate => "Moderate",
            StressLevel::High => "High",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            StressLevel::Low => 1.0,
            StressLevel::Moderate => 2.0,
            StressLevel::High => 3.0,
        }
    }

    /// Buckets a mean stress score back into a level.
    pub fn from_mean_score(score: f64) -> Self {
        if score <= 1.5 {
            StressLevel::Low
        } else if score <= 2.5 {
            StressLevel::Moderate
        } else {
            StressLevel::High
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StressLevel {
    type Err = DeckError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Low" => Ok(StressLevel::Low),
            "Moderate" => Ok(StressLevel::Moderate),
            "High" => Ok(StressLevel::High),
            other => Err(DeckError::InvalidCategory {
                column: STRESS_LEVEL.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Column access used by the aggregation engine.
pub trait Record {
    fn category(&self, column: &str) -> Option<&str>;
    fn measure(&self, column: &str) -> Option<f64>;
}

impl<R: Record + ?Sized> Record for &R {
    fn category(&self, column: &str) -> Option<&str> {
        (**self).category(column)
    }

    fn measure(&self, column: &str) -> Option<f64> {
        (**self).measure(column)
    }
}

/// A complete record with a validated stress level and any derived group labels.
#[derive(Debug, Clone)]
pub struct StudentRow<'a> {
    pub record: &'a StudentRecord,
    pub stress: StressLevel,
    labels: Vec<(String, String)>,
}

impl<'a> StudentRow<'a> {
    pub fn new(record: &'a StudentRecord, stress: StressLevel) -> Self {
        Self {
            record,
            stress,
            labels: Vec::new(),
        }
    }

    pub fn set_label(&mut self, column: &str, label: String) {
        match self.labels.iter_mut().find(|(name, _)| name == column) {
            Some(entry) => entry.1 = label,
            None => self.labels.push((column.to_string(), label)),
        }
    }

    pub fn label(&self, column: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, label)| label.as_str())
    }
}

impl Record for StudentRow<'_> {
    fn category(&self, column: &str) -> Option<&str> {
        if column == STRESS_LEVEL {
            return Some(self.stress.as_str());
        }
        self.label(column)
    }

    fn measure(&self, column: &str) -> Option<f64> {
        if column == NUMERIC_STRESS {
            return Some(self.stress.score());
        }
        self.record.numeric(column)
    }
}
