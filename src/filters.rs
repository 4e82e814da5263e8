//! Filter-key dispatch for the interactive activity slide.
//!
//! Three independent selectors resolve to one key of a table that is built
//! once from the dataset and never mutated. Applying a key either swaps both
//! activity series at once or, when the key has no entry, changes nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::{aggregate, melt, LongRow};
use crate::config::DeckConfig;
use crate::derive::{assign_combined, assign_split, Cut};
use crate::error::DeckError;
use crate::models::{
    Record, StudentRow, GPA, PHYSICAL_HOURS, SLEEP_HOURS, SOCIAL_HOURS, STRESS_LEVEL, STUDY_HOURS,
};
use crate::normalize::SizeScale;

pub const ALL_STUDENTS: &str = "All Students";
pub const ALL: &str = "All";

pub const STUDY_GROUP: &str = "Study_Group";
pub const SLEEP_GROUP: &str = "Sleep_Group";
pub const STUDY_SLEEP_GROUP: &str = "Combined_Study_Sleep";
pub const PHYSICAL_GROUP: &str = "Physical_Activity_Group";
pub const GPA_GROUP: &str = "GPA_Group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpaLevel {
    High,
    Low,
}

impl GpaLevel {
    pub const ALL: [GpaLevel; 2] = [GpaLevel::High, GpaLevel::Low];

    pub fn label(&self) -> &'static str {
        match self {
            GpaLevel::High => "High GPA",
            GpaLevel::Low => "Low GPA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StudySleep {
    LowStudyLowSleep,
    LowStudyHighSleep,
    HighStudyLowSleep,
    HighStudyHighSleep,
}

impl StudySleep {
    pub const ALL: [StudySleep; 4] = [
        StudySleep::LowStudyLowSleep,
        StudySleep::LowStudyHighSleep,
        StudySleep::HighStudyLowSleep,
        StudySleep::HighStudyHighSleep,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StudySleep::LowStudyLowSleep => "Low Study & Low Sleep",
            StudySleep::LowStudyHighSleep => "Low Study & High Sleep",
            StudySleep::HighStudyLowSleep => "High Study & Low Sleep",
            StudySleep::HighStudyHighSleep => "High Study & High Sleep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityLevel {
    High,
    Low,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 2] = [ActivityLevel::High, ActivityLevel::Low];

    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::High => "High Physical Activity",
            ActivityLevel::Low => "Low Physical Activity",
        }
    }
}

fn parse_choice<T: Copy>(
    selector: &'static str,
    value: &str,
    choices: &[T],
    label: fn(&T) -> &'static str,
) -> Result<Option<T>, DeckError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(ALL) || value.eq_ignore_ascii_case(ALL_STUDENTS) {
        return Ok(None);
    }
    choices
        .iter()
        .find(|choice| label(choice).eq_ignore_ascii_case(value))
        .copied()
        .map(Some)
        .ok_or_else(|| DeckError::UnknownSelector {
            selector,
            value: value.to_string(),
        })
}

/// Current value of the three selectors. `None` means "All".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub gpa: Option<GpaLevel>,
    pub study_sleep: Option<StudySleep>,
    pub physical: Option<ActivityLevel>,
}

impl Selection {
    pub fn parse(gpa: &str, study_sleep: &str, physical: &str) -> Result<Self, DeckError> {
        Ok(Self {
            gpa: parse_gpa(gpa)?,
            study_sleep: parse_study_sleep(study_sleep)?,
            physical: parse_physical(physical)?,
        })
    }
}

pub fn parse_gpa(value: &str) -> Result<Option<GpaLevel>, DeckError> {
    parse_choice("GPA level", value, &GpaLevel::ALL, GpaLevel::label)
}

pub fn parse_study_sleep(value: &str) -> Result<Option<StudySleep>, DeckError> {
    parse_choice("study & sleep habits", value, &StudySleep::ALL, StudySleep::label)
}

pub fn parse_physical(value: &str) -> Result<Option<ActivityLevel>, DeckError> {
    parse_choice("physical activity level", value, &ActivityLevel::ALL, ActivityLevel::label)
}

impl FromStr for Selection {
    type Err = DeckError;

    /// `gpa|study_sleep|physical`, e.g. `High GPA|All|All`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split('|');
        let mut next = || parts.next().unwrap_or(ALL);
        let (gpa, study_sleep, physical) = (next(), next(), next());
        Selection::parse(gpa, study_sleep, physical)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.gpa.map(|g| g.label()).unwrap_or(ALL_STUDENTS),
            self.study_sleep.map(|s| s.label()).unwrap_or(ALL),
            self.physical.map(|p| p.label()).unwrap_or(ALL)
        )
    }
}

/// First matching rule wins; a physical-activity choice overrides the rest.
pub fn resolve_key(selection: &Selection) -> String {
    if let Some(physical) = selection.physical {
        return physical.label().to_string();
    }
    match (selection.gpa, selection.study_sleep) {
        (None, None) => ALL_STUDENTS.to_string(),
        (Some(gpa), None) => gpa.label().to_string(),
        (None, Some(study_sleep)) => study_sleep.label().to_string(),
        (Some(gpa), Some(study_sleep)) => gpa_study_sleep_key(gpa, study_sleep),
    }
}

fn gpa_study_sleep_key(gpa: GpaLevel, study_sleep: StudySleep) -> String {
    format!("{} - {}", gpa.label(), study_sleep.label())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPoint {
    pub stress_level: String,
    pub mean_hours: f64,
    pub activity_type: String,
    pub group: String,
    pub size: f64,
}

/// Both activity series for one key. Always replaced as a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySeries {
    pub group: String,
    pub rows: usize,
    pub physical: Vec<ActivityPoint>,
    pub social: Vec<ActivityPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub study_median: f64,
    pub sleep_median: f64,
    pub physical_median: f64,
    pub gpa_cut: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterTable {
    pub thresholds: Thresholds,
    pub scale: SizeScale,
    pub entries: BTreeMap<String, ActivitySeries>,
}

impl FilterTable {
    /// Labels every row against thresholds computed once over all `rows`,
    /// aggregates each reachable subset and sizes markers on one shared scale.
    /// Returns `Ok(None)` when there are no rows to split.
    pub fn build(rows: &[StudentRow<'_>], config: &DeckConfig) -> Result<Option<Self>, DeckError> {
        let mut rows = rows.to_vec();
        let study = assign_split(&mut rows, STUDY_HOURS, Cut::Median, "Study", STUDY_GROUP);
        let sleep = assign_split(&mut rows, SLEEP_HOURS, Cut::Median, "Sleep", SLEEP_GROUP);
        assign_combined(&mut rows, STUDY_GROUP, SLEEP_GROUP, STUDY_SLEEP_GROUP);
        let physical = assign_split(
            &mut rows,
            PHYSICAL_HOURS,
            Cut::Median,
            "Physical Activity",
            PHYSICAL_GROUP,
        );
        let gpa = assign_split(
            &mut rows,
            GPA,
            Cut::Quantile(config.gpa_quantile),
            "GPA",
            GPA_GROUP,
        );
        let (Some(study_median), Some(sleep_median), Some(physical_median), Some(gpa_cut)) =
            (study, sleep, physical, gpa)
        else {
            return Ok(None);
        };

        let mut subsets: Vec<(String, Vec<&StudentRow<'_>>)> = Vec::new();
        subsets.push((ALL_STUDENTS.to_string(), rows.iter().collect()));
        for level in GpaLevel::ALL {
            subsets.push((level.label().to_string(), matching(&rows, &[(GPA_GROUP, level.label())])));
        }
        for combo in StudySleep::ALL {
            subsets.push((
                combo.label().to_string(),
                matching(&rows, &[(STUDY_SLEEP_GROUP, combo.label())]),
            ));
        }
        for level in ActivityLevel::ALL {
            subsets.push((
                level.label().to_string(),
                matching(&rows, &[(PHYSICAL_GROUP, level.label())]),
            ));
        }
        for level in GpaLevel::ALL {
            for combo in StudySleep::ALL {
                subsets.push((
                    gpa_study_sleep_key(level, combo),
                    matching(
                        &rows,
                        &[(GPA_GROUP, level.label()), (STUDY_SLEEP_GROUP, combo.label())],
                    ),
                ));
            }
        }

        let mut long_by_key: Vec<(String, usize, Vec<LongRow>)> = Vec::new();
        for (key, subset) in subsets {
            if subset.is_empty() {
                debug!(key = %key, "no rows for filter subset");
                continue;
            }
            let means = aggregate(
                &subset,
                STRESS_LEVEL,
                &[PHYSICAL_HOURS, SOCIAL_HOURS],
                &config.stress_order,
            );
            let long = melt(&means, &config.interactive_activity_names)?;
            long_by_key.push((key, subset.len(), long));
        }

        // Filled-in means for empty stress levels stay in the series but not in the scale.
        let scale = SizeScale::fit(
            long_by_key.iter().flat_map(|(_, _, long)| {
                long.iter().filter(|row| row.rows > 0).map(|row| row.value)
            }),
            config.interactive_sizes,
        );
        let Some(scale) = scale else {
            return Ok(None);
        };

        let physical_name = config.interactive_activity_names.display_name(PHYSICAL_HOURS)?;
        let social_name = config.interactive_activity_names.display_name(SOCIAL_HOURS)?;
        let entries = long_by_key
            .into_iter()
            .map(|(key, count, long)| {
                let points = |activity: &str| -> Vec<ActivityPoint> {
                    long.iter()
                        .filter(|row| row.measure == activity)
                        .map(|row| ActivityPoint {
                            stress_level: row.category.clone(),
                            mean_hours: row.value,
                            activity_type: row.measure.clone(),
                            group: key.clone(),
                            size: if row.rows > 0 {
                                scale.size(row.value)
                            } else {
                                scale.out.min
                            },
                        })
                        .collect()
                };
                let series = ActivitySeries {
                    group: key.clone(),
                    rows: count,
                    physical: points(physical_name),
                    social: points(social_name),
                };
                (key, series)
            })
            .collect();

        Ok(Some(Self {
            thresholds: Thresholds {
                study_median,
                sleep_median,
                physical_median,
                gpa_cut,
            },
            scale,
            entries,
        }))
    }

    pub fn get(&self, key: &str) -> Option<&ActivitySeries> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn matching<'r, 'a>(rows: &'r [StudentRow<'a>], filters: &[(&str, &str)]) -> Vec<&'r StudentRow<'a>> {
    rows.iter()
        .filter(|row| {
            filters
                .iter()
                .all(|(column, value)| row.category(column) == Some(*value))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated(String),
    /// The resolved key has no entry; the view keeps what it showed.
    Unchanged(String),
}

/// What the interactive chart currently displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterView {
    pub selection: Selection,
    pub key: String,
    pub series: ActivitySeries,
}

impl FilterView {
    pub fn initial(table: &FilterTable) -> Option<Self> {
        let selection = Selection::default();
        let key = resolve_key(&selection);
        let series = table.get(&key)?.clone();
        Some(Self {
            selection,
            key,
            series,
        })
    }

    pub fn apply(&mut self, table: &FilterTable, selection: Selection) -> Applied {
        self.selection = selection;
        let key = resolve_key(&selection);
        match table.get(&key) {
            Some(series) => {
                self.series = series.clone();
                self.key = key.clone();
                Applied::Updated(key)
            }
            None => {
                debug!(key = %key, "filter key has no data, keeping current view");
                Applied::Unchanged(key)
            }
        }
    }
}
