//! Builds every slide's prepared table and chart configuration.
//!
//! Each data-backed builder checks for the dataset on its own and yields a
//! placeholder when it is missing, so one failed load never aborts the deck.

use serde::Serialize;
use tracing::warn;

use crate::aggregate::{aggregate, melt, pivot, sort_by_total_desc, Pivot};
use crate::config::{color_for, DeckConfig};
use crate::dataset::{complete, Dataset};
use crate::derive::{assign_combined, assign_split, classify_rows, mean, Cut};
use crate::error::DeckError;
use crate::filters::{
    ActivityLevel, FilterTable, FilterView, GpaLevel, StudySleep, ALL, ALL_STUDENTS, SLEEP_GROUP,
    STUDY_GROUP,
};
use crate::models::{
    Record, StressLevel, StudentRecord, EXTRACURRICULAR_HOURS, GPA, NUMERIC_STRESS, PHYSICAL_HOURS,
    SLEEP_HOURS, SOCIAL_HOURS, STRESS_LEVEL, STUDY_HOURS,
};
use crate::normalize::SizeScale;

pub const SLIDE_TITLES: [&str; 5] = [
    "Welcome & Introduction",
    "GPA vs Study Hours (by Stress)",
    "GPA & Stress by Study/Sleep Habits",
    "Activity Hours by Stress (High Study/Sleep)",
    "Activity Hours - Interactive Filters",
];

pub const NO_DATA: &str = "CSV not found.";

const HABIT_GROUP: &str = "Combined_Group";

#[derive(Debug, Clone, Serialize)]
pub struct Tooltip {
    pub label: String,
    pub field: String,
    pub format: Option<String>,
}

fn tooltip(label: &str, field: &str, format: Option<&str>) -> Tooltip {
    Tooltip {
        label: label.to_string(),
        field: field.to_string(),
        format: format.map(str::to_string),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartConfig {
    pub x_label: String,
    pub y_label: String,
    pub category_order: Vec<String>,
    pub colors: Vec<(String, String)>,
    pub tooltips: Vec<Tooltip>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewStats {
    pub students: usize,
    /// Percentage of students per stress level, in stress order.
    pub stress_share: Vec<(String, f64)>,
    pub mean_gpa: f64,
    pub above_mean_gpa_pct: f64,
    pub below_mean_gpa_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub headline: String,
    pub description: String,
    pub stats: Option<OverviewStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterPoint {
    pub study_hours: f64,
    pub gpa: f64,
    pub stress_level: StressLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterChart {
    pub config: ChartConfig,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitGroup {
    pub group: String,
    pub rows: usize,
    pub mean_gpa: f64,
    pub mean_stress: f64,
    pub stress_category: StressLevel,
    pub dot_color: String,
    pub dot_size: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DualAxisChart {
    pub config: ChartConfig,
    pub stress_axis_label: String,
    pub gpa_range: (f64, f64),
    pub stress_range: (f64, f64),
    pub study_median: f64,
    pub sleep_median: f64,
    pub groups: Vec<HabitGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedBarChart {
    pub config: ChartConfig,
    pub subtitle: String,
    pub note: Option<String>,
    pub focus_rows: usize,
    pub table: Pivot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectorOptions {
    pub gpa: Vec<String>,
    pub study_sleep: Vec<String>,
    pub physical: Vec<String>,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            gpa: std::iter::once(ALL_STUDENTS)
                .chain(GpaLevel::ALL.iter().map(|g| g.label()))
                .map(str::to_string)
                .collect(),
            study_sleep: std::iter::once(ALL)
                .chain(StudySleep::ALL.iter().map(|s| s.label()))
                .map(str::to_string)
                .collect(),
            physical: std::iter::once(ALL)
                .chain(ActivityLevel::ALL.iter().map(|p| p.label()))
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractiveChart {
    pub config: ChartConfig,
    pub x_max: f64,
    pub bands: Vec<(String, String)>,
    pub options: SelectorOptions,
    pub view: FilterView,
    pub table: FilterTable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlideBody {
    Placeholder { message: String },
    Overview(Overview),
    Scatter(ScatterChart),
    DualAxis(DualAxisChart),
    GroupedBars(GroupedBarChart),
    Interactive(InteractiveChart),
}

#[derive(Debug, Clone, Serialize)]
pub struct Slide {
    pub title: String,
    pub heading: String,
    pub body: SlideBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn build(dataset: &Dataset, config: &DeckConfig) -> Self {
        let records = dataset.records();
        let slides = vec![
            Slide {
                title: SLIDE_TITLES[0].to_string(),
                heading: "The Interplay of Lifestyle, Stress Level, and Academic Performance"
                    .to_string(),
                body: SlideBody::Overview(overview(records, config)),
            },
            data_slide(
                1,
                "Academic Performance (GPA) vs. Study Time, Conditioned by Stress",
                records,
                |r| scatter(r, config),
            ),
            data_slide(
                2,
                "Mean GPA vs. Mean Stress by Study & Sleep Habits",
                records,
                |r| habits(r, config),
            ),
            data_slide(3, "Mean Activity Hours by Stress Level", records, |r| {
                focus_activity(r, config)
            }),
            data_slide(4, "Stress & GPA for Various Lifestyles", records, |r| {
                interactive(r, config)
            }),
        ];
        Self { slides }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.slides.iter().map(|slide| slide.title.as_str()).collect()
    }

    /// The interactive slide's chart, if it was built.
    pub fn interactive(&self) -> Option<&InteractiveChart> {
        self.slides.iter().find_map(|slide| match &slide.body {
            SlideBody::Interactive(chart) => Some(chart),
            _ => None,
        })
    }
}

fn data_slide<F>(index: usize, heading: &str, records: Option<&[StudentRecord]>, build: F) -> Slide
where
    F: FnOnce(&[StudentRecord]) -> Result<SlideBody, DeckError>,
{
    let body = match records {
        None => SlideBody::Placeholder {
            message: NO_DATA.to_string(),
        },
        Some(records) => build(records).unwrap_or_else(|err| {
            warn!(slide = index, "slide could not be built: {err}");
            SlideBody::Placeholder {
                message: err.to_string(),
            }
        }),
    };
    Slide {
        title: SLIDE_TITLES[index].to_string(),
        heading: heading.to_string(),
        body,
    }
}

fn no_rows() -> SlideBody {
    SlideBody::Placeholder {
        message: "No complete rows to chart.".to_string(),
    }
}

fn overview(records: Option<&[StudentRecord]>, config: &DeckConfig) -> Overview {
    let stats = records.and_then(|records| {
        let complete_rows = complete(records, &[GPA, STRESS_LEVEL]);
        let rows = classify_rows(&complete_rows);
        if rows.is_empty() {
            return None;
        }
        let total = rows.len() as f64;
        let stress_share = config
            .stress_order
            .iter()
            .map(|level| {
                let count = rows
                    .iter()
                    .filter(|row| row.category(STRESS_LEVEL) == Some(level.as_str()))
                    .count();
                (level.clone(), count as f64 / total * 100.0)
            })
            .collect();
        let gpas: Vec<f64> = rows.iter().filter_map(|row| row.measure(GPA)).collect();
        let mean_gpa = mean(&gpas)?;
        let above = gpas.iter().filter(|gpa| **gpa > mean_gpa).count() as f64 / total * 100.0;
        Some(OverviewStats {
            students: rows.len(),
            stress_share,
            mean_gpa,
            above_mean_gpa_pct: above,
            below_mean_gpa_pct: 100.0 - above,
        })
    });

    Overview {
        headline: "The Interplay of Lifestyle, Stress Level, and Academic Performance".to_string(),
        description: "This analysis explores the Student Lifestyle Dataset from Kaggle, with \
                      information on study time, sleeping time, physical activities, social \
                      activities, stress levels, and grades."
            .to_string(),
        stats,
    }
}

fn scatter(records: &[StudentRecord], config: &DeckConfig) -> Result<SlideBody, DeckError> {
    let complete_rows = complete(records, &[STUDY_HOURS, GPA, STRESS_LEVEL]);
    let rows = classify_rows(&complete_rows);
    if rows.is_empty() {
        return Ok(no_rows());
    }

    let points = rows
        .iter()
        .filter_map(|row| {
            Some(ScatterPoint {
                study_hours: row.measure(STUDY_HOURS)?,
                gpa: row.measure(GPA)?,
                stress_level: row.stress,
            })
        })
        .collect();

    Ok(SlideBody::Scatter(ScatterChart {
        config: ChartConfig {
            x_label: "Study Hours Per Day".to_string(),
            y_label: "GPA (Grade Point Average)".to_string(),
            category_order: config.stress_order.clone(),
            colors: config.stress_palette.clone(),
            tooltips: vec![
                tooltip("Study Hours", "study_hours", Some("0.0")),
                tooltip("GPA", "gpa", Some("0.00")),
                tooltip("Stress Level", "stress_level", None),
            ],
        },
        points,
    }))
}

fn habits(records: &[StudentRecord], config: &DeckConfig) -> Result<SlideBody, DeckError> {
    let complete_rows = complete(records, &[STUDY_HOURS, SLEEP_HOURS, GPA, STRESS_LEVEL]);
    let mut rows = classify_rows(&complete_rows);
    let study = assign_split(&mut rows, STUDY_HOURS, Cut::Median, "Study", STUDY_GROUP);
    let sleep = assign_split(&mut rows, SLEEP_HOURS, Cut::Median, "Sleep", SLEEP_GROUP);
    let (Some(study_median), Some(sleep_median)) = (study, sleep) else {
        return Ok(no_rows());
    };
    assign_combined(&mut rows, STUDY_GROUP, SLEEP_GROUP, HABIT_GROUP);

    let means = aggregate(&rows, HABIT_GROUP, &[GPA, NUMERIC_STRESS], &config.study_sleep_order);
    let gpa_means: Vec<f64> = means.groups.iter().map(|g| g.means[0]).collect();
    let Some(scale) = SizeScale::fit(gpa_means, config.dual_axis_sizes) else {
        return Ok(no_rows());
    };

    let groups = means
        .groups
        .iter()
        .map(|group| {
            let stress_category = StressLevel::from_mean_score(group.means[1]);
            HabitGroup {
                group: group.category.clone(),
                rows: group.rows,
                mean_gpa: group.means[0],
                mean_stress: group.means[1],
                stress_category,
                dot_color: color_for(&config.habit_dot_palette, stress_category.as_str())
                    .unwrap_or("gray")
                    .to_string(),
                dot_size: scale.size(group.means[0]),
            }
        })
        .collect();

    Ok(SlideBody::DualAxis(DualAxisChart {
        config: ChartConfig {
            x_label: "Study & Sleep Habit Group".to_string(),
            y_label: "Mean GPA".to_string(),
            category_order: config.study_sleep_order.clone(),
            colors: config.habit_dot_palette.clone(),
            tooltips: vec![
                tooltip("Group", "group", None),
                tooltip("Mean Stress", "mean_stress", Some("0.00")),
                tooltip("Mean GPA", "mean_gpa", Some("0.00")),
                tooltip("Stress Category", "stress_category", None),
            ],
        },
        stress_axis_label: "Mean Stress Score (1=Low, 3=High)".to_string(),
        gpa_range: (1.0, 4.0),
        stress_range: (1.0, 4.0),
        study_median,
        sleep_median,
        groups,
    }))
}

fn focus_activity(records: &[StudentRecord], config: &DeckConfig) -> Result<SlideBody, DeckError> {
    let complete_rows = complete(
        records,
        &[STUDY_HOURS, SLEEP_HOURS, STRESS_LEVEL, PHYSICAL_HOURS, SOCIAL_HOURS],
    );
    let rows = classify_rows(&complete_rows);
    let study: Vec<f64> = rows.iter().filter_map(|r| r.measure(STUDY_HOURS)).collect();
    let sleep: Vec<f64> = rows.iter().filter_map(|r| r.measure(SLEEP_HOURS)).collect();
    let (Some(mean_study), Some(mean_sleep)) = (mean(&study), mean(&sleep)) else {
        return Ok(no_rows());
    };

    let focus: Vec<_> = rows
        .iter()
        .filter(|row| {
            row.measure(STUDY_HOURS).is_some_and(|v| v > mean_study)
                && row.measure(SLEEP_HOURS).is_some_and(|v| v > mean_sleep)
        })
        .collect();

    let means = aggregate(
        &focus,
        STRESS_LEVEL,
        &[PHYSICAL_HOURS, SOCIAL_HOURS],
        &config.focus_stress_order,
    );
    let missing = means.empty_categories();
    let note = (!missing.is_empty()).then(|| {
        format!(
            "No students in this group reported {} stress levels.",
            missing.join(" or ")
        )
    });

    let long = melt(&means, &config.focus_activity_names)?;
    let mut table = pivot(&long, &config.focus_stress_order);
    sort_by_total_desc(&mut table.rows);

    let colors = config
        .focus_stress_order
        .iter()
        .filter_map(|level| {
            color_for(&config.focus_palette, level).map(|c| (level.clone(), c.to_string()))
        })
        .collect();

    Ok(SlideBody::GroupedBars(GroupedBarChart {
        config: ChartConfig {
            x_label: "Mean Hours Per Day".to_string(),
            y_label: "Activity Type".to_string(),
            category_order: table.rows.iter().map(|row| row.label.clone()).collect(),
            colors,
            tooltips: vec![
                tooltip("Activity", "label", None),
                tooltip("Stress Level", "category", None),
                tooltip("Mean Hours", "value", Some("0.00")),
            ],
        },
        subtitle: "(High Study & High Sleep Students)".to_string(),
        note,
        focus_rows: focus.len(),
        table,
    }))
}

fn interactive(records: &[StudentRecord], config: &DeckConfig) -> Result<SlideBody, DeckError> {
    let complete_rows = complete(
        records,
        &[
            STUDY_HOURS,
            EXTRACURRICULAR_HOURS,
            SLEEP_HOURS,
            SOCIAL_HOURS,
            PHYSICAL_HOURS,
            GPA,
            STRESS_LEVEL,
        ],
    );
    let rows = classify_rows(&complete_rows);
    let Some(table) = FilterTable::build(&rows, config)? else {
        return Ok(no_rows());
    };
    let Some(view) = FilterView::initial(&table) else {
        return Ok(no_rows());
    };

    let bands = config
        .stress_order
        .iter()
        .filter_map(|level| {
            color_for(&config.band_palette, level).map(|c| (level.clone(), c.to_string()))
        })
        .collect();

    Ok(SlideBody::Interactive(InteractiveChart {
        config: ChartConfig {
            x_label: "Mean Hours per Day".to_string(),
            y_label: "Stress Level".to_string(),
            category_order: config.stress_order.clone(),
            colors: config.activity_palette.clone(),
            tooltips: vec![
                tooltip("Activity", "activity_type", None),
                tooltip("Stress Level", "stress_level", None),
                tooltip("Mean Hours", "mean_hours", Some("0.00")),
                tooltip("Group", "group", None),
            ],
        },
        x_max: table.scale.max * 1.2,
        bands,
        options: SelectorOptions::default(),
        view,
        table,
    }))
}
