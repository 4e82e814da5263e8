use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::derive::mean;
use crate::filters::{ActivityPoint, FilterView};
use crate::navigation::Frame;
use crate::slides::{Deck, Slide, SlideBody};

pub fn build_report(deck: &Deck, source: &str, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Lifestyle Analysis");
    let _ = writeln!(
        output,
        "Generated from {} on {}",
        source,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    for (index, slide) in deck.slides.iter().enumerate() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Slide {}: {}", index + 1, slide.title);
        render_slide(&mut output, slide, None);
    }

    output
}

#[derive(Serialize)]
struct DeckExport<'a> {
    source: &'a str,
    generated_at: DateTime<Utc>,
    dataset_error: Option<String>,
    slides: &'a [Slide],
}

/// The prepared deck as JSON for an external chart renderer.
pub fn build_json(
    deck: &Deck,
    source: &str,
    dataset_error: Option<String>,
    generated_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&DeckExport {
        source,
        generated_at,
        dataset_error,
        slides: &deck.slides,
    })
}

/// Writes one slide. `view` replaces the interactive slide's initial series.
pub fn render_slide(output: &mut String, slide: &Slide, view: Option<&FilterView>) {
    let _ = writeln!(output, "### {}", slide.heading);

    match &slide.body {
        SlideBody::Placeholder { message } => {
            let _ = writeln!(output, "**{}**", message);
        }
        SlideBody::Overview(overview) => {
            let _ = writeln!(output, "{}", overview.description);
            if let Some(stats) = &overview.stats {
                let _ = writeln!(output);
                let _ = writeln!(output, "Students with complete records: {}", stats.students);
                for (level, share) in &stats.stress_share {
                    let _ = writeln!(output, "- {} stress: {:.0}%", level, share);
                }
                let _ = writeln!(
                    output,
                    "- GPA above mean ({:.2}): {:.0}%, below: {:.0}%",
                    stats.mean_gpa, stats.above_mean_gpa_pct, stats.below_mean_gpa_pct
                );
            }
        }
        SlideBody::Scatter(chart) => {
            let _ = writeln!(
                output,
                "{} vs {}, {} students",
                chart.config.y_label,
                chart.config.x_label,
                chart.points.len()
            );
            for level in &chart.config.category_order {
                let gpas: Vec<f64> = chart
                    .points
                    .iter()
                    .filter(|p| p.stress_level.as_str() == level)
                    .map(|p| p.gpa)
                    .collect();
                match mean(&gpas) {
                    Some(avg) => {
                        let _ = writeln!(output, "- {}: {} students, mean GPA {:.2}", level, gpas.len(), avg);
                    }
                    None => {
                        let _ = writeln!(output, "- {}: no students", level);
                    }
                }
            }
        }
        SlideBody::DualAxis(chart) => {
            let _ = writeln!(
                output,
                "Split at median study {:.2} h and median sleep {:.2} h",
                chart.study_median, chart.sleep_median
            );
            let _ = writeln!(output);
            let _ = writeln!(output, "| Group | Students | Mean GPA | Mean Stress | Stress Category |");
            let _ = writeln!(output, "|---|---|---|---|---|");
            for group in &chart.groups {
                let _ = writeln!(
                    output,
                    "| {} | {} | {:.2} | {:.2} | {} |",
                    group.group, group.rows, group.mean_gpa, group.mean_stress, group.stress_category
                );
            }
        }
        SlideBody::GroupedBars(chart) => {
            let _ = writeln!(output, "{} ({} students)", chart.subtitle, chart.focus_rows);
            if let Some(note) = &chart.note {
                let _ = writeln!(output, "> Note: {}", note);
            }
            let _ = writeln!(output);
            let _ = writeln!(output, "| {} | {} |", chart.config.y_label, chart.table.categories.join(" | "));
            let _ = writeln!(output, "|---|{}", "---|".repeat(chart.table.categories.len()));
            for row in &chart.table.rows {
                let cells: Vec<String> = row.values.iter().map(|v| format!("{:.2}", v)).collect();
                let _ = writeln!(output, "| {} | {} |", row.label, cells.join(" | "));
            }
        }
        SlideBody::Interactive(chart) => {
            let view = view.unwrap_or(&chart.view);
            let _ = writeln!(output, "Showing: {} ({} students)", view.key, view.series.rows);
            let _ = writeln!(output, "Filters: {}", view.selection);
            let _ = writeln!(output);
            write_series(output, &view.series.physical);
            write_series(output, &view.series.social);
            let _ = writeln!(output);
            let _ = writeln!(output, "Available groups: {}", chart.table.keys().collect::<Vec<_>>().join(", "));
        }
    }
}

pub fn write_series(output: &mut String, points: &[ActivityPoint]) {
    let Some(first) = points.first() else {
        return;
    };
    let _ = writeln!(output, "{}:", first.activity_type);
    for point in points {
        let _ = writeln!(
            output,
            "- {:<8} {:>5.2} h (size {:.1})",
            point.stress_level, point.mean_hours, point.size
        );
    }
}

pub fn nav_bar(frame: &Frame<'_>) -> String {
    const WIDTH: usize = 20;
    let filled = ((frame.progress_pct / 100.0) * WIDTH as f64).round() as usize;
    let mut output = String::new();
    let _ = write!(
        output,
        "[{}] [Home] [{}] [{}]  Slide {} of {} [{}{}]",
        if frame.prev_enabled { "Previous" } else { "--------" },
        if frame.next_enabled { "Next" } else { "----" },
        frame.play_label,
        frame.index + 1,
        frame.total,
        "#".repeat(filled.min(WIDTH)),
        " ".repeat(WIDTH - filled.min(WIDTH)),
    );
    output
}
