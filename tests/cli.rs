use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

const HEADER: &str = "Student_ID,Study_Hours_Per_Day,Extracurricular_Hours_Per_Day,Sleep_Hours_Per_Day,Social_Hours_Per_Day,Physical_Activity_Hours_Per_Day,Stress_Level,GPA";

fn write_dataset(dir: &Path) -> String {
    let rows = [
        "1,6.9,3.8,8.7,2.8,1.8,Moderate,2.99",
        "2,5.3,3.5,8.0,4.2,3.0,Low,2.75",
        "3,5.1,3.9,9.2,1.2,4.6,Low,2.67",
        "4,6.5,2.1,7.2,1.7,6.5,Moderate,2.88",
        "5,8.1,0.6,6.5,2.2,6.6,High,3.51",
        "6,6.0,2.1,8.0,0.3,7.6,Moderate,2.85",
        "7,8.0,0.7,5.3,5.7,4.3,High,3.08",
        "8,8.4,1.8,5.6,3.0,5.2,High,3.20",
        "9,9.1,3.9,8.8,0.5,1.7,High,3.82",
        "10,7.3,3.8,8.2,1.0,3.7,Moderate,3.16",
    ];
    let path = dir.join("students.csv");
    fs::write(&path, format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
    path.to_str().unwrap().to_string()
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn render_json_builds_every_chart() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());
    let out = dir.path().join("deck.json");

    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.env_remove("LIFESTYLE_DECK_CSV").args([
        "render",
        "--csv",
        &csv,
        "--format",
        "json",
        "--out",
        out.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let deck: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let kinds: Vec<&str> = deck["slides"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slide| slide["body"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        ["overview", "scatter", "dual_axis", "grouped_bars", "interactive"]
    );
    assert!(deck["dataset_error"].is_null());
    assert_eq!(deck["slides"][4]["body"]["view"]["key"], "All Students");
}

#[test]
fn render_without_dataset_writes_placeholders() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("deck.md");
    let missing = dir.path().join("missing.csv");

    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.env_remove("LIFESTYLE_DECK_CSV").args([
        "render",
        "--csv",
        missing.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let report = fs::read_to_string(&out).unwrap();
    assert!(report.starts_with("# Student Lifestyle Analysis"));
    assert_eq!(report.matches("**CSV not found.**").count(), 4);
}

#[test]
fn resolve_prefers_physical_activity() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());

    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.env_remove("LIFESTYLE_DECK_CSV").args([
        "resolve",
        "--csv",
        &csv,
        "--gpa",
        "High GPA",
        "--physical",
        "High Physical Activity",
    ]);
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.starts_with("Resolved key: High Physical Activity\n"));
    assert!(stdout.contains("Physical Activity:"));
}

#[test]
fn resolve_rejects_unknown_selection() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());

    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.env_remove("LIFESTYLE_DECK_CSV")
        .args(["resolve", "--csv", &csv, "--gpa", "Medium GPA"]);
    cmd.assert().failure();
}

#[test]
fn summary_reports_thresholds() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());

    let mut cmd = Command::cargo_bin("lifestyle-deck").unwrap();
    cmd.env_remove("LIFESTYLE_DECK_CSV")
        .args(["summary", "--csv", &csv]);
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.contains("Rows loaded: 10"));
    assert!(stdout.contains("Thresholds: study"));
}
