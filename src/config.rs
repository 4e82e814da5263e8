use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::aggregate::RenameTable;
use crate::models::{PHYSICAL_HOURS, SOCIAL_HOURS};
use crate::normalize::SizeRange;

/// Category orders, display names, palettes and sizes used to build the deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub stress_order: Vec<String>,
    pub focus_stress_order: Vec<String>,
    pub study_sleep_order: Vec<String>,
    pub focus_activity_names: RenameTable,
    pub interactive_activity_names: RenameTable,
    pub stress_palette: Vec<(String, String)>,
    pub focus_palette: Vec<(String, String)>,
    pub band_palette: Vec<(String, String)>,
    pub habit_dot_palette: Vec<(String, String)>,
    pub activity_palette: Vec<(String, String)>,
    pub dual_axis_sizes: SizeRange,
    pub interactive_sizes: SizeRange,
    pub gpa_quantile: f64,
    pub autoplay_secs: u64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            stress_order: strings(&["Low", "Moderate", "High"]),
            focus_stress_order: strings(&["Moderate", "High", "Low"]),
            study_sleep_order: strings(&[
                "Low Study & Low Sleep",
                "Low Study & High Sleep",
                "High Study & Low Sleep",
                "High Study & High Sleep",
            ]),
            focus_activity_names: RenameTable::new([
                (PHYSICAL_HOURS, "Physical Activity"),
                (SOCIAL_HOURS, "Social Activity"),
            ]),
            interactive_activity_names: RenameTable::new([
                (PHYSICAL_HOURS, "Physical Activity"),
                (SOCIAL_HOURS, "Social Hours"),
            ]),
            stress_palette: pairs(&[("Low", "#2ca02c"), ("Moderate", "#ff7f0e"), ("High", "#d62728")]),
            focus_palette: pairs(&[("Low", "#2E7D32"), ("Moderate", "#F57C00"), ("High", "#C62828")]),
            band_palette: pairs(&[("Low", "#90EE90"), ("Moderate", "#FFD700"), ("High", "#FFB6C6")]),
            habit_dot_palette: pairs(&[("Low", "green"), ("Moderate", "#FFC000"), ("High", "red")]),
            activity_palette: pairs(&[("Physical Activity", "#1f77b4"), ("Social Hours", "#ff7f0e")]),
            dual_axis_sizes: SizeRange::new(12.0, 28.0),
            interactive_sizes: SizeRange::new(12.0, 30.0),
            gpa_quantile: 0.5,
            autoplay_secs: 5,
        }
    }
}

impl DeckConfig {
    /// Defaults, overlaid with the JSON file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: DeckConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        if !(0.0..=1.0).contains(&config.gpa_quantile) {
            anyhow::bail!("gpa_quantile must be within 0..=1, got {}", config.gpa_quantile);
        }
        Ok(config)
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_secs(self.autoplay_secs.max(1))
    }
}

/// Looks up the color assigned to `key` in a palette.
pub fn color_for<'a>(palette: &'a [(String, String)], key: &str) -> Option<&'a str> {
    palette
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, color)| color.as_str())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_carry_reference_orders() {
        let config = DeckConfig::default();
        assert_eq!(config.stress_order, ["Low", "Moderate", "High"]);
        assert_eq!(config.study_sleep_order.len(), 4);
        assert_eq!(config.autoplay_interval(), Duration::from_secs(5));
        assert_eq!(
            config.focus_activity_names.display_name(SOCIAL_HOURS).unwrap(),
            "Social Activity"
        );
        assert_eq!(color_for(&config.stress_palette, "High"), Some("#d62728"));
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"autoplay_secs": 2, "interactive_sizes": {{"min": 5.0, "max": 9.0}}}}"#).unwrap();

        let config = DeckConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.autoplay_secs, 2);
        assert_eq!(config.interactive_sizes, SizeRange::new(5.0, 9.0));
        assert_eq!(config.stress_order, DeckConfig::default().stress_order);
    }

    #[test]
    fn rejects_out_of_range_quantile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"gpa_quantile": 1.5}}"#).unwrap();
        assert!(DeckConfig::load(Some(file.path())).is_err());
    }
}
