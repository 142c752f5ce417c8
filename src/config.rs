//! Analysis configuration: bucket boundaries, segment thresholds, forecast settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;

/// Half-open hour interval `[start, end)` on a 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start <= hour && hour < self.end
    }

    fn validate(&self, name: &str) -> Result<(), AnalysisError> {
        if self.start >= self.end || self.end > 24 {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} must satisfy start < end <= 24, got [{}, {})",
                name, self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Time-of-day blocks. Any hour outside `morning` and `afternoon` is evening,
/// so evening covers both late night and pre-dawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBlockBounds {
    pub morning: HourRange,
    pub afternoon: HourRange,
}

impl Default for TimeBlockBounds {
    fn default() -> Self {
        Self {
            morning: HourRange::new(6, 12),
            afternoon: HourRange::new(12, 17),
        }
    }
}

/// Traffic peak windows; hours outside all three are low traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakWindows {
    pub morning: HourRange,
    pub lunch: HourRange,
    pub evening: HourRange,
}

impl Default for PeakWindows {
    fn default() -> Self {
        Self {
            morning: HourRange::new(7, 10),
            lunch: HourRange::new(12, 14),
            evening: HourRange::new(17, 19),
        }
    }
}

/// RFM thresholds, evaluated loyal → regular → recent → churned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentThresholds {
    pub loyal_max_recency_days: i64,
    pub loyal_min_frequency: f64,
    pub regular_max_recency_days: i64,
    pub regular_min_frequency: f64,
    pub recent_max_recency_days: i64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            loyal_max_recency_days: 30,
            loyal_min_frequency: 0.5,
            regular_max_recency_days: 60,
            regular_min_frequency: 0.2,
            recent_max_recency_days: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Number of days projected past the last observed date.
    pub horizon_days: usize,
    /// Insert zero-sales days for calendar dates without transactions before
    /// decomposing and forecasting, keeping the weekly phase aligned.
    pub fill_missing_dates: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            fill_missing_dates: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub time_blocks: TimeBlockBounds,
    pub peaks: PeakWindows,
    pub segments: SegmentThresholds,
    pub forecast: ForecastSettings,
}

impl AnalysisConfig {
    /// Read a YAML file; omitted keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", path.display(), e))?;
        let config = Self::from_yaml(&contents)?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> crate::Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.time_blocks.morning.validate("time_blocks.morning")?;
        self.time_blocks.afternoon.validate("time_blocks.afternoon")?;
        self.peaks.morning.validate("peaks.morning")?;
        self.peaks.lunch.validate("peaks.lunch")?;
        self.peaks.evening.validate("peaks.evening")?;

        if self.forecast.horizon_days == 0 {
            return Err(AnalysisError::InvalidConfig(
                "forecast.horizon_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.time_blocks.morning, HourRange::new(6, 12));
        assert_eq!(config.peaks.evening, HourRange::new(17, 19));
        assert_eq!(config.segments.recent_max_recency_days, 90);
        assert_eq!(config.forecast.horizon_days, 30);
        assert!(config.forecast.fill_missing_dates);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "segments:\n  loyal_min_frequency: 0.8\nforecast:\n  horizon_days: 14\n";
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.segments.loyal_min_frequency, 0.8);
        assert_eq!(config.segments.regular_min_frequency, 0.2);
        assert_eq!(config.forecast.horizon_days, 14);
        assert_eq!(config.peaks, PeakWindows::default());
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let yaml = "peaks:\n  lunch:\n    start: 14\n    end: 12\n";
        assert!(AnalysisConfig::from_yaml(yaml).is_err());

        let mut config = AnalysisConfig::default();
        config.time_blocks.afternoon = HourRange::new(12, 25);
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        let mut config = AnalysisConfig::default();
        config.forecast.horizon_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.yaml");
        fs::write(&path, "time_blocks:\n  morning:\n    start: 5\n    end: 11\n").unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.time_blocks.morning, HourRange::new(5, 11));
        assert_eq!(config.time_blocks.afternoon, HourRange::new(12, 17));

        assert!(AnalysisConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
