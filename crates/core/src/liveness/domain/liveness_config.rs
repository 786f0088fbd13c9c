use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::liveness::domain::decision_engine::DecisionThresholds;
use crate::liveness::domain::facial_region::FacialRegion;
use crate::shared::constants::{DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one region is required")]
    NoRegions,
    #[error("region '{0}' has no landmark indices")]
    EmptyRegion(String),
    #[error("region name '{0}' is used more than once")]
    DuplicateRegion(String),
    #[error("region '{region}': {field} must be a finite non-negative number, got {value}")]
    InvalidThreshold {
        region: String,
        field: &'static str,
        value: f64,
    },
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("window size must be at most {max}, got {value}")]
    WindowTooLarge { value: usize, max: usize },
    #[error("decision {field} must be within [0, 1], got {value}")]
    InvalidDecisionRatio { field: &'static str, value: f64 },
    #[error("min_person_regions must be between 1 and {regions}, got {value}")]
    InvalidMajority { value: usize, regions: usize },
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What happens to the retained color sample on a frame without a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Keep it; the next detected face is diffed against it however old
    /// it is.
    #[default]
    CarryPrevious,
    /// Drop it; diffing resumes after two consecutive detections.
    DiscardPrevious,
}

/// Full tuning surface of the liveness classifier.
///
/// Defaults reproduce the reference configuration exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub regions: Vec<FacialRegion>,
    pub window_size: usize,
    pub decision: DecisionThresholds,
    pub gap_policy: GapPolicy,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            regions: FacialRegion::reference_set(),
            window_size: DEFAULT_WINDOW_SIZE,
            decision: DecisionThresholds::default(),
            gap_policy: GapPolicy::default(),
        }
    }
}

impl LivenessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }

        let mut names = HashSet::new();
        for region in &self.regions {
            if !names.insert(region.name.as_str()) {
                return Err(ConfigError::DuplicateRegion(region.name.clone()));
            }
            if region.landmark_indices.is_empty() {
                return Err(ConfigError::EmptyRegion(region.name.clone()));
            }
            check_threshold(region, "color_threshold", region.color_threshold)?;
            check_threshold(region, "brightness_threshold", region.brightness_threshold)?;
        }

        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowTooLarge {
                value: self.window_size,
                max: MAX_WINDOW_SIZE,
            });
        }

        check_ratio("avg_color_ratio", self.decision.avg_color_ratio)?;
        check_ratio("avg_brightness_ratio", self.decision.avg_brightness_ratio)?;

        let min = self.decision.min_person_regions;
        if min == 0 || min > self.regions.len() {
            return Err(ConfigError::InvalidMajority {
                value: min,
                regions: self.regions.len(),
            });
        }
        Ok(())
    }

    /// Highest landmark index any region references.
    pub fn max_landmark_index(&self) -> Option<usize> {
        self.regions
            .iter()
            .flat_map(|r| r.landmark_indices.iter().copied())
            .max()
    }
}

fn check_threshold(region: &FacialRegion, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            region: region.name.clone(),
            field,
            value,
        })
    }
}

fn check_ratio(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidDecisionRatio { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::domain::liveness_classifier::LivenessClassifier;
    use crate::shared::constants::FACE_MESH_LANDMARK_COUNT;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        let config = LivenessConfig::default();
        config.validate().unwrap();
        assert_eq!(config.regions.len(), 6);
        assert_eq!(config.window_size, 100);
        assert_eq!(config.gap_policy, GapPolicy::CarryPrevious);
    }

    #[test]
    fn test_default_indices_fit_topology() {
        let max = LivenessConfig::default().max_landmark_index().unwrap();
        assert!(max < FACE_MESH_LANDMARK_COUNT);
    }

    #[test]
    fn test_rejects_no_regions() {
        let config = LivenessConfig {
            regions: vec![],
            ..LivenessConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoRegions)));
    }

    #[test]
    fn test_rejects_empty_region() {
        let mut config = LivenessConfig::default();
        config.regions[2].landmark_indices.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyRegion(name)) if name == "nose"
        ));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut config = LivenessConfig::default();
        config.regions[1].name = "left_eye".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateRegion(_))
        ));
    }

    #[test]
    fn test_rejects_negative_and_nan_thresholds() {
        let mut config = LivenessConfig::default();
        config.regions[0].color_threshold = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { field: "color_threshold", .. })
        ));

        let mut config = LivenessConfig::default();
        config.regions[3].brightness_threshold = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { field: "brightness_threshold", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = LivenessConfig {
            window_size: 0,
            ..LivenessConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[rstest]
    #[case::just_over_cap(MAX_WINDOW_SIZE + 1)]
    #[case::overflowing_slot_count(usize::MAX / 2)]
    fn test_rejects_oversized_window(#[case] window_size: usize) {
        let config = LivenessConfig {
            window_size,
            ..LivenessConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowTooLarge { max: MAX_WINDOW_SIZE, .. })
        ));
        assert!(LivenessClassifier::new(config).is_err());
    }

    #[test]
    fn test_accepts_window_at_cap() {
        let config = LivenessConfig {
            window_size: MAX_WINDOW_SIZE,
            ..LivenessConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let mut config = LivenessConfig::default();
        config.decision.avg_brightness_ratio = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDecisionRatio { field: "avg_brightness_ratio", .. })
        ));
    }

    #[test]
    fn test_rejects_majority_beyond_region_count() {
        let mut config = LivenessConfig::default();
        config.decision.min_person_regions = 7;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMajority { value: 7, regions: 6 })
        ));
        config.decision.min_person_regions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: LivenessConfig =
            serde_json::from_str(r#"{"window_size": 30, "gap_policy": "discard_previous"}"#)
                .unwrap();
        assert_eq!(config.window_size, 30);
        assert_eq!(config.gap_policy, GapPolicy::DiscardPrevious);
        assert_eq!(config.regions, FacialRegion::reference_set());
        assert_eq!(config.decision, DecisionThresholds::default());
    }

    #[test]
    fn test_json_roundtrip_preserves_defaults() {
        let json = serde_json::to_string(&LivenessConfig::default()).unwrap();
        let back: LivenessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LivenessConfig::default());
    }
}
