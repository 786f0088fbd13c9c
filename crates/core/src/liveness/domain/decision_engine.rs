use std::fmt;

use serde::{Deserialize, Serialize};

use crate::liveness::domain::window_aggregator::{RegionAverage, WindowEvaluation};
use crate::shared::constants::{
    DEFAULT_AVG_BRIGHTNESS_RATIO, DEFAULT_AVG_COLOR_RATIO, DEFAULT_MIN_PERSON_REGIONS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Person,
    Picture,
    /// No window has completed yet.
    #[default]
    Indeterminate,
}

impl Verdict {
    pub fn is_live(&self) -> bool {
        matches!(self, Verdict::Person)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Person => write!(f, "Person"),
            Verdict::Picture => write!(f, "Picture"),
            Verdict::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// Global thresholds applied to window averages.
///
/// Kept apart from the per-region raw-diff thresholds in
/// [`FacialRegion`](crate::liveness::domain::facial_region::FacialRegion):
/// those classify single landmark changes, these classify a region's
/// behavior over a whole window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    pub avg_color_ratio: f64,
    pub avg_brightness_ratio: f64,
    pub min_person_regions: usize,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            avg_color_ratio: DEFAULT_AVG_COLOR_RATIO,
            avg_brightness_ratio: DEFAULT_AVG_BRIGHTNESS_RATIO,
            min_person_regions: DEFAULT_MIN_PERSON_REGIONS,
        }
    }
}

impl DecisionThresholds {
    pub fn is_person_like(&self, avg: &RegionAverage) -> bool {
        avg.avg_color_ratio >= self.avg_color_ratio
            || avg.avg_brightness_ratio >= self.avg_brightness_ratio
    }
}

/// Outcome of one window vote.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    /// One flag per region, in region order.
    pub person_like: Vec<bool>,
}

impl Decision {
    pub fn person_like_count(&self) -> usize {
        self.person_like.iter().filter(|&&f| f).count()
    }
}

/// Majority vote over regions; owns the live verdict.
pub struct DecisionEngine {
    thresholds: DecisionThresholds,
    verdict: Verdict,
}

impl DecisionEngine {
    pub fn new(thresholds: DecisionThresholds) -> Self {
        Self {
            thresholds,
            verdict: Verdict::Indeterminate,
        }
    }

    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Votes on a completed window and overwrites the live verdict.
    pub fn decide(&mut self, evaluation: &WindowEvaluation) -> Decision {
        let person_like: Vec<bool> = evaluation
            .averages
            .iter()
            .map(|avg| self.thresholds.is_person_like(avg))
            .collect();
        let count = person_like.iter().filter(|&&f| f).count();
        self.verdict = if count >= self.thresholds.min_person_regions {
            Verdict::Person
        } else {
            Verdict::Picture
        };
        Decision {
            verdict: self.verdict,
            person_like,
        }
    }

    pub fn reset(&mut self) {
        self.verdict = Verdict::Indeterminate;
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionThresholds::default())
    }
}
