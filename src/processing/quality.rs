//! Quality parameter and the clamp policy applied before it reaches the encoder.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::utils::{ConverterError, ConverterResult};

/// Encoder quality in `[0.0, 1.0]`. Not a percentage of the source size.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Quality(f32);

impl Quality {
    /// Quality used for the initial encode at ingestion.
    pub const DEFAULT: Quality = Quality(0.9);

    pub fn new(value: f32) -> ConverterResult<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConverterError::validation(
                format!("Quality must be within [0.0, 1.0], got {}", value)
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality factor on libwebp's 0-100 scale.
    pub fn as_factor(self) -> f32 {
        self.0 * 100.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Range a caller clamps candidate qualities into.
///
/// `Capped` keeps the slider at or below 0.9 so re-encoding already compressed
/// sources does not balloon; `Free` allows the full `[0.05, 1.0]` range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPolicy {
    #[default]
    Capped,
    Free,
}

impl QualityPolicy {
    pub const MIN: f32 = 0.05;
    /// Slider granularity.
    pub const STEP: f32 = 0.05;

    pub fn ceiling(self) -> f32 {
        match self {
            Self::Capped => 0.9,
            Self::Free => 1.0,
        }
    }

    /// Clamps a raw candidate into this policy's range. NaN maps to the floor.
    pub fn clamp(self, candidate: f32) -> Quality {
        if candidate.is_nan() {
            return Quality(Self::MIN);
        }
        Quality(candidate.clamp(Self::MIN, self.ceiling()))
    }

    /// Every slider stop from the floor up to the ceiling, ascending.
    pub fn steps(self) -> Vec<Quality> {
        // Work in hundredths so accumulated float error cannot skip the ceiling.
        let step = (Self::STEP * 100.0).round() as u32;
        let floor = (Self::MIN * 100.0).round() as u32;
        let ceiling = (self.ceiling() * 100.0).round() as u32;
        (floor..=ceiling)
            .step_by(step as usize)
            .map(|hundredths| Quality(hundredths as f32 / 100.0))
            .collect()
    }
}
