//! Grain moisture classification.
//!
//! A lab reading is labelled `wet`, `dry` or `overdry` by comparing its
//! moisture against thresholds that depend on the grain type. Rapeseed
//! (`raps`) dries to a much lower moisture than cereals, so it carries its
//! own thresholds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::CoreError;

/// Moisture classification of a lab reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrainClass {
    /// Above the wet threshold.
    Wet,
    /// Within the target band, both bounds inclusive.
    Dry,
    /// Below the target band.
    Overdry,
}

impl GrainClass {
    /// String representation for tables.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wet => "wet",
            Self::Dry => "dry",
            Self::Overdry => "overdry",
        }
    }
}

impl fmt::Display for GrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrainClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wet" => Ok(Self::Wet),
            "dry" => Ok(Self::Dry),
            "overdry" => Ok(Self::Overdry),
            _ => Err(format!("unknown grain class: {s}")),
        }
    }
}

/// Moisture thresholds for one grain type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Moisture strictly above this is `wet`.
    pub wet_above: f64,
    /// Moisture at or above this (and not wet) is `dry`; below is `overdry`.
    pub dry_from: f64,
}

impl Thresholds {
    /// Thresholds for cereals.
    pub const CEREAL: Self = Self {
        wet_above: 14.5,
        dry_from: 12.0,
    };

    /// Thresholds for rapeseed.
    pub const RAPS: Self = Self {
        wet_above: 9.5,
        dry_from: 7.0,
    };

    /// Classifies a moisture percentage.
    ///
    /// A missing moisture fails every comparison and lands in `overdry`.
    pub fn classify(&self, moisture: Option<f64>) -> GrainClass {
        match moisture {
            Some(m) if m > self.wet_above => GrainClass::Wet,
            Some(m) if (self.dry_from..=self.wet_above).contains(&m) => GrainClass::Dry,
            _ => GrainClass::Overdry,
        }
    }

    fn validate(&self, grain: &str) -> Result<(), CoreError> {
        if !self.wet_above.is_finite() || !self.dry_from.is_finite() || self.dry_from > self.wet_above
        {
            return Err(CoreError::InvalidThresholds {
                grain: grain.to_string(),
                dry_from: self.dry_from,
                wet_above: self.wet_above,
            });
        }
        Ok(())
    }
}

/// Thresholds for every grain type, with a fallback for unlisted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRules {
    /// Thresholds for grain types not listed in `grains`, and for readings
    /// without a grain label.
    pub default: Thresholds,
    /// Grain name (matched case-insensitively) to thresholds.
    #[serde(default)]
    pub grains: BTreeMap<String, Thresholds>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            default: Thresholds::CEREAL,
            grains: BTreeMap::from([("raps".to_string(), Thresholds::RAPS)]),
        }
    }
}

impl ClassificationRules {
    /// Returns the thresholds that apply to `grain`.
    pub fn thresholds_for(&self, grain: Option<&str>) -> &Thresholds {
        grain
            .map(str::trim)
            .and_then(|g| {
                self.grains
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(g))
                    .map(|(_, t)| t)
            })
            .unwrap_or(&self.default)
    }

    /// Classifies a reading by grain type and moisture.
    pub fn classify(&self, grain: Option<&str>, moisture: Option<f64>) -> GrainClass {
        self.thresholds_for(grain).classify(moisture)
    }

    /// Checks that every threshold pair is finite and ordered.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.default.validate("default")?;
        for (grain, thresholds) in &self.grains {
            thresholds.validate(grain)?;
        }
        Ok(())
    }
}
