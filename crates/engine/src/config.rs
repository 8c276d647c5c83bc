use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Largest supported currency precision (fractional digits of the smallest unit).
pub const MAX_PRECISION: u32 = 18;
/// Largest supported precision for percentage columns.
pub const MAX_PERCENT_DECIMALS: u32 = 10;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Fractional digits of the output currency unit. `6` means amounts are
    /// rounded to 0.000001.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Fractional digits kept in share percentages.
    #[serde(default = "default_percent_decimals")]
    pub percent_decimals: u32,
    /// Contributors whose humanity score is below this cutoff are excluded.
    #[serde(default = "default_min_humanity_score")]
    pub min_humanity_score: f64,
    #[serde(default)]
    pub remainder: RemainderRule,
}

fn default_precision() -> u32 {
    6
}

fn default_percent_decimals() -> u32 {
    2
}

fn default_min_humanity_score() -> f64 {
    50.0
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            percent_decimals: default_percent_decimals(),
            min_humanity_score: default_min_humanity_score(),
            remainder: RemainderRule::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remainder rule
// ---------------------------------------------------------------------------

/// How leftover smallest units are handed out after floor rounding.
///
/// Both rules break ties by ascending campaign id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderRule {
    /// One unit each to the entries with the largest fractional remainder (Hamilton).
    LargestRemainder,
    /// All leftover units to the entry with the largest floored allocation.
    ///
    /// Campaigns with equal scores can then differ by up to `n - 1` units,
    /// where `n` is the number of campaigns; `LargestRemainder` keeps them
    /// within one unit.
    LargestAllocation,
}

impl Default for RemainderRule {
    fn default() -> Self {
        Self::LargestRemainder
    }
}

impl std::fmt::Display for RemainderRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LargestRemainder => write!(f, "largest_remainder"),
            Self::LargestAllocation => write!(f, "largest_allocation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchingConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchingConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.precision > MAX_PRECISION {
            return Err(MatchError::ConfigValidation(format!(
                "precision must be at most {MAX_PRECISION}, got {}",
                self.precision
            )));
        }

        if self.percent_decimals > MAX_PERCENT_DECIMALS {
            return Err(MatchError::ConfigValidation(format!(
                "percent_decimals must be at most {MAX_PERCENT_DECIMALS}, got {}",
                self.percent_decimals
            )));
        }

        // Scores come from an external 0-100 scale
        if !self.min_humanity_score.is_finite()
            || !(0.0..=100.0).contains(&self.min_humanity_score)
        {
            return Err(MatchError::ConfigValidation(format!(
                "min_humanity_score must be within 0..=100, got {}",
                self.min_humanity_score
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
