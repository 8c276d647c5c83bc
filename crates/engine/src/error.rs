use std::fmt;

use crate::model::CampaignId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (precision out of range, bad threshold, etc.).
    ConfigValidation(String),
    /// The round cannot produce a distribution (empty pool, no campaigns,
    /// no qualifying contributions).
    InvalidRound(String),
    /// A review sheet or approved result set could not be accepted.
    /// `row` is 1-based and counts data rows (header excluded).
    MalformedResult {
        row: Option<usize>,
        field: String,
        message: String,
    },
    /// Approved amounts cannot be rescaled into an exact pool-conserving payout.
    ReconciliationOverflow {
        campaign_id: Option<CampaignId>,
        message: String,
    },
}

impl MatchError {
    pub(crate) fn malformed(row: Option<usize>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResult {
            row,
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn overflow(campaign_id: Option<CampaignId>, message: impl Into<String>) -> Self {
        Self::ReconciliationOverflow {
            campaign_id,
            message: message.into(),
        }
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidRound(msg) => write!(f, "invalid round: {msg}"),
            Self::MalformedResult { row: Some(row), field, message } => {
                write!(f, "malformed result at row {row}, field '{field}': {message}")
            }
            Self::MalformedResult { row: None, field, message } => {
                write!(f, "malformed result, field '{field}': {message}")
            }
            Self::ReconciliationOverflow { campaign_id: Some(id), message } => {
                write!(f, "reconciliation overflow for campaign {id}: {message}")
            }
            Self::ReconciliationOverflow { campaign_id: None, message } => {
                write!(f, "reconciliation overflow: {message}")
            }
        }
    }
}

impl std::error::Error for MatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display_names_row_and_field() {
        let err = MatchError::malformed(Some(3), "payoutScaled", "not a decimal: 'abc'");
        assert_eq!(
            err.to_string(),
            "malformed result at row 3, field 'payoutScaled': not a decimal: 'abc'"
        );
    }

    #[test]
    fn overflow_display_names_campaign() {
        let err = MatchError::overflow(Some(7), "negative approved amount");
        assert!(err.to_string().contains("campaign 7"));
    }
}
