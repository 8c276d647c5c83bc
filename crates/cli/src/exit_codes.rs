//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: payout scripts branch on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unknown format)          |
//! | 3    | Invalid round, or round/humanity input won't parse   |
//! | 4    | Malformed review sheet or approved result set        |
//! | 5    | Approved amounts cannot be reconciled to the pool    |
//! | 6    | Matching config could not be parsed or is invalid    |
//! | 7    | Input/output failure (missing file, unwritable path) |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `match_exit_code` or the command's error handling

use qfmatch_engine::MatchError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Round cannot produce a distribution, or round/humanity input does not parse.
pub const EXIT_INVALID_ROUND: u8 = 3;

/// Review sheet or approved set failed to parse (row/field in message).
pub const EXIT_MALFORMED_RESULT: u8 = 4;

/// Approved amounts cannot be rescaled into an exact payout.
pub const EXIT_RECONCILIATION_OVERFLOW: u8 = 5;

/// Config parse or validation failure.
pub const EXIT_CONFIG: u8 = 6;

/// File read/write failure.
pub const EXIT_IO: u8 = 7;

/// Map an engine error to its exit code.
pub fn match_exit_code(err: &MatchError) -> u8 {
    match err {
        MatchError::InvalidRound(_) => EXIT_INVALID_ROUND,
        MatchError::MalformedResult { .. } => EXIT_MALFORMED_RESULT,
        MatchError::ReconciliationOverflow { .. } => EXIT_RECONCILIATION_OVERFLOW,
        MatchError::ConfigParse(_) | MatchError::ConfigValidation(_) => EXIT_CONFIG,
    }
}

/// Stable machine-readable name of an engine error.
pub fn match_error_kind(err: &MatchError) -> &'static str {
    match err {
        MatchError::InvalidRound(_) => "invalid_round",
        MatchError::MalformedResult { .. } => "malformed_result",
        MatchError::ReconciliationOverflow { .. } => "reconciliation_overflow",
        MatchError::ConfigParse(_) => "config_parse",
        MatchError::ConfigValidation(_) => "config_validation",
    }
}

/// Structured error output for `--json` commands.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<u64>,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn from_match_error(err: &MatchError) -> Self {
        let (row, field, campaign_id) = match err {
            MatchError::MalformedResult { row, field, .. } => (*row, Some(field.clone()), None),
            MatchError::ReconciliationOverflow { campaign_id, .. } => (None, None, *campaign_id),
            _ => (None, None, None),
        };
        Self {
            error: match_error_kind(err),
            message: err.to_string(),
            row,
            field,
            campaign_id,
            exit_code: match_exit_code(err),
        }
    }
}
