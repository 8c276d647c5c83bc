//! Review-sheet serialization: JSON and CSV, both lossless.
//!
//! CSV layout:
//!
//! ```text
//! campaignId,campaignTitle,recipientAddress,suggestedMatch,suggestedSharePct,payoutScaled,payoutSharePct
//! 1,Clean Water,0xabc...,469.359675,46.94,469.359675,46.94
//! # matchingPool=1000
//! ```
//!
//! Header names are matched ignoring case and punctuation, unknown columns are
//! ignored, and `#` lines are comments. The `matchingPool` comment carries the
//! pool so a CSV sheet round-trips like the JSON one.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::model::{
    AggregatedCampaign, ApprovedAmount, ApprovedResultSet, CampaignId, DistributionEntry, ResultReport, ResultRow,
    ReviewSheet, RoundSnapshot,
};
use crate::reconcile::reconcile;

pub const CSV_COLUMNS: [&str; 7] = [
    "campaignId",
    "campaignTitle",
    "recipientAddress",
    "suggestedMatch",
    "suggestedSharePct",
    "payoutScaled",
    "payoutSharePct",
];

const POOL_KEY: &str = "matchingPool";

// ---------------------------------------------------------------------------
// Sheet helpers
// ---------------------------------------------------------------------------

impl From<&ResultReport> for ReviewSheet {
    fn from(report: &ResultReport) -> Self {
        Self::from_report(report)
    }
}

impl ReviewSheet {
    pub fn from_report(report: &ResultReport) -> Self {
        Self {
            matching_pool: Some(report.matching_pool),
            campaigns: report.campaigns.clone(),
        }
    }

    /// Initial sheet for a fresh distribution: every payout starts at its
    /// suggested match.
    pub fn from_distribution(
        config: &MatchingConfig,
        round: &RoundSnapshot,
        aggregated: &[AggregatedCampaign],
        distribution: &[DistributionEntry],
    ) -> Result<Self, MatchError> {
        let report = reconcile(config, round, aggregated, distribution, &ApprovedResultSet::default())?;
        Ok(Self::from_report(&report))
    }

    /// The reviewer's decision: each row's `payoutScaled` is its approved amount.
    pub fn approved(&self) -> ApprovedResultSet {
        ApprovedResultSet::new(
            self.campaigns
                .iter()
                .map(|row| ApprovedAmount {
                    campaign_id: row.campaign_id,
                    approved_amount: row.payout_scaled,
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

pub fn to_json(sheet: &ReviewSheet) -> Result<String, MatchError> {
    serde_json::to_string_pretty(sheet)
        .map_err(|e| MatchError::malformed(None, "json", e.to_string()))
}

pub fn from_json(input: &str) -> Result<ReviewSheet, MatchError> {
    let sheet: ReviewSheet = serde_json::from_str(input).map_err(|e| {
        MatchError::malformed(
            None,
            "json",
            format!("{e} (line {}, column {})", e.line(), e.column()),
        )
    })?;
    check_unique_ids(sheet.campaigns.iter().map(|c| c.campaign_id))?;
    Ok(sheet)
}

pub fn approved_from_json(input: &str) -> Result<ApprovedResultSet, MatchError> {
    from_json(input).map(|sheet| sheet.approved())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn to_csv(sheet: &ReviewSheet) -> Result<String, MatchError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let write_err = |e: csv::Error| MatchError::malformed(None, "csv", e.to_string());

    writer.write_record(CSV_COLUMNS).map_err(write_err)?;
    for row in &sheet.campaigns {
        writer
            .write_record([
                row.campaign_id.to_string(),
                row.campaign_title.clone(),
                row.recipient_address.clone().unwrap_or_default(),
                row.suggested_match.to_string(),
                row.suggested_share_pct.to_string(),
                row.payout_scaled.to_string(),
                row.payout_share_pct.to_string(),
            ])
            .map_err(write_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| MatchError::malformed(None, "csv", e.to_string()))?;
    let mut out =
        String::from_utf8(bytes).map_err(|e| MatchError::malformed(None, "csv", e.to_string()))?;

    if let Some(pool) = sheet.matching_pool {
        out.push_str(&format!("# {POOL_KEY}={pool}\n"));
    }
    Ok(out)
}

pub fn from_csv(input: &str) -> Result<ReviewSheet, MatchError> {
    let matching_pool = read_pool_comment(input)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::Headers)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MatchError::malformed(None, "header", e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    let idx = |name: &str| -> Result<usize, MatchError> {
        let wanted = normalize_header(name);
        headers
            .iter()
            .position(|h| *h == wanted)
            .ok_or_else(|| MatchError::malformed(None, name, "missing required column"))
    };

    let id_idx = idx("campaignId")?;
    let title_idx = idx("campaignTitle")?;
    let recipient_idx = idx("recipientAddress")?;
    let suggested_idx = idx("suggestedMatch")?;
    let suggested_pct_idx = idx("suggestedSharePct")?;
    let payout_idx = idx("payoutScaled")?;
    let payout_pct_idx = idx("payoutSharePct")?;

    let mut campaigns = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| MatchError::malformed(Some(row), "record", e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let id_str = cell(id_idx).trim();
        let campaign_id: CampaignId = id_str.parse().map_err(|_| {
            MatchError::malformed(Some(row), "campaignId", format!("not a campaign id: '{id_str}'"))
        })?;
        let recipient = cell(recipient_idx);

        campaigns.push(ResultRow {
            campaign_id,
            campaign_title: cell(title_idx).to_string(),
            recipient_address: (!recipient.is_empty()).then(|| recipient.to_string()),
            suggested_match: parse_decimal(cell(suggested_idx), Some(row), "suggestedMatch")?,
            suggested_share_pct: parse_decimal(cell(suggested_pct_idx), Some(row), "suggestedSharePct")?,
            payout_scaled: parse_decimal(cell(payout_idx), Some(row), "payoutScaled")?,
            payout_share_pct: parse_decimal(cell(payout_pct_idx), Some(row), "payoutSharePct")?,
        });
    }

    check_unique_ids(campaigns.iter().map(|c| c.campaign_id))?;

    Ok(ReviewSheet {
        matching_pool,
        campaigns,
    })
}

pub fn approved_from_csv(input: &str) -> Result<ApprovedResultSet, MatchError> {
    from_csv(input).map(|sheet| sheet.approved())
}

/// `# matchingPool=<decimal>` on any comment line. Other comments are ignored,
/// and lines inside a quoted multi-line cell are never comments.
fn read_pool_comment(input: &str) -> Result<Option<Decimal>, MatchError> {
    let wanted = normalize_header(POOL_KEY);
    let mut pool = None;
    let mut in_quotes = false;
    for line in input.lines() {
        let comment = if in_quotes { None } else { line.strip_prefix('#') };
        let Some(comment) = comment else {
            // `""` escapes keep the count even
            if line.matches('"').count() % 2 == 1 {
                in_quotes = !in_quotes;
            }
            continue;
        };
        let Some((key, value)) = comment.split_once('=') else {
            continue;
        };
        if normalize_header(key) == wanted {
            pool = Some(parse_decimal(value.trim(), None, POOL_KEY)?);
        }
    }
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// `"Campaign ID"`, `"campaign_id"` and `"campaignId"` all normalize to `"campaignid"`.
fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Plain decimal only: optional leading `-`, digits, at most one `.`.
/// Rejects exponents, thousands separators and currency symbols.
fn parse_decimal(value: &str, row: Option<usize>, field: &str) -> Result<Decimal, MatchError> {
    let value = value.trim();
    let digits = value.strip_prefix('-').unwrap_or(value);
    let plain = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit());
    if !plain {
        return Err(MatchError::malformed(row, field, format!("not a decimal: '{value}'")));
    }
    Decimal::from_str(value).map_err(|e| MatchError::malformed(row, field, format!("'{value}': {e}")))
}

fn check_unique_ids(ids: impl Iterator<Item = CampaignId>) -> Result<(), MatchError> {
    let mut seen: HashSet<CampaignId> = HashSet::new();
    for (i, id) in ids.enumerate() {
        if !seen.insert(id) {
            return Err(MatchError::malformed(
                Some(i + 1),
                "campaignId",
                format!("duplicate campaign id {id}"),
            ));
        }
    }
    Ok(())
}

/// Index approved amounts by campaign, rejecting duplicates.
pub(crate) fn index_approved(
    approved: &ApprovedResultSet,
) -> Result<HashMap<CampaignId, Decimal>, MatchError> {
    check_unique_ids(approved.entries.iter().map(|e| e.campaign_id))?;
    Ok(approved
        .entries
        .iter()
        .map(|e| (e.campaign_id, e.approved_amount))
        .collect())
}
