use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::units::checked_sum;

pub type CampaignId = u64;
pub type ContributorId = String;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Immutable input for one computation run, as handed over by the storage layer.
///
/// Monetary fields are decimal strings on the wire (`"1000.50"`), never JSON
/// numbers, so nothing passes through binary floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub matching_pool: Decimal,
    /// Round token. When set, payments in any other token do not qualify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub campaigns: Vec<CampaignEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignEntry {
    pub campaign_id: CampaignId,
    pub title: String,
    /// A blank address is read as `None`.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub recipient_address: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub amount: Decimal,
    pub token: String,
    pub status: PaymentStatus,
    pub contributor_id: ContributorId,
}

impl PaymentRecord {
    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Confirmed,
    Pending,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Pending => write!(f, "pending"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation + scoring
// ---------------------------------------------------------------------------

/// Qualifying contributions of one campaign, summed per contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedCampaign {
    pub campaign_id: CampaignId,
    pub title: String,
    /// Only contributors with a positive total are present. A total finer
    /// than the scoring precision still counts here but adds nothing to the
    /// QF score.
    pub contributions_by_contributor: BTreeMap<ContributorId, Decimal>,
    pub unique_contributor_count: usize,
    /// Raw count of qualifying confirmed payments, not deduplicated by contributor.
    pub confirmed_contribution_count: usize,
}

impl AggregatedCampaign {
    /// `None` when the total leaves the `Decimal` range.
    pub fn total_contributions(&self) -> Option<Decimal> {
        checked_sum(self.contributions_by_contributor.values())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QfScore {
    pub campaign_id: CampaignId,
    pub score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEntry {
    pub campaign_id: CampaignId,
    pub matching_amount: Decimal,
}

// ---------------------------------------------------------------------------
// Review + approval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedAmount {
    pub campaign_id: CampaignId,
    pub approved_amount: Decimal,
}

/// Reviewer-approved payouts. May omit campaigns; omitted campaigns keep
/// their suggested amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovedResultSet {
    pub entries: Vec<ApprovedAmount>,
}

impl ApprovedResultSet {
    pub fn new(entries: Vec<ApprovedAmount>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One campaign line of a report or review sheet. Column order matches the CSV schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub campaign_id: CampaignId,
    pub campaign_title: String,
    /// Reports never carry `Some("")`; a blank address is `None`, which the
    /// CSV form writes as an empty cell.
    pub recipient_address: Option<String>,
    pub suggested_match: Decimal,
    pub suggested_share_pct: Decimal,
    pub payout_scaled: Decimal,
    pub payout_share_pct: Decimal,
}

/// The document exchanged with reviewers, as JSON or CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSheet {
    #[serde(default)]
    pub matching_pool: Option<Decimal>,
    pub campaigns: Vec<ResultRow>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTotals {
    pub total_donations: Decimal,
    pub total_suggested_match: Decimal,
    pub confirmed_contribution_count: usize,
    /// Distinct contributors across the whole round.
    pub unique_contributor_count: usize,
    pub total_recipients: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub round_id: u64,
    pub matching_pool: Decimal,
    /// Factor applied to approved amounts to reach the pool; `1` when no rescale happened.
    pub ratio: Decimal,
    pub rescaled: bool,
    pub totals: ResultTotals,
    pub campaigns: Vec<ResultRow>,
}

impl ResultReport {
    pub fn total_payout(&self) -> Option<Decimal> {
        checked_sum(self.campaigns.iter().map(|c| &c.payout_scaled))
    }
}

/// What-if result for a hypothetical contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEstimate {
    pub campaign_id: CampaignId,
    pub baseline_match: Decimal,
    pub estimated_match: Decimal,
    pub marginal_match: Decimal,
}
