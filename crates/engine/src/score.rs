use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::MatchError;
use crate::model::{AggregatedCampaign, QfScore};
use crate::units::{from_units, to_units_floor};

/// Fewest fractional digits scores are computed at, whatever the currency precision.
pub const MIN_SCORE_PRECISION: u32 = 6;

/// Quadratic-funding score `(Σ sqrt(contribution))²` of one campaign.
///
/// Contributions are taken in smallest units at `precision`, raised to
/// [`MIN_SCORE_PRECISION`] when coarser (finer digits truncated), and each
/// square root is the floor integer root of those units. The squared sum is
/// again in smallest units, so the returned score carries exactly that many
/// fractional digits. A contributor whose total is below one unit adds nothing.
pub fn score(aggregated: &AggregatedCampaign, precision: u32) -> Result<QfScore, MatchError> {
    let precision = precision.max(MIN_SCORE_PRECISION);
    let raw = raw_score(aggregated, precision);
    let score = from_units(&raw, precision).ok_or_else(|| {
        MatchError::InvalidRound(format!(
            "campaign {}: QF score exceeds the supported decimal range",
            aggregated.campaign_id
        ))
    })?;

    log::trace!(
        "campaign {} score {} ({} contributors)",
        aggregated.campaign_id,
        score,
        aggregated.unique_contributor_count
    );

    Ok(QfScore {
        campaign_id: aggregated.campaign_id,
        score,
    })
}

/// Score every campaign, preserving order.
pub fn score_all(aggregated: &[AggregatedCampaign], precision: u32) -> Result<Vec<QfScore>, MatchError> {
    aggregated.iter().map(|a| score(a, precision)).collect()
}

fn raw_score(aggregated: &AggregatedCampaign, precision: u32) -> BigUint {
    let root_sum: BigUint = aggregated
        .contributions_by_contributor
        .values()
        .filter_map(|amount| to_units_floor(*amount, precision))
        .filter(|units| !units.is_zero())
        .map(|units| units.sqrt())
        .sum();
    &root_sum * &root_sum
}
