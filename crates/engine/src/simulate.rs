//! What-if estimate of the match a new contribution would unlock.

use rust_decimal::Decimal;

use crate::config::MatchingConfig;
use crate::distribute::{distribute, pool_units};
use crate::error::MatchError;
use crate::model::{AggregatedCampaign, CampaignId, MatchEstimate};
use crate::score::score_all;

/// Estimate the match `campaign_id` would receive if `contributor_id` gave
/// `amount` more, against the current aggregates.
///
/// A non-positive `amount` yields an all-zero estimate. When the current
/// round has nothing to distribute yet the baseline is zero.
pub fn estimate_match(
    config: &MatchingConfig,
    pool: Decimal,
    aggregated: &[AggregatedCampaign],
    campaign_id: CampaignId,
    contributor_id: &str,
    amount: Decimal,
) -> Result<MatchEstimate, MatchError> {
    let Some(target) = aggregated.iter().position(|a| a.campaign_id == campaign_id) else {
        return Err(MatchError::InvalidRound(format!(
            "campaign {campaign_id} is not part of the round"
        )));
    };

    if amount <= Decimal::ZERO {
        return Ok(MatchEstimate {
            campaign_id,
            baseline_match: Decimal::ZERO,
            estimated_match: Decimal::ZERO,
            marginal_match: Decimal::ZERO,
        });
    }
    pool_units(pool, config.precision)?;

    let baseline_match = match_for(config, pool, aggregated, target)?;

    let mut simulated = aggregated.to_vec();
    let campaign = &mut simulated[target];
    let entry = campaign
        .contributions_by_contributor
        .entry(contributor_id.to_string())
        .or_insert(Decimal::ZERO);
    if entry.is_zero() {
        campaign.unique_contributor_count += 1;
    }
    *entry = entry.checked_add(amount).ok_or_else(|| {
        MatchError::InvalidRound(format!(
            "campaign {campaign_id}: {contributor_id} plus {amount} exceeds the supported decimal range"
        ))
    })?;
    campaign.confirmed_contribution_count += 1;

    let estimated_match = match_for(config, pool, &simulated, target)?;
    let marginal_match = (estimated_match - baseline_match).max(Decimal::ZERO);

    log::debug!(
        "campaign {}: +{} from {} -> match {} (baseline {})",
        campaign_id,
        amount,
        contributor_id,
        estimated_match,
        baseline_match
    );

    Ok(MatchEstimate {
        campaign_id,
        baseline_match,
        estimated_match,
        marginal_match,
    })
}

/// Matching amount of `aggregated[index]`, zero when the round is not distributable.
fn match_for(
    config: &MatchingConfig,
    pool: Decimal,
    aggregated: &[AggregatedCampaign],
    index: usize,
) -> Result<Decimal, MatchError> {
    let scores = score_all(aggregated, config.precision)?;
    match distribute(config, pool, &scores) {
        Ok(entries) => Ok(entries[index].matching_amount),
        Err(MatchError::InvalidRound(_)) => Ok(Decimal::ZERO),
        Err(e) => Err(e),
    }
}
