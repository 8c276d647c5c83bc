use std::collections::{BTreeSet, HashMap};

use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::apportion::apportion;
use crate::codec::index_approved;
use crate::config::MatchingConfig;
use crate::distribute::pool_units;
use crate::error::MatchError;
use crate::model::{
    AggregatedCampaign, ApprovedResultSet, CampaignId, DistributionEntry, ResultReport, ResultRow,
    ResultTotals, RoundSnapshot,
};
use crate::units::{checked_sum, common_scale_weights, from_units, to_units_exact};

/// Build the final payout report from the suggestion and a reviewer's
/// approved amounts.
///
/// Campaigns missing from `approved` keep their suggested amount. When the
/// resulting payouts do not already sum to the pool at the configured
/// precision, they are rescaled proportionally with the distributor's
/// remainder rule so `Σ payoutScaled == matchingPool` holds exactly.
pub fn reconcile(
    config: &MatchingConfig,
    round: &RoundSnapshot,
    aggregated: &[AggregatedCampaign],
    suggested: &[DistributionEntry],
    approved: &ApprovedResultSet,
) -> Result<ResultReport, MatchError> {
    let pool = round.matching_pool;
    let total_units = pool_units(pool, config.precision)?;

    let suggested_by_id: HashMap<CampaignId, Decimal> = suggested
        .iter()
        .map(|e| (e.campaign_id, e.matching_amount))
        .collect();
    let approved_by_id = index_approved(approved)?;

    for (i, entry) in approved.entries.iter().enumerate() {
        if !round.campaigns.iter().any(|c| c.campaign_id == entry.campaign_id) {
            return Err(MatchError::malformed(
                Some(i + 1),
                "campaignId",
                format!("campaign {} is not part of round {}", entry.campaign_id, round.round_id),
            ));
        }
        if entry.approved_amount.is_sign_negative() && !entry.approved_amount.is_zero() {
            return Err(MatchError::overflow(
                Some(entry.campaign_id),
                format!("negative approved amount {}", entry.approved_amount),
            ));
        }
    }

    let ids: Vec<CampaignId> = round.campaigns.iter().map(|c| c.campaign_id).collect();
    let suggested_amounts: Vec<Decimal> = ids
        .iter()
        .map(|id| suggested_by_id.get(id).copied().unwrap_or(Decimal::ZERO))
        .collect();
    let payouts: Vec<Decimal> = ids
        .iter()
        .zip(&suggested_amounts)
        .map(|(id, s)| approved_by_id.get(id).copied().unwrap_or(*s))
        .collect();

    let raw_sum = ids.iter().zip(&payouts).try_fold(Decimal::ZERO, |acc, (id, p)| {
        acc.checked_add(*p).ok_or_else(|| {
            MatchError::overflow(Some(*id), "approved total exceeds the supported decimal range")
        })
    })?;
    let exact: Option<Vec<BigUint>> = if raw_sum == pool {
        payouts
            .iter()
            .map(|p| to_units_exact(*p, config.precision))
            .collect()
    } else {
        None
    };

    let rescaled = exact.is_none();
    let shares = match exact {
        Some(units) => units,
        None => rescale(config, &total_units, &payouts, &ids)?,
    };

    let ratio = if rescaled {
        pool.checked_div(raw_sum)
            .map(|r| r.round_dp(config.precision))
            .ok_or_else(|| MatchError::overflow(None, "pool to approved-total ratio is out of range"))?
    } else {
        Decimal::ONE
    };

    let payout_scaled: Vec<Decimal> = ids
        .iter()
        .zip(&shares)
        .map(|(id, units)| {
            from_units(units, config.precision).ok_or_else(|| {
                MatchError::overflow(Some(*id), "scaled payout exceeds the supported decimal range")
            })
        })
        .collect::<Result<_, _>>()?;

    let total_suggested = checked_sum(&suggested_amounts)
        .ok_or_else(|| MatchError::overflow(None, "suggested total exceeds the supported decimal range"))?;
    let total_payout = checked_sum(&payout_scaled)
        .ok_or_else(|| MatchError::overflow(None, "payout total exceeds the supported decimal range"))?;

    let mut campaigns = Vec::with_capacity(round.campaigns.len());
    for ((campaign, suggested_match), payout) in round
        .campaigns
        .iter()
        .zip(&suggested_amounts)
        .zip(&payout_scaled)
    {
        campaigns.push(ResultRow {
            campaign_id: campaign.campaign_id,
            campaign_title: campaign.title.clone(),
            recipient_address: campaign
                .recipient_address
                .clone()
                .filter(|address| !address.trim().is_empty()),
            suggested_match: *suggested_match,
            suggested_share_pct: share_pct(*suggested_match, total_suggested, config.percent_decimals)?,
            payout_scaled: *payout,
            payout_share_pct: share_pct(*payout, total_payout, config.percent_decimals)?,
        });
    }

    let totals = totals(aggregated, total_suggested, campaigns.len())?;

    if rescaled {
        log::debug!(
            "round {}: rescaled approved total {} to pool {} (ratio {})",
            round.round_id,
            raw_sum,
            pool,
            ratio
        );
    }

    Ok(ResultReport {
        round_id: round.round_id,
        matching_pool: pool,
        ratio,
        rescaled,
        totals,
        campaigns,
    })
}

fn rescale(
    config: &MatchingConfig,
    total_units: &BigUint,
    payouts: &[Decimal],
    ids: &[CampaignId],
) -> Result<Vec<BigUint>, MatchError> {
    let weights = common_scale_weights(payouts)
        .ok_or_else(|| MatchError::overflow(None, "payouts must be non-negative"))?;
    if weights.iter().all(|w| w.is_zero()) {
        return Err(MatchError::overflow(
            None,
            "all approved amounts are zero, nothing to scale to the pool",
        ));
    }
    Ok(apportion(total_units, &weights, ids, config.remainder))
}

/// `part / total * 100`, half-even at `decimals`. Zero when `total` is zero.
fn share_pct(part: Decimal, total: Decimal, decimals: u32) -> Result<Decimal, MatchError> {
    let mut pct = if total.is_zero() {
        Decimal::ZERO
    } else {
        part.checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|p| p.checked_div(total))
            .ok_or_else(|| MatchError::overflow(None, "share percentage is out of range"))?
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven)
    };
    pct.rescale(decimals);
    Ok(pct)
}

fn totals(
    aggregated: &[AggregatedCampaign],
    total_suggested: Decimal,
    total_recipients: usize,
) -> Result<ResultTotals, MatchError> {
    let contributors: BTreeSet<&str> = aggregated
        .iter()
        .flat_map(|a| a.contributions_by_contributor.keys().map(String::as_str))
        .collect();

    let total_donations = aggregated
        .iter()
        .try_fold(Decimal::ZERO, |acc, a| a.total_contributions().and_then(|t| acc.checked_add(t)))
        .ok_or_else(|| MatchError::InvalidRound("total donations exceed the supported decimal range".into()))?;

    Ok(ResultTotals {
        total_donations,
        total_suggested_match: total_suggested,
        confirmed_contribution_count: aggregated.iter().map(|a| a.confirmed_contribution_count).sum(),
        unique_contributor_count: contributors.len(),
        total_recipients,
    })
}
