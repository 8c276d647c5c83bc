use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::aggregate::{aggregate, HumanityOracle};
use crate::config::MatchingConfig;
use crate::distribute::{distribute, pool_units};
use crate::error::MatchError;
use crate::model::{
    AggregatedCampaign, ApprovedResultSet, DistributionEntry, QfScore, ResultReport, ReviewSheet,
    RoundSnapshot,
};
use crate::reconcile::reconcile;
use crate::score::score_all;
use crate::units::checked_sum;

// ---------------------------------------------------------------------------
// Round validation
// ---------------------------------------------------------------------------

/// Structural checks on a round before any computation.
pub fn validate_round(config: &MatchingConfig, round: &RoundSnapshot) -> Result<(), MatchError> {
    pool_units(round.matching_pool, config.precision)?;

    if round.campaigns.is_empty() {
        return Err(MatchError::InvalidRound(format!(
            "round {} has no campaigns",
            round.round_id
        )));
    }

    let mut seen = HashSet::new();
    let mut confirmed_total = Decimal::ZERO;
    for campaign in &round.campaigns {
        if !seen.insert(campaign.campaign_id) {
            return Err(MatchError::InvalidRound(format!(
                "duplicate campaign id {}",
                campaign.campaign_id
            )));
        }
        if let Some(p) = campaign
            .payments
            .iter()
            .find(|p| p.is_confirmed() && p.amount < Decimal::ZERO)
        {
            return Err(MatchError::InvalidRound(format!(
                "campaign {}: negative confirmed amount {} from {}",
                campaign.campaign_id, p.amount, p.contributor_id
            )));
        }
        let confirmed = campaign.payments.iter().filter(|p| p.is_confirmed()).map(|p| &p.amount);
        confirmed_total = checked_sum(confirmed)
            .and_then(|sum| confirmed_total.checked_add(sum))
            .ok_or_else(|| {
                MatchError::InvalidRound(format!(
                    "round {}: confirmed contributions up to campaign {} exceed the supported decimal range",
                    round.round_id, campaign.campaign_id
                ))
            })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Everything computed for a round up to the suggested distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub aggregated: Vec<AggregatedCampaign>,
    pub scores: Vec<QfScore>,
    pub distribution: Vec<DistributionEntry>,
}

impl RoundOutcome {
    /// The suggestion as a sheet for external review: payouts equal the
    /// suggested amounts until a reviewer edits them.
    pub fn review_sheet(&self, config: &MatchingConfig, round: &RoundSnapshot) -> Result<ReviewSheet, MatchError> {
        ReviewSheet::from_distribution(config, round, &self.aggregated, &self.distribution)
    }
}

/// Validate, aggregate, score and distribute one round.
pub fn run<H>(config: &MatchingConfig, round: &RoundSnapshot, humanity: &H) -> Result<RoundOutcome, MatchError>
where
    H: HumanityOracle + ?Sized,
{
    config.validate()?;
    validate_round(config, round)?;

    let aggregated = aggregate(round, config.min_humanity_score, humanity)?;
    let scores = score_all(&aggregated, config.precision)?;
    let distribution = distribute(config, round.matching_pool, &scores)?;

    log::info!(
        "round {}: {} campaigns, pool {} distributed",
        round.round_id,
        distribution.len(),
        round.matching_pool
    );

    Ok(RoundOutcome {
        aggregated,
        scores,
        distribution,
    })
}

/// Full pipeline including reconciliation against `approved`.
pub fn report<H>(
    config: &MatchingConfig,
    round: &RoundSnapshot,
    humanity: &H,
    approved: &ApprovedResultSet,
) -> Result<ResultReport, MatchError>
where
    H: HumanityOracle + ?Sized,
{
    let outcome = run(config, round, humanity)?;
    reconcile(config, round, &outcome.aggregated, &outcome.distribution, approved)
}
