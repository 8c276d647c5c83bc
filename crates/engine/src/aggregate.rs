use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::error::MatchError;
use crate::model::{AggregatedCampaign, PaymentRecord, RoundSnapshot};

/// Source of per-contributor humanity (anti-Sybil) scores, 0-100.
pub trait HumanityOracle {
    fn humanity_score(&self, contributor_id: &str) -> f64;
}

impl<F> HumanityOracle for F
where
    F: Fn(&str) -> f64,
{
    fn humanity_score(&self, contributor_id: &str) -> f64 {
        self(contributor_id)
    }
}

/// Precomputed scores. Contributors without an entry score 0.
impl HumanityOracle for HashMap<String, f64> {
    fn humanity_score(&self, contributor_id: &str) -> f64 {
        self.get(contributor_id).copied().unwrap_or(0.0)
    }
}

/// Filter qualifying payments and sum them per contributor, one entry per campaign.
///
/// A payment qualifies when it is confirmed, is in the round token (if the
/// round names one) and its contributor scores at least `min_humanity_score`.
/// Campaigns without qualifying payments are kept with an empty map.
///
/// Fails with `InvalidRound` when a contributor's or a campaign's total
/// leaves the `Decimal` range.
pub fn aggregate<H>(
    round: &RoundSnapshot,
    min_humanity_score: f64,
    humanity: &H,
) -> Result<Vec<AggregatedCampaign>, MatchError>
where
    H: HumanityOracle + ?Sized,
{
    // One oracle lookup per contributor per run
    let mut verdicts: HashMap<&str, bool> = HashMap::new();
    let mut excluded = 0usize;
    let mut aggregated = Vec::with_capacity(round.campaigns.len());

    for campaign in &round.campaigns {
        let mut sums: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut count = 0usize;

        for payment in &campaign.payments {
            if !qualifies(payment, round.token.as_deref()) {
                continue;
            }
            let human = *verdicts
                .entry(payment.contributor_id.as_str())
                .or_insert_with(|| humanity.humanity_score(&payment.contributor_id) >= min_humanity_score);
            if !human {
                excluded += 1;
                continue;
            }
            count += 1;
            let total = sums.entry(payment.contributor_id.clone()).or_insert(Decimal::ZERO);
            *total = total.checked_add(payment.amount).ok_or_else(|| {
                MatchError::InvalidRound(format!(
                    "campaign {}: contributions from {} exceed the supported decimal range",
                    campaign.campaign_id, payment.contributor_id
                ))
            })?;
        }

        sums.retain(|_, total| *total > Decimal::ZERO);

        let entry = AggregatedCampaign {
            campaign_id: campaign.campaign_id,
            title: campaign.title.clone(),
            unique_contributor_count: sums.len(),
            contributions_by_contributor: sums,
            confirmed_contribution_count: count,
        };
        if entry.total_contributions().is_none() {
            return Err(MatchError::InvalidRound(format!(
                "campaign {}: total contributions exceed the supported decimal range",
                campaign.campaign_id
            )));
        }
        aggregated.push(entry);
    }

    log::debug!(
        "round {}: aggregated {} campaigns, {} confirmed payments below humanity threshold {}",
        round.round_id,
        aggregated.len(),
        excluded,
        min_humanity_score
    );

    Ok(aggregated)
}

fn qualifies(payment: &PaymentRecord, round_token: Option<&str>) -> bool {
    if !payment.is_confirmed() {
        return false;
    }
    match round_token {
        Some(token) => payment.token.eq_ignore_ascii_case(token),
        None => true,
    }
}
