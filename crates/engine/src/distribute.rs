use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;

use crate::apportion::apportion;
use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::model::{CampaignId, DistributionEntry, QfScore};
use crate::units::{common_scale_weights, from_units, to_units_exact};

/// Pool in smallest units, or `InvalidRound` when it is not a positive amount
/// representable at `precision`.
pub(crate) fn pool_units(pool: Decimal, precision: u32) -> Result<BigUint, MatchError> {
    if pool <= Decimal::ZERO {
        return Err(MatchError::InvalidRound(format!(
            "matching pool must be positive, got {pool}"
        )));
    }
    to_units_exact(pool, precision).ok_or_else(|| {
        MatchError::InvalidRound(format!(
            "matching pool {pool} has more than {precision} fractional digits"
        ))
    })
}

/// Allocate `pool` across campaigns proportionally to their QF scores.
///
/// Amounts are floored to the configured precision and the leftover units
/// are distributed by `config.remainder`, so the result sums to `pool`
/// exactly. Output order follows `scores`.
pub fn distribute(
    config: &MatchingConfig,
    pool: Decimal,
    scores: &[QfScore],
) -> Result<Vec<DistributionEntry>, MatchError> {
    let total = pool_units(pool, config.precision)?;

    if scores.is_empty() {
        return Err(MatchError::InvalidRound("round has no campaigns".into()));
    }

    let values: Vec<Decimal> = scores.iter().map(|s| s.score).collect();
    let weights = common_scale_weights(&values).ok_or_else(|| {
        MatchError::InvalidRound("QF scores must be non-negative".into())
    })?;
    if weights.iter().all(|w| w.is_zero()) {
        return Err(MatchError::InvalidRound(
            "no campaign has a qualifying contribution".into(),
        ));
    }

    let keys: Vec<CampaignId> = scores.iter().map(|s| s.campaign_id).collect();
    let shares = apportion(&total, &weights, &keys, config.remainder);

    let entries = scores
        .iter()
        .zip(&shares)
        .map(|(s, share)| {
            let matching_amount = from_units(share, config.precision).ok_or_else(|| {
                MatchError::InvalidRound(format!(
                    "campaign {}: matching amount exceeds the supported decimal range",
                    s.campaign_id
                ))
            })?;
            Ok(DistributionEntry {
                campaign_id: s.campaign_id,
                matching_amount,
            })
        })
        .collect::<Result<Vec<_>, MatchError>>()?;

    log::debug!(
        "distributed {} across {} campaigns ({} rule, precision {})",
        pool,
        entries.len(),
        config.remainder,
        config.precision
    );

    Ok(entries)
}
