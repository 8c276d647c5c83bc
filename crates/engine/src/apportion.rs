//! Exact-sum proportional split of an integer total.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;

use crate::config::RemainderRule;
use crate::model::CampaignId;

/// Split `total` units across entries proportionally to `weights`.
///
/// Every share is first floored, then the leftover units (always fewer than
/// the number of entries with a non-zero remainder) are handed out per `rule`.
/// The result sums to `total` exactly. Entries with zero weight receive zero.
/// `keys` break ties, ascending. Output order follows input order.
///
/// Callers must ensure at least one weight is non-zero.
pub fn apportion(
    total: &BigUint,
    weights: &[BigUint],
    keys: &[CampaignId],
    rule: RemainderRule,
) -> Vec<BigUint> {
    debug_assert_eq!(weights.len(), keys.len());
    let weight_sum: BigUint = weights.iter().sum();
    debug_assert!(!weight_sum.is_zero());

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for w in weights {
        let (share, rem) = (total * w).div_rem(&weight_sum);
        shares.push(share);
        remainders.push(rem);
    }

    let allocated: BigUint = shares.iter().sum();
    let mut leftover = total - &allocated;
    if leftover.is_zero() {
        return shares;
    }

    match rule {
        RemainderRule::LargestRemainder => {
            let mut order: Vec<usize> = (0..shares.len()).collect();
            order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(keys[a].cmp(&keys[b])));
            for i in order {
                if leftover.is_zero() {
                    break;
                }
                shares[i] += 1u32;
                leftover -= 1u32;
            }
        }
        RemainderRule::LargestAllocation => {
            let winner = (0..shares.len())
                .filter(|&i| !weights[i].is_zero())
                .max_by(|&a, &b| shares[a].cmp(&shares[b]).then(keys[b].cmp(&keys[a])));
            if let Some(i) = winner {
                shares[i] += leftover;
            }
        }
    }

    shares
}
