// Property-based tests for pool conservation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use rust_decimal::Decimal;

use qfmatch_engine::codec;
use qfmatch_engine::model::{ApprovedAmount, CampaignEntry};
use qfmatch_engine::{
    distribute, reconcile, AggregatedCampaign, ApprovedResultSet, DistributionEntry, MatchingConfig, QfScore,
    RemainderRule, ResultRow, ReviewSheet, RoundSnapshot,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Positive pool with up to 6 fractional digits.
fn arb_pool() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000_000_000, 0u32..=6).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Non-negative amount, sometimes zero, sometimes with more digits than the
/// currency precision.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        1 => Just(Decimal::ZERO),
        4 => (0i64..=10_000_000_000, 0u32..=8).prop_map(|(m, s)| Decimal::new(m, s)),
    ]
}

fn arb_rule() -> impl Strategy<Value = RemainderRule> {
    prop_oneof![Just(RemainderRule::LargestRemainder), Just(RemainderRule::LargestAllocation)]
}

/// Any decimal a sheet cell may hold, including negatives and trailing zeros.
fn arb_cell_decimal() -> impl Strategy<Value = Decimal> {
    (-999_999_999_999_999i64..=999_999_999_999_999, 0u32..=12).prop_map(|(m, s)| Decimal::new(m, s))
}

fn arb_row(campaign_id: u64) -> impl Strategy<Value = ResultRow> {
    (
        "[ -~\n]{0,24}",
        proptest::option::of("[ -~]{0,8}[!-~]"),
        arb_cell_decimal(),
        arb_cell_decimal(),
        arb_cell_decimal(),
        arb_cell_decimal(),
    )
        .prop_map(move |(title, recipient, suggested, suggested_pct, payout, payout_pct)| ResultRow {
            campaign_id,
            campaign_title: title,
            recipient_address: recipient,
            suggested_match: suggested,
            suggested_share_pct: suggested_pct,
            payout_scaled: payout,
            payout_share_pct: payout_pct,
        })
}

fn arb_sheet() -> impl Strategy<Value = ReviewSheet> {
    (
        proptest::option::of(arb_cell_decimal()),
        proptest::collection::btree_set(any::<u64>(), 0..8),
    )
        .prop_flat_map(|(pool, ids)| {
            let rows: Vec<_> = ids.into_iter().map(arb_row).collect();
            rows.prop_map(move |campaigns| ReviewSheet {
                matching_pool: pool,
                campaigns,
            })
        })
}

fn cell_strings(sheet: &ReviewSheet) -> Vec<String> {
    sheet
        .campaigns
        .iter()
        .flat_map(|c| {
            [
                c.suggested_match.to_string(),
                c.suggested_share_pct.to_string(),
                c.payout_scaled.to_string(),
                c.payout_share_pct.to_string(),
            ]
        })
        .chain(sheet.matching_pool.map(|p| p.to_string()))
        .collect()
}

fn scores_from(amounts: &[Decimal]) -> Vec<QfScore> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, a)| QfScore {
            campaign_id: i as u64 + 1,
            score: *a,
        })
        .collect()
}

fn round_with(pool: Decimal, n: usize) -> RoundSnapshot {
    RoundSnapshot {
        round_id: 1,
        matching_pool: pool,
        token: None,
        campaigns: (1..=n as u64)
            .map(|id| CampaignEntry {
                campaign_id: id,
                title: format!("Campaign {id}"),
                recipient_address: None,
                payments: vec![],
            })
            .collect(),
    }
}

fn empty_aggregates(n: usize) -> Vec<AggregatedCampaign> {
    (1..=n as u64)
        .map(|id| AggregatedCampaign {
            campaign_id: id,
            title: format!("Campaign {id}"),
            contributions_by_contributor: Default::default(),
            unique_contributor_count: 0,
            confirmed_contribution_count: 0,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn distribution_conserves_pool(
        pool in arb_pool(),
        amounts in proptest::collection::vec(arb_amount(), 1..12),
        rule in arb_rule(),
    ) {
        prop_assume!(amounts.iter().any(|a| !a.is_zero()));
        let config = MatchingConfig { remainder: rule, ..MatchingConfig::default() };
        let out = distribute(&config, pool, &scores_from(&amounts)).unwrap();

        let total: Decimal = out.iter().map(|e| e.matching_amount).sum();
        prop_assert_eq!(total, pool);
        for (entry, score) in out.iter().zip(&amounts) {
            prop_assert!(entry.matching_amount >= Decimal::ZERO);
            prop_assert!(entry.matching_amount.scale() <= 6);
            if score.is_zero() {
                prop_assert!(entry.matching_amount.is_zero());
            }
        }
    }

    // Largest-allocation hands every leftover unit to one campaign, so only
    // the default rule keeps equal scores within one unit.
    #[test]
    fn equal_scores_differ_by_at_most_one_unit(
        pool in arb_pool(),
        score in 1i64..=1_000_000_000,
        n in 1usize..10,
    ) {
        let config = MatchingConfig::default();
        let amounts = vec![Decimal::new(score, 3); n];
        let out = distribute(&config, pool, &scores_from(&amounts)).unwrap();

        let max = out.iter().map(|e| e.matching_amount).max().unwrap();
        let min = out.iter().map(|e| e.matching_amount).min().unwrap();
        prop_assert!(max - min <= Decimal::new(1, 6));
    }

    #[test]
    fn reconciled_payouts_conserve_pool(
        pool in arb_pool(),
        approved in proptest::collection::vec(proptest::option::of(arb_amount()), 1..12),
        rule in arb_rule(),
    ) {
        let n = approved.len();
        let config = MatchingConfig { remainder: rule, ..MatchingConfig::default() };
        let round = round_with(pool, n);

        // Everything unapproved falls back to an even suggestion
        let even = vec![Decimal::ONE; n];
        let suggested: Vec<DistributionEntry> = distribute(&config, pool, &scores_from(&even)).unwrap();
        let approved = ApprovedResultSet::new(
            approved
                .iter()
                .enumerate()
                .filter_map(|(i, a)| a.map(|amount| ApprovedAmount { campaign_id: i as u64 + 1, approved_amount: amount }))
                .collect(),
        );
        let nothing_to_pay = suggested.iter().all(|s| {
            approved
                .entries
                .iter()
                .find(|e| e.campaign_id == s.campaign_id)
                .map_or(s.matching_amount, |e| e.approved_amount)
                .is_zero()
        });
        prop_assume!(!nothing_to_pay);

        let report = reconcile(&config, &round, &empty_aggregates(n), &suggested, &approved).unwrap();
        prop_assert_eq!(report.total_payout(), Some(pool));
        prop_assert_eq!(report.campaigns.len(), n);
        for row in &report.campaigns {
            prop_assert!(row.payout_scaled >= Decimal::ZERO);
        }
    }

    #[test]
    fn review_sheet_survives_csv_and_json(sheet in arb_sheet()) {
        let via_csv = codec::from_csv(&codec::to_csv(&sheet).unwrap()).unwrap();
        prop_assert_eq!(&via_csv, &sheet);
        prop_assert_eq!(cell_strings(&via_csv), cell_strings(&sheet));

        let via_json = codec::from_json(&codec::to_json(&sheet).unwrap()).unwrap();
        prop_assert_eq!(&via_json, &sheet);
        prop_assert_eq!(cell_strings(&via_json), cell_strings(&sheet));
    }
}
