use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use qfmatch_engine::codec::{approved_from_csv, from_csv, from_json, to_csv, to_json};
use qfmatch_engine::{
    estimate_match, report, run, ApprovedResultSet, MatchError, MatchingConfig, RoundSnapshot,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_round() -> RoundSnapshot {
    serde_json::from_str(&read_fixture("round.json")).unwrap()
}

fn load_config() -> MatchingConfig {
    MatchingConfig::from_toml(&read_fixture("matching.toml")).unwrap()
}

fn load_humanity() -> HashMap<String, f64> {
    let data = read_fixture("humanity.csv");
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    reader
        .deserialize::<(String, f64)>()
        .map(|r| r.unwrap())
        .collect()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// -------------------------------------------------------------------------
// Suggestion
// -------------------------------------------------------------------------

#[test]
fn fixture_round_reproduces_worked_example() {
    let outcome = run(&load_config(), &load_round(), &load_humanity()).unwrap();

    let amounts: Vec<String> = outcome
        .distribution
        .iter()
        .map(|d| d.matching_amount.to_string())
        .collect();
    assert_eq!(amounts, vec!["469.359675", "530.640325", "0.000000"]);

    let scores: Vec<String> = outcome.scores.iter().map(|s| s.score.to_string()).collect();
    assert_eq!(scores, vec!["69.622336", "78.712384", "0.000000"]);
}

#[test]
fn pending_failed_bot_and_foreign_token_are_excluded() {
    let outcome = run(&load_config(), &load_round(), &load_humanity()).unwrap();

    let clean_water = &outcome.aggregated[0];
    assert_eq!(clean_water.contributions_by_contributor["u2"], dec("20"));
    assert_eq!(clean_water.confirmed_contribution_count, 2);

    let garden = &outcome.aggregated[1];
    assert!(!garden.contributions_by_contributor.contains_key("bot1"));
    assert_eq!(garden.contributions_by_contributor["u4"], dec("25"));

    let library = &outcome.aggregated[2];
    assert!(library.contributions_by_contributor.is_empty());
}

#[test]
fn lowering_threshold_admits_the_bot() {
    let config = MatchingConfig {
        min_humanity_score: 0.0,
        ..load_config()
    };
    let outcome = run(&config, &load_round(), &load_humanity()).unwrap();
    assert!(outcome.aggregated[1].contributions_by_contributor.contains_key("bot1"));
    assert!(outcome.distribution[1].matching_amount > dec("530.640325"));
}

// -------------------------------------------------------------------------
// Review hand-off
// -------------------------------------------------------------------------

#[test]
fn review_sheet_survives_csv_and_json() {
    let config = load_config();
    let round = load_round();
    let sheet = run(&config, &round, &load_humanity())
        .unwrap()
        .review_sheet(&config, &round)
        .unwrap();

    assert_eq!(from_csv(&to_csv(&sheet).unwrap()).unwrap(), sheet);
    assert_eq!(from_json(&to_json(&sheet).unwrap()).unwrap(), sheet);

    let pcts: Vec<String> = sheet
        .campaigns
        .iter()
        .map(|c| c.suggested_share_pct.to_string())
        .collect();
    assert_eq!(pcts, vec!["46.94", "53.06", "0.00"]);
}

#[test]
fn unedited_sheet_reconciles_without_rescale() {
    let config = load_config();
    let round = load_round();
    let humanity = load_humanity();
    let sheet = run(&config, &round, &humanity)
        .unwrap()
        .review_sheet(&config, &round)
        .unwrap();

    let approved = approved_from_csv(&to_csv(&sheet).unwrap()).unwrap();
    let report = report(&config, &round, &humanity, &approved).unwrap();
    assert!(!report.rescaled);
    assert_eq!(report.ratio, Decimal::ONE);
    assert_eq!(report.total_payout(), Some(round.matching_pool));
}

#[test]
fn edited_sheet_is_rescaled_to_pool() {
    let config = load_config();
    let round = load_round();
    let approved = approved_from_csv(&read_fixture("approved.csv")).unwrap();
    let report = report(&config, &round, &load_humanity(), &approved).unwrap();

    assert!(report.rescaled);
    assert_eq!(report.ratio, dec("2"));
    let payouts: Vec<Decimal> = report.campaigns.iter().map(|c| c.payout_scaled).collect();
    assert_eq!(payouts, vec![dec("500"), dec("500"), dec("0")]);
    assert_eq!(report.total_payout(), Some(dec("1000")));

    assert_eq!(report.campaigns[2].campaign_title, "Library, East Wing");
    assert_eq!(report.campaigns[2].recipient_address, None);
}

#[test]
fn report_totals_cover_the_round() {
    let config = load_config();
    let report = report(&config, &load_round(), &load_humanity(), &ApprovedResultSet::default()).unwrap();

    assert_eq!(report.round_id, 7);
    assert_eq!(report.totals.total_donations, dec("75"));
    assert_eq!(report.totals.confirmed_contribution_count, 4);
    assert_eq!(report.totals.unique_contributor_count, 4);
    assert_eq!(report.totals.total_suggested_match, dec("1000"));
    assert_eq!(report.totals.total_recipients, 3);
}

#[test]
fn approved_sheet_for_another_round_is_rejected() {
    let config = load_config();
    let bad = read_fixture("approved.csv").replace("\n3,", "\n33,");
    let approved = approved_from_csv(&bad).unwrap();
    let err = report(&config, &load_round(), &load_humanity(), &approved).unwrap_err();
    assert!(matches!(err, MatchError::MalformedResult { row: Some(3), .. }));
}

// -------------------------------------------------------------------------
// Degenerate rounds
// -------------------------------------------------------------------------

#[test]
fn confirmed_only_filtering_matches_plain_round() {
    let config = MatchingConfig {
        min_humanity_score: 0.0,
        ..MatchingConfig::default()
    };
    let noisy: RoundSnapshot = serde_json::from_str(
        r#"{"roundId": 1, "matchingPool": "100", "campaigns": [
            {"campaignId": 1, "title": "A", "payments": [
                {"amount": "10", "token": "USDC", "status": "confirmed", "contributorId": "x"},
                {"amount": "1000", "token": "USDC", "status": "pending", "contributorId": "y"}]},
            {"campaignId": 2, "title": "B", "payments": [
                {"amount": "10", "token": "USDC", "status": "confirmed", "contributorId": "z"}]}]}"#,
    )
    .unwrap();
    let humanity: HashMap<String, f64> = HashMap::new();
    let outcome = run(&config, &noisy, &humanity).unwrap();
    assert_eq!(outcome.scores[0].score, outcome.scores[1].score);
    assert_eq!(outcome.distribution[0].matching_amount, dec("50"));
}

#[test]
fn blank_recipient_survives_csv_review() {
    let config = MatchingConfig {
        min_humanity_score: 0.0,
        ..MatchingConfig::default()
    };
    let round: RoundSnapshot = serde_json::from_str(
        r#"{"roundId": 2, "matchingPool": "10", "campaigns": [
            {"campaignId": 1, "title": "A", "recipientAddress": "", "payments": [
                {"amount": "4", "token": "USDC", "status": "confirmed", "contributorId": "x"}]},
            {"campaignId": 2, "title": "B", "recipientAddress": "0xb", "payments": []}]}"#,
    )
    .unwrap();
    assert_eq!(round.campaigns[0].recipient_address, None);

    let humanity: HashMap<String, f64> = HashMap::new();
    let report = report(&config, &round, &humanity, &ApprovedResultSet::default()).unwrap();
    let sheet = qfmatch_engine::ReviewSheet::from_report(&report);
    assert_eq!(from_csv(&to_csv(&sheet).unwrap()).unwrap(), sheet);
}

#[test]
fn oversized_round_is_invalid_not_a_crash() {
    let round: RoundSnapshot = serde_json::from_str(
        r#"{"roundId": 3, "matchingPool": "100", "campaigns": [
            {"campaignId": 1, "title": "A", "payments": [
                {"amount": "50000000000000000000000000000", "token": "USDC", "status": "confirmed", "contributorId": "u"},
                {"amount": "50000000000000000000000000000", "token": "USDC", "status": "confirmed", "contributorId": "u"}]}]}"#,
    )
    .unwrap();
    let humanity: HashMap<String, f64> = HashMap::new();
    let config = MatchingConfig {
        min_humanity_score: 0.0,
        ..MatchingConfig::default()
    };
    assert!(matches!(run(&config, &round, &humanity), Err(MatchError::InvalidRound(_))));
}

#[test]
fn rounds_without_match_are_invalid() {
    let config = load_config();
    let humanity = load_humanity();

    let mut round = load_round();
    round.matching_pool = Decimal::ZERO;
    assert!(matches!(run(&config, &round, &humanity), Err(MatchError::InvalidRound(_))));

    let mut round = load_round();
    round.campaigns.clear();
    assert!(matches!(run(&config, &round, &humanity), Err(MatchError::InvalidRound(_))));

    let nobody: HashMap<String, f64> = HashMap::new();
    assert!(matches!(run(&config, &load_round(), &nobody), Err(MatchError::InvalidRound(_))));
}

// -------------------------------------------------------------------------
// Estimates
// -------------------------------------------------------------------------

#[test]
fn estimate_for_fixture_round() {
    let config = load_config();
    let round = load_round();
    let outcome = run(&config, &round, &load_humanity()).unwrap();

    let est = estimate_match(&config, round.matching_pool, &outcome.aggregated, 3, "u6", dec("4")).unwrap();
    assert!(est.baseline_match.is_zero());
    assert!(est.estimated_match > Decimal::ZERO);
    assert_eq!(est.marginal_match, est.estimated_match);
}
