//! `qfmatch distribute | export | estimate | validate`: commands that work
//! from the round snapshot alone.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use qfmatch_engine::codec;
use qfmatch_engine::{estimate_match, run, validate_round, MatchError, MatchingConfig, RoundOutcome, RoundSnapshot};

use crate::exit_codes::{match_exit_code, ErrorOutput, EXIT_USAGE};
use crate::inputs::{emit, load_config, load_humanity, load_round, SheetFormat};
use crate::{CliError, Context};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributionOutput {
    round_id: u64,
    matching_pool: Decimal,
    campaigns: Vec<DistributionRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributionRow {
    campaign_id: u64,
    title: String,
    unique_contributor_count: usize,
    total_contributions: Decimal,
    score: Decimal,
    matching_amount: Decimal,
}

impl DistributionOutput {
    fn new(round: &RoundSnapshot, outcome: &RoundOutcome) -> Result<Self, MatchError> {
        let campaigns = outcome
            .aggregated
            .iter()
            .zip(&outcome.scores)
            .zip(&outcome.distribution)
            .map(|((agg, score), entry)| {
                let total_contributions = agg.total_contributions().ok_or_else(|| {
                    MatchError::InvalidRound(format!(
                        "campaign {}: total contributions exceed the supported decimal range",
                        agg.campaign_id
                    ))
                })?;
                Ok(DistributionRow {
                    campaign_id: agg.campaign_id,
                    title: agg.title.clone(),
                    unique_contributor_count: agg.unique_contributor_count,
                    total_contributions,
                    score: score.score,
                    matching_amount: entry.matching_amount,
                })
            })
            .collect::<Result<_, MatchError>>()?;
        Ok(Self {
            round_id: round.round_id,
            matching_pool: round.matching_pool,
            campaigns,
        })
    }
}

fn compute(ctx: &Context, round_path: &Path) -> Result<(MatchingConfig, RoundSnapshot, RoundOutcome), CliError> {
    let config = load_config(ctx.config.as_deref(), ctx.min_humanity_score)?;
    let round = load_round(round_path)?;
    let humanity = load_humanity(ctx.humanity.as_deref())?;
    let outcome = run(&config, &round, humanity.as_ref())?;
    Ok((config, round, outcome))
}

// ============================================================================
// distribute
// ============================================================================

pub fn cmd_distribute(ctx: &Context, round_path: PathBuf, json: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let (_, round, outcome) = compute(ctx, &round_path)?;
    let out = DistributionOutput::new(&round, &outcome)?;

    if json || output.is_some() {
        let json_str = serde_json::to_string_pretty(&out).map_err(CliError::serialize)?;
        if let Some(ref path) = output {
            emit(Some(path), &json_str)?;
        }
        if json {
            println!("{json_str}");
        }
    } else {
        print_table(&out);
    }

    let funded = out.campaigns.iter().filter(|c| !c.matching_amount.is_zero()).count();
    eprintln!(
        "round {}: pool {} across {} campaigns ({} funded)",
        out.round_id,
        out.matching_pool,
        out.campaigns.len(),
        funded
    );
    Ok(())
}

fn print_table(out: &DistributionOutput) {
    let title_width = out
        .campaigns
        .iter()
        .map(|c| c.title.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(5, 40);

    println!(
        "{:>10}  {:<tw$}  {:>12}  {:>18}  {:>18}",
        "campaignId",
        "title",
        "contributors",
        "score",
        "matchingAmount",
        tw = title_width
    );
    for c in &out.campaigns {
        let title: String = c.title.chars().take(title_width).collect();
        println!(
            "{:>10}  {:<tw$}  {:>12}  {:>18}  {:>18}",
            c.campaign_id,
            title,
            c.unique_contributor_count,
            c.score.to_string(),
            c.matching_amount.to_string(),
            tw = title_width
        );
    }
}

// ============================================================================
// export
// ============================================================================

pub fn cmd_export(ctx: &Context, round_path: PathBuf, format: SheetFormat, output: Option<PathBuf>) -> Result<(), CliError> {
    let (config, round, outcome) = compute(ctx, &round_path)?;
    let sheet = outcome.review_sheet(&config, &round)?;

    let content = match format {
        SheetFormat::Csv => codec::to_csv(&sheet)?,
        SheetFormat::Json => codec::to_json(&sheet)?,
    };
    emit(output.as_ref(), &content)?;

    log::info!("exported {} campaigns for review", sheet.campaigns.len());
    Ok(())
}

// ============================================================================
// estimate
// ============================================================================

pub fn cmd_estimate(
    ctx: &Context,
    round_path: PathBuf,
    campaign: u64,
    contributor: String,
    amount: String,
) -> Result<(), CliError> {
    let amount = Decimal::from_str(amount.trim()).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("invalid --amount '{amount}': {e}"),
        hint: Some("use a plain decimal, e.g. --amount 25.50".into()),
    })?;

    let config = load_config(ctx.config.as_deref(), ctx.min_humanity_score)?;
    let round = load_round(&round_path)?;
    validate_round(&config, &round)?;
    let humanity = load_humanity(ctx.humanity.as_deref())?;

    let aggregated = qfmatch_engine::aggregate(&round, config.min_humanity_score, humanity.as_ref())?;
    let estimate = estimate_match(&config, round.matching_pool, &aggregated, campaign, &contributor, amount)?;

    let json_str = serde_json::to_string_pretty(&estimate).map_err(CliError::serialize)?;
    println!("{json_str}");
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateOutput {
    valid: bool,
    round_id: u64,
    campaigns: usize,
    payments: usize,
    matching_pool: Decimal,
}

pub fn cmd_validate(ctx: &Context, round_path: PathBuf, json: bool) -> Result<(), CliError> {
    let config = load_config(ctx.config.as_deref(), ctx.min_humanity_score)?;
    let round = load_round(&round_path)?;

    if let Err(err) = validate_round(&config, &round) {
        if json {
            let out = ErrorOutput::from_match_error(&err);
            let json_str = serde_json::to_string_pretty(&out).map_err(CliError::serialize)?;
            println!("{json_str}");
            eprintln!("error: {err}");
            return Err(CliError::silent(match_exit_code(&err)));
        }
        return Err(err.into());
    }

    let out = ValidateOutput {
        valid: true,
        round_id: round.round_id,
        campaigns: round.campaigns.len(),
        payments: round.campaigns.iter().map(|c| c.payments.len()).sum(),
        matching_pool: round.matching_pool,
    };
    if json {
        let json_str = serde_json::to_string_pretty(&out).map_err(CliError::serialize)?;
        println!("{json_str}");
    } else {
        println!(
            "ok: round {}, {} campaigns, {} payments, pool {}",
            out.round_id, out.campaigns, out.payments, out.matching_pool
        );
    }
    Ok(())
}
