//! `qfmatch reconcile`: approved review sheet in, payout report out.

use std::path::PathBuf;

use qfmatch_engine::report;

use crate::inputs::{emit, load_approved, load_config, load_humanity, load_round, SheetFormat};
use crate::{CliError, Context};

pub fn cmd_reconcile(
    ctx: &Context,
    round_path: PathBuf,
    approved_path: PathBuf,
    format: Option<SheetFormat>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(ctx.config.as_deref(), ctx.min_humanity_score)?;
    let round = load_round(&round_path)?;
    let approved = load_approved(&approved_path, format)?;
    let humanity = load_humanity(ctx.humanity.as_deref())?;

    if approved.len() < round.campaigns.len() {
        log::warn!(
            "{} of {} campaigns have no approved amount; keeping their suggestion",
            round.campaigns.len() - approved.len(),
            round.campaigns.len()
        );
    }

    let report = report(&config, &round, humanity.as_ref(), &approved)?;

    let json_str = serde_json::to_string_pretty(&report).map_err(CliError::serialize)?;
    emit(output.as_ref(), &json_str)?;

    if report.rescaled {
        eprintln!(
            "round {}: approved amounts rescaled to pool {} (ratio {})",
            report.round_id, report.matching_pool, report.ratio
        );
    } else {
        eprintln!(
            "round {}: approved amounts match pool {}",
            report.round_id, report.matching_pool
        );
    }
    Ok(())
}
