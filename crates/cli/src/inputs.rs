//! File loading and output writing shared by every subcommand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use qfmatch_engine::codec;
use qfmatch_engine::{ApprovedResultSet, HumanityOracle, MatchingConfig, RoundSnapshot};

use crate::exit_codes::{EXIT_INVALID_ROUND, EXIT_USAGE};
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SheetFormat {
    Csv,
    Json,
}

impl SheetFormat {
    /// Explicit format, else the file extension.
    pub fn resolve(explicit: Option<SheetFormat>, path: &Path) -> Result<SheetFormat, CliError> {
        if let Some(format) = explicit {
            return Ok(format);
        }
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("csv") => Ok(SheetFormat::Csv),
            Some("json") => Ok(SheetFormat::Json),
            _ => Err(CliError {
                code: EXIT_USAGE,
                message: format!("cannot infer sheet format of {}", path.display()),
                hint: Some("pass --format csv or --format json".into()),
            }),
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

/// Matching config from `--config`, defaults otherwise, then CLI overrides.
pub fn load_config(path: Option<&Path>, min_humanity_score: Option<f64>) -> Result<MatchingConfig, CliError> {
    let mut config = match path {
        Some(path) => MatchingConfig::from_toml(&read(path)?).map_err(CliError::from)?,
        None => MatchingConfig::default(),
    };
    if let Some(score) = min_humanity_score {
        config.min_humanity_score = score;
        config.validate().map_err(CliError::from)?;
    }
    log::debug!(
        "config: precision {}, percent decimals {}, min humanity {}, remainder {}",
        config.precision,
        config.percent_decimals,
        config.min_humanity_score,
        config.remainder
    );
    Ok(config)
}

pub fn load_round(path: &Path) -> Result<RoundSnapshot, CliError> {
    let data = read(path)?;
    serde_json::from_str(&data).map_err(|e| CliError {
        code: EXIT_INVALID_ROUND,
        message: format!("cannot parse round {}: {e}", path.display()),
        hint: Some("amounts must be decimal strings, e.g. \"matchingPool\": \"1000.50\"".into()),
    })
}

#[derive(Deserialize)]
struct HumanityRow {
    #[serde(rename = "contributorId", alias = "contributor_id")]
    contributor_id: String,
    score: f64,
}

/// Humanity scores from a `contributorId,score` CSV. Without a file every
/// contributor passes the threshold.
pub fn load_humanity(path: Option<&Path>) -> Result<Box<dyn HumanityOracle>, CliError> {
    let Some(path) = path else {
        log::warn!("no --humanity file given; humanity filtering is disabled");
        return Ok(Box::new(|_: &str| 100.0));
    };

    let data = read(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut scores = HashMap::new();
    for (i, row) in reader.deserialize::<HumanityRow>().enumerate() {
        let row = row.map_err(|e| CliError {
            code: EXIT_INVALID_ROUND,
            message: format!("{} row {}: {e}", path.display(), i + 1),
            hint: Some("expected columns contributorId,score".into()),
        })?;
        scores.insert(row.contributor_id, row.score);
    }
    log::info!("loaded {} humanity scores from {}", scores.len(), path.display());
    Ok(Box::new(scores))
}

pub fn load_approved(path: &Path, format: Option<SheetFormat>) -> Result<ApprovedResultSet, CliError> {
    let data = read(path)?;
    let approved = match SheetFormat::resolve(format, path)? {
        SheetFormat::Csv => codec::approved_from_csv(&data),
        SheetFormat::Json => codec::approved_from_json(&data),
    }
    .map_err(|e| CliError::from(e).with_hint(format!("fix {} and re-run", path.display())))?;
    log::info!("loaded {} approved amounts from {}", approved.len(), path.display());
    Ok(approved)
}

/// Write to `output` when given, stdout otherwise.
pub fn emit(output: Option<&PathBuf>, content: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
