// qfmatch CLI - quadratic-funding matching rounds and payout reconciliation

mod exit_codes;
mod inputs;
mod reconcile;
mod round;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{match_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS};
use inputs::SheetFormat;

#[derive(Parser)]
#[command(name = "qfmatch")]
#[command(about = "Quadratic-funding matching and payout reconciliation")]
#[command(version)]
struct Cli {
    /// Matching config (TOML). Defaults apply when omitted.
    #[arg(long, global = true, env = "QFMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Humanity scores CSV (contributorId,score). Without it nobody is filtered.
    #[arg(long, global = true, env = "QFMATCH_HUMANITY")]
    humanity: Option<PathBuf>,

    /// Override the config's minimum humanity score (0-100)
    #[arg(long, global = true)]
    min_humanity_score: Option<f64>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the suggested matching distribution of a round
    #[command(after_help = "\
Examples:
  qfmatch distribute round.json --humanity scores.csv
  qfmatch distribute round.json --json
  qfmatch distribute round.json --output distribution.json")]
    Distribute {
        /// Round snapshot (JSON)
        round: PathBuf,

        /// Print JSON to stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Export the suggestion as a review sheet for manual approval
    #[command(after_help = "\
Examples:
  qfmatch export round.json --format csv -o review.csv
  qfmatch export round.json --format json")]
    Export {
        /// Round snapshot (JSON)
        round: PathBuf,

        /// Sheet format
        #[arg(long, short = 'f', value_enum, default_value = "csv")]
        format: SheetFormat,

        /// Write the sheet to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Reconcile an approved review sheet into the final payout report
    #[command(after_help = "\
Examples:
  qfmatch reconcile round.json review.csv
  qfmatch reconcile round.json approved.json -o report.json
  qfmatch reconcile round.json edited.txt --format csv")]
    Reconcile {
        /// Round snapshot (JSON)
        round: PathBuf,

        /// Approved review sheet (CSV or JSON)
        approved: PathBuf,

        /// Sheet format (default: from file extension)
        #[arg(long, short = 'f', value_enum)]
        format: Option<SheetFormat>,

        /// Write the report to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Estimate the match a new contribution would unlock
    #[command(after_help = "\
Examples:
  qfmatch estimate round.json --campaign 3 --contributor 0xabc --amount 25")]
    Estimate {
        /// Round snapshot (JSON)
        round: PathBuf,

        /// Campaign receiving the contribution
        #[arg(long)]
        campaign: u64,

        /// Contributor making it
        #[arg(long)]
        contributor: String,

        /// Contribution amount (decimal)
        #[arg(long)]
        amount: String,
    },

    /// Check a config and round without computing anything
    #[command(after_help = "\
Examples:
  qfmatch validate round.json --config matching.toml
  qfmatch validate round.json --json")]
    Validate {
        /// Round snapshot (JSON)
        round: PathBuf,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options every subcommand reads.
pub struct Context {
    pub config: Option<PathBuf>,
    pub humanity: Option<PathBuf>,
    pub min_humanity_score: Option<f64>,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context {
        config: cli.config,
        humanity: cli.humanity,
        min_humanity_score: cli.min_humanity_score,
    };

    let result = match cli.command {
        Commands::Distribute { round, json, output } => round::cmd_distribute(&ctx, round, json, output),
        Commands::Export { round, format, output } => round::cmd_export(&ctx, round, format, output),
        Commands::Reconcile { round, approved, format, output } => {
            reconcile::cmd_reconcile(&ctx, round, approved, format, output)
        }
        Commands::Estimate { round, campaign, contributor, amount } => {
            round::cmd_estimate(&ctx, round, campaign, contributor, amount)
        }
        Commands::Validate { round, json } => round::cmd_validate(&ctx, round, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Failure that has already been reported on stdout/stderr.
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    pub fn serialize(err: serde_json::Error) -> Self {
        Self { code: EXIT_ERROR, message: format!("JSON serialization error: {err}"), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<qfmatch_engine::MatchError> for CliError {
    fn from(err: qfmatch_engine::MatchError) -> Self {
        Self {
            code: match_exit_code(&err),
            message: err.to_string(),
            hint: None,
        }
    }
}
