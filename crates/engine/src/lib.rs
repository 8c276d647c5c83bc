//! `qfmatch-engine`: quadratic-funding matching and result reconciliation.
//!
//! Pure engine crate: receives a pre-loaded round snapshot and humanity
//! scores, returns an exact, pool-conserving distribution and payout report.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod apportion;
pub mod codec;
pub mod config;
pub mod distribute;
pub mod engine;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod score;
pub mod simulate;
pub mod units;

pub use aggregate::{aggregate, HumanityOracle};
pub use config::{MatchingConfig, RemainderRule};
pub use distribute::distribute;
pub use engine::{report, run, validate_round, RoundOutcome};
pub use error::MatchError;
pub use model::{
    AggregatedCampaign, ApprovedAmount, ApprovedResultSet, CampaignEntry, DistributionEntry,
    MatchEstimate, PaymentRecord, PaymentStatus, QfScore, ResultReport, ResultRow, ResultTotals,
    ReviewSheet, RoundSnapshot,
};
pub use reconcile::reconcile;
pub use score::{score, score_all};
pub use simulate::estimate_match;
