use thiserror::Error;

use crate::api::engine::FrameReport;
use crate::api::types::RiskLevel;

/// Board configuration failures. All of them are fatal to the operation that
/// raised them; nothing is left half-built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no multiplier sequence for {risk:?} risk with {rows} rows")]
    UnsupportedBoard { risk: RiskLevel, rows: u8 },

    /// A sensor reported a bucket the multiplier sequence does not have.
    /// Layout and physics disagree about the bucket labeling.
    #[error("bucket index {index} outside multiplier sequence of length {len}")]
    BucketOutOfRange { index: usize, len: usize },

    #[error("malformed multiplier table: {0}")]
    MalformedTable(String),

    #[error("unknown risk level index {0}")]
    UnknownRiskLevel(u8),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A frame in which at least one ball reported a bucket the multiplier
/// sequence does not have.
///
/// The frame still ran to completion: every other resolution was priced and
/// is in `report`, and every resolved body was removed, the failed ones
/// included. `source` is the first failure.
#[derive(Debug, Error)]
#[error("frame {}: {}", .report.frame, .source)]
pub struct FrameError {
    pub report: FrameReport,
    #[source]
    pub source: ConfigError,
}

/// Caller-side bet placement failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("insufficient balance: {balance:.2} available, {bet:.2} required")]
    InsufficientBalance { balance: f64, bet: f64 },

    #[error("invalid bet amount {0}")]
    InvalidBet(f64),

    #[error("invalid deposit amount {0}")]
    InvalidDeposit(f64),
}
