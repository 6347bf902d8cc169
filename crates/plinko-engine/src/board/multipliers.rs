use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::error::ConfigError;
use crate::api::types::{BoardConfig, RiskLevel};

const LOW: [&[f64]; 9] = [
    &[5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6],
    &[5.6, 2.0, 1.6, 1.0, 0.7, 0.7, 1.0, 1.6, 2.0, 5.6],
    &[8.9, 3.0, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 3.0, 8.9],
    &[8.4, 3.0, 1.9, 1.3, 1.0, 0.7, 0.7, 1.0, 1.3, 1.9, 3.0, 8.4],
    &[10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0],
    &[8.1, 4.0, 3.0, 1.9, 1.2, 0.9, 0.7, 0.7, 0.9, 1.2, 1.9, 3.0, 4.0, 8.1],
    &[7.1, 4.0, 1.9, 1.4, 1.3, 1.1, 1.0, 0.5, 1.0, 1.1, 1.3, 1.4, 1.9, 4.0, 7.1],
    &[15.0, 8.0, 3.0, 2.0, 1.5, 1.1, 1.0, 0.7, 0.7, 1.0, 1.1, 1.5, 2.0, 3.0, 8.0, 15.0],
    &[16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0],
];

const MEDIUM: [&[f64]; 9] = [
    &[13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0],
    &[18.0, 4.0, 1.7, 0.9, 0.5, 0.5, 0.9, 1.7, 4.0, 18.0],
    &[22.0, 5.0, 2.0, 1.4, 0.6, 0.4, 0.6, 1.4, 2.0, 5.0, 22.0],
    &[24.0, 6.0, 3.0, 1.8, 0.7, 0.5, 0.5, 0.7, 1.8, 3.0, 6.0, 24.0],
    &[33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0],
    &[43.0, 13.0, 6.0, 3.0, 1.3, 0.7, 0.4, 0.4, 0.7, 1.3, 3.0, 6.0, 13.0, 43.0],
    &[58.0, 15.0, 7.0, 4.0, 1.9, 1.0, 0.5, 0.2, 0.5, 1.0, 1.9, 4.0, 7.0, 15.0, 58.0],
    &[88.0, 18.0, 11.0, 5.0, 3.0, 1.3, 0.5, 0.3, 0.3, 0.5, 1.3, 3.0, 5.0, 11.0, 18.0, 88.0],
    &[110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0],
];

const HIGH: [&[f64]; 9] = [
    &[29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0],
    &[43.0, 7.0, 2.0, 0.6, 0.2, 0.2, 0.6, 2.0, 7.0, 43.0],
    &[76.0, 10.0, 3.0, 0.9, 0.3, 0.2, 0.3, 0.9, 3.0, 10.0, 76.0],
    &[120.0, 14.0, 5.2, 1.4, 0.4, 0.2, 0.2, 0.4, 1.4, 5.2, 14.0, 120.0],
    &[170.0, 24.0, 8.1, 2.0, 0.7, 0.2, 0.2, 0.2, 0.7, 2.0, 8.1, 24.0, 170.0],
    &[260.0, 37.0, 11.0, 4.0, 1.0, 0.2, 0.2, 0.2, 0.2, 1.0, 4.0, 11.0, 37.0, 260.0],
    &[420.0, 56.0, 18.0, 5.0, 1.9, 0.3, 0.2, 0.2, 0.2, 0.3, 1.9, 5.0, 18.0, 56.0, 420.0],
    &[620.0, 83.0, 27.0, 8.0, 3.0, 0.5, 0.2, 0.2, 0.2, 0.2, 0.5, 3.0, 8.0, 27.0, 83.0, 620.0],
    &[1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0, 1000.0],
];

/// Payout multipliers keyed by risk level, then row count.
/// Each sequence has `rows + 1` entries, one per bucket, left to right.
///
/// The engine consumes the table; it never computes multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiplierTable {
    sequences: BTreeMap<RiskLevel, BTreeMap<u8, Vec<f64>>>,
}

impl MultiplierTable {
    /// The stock table covering every risk level for 8..=16 rows.
    pub fn builtin() -> Self {
        let mut sequences = BTreeMap::new();
        for (risk, rows) in [
            (RiskLevel::Low, &LOW),
            (RiskLevel::Medium, &MEDIUM),
            (RiskLevel::High, &HIGH),
        ] {
            let by_rows = rows
                .iter()
                .enumerate()
                .map(|(i, seq)| (BoardConfig::MIN_ROWS + i as u8, seq.to_vec()))
                .collect();
            sequences.insert(risk, by_rows);
        }
        Self { sequences }
    }

    /// Parse and validate a table from JSON, e.g.
    /// `{ "Low": { "8": [5.6, 2.1, ...] }, "High": { ... } }`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Check every sequence: `rows + 1` entries, symmetric, finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (risk, by_rows) in &self.sequences {
            for (&rows, seq) in by_rows {
                if seq.len() != rows as usize + 1 {
                    return Err(ConfigError::MalformedTable(format!(
                        "{risk:?}/{rows}: expected {} multipliers, found {}",
                        rows as usize + 1,
                        seq.len()
                    )));
                }
                if seq.iter().any(|m| !m.is_finite() || *m < 0.0) {
                    return Err(ConfigError::MalformedTable(format!(
                        "{risk:?}/{rows}: multipliers must be finite and non-negative"
                    )));
                }
                if !is_palindrome(seq) {
                    return Err(ConfigError::MalformedTable(format!(
                        "{risk:?}/{rows}: sequence is not symmetric"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The ordered multiplier sequence for a board.
    pub fn sequence(&self, config: &BoardConfig) -> Result<&[f64], ConfigError> {
        self.sequences
            .get(&config.risk)
            .and_then(|by_rows| by_rows.get(&config.rows))
            .map(Vec::as_slice)
            .ok_or(ConfigError::UnsupportedBoard {
                risk: config.risk,
                rows: config.rows,
            })
    }

    /// The multiplier of one bucket.
    pub fn multiplier(&self, config: &BoardConfig, bucket_index: usize) -> Result<f64, ConfigError> {
        let seq = self.sequence(config)?;
        seq.get(bucket_index)
            .copied()
            .ok_or(ConfigError::BucketOutOfRange {
                index: bucket_index,
                len: seq.len(),
            })
    }

    pub fn supports(&self, config: &BoardConfig) -> bool {
        self.sequence(config).is_ok()
    }

    /// Every (risk, rows) pair the table has a sequence for.
    pub fn configs(&self) -> impl Iterator<Item = BoardConfig> + '_ {
        self.sequences.iter().flat_map(|(&risk, by_rows)| {
            by_rows.keys().map(move |&rows| BoardConfig::new(rows, risk))
        })
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_palindrome(seq: &[f64]) -> bool {
    seq.iter().eq(seq.iter().rev())
}
