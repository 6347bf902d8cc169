use serde::{Deserialize, Serialize};

use crate::api::error::ConfigError;

/// Caller-assigned identifier of a ball (one per placed bet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u64);

/// Packed 0xRRGGBB color carried by a ball into its visual effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ColorTag(pub u32);

impl ColorTag {
    pub const RED: ColorTag = ColorTag(0xef4444);

    /// Parse a `#rrggbb` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(ColorTag)
    }

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0)
    }
}

impl Default for ColorTag {
    fn default() -> Self {
        Self::RED
    }
}

/// A bet in flight. Owned by the caller; the engine only ever derives a
/// physics body from it and never creates or destroys the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    /// Horizontal drop position before jitter.
    pub spawn_x: f32,
    pub bet_amount: f64,
    #[serde(default)]
    pub color: ColorTag,
}

impl Ball {
    pub fn new(id: BallId, spawn_x: f32, bet_amount: f64) -> Self {
        Self {
            id,
            spawn_x,
            bet_amount,
            color: ColorTag::default(),
        }
    }

    pub fn with_color(mut self, color: ColorTag) -> Self {
        self.color = color;
        self
    }
}

/// Controls how spread out the multipliers of a board are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
}

impl TryFrom<u8> for RiskLevel {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RiskLevel::Low),
            1 => Ok(RiskLevel::Medium),
            2 => Ok(RiskLevel::High),
            other => Err(ConfigError::UnknownRiskLevel(other)),
        }
    }
}

/// The two knobs that define a board. Changing either one means rebuilding
/// both the layout and the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: u8,
    pub risk: RiskLevel,
}

impl BoardConfig {
    /// Smallest row count covered by the built-in multiplier table.
    pub const MIN_ROWS: u8 = 8;
    /// Largest row count covered by the built-in multiplier table.
    pub const MAX_ROWS: u8 = 16;

    pub fn new(rows: u8, risk: RiskLevel) -> Self {
        Self { rows, risk }
    }

    pub fn bucket_count(&self) -> usize {
        self.rows as usize + 1
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 16,
            risk: RiskLevel::Medium,
        }
    }
}

/// A ball's first arrival in a bucket. Raised at most once per ball id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub ball_id: BallId,
    pub bucket_index: usize,
}

/// Monetary result of a resolved ball. Derived, never stored by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutResult {
    pub ball_id: BallId,
    pub bucket_index: usize,
    pub multiplier: f64,
    pub payout: f64,
    pub bet_amount: f64,
    pub is_win: bool,
}

impl PayoutResult {
    /// Payout minus stake; negative on a loss.
    pub fn net(&self) -> f64 {
        self.payout - self.bet_amount
    }
}
