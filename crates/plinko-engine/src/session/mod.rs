//! Caller-side bookkeeping around the engine: the wallet, the active-ball
//! set, statistics and the auto-bet timer. Talks to the engine only through
//! the ball list it hands to `sync_active_balls` and the payouts it settles.

pub mod autobet;
pub mod stats;

pub use autobet::{AutoBet, BetMode};
pub use stats::{ProfitHistory, ProfitPoint, Stats};

use crate::api::error::SessionError;
use crate::api::types::{Ball, BallId, BoardConfig, ColorTag, PayoutResult};

pub const STARTING_BALANCE: f64 = 179.0;
pub const DEFAULT_BET: f64 = 1.0;

pub struct Session {
    balance: f64,
    bet_amount: f64,
    board: BoardConfig,
    /// Balls in flight, in drop order.
    active: Vec<Ball>,
    next_id: u64,
    spawn_x: f32,
    color: ColorTag,
    stats: Stats,
}

impl Session {
    /// New balls drop from `spawn_x` (normally the board's horizontal center).
    pub fn new(balance: f64, spawn_x: f32) -> Self {
        Self {
            balance,
            bet_amount: DEFAULT_BET,
            board: BoardConfig::default(),
            active: Vec::new(),
            next_id: 1,
            spawn_x,
            color: ColorTag::RED,
            stats: Stats::default(),
        }
    }

    /// Place a bet: debit the stake and add a ball to the active set.
    /// A rejected bet leaves the balance and the active set untouched.
    pub fn drop_ball(&mut self) -> Result<BallId, SessionError> {
        let bet = self.bet_amount;
        if !bet.is_finite() || bet <= 0.0 {
            return Err(SessionError::InvalidBet(bet));
        }
        if self.balance < bet {
            return Err(SessionError::InsufficientBalance {
                balance: self.balance,
                bet,
            });
        }

        let id = BallId(self.next_id);
        self.next_id += 1;
        self.balance -= bet;
        self.active
            .push(Ball::new(id, self.spawn_x, bet).with_color(self.color));
        Ok(id)
    }

    /// Credit a payout and retire its ball from the active set.
    /// Returns `false` (and changes nothing) if the ball is not active.
    pub fn settle(&mut self, result: &PayoutResult) -> bool {
        let Some(index) = self.active.iter().position(|b| b.id == result.ball_id) else {
            log::debug!("Ignoring settlement of inactive ball {}", result.ball_id.0);
            return false;
        };
        self.active.remove(index);
        self.balance += result.payout;
        self.stats.record(result);
        true
    }

    pub fn add_funds(&mut self, amount: f64) -> Result<(), SessionError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SessionError::InvalidDeposit(amount));
        }
        self.balance += amount;
        Ok(())
    }

    pub fn set_bet_amount(&mut self, amount: f64) -> Result<(), SessionError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SessionError::InvalidBet(amount));
        }
        self.bet_amount = amount;
        Ok(())
    }

    pub fn halve_bet(&mut self) {
        self.bet_amount /= 2.0;
    }

    pub fn double_bet(&mut self) {
        self.bet_amount *= 2.0;
    }

    pub fn set_board(&mut self, board: BoardConfig) {
        self.board = board;
    }

    pub fn set_color(&mut self, color: ColorTag) {
        self.color = color;
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn bet_amount(&self) -> f64 {
        self.bet_amount
    }

    pub fn board(&self) -> BoardConfig {
        self.board
    }

    pub fn active_balls(&self) -> &[Ball] {
        &self.active
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(STARTING_BALANCE, 300.0)
    }
}
