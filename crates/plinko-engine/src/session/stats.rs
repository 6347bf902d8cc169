use std::collections::VecDeque;

use serde::Serialize;

use crate::api::types::PayoutResult;

/// Cumulative profit after a numbered game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfitPoint {
    pub game: u64,
    pub profit: f64,
}

/// Bounded ring of the most recent profit points, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitHistory {
    points: VecDeque<ProfitPoint>,
    capacity: usize,
    next_game: u64,
}

impl ProfitHistory {
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Starts with the `(0, 0.0)` origin point.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut points = VecDeque::with_capacity(capacity);
        points.push_back(ProfitPoint {
            game: 0,
            profit: 0.0,
        });
        Self {
            points,
            capacity,
            next_game: 1,
        }
    }

    /// Record the cumulative profit after the next game, evicting the
    /// oldest point when full.
    pub fn push(&mut self, profit: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(ProfitPoint {
            game: self.next_game,
            profit,
        });
        self.next_game += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfitPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&ProfitPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ProfitHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Running win/loss tally of a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    /// Sum of `payout - bet` over every settled ball.
    pub profit: f64,
    pub wins: u32,
    pub losses: u32,
    pub history: ProfitHistory,
}

impl Stats {
    pub fn record(&mut self, result: &PayoutResult) {
        self.profit += result.net();
        if result.is_win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.history.push(self.profit);
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }
}
