use crate::api::types::BallId;
use crate::core::time::Interval;
use crate::session::Session;

/// Seconds between automatic drops.
pub const AUTO_BET_INTERVAL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetMode {
    Manual,
    Auto,
}

/// Periodic ball dropper driven by frame deltas.
///
/// Places at most one bet per tick. Halts on its own when the requested
/// number of bets has been placed or a bet is rejected.
pub struct AutoBet {
    interval: Interval,
    running: bool,
    /// Bets to place before stopping. The immediate first bet is always
    /// placed, so 0 behaves like 1.
    target: u32,
    placed: u32,
}

impl AutoBet {
    pub fn new() -> Self {
        Self::with_interval(AUTO_BET_INTERVAL)
    }

    pub fn with_interval(period: f32) -> Self {
        Self {
            interval: Interval::new(period),
            running: false,
            target: 0,
            placed: 0,
        }
    }

    /// Start a run and place its first bet immediately.
    pub fn start(&mut self, number_of_bets: u32, session: &mut Session) -> Option<BallId> {
        self.running = true;
        self.target = number_of_bets;
        self.placed = 0;
        self.interval.reset();
        log::debug!("Auto-bet started ({} bets)", number_of_bets);
        self.fire(session)
    }

    /// Halt the run. No bet is placed after this returns, however much
    /// time had accumulated.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("Auto-bet stopped after {} bets", self.placed);
        }
        self.running = false;
        self.interval.reset();
    }

    /// Advance the timer; places one bet when a period has elapsed.
    pub fn tick(&mut self, frame_dt: f32, session: &mut Session) -> Option<BallId> {
        if !self.running || !self.interval.tick(frame_dt) {
            return None;
        }
        self.fire(session)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> BetMode {
        if self.running {
            BetMode::Auto
        } else {
            BetMode::Manual
        }
    }

    /// Bets placed by the current (or last) run.
    pub fn placed(&self) -> u32 {
        self.placed
    }

    fn fire(&mut self, session: &mut Session) -> Option<BallId> {
        match session.drop_ball() {
            Ok(id) => {
                self.placed += 1;
                if self.placed >= self.target {
                    self.stop();
                }
                Some(id)
            }
            Err(e) => {
                log::info!("Auto-bet halted: {}", e);
                self.stop();
                None
            }
        }
    }
}

impl Default for AutoBet {
    fn default() -> Self {
        Self::new()
    }
}
