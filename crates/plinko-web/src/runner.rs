use plinko_engine::{
    AutoBet, BallId, BallInstance, BoardBuffers, ConfigError, EffectInstance, EngineConfig,
    FrameBuffers, FrameError, OutcomeRecord, PlinkoEngine, RiskLevel, Session, SessionError,
};
use plinko_engine::session::STARTING_BALANCE;

/// Wires the session, the auto-bet timer and the engine into one frame
/// callback, and packs the results into flat buffers for JS.
///
/// The web crate keeps a single `thread_local!` PlinkoRunner and exports
/// free functions via `#[wasm_bindgen]`.
pub struct PlinkoRunner {
    engine: PlinkoEngine,
    session: Session,
    auto: AutoBet,
    frame: FrameBuffers,
    board: BoardBuffers,
    /// Flat `[game, profit]` pairs, oldest first.
    history: Vec<f64>,
}

impl PlinkoRunner {
    pub fn new(config: EngineConfig) -> Self {
        let spawn_x = config.board.width / 2.0;
        Self {
            engine: PlinkoEngine::new(config),
            session: Session::new(STARTING_BALANCE, spawn_x),
            auto: AutoBet::new(),
            frame: FrameBuffers::new(),
            board: BoardBuffers::default(),
            history: Vec::with_capacity(100),
        }
    }

    /// Build the session's initial board. Call once after construction.
    pub fn init(&mut self) -> Result<(), ConfigError> {
        let board = self.session.board();
        self.configure(board.rows, board.risk)?;
        self.pack_history();
        Ok(())
    }

    /// Switch boards. Stops auto-bet; balls in flight drop again on the new
    /// board. On error the current board stays.
    pub fn configure(&mut self, rows: u8, risk: RiskLevel) -> Result<(), ConfigError> {
        self.auto.stop();
        let layout = self.engine.configure_board(rows, risk)?;
        self.board = BoardBuffers::from_layout(layout);
        self.session.set_board(layout.config);
        self.engine.sync_active_balls(self.session.active_balls());
        Ok(())
    }

    /// Place one manual bet.
    pub fn drop_ball(&mut self) -> Result<BallId, SessionError> {
        let id = self.session.drop_ball()?;
        self.engine.sync_active_balls(self.session.active_balls());
        Ok(id)
    }

    /// Run one frame: auto-bet, sync, one fixed physics step, settle, sync
    /// again, pack buffers. `dt` only drives the auto-bet timer; physics
    /// always advances by exactly one fixed step.
    ///
    /// A frame that fails still settles and renders what it resolved, then
    /// stops auto-bet and returns the error.
    pub fn tick(&mut self, dt: f32) -> Result<(), ConfigError> {
        self.frame.clear();

        self.auto.tick(dt, &mut self.session);
        self.engine.sync_active_balls(self.session.active_balls());

        let (report, failure) = match self.engine.step_frame() {
            Ok(report) => (report, None),
            Err(FrameError { report, source }) => {
                self.auto.stop();
                (report, Some(source))
            }
        };
        for outcome in &report.outcomes {
            self.session.settle(outcome);
            self.frame.outcomes.push(OutcomeRecord::from(outcome));
        }
        if !report.outcomes.is_empty() {
            self.engine.sync_active_balls(self.session.active_balls());
            self.pack_history();
        }

        let radius = self.engine.config().physics.ball_radius;
        self.frame.balls.extend(
            self.engine
                .balls()
                .map(|b| BallInstance::new(b.pos, b.rotation, radius, b.color)),
        );
        let now = self.engine.now();
        self.frame.effects.extend(
            self.engine
                .effects()
                .iter()
                .map(|e| EffectInstance::from_effect(e, now)),
        );
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn auto_start(&mut self, number_of_bets: u32) {
        self.auto.start(number_of_bets, &mut self.session);
        self.engine.sync_active_balls(self.session.active_balls());
    }

    pub fn auto_stop(&mut self) {
        self.auto.stop();
    }

    /// Release the board and every body. `init` or `configure` brings it back.
    pub fn teardown(&mut self) {
        self.auto.stop();
        self.engine.teardown();
        self.frame.clear();
        self.board = BoardBuffers::default();
    }

    fn pack_history(&mut self) {
        self.history.clear();
        self.history.extend(
            self.session
                .stats()
                .history
                .iter()
                .flat_map(|p| [p.game as f64, p.profit]),
        );
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn engine(&self) -> &PlinkoEngine {
        &self.engine
    }

    pub fn is_auto_betting(&self) -> bool {
        self.auto.is_running()
    }

    // ---- Pointer accessors for JS reads ----

    pub fn balls_ptr(&self) -> *const f32 {
        self.frame.balls_ptr()
    }

    pub fn ball_count(&self) -> u32 {
        self.frame.balls.len() as u32
    }

    pub fn effects_ptr(&self) -> *const f32 {
        self.frame.effects_ptr()
    }

    pub fn effect_count(&self) -> u32 {
        self.frame.effects.len() as u32
    }

    pub fn outcomes_ptr(&self) -> *const f64 {
        self.frame.outcomes_ptr()
    }

    pub fn outcome_count(&self) -> u32 {
        self.frame.outcomes.len() as u32
    }

    pub fn pegs_ptr(&self) -> *const f32 {
        self.board.pegs.as_ptr()
    }

    pub fn peg_count(&self) -> u32 {
        self.board.peg_count() as u32
    }

    pub fn buckets_ptr(&self) -> *const f32 {
        self.board.buckets.as_ptr()
    }

    pub fn bucket_count(&self) -> u32 {
        self.board.bucket_count() as u32
    }

    pub fn history_ptr(&self) -> *const f64 {
        self.history.as_ptr()
    }

    pub fn history_len(&self) -> u32 {
        (self.history.len() / 2) as u32
    }

    pub fn world_width(&self) -> f32 {
        self.engine.config().board.width
    }

    pub fn world_height(&self) -> f32 {
        self.engine.config().board.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> PlinkoRunner {
        let mut runner = PlinkoRunner::new(EngineConfig::default().with_seed(11));
        runner.init().unwrap();
        runner
    }

    /// Tick until `games` balls have been settled.
    fn tick_until_settled(runner: &mut PlinkoRunner, games: u32, max_frames: usize) {
        for _ in 0..max_frames {
            runner.tick(1.0 / 60.0).unwrap();
            if runner.session().stats().games() >= games {
                return;
            }
        }
    }

    #[test]
    fn init_builds_default_board() {
        let runner = runner();
        assert_eq!(runner.bucket_count(), 17);
        assert_eq!(runner.peg_count() as usize, (0..16).map(|i| i + 2).sum::<usize>());
        assert_eq!(runner.history_len(), 1);
        assert_eq!(runner.world_width(), 600.0);
    }

    #[test]
    fn dropped_ball_is_settled_and_removed() {
        let mut runner = runner();
        runner.drop_ball().unwrap();
        assert_eq!(runner.session().balance(), 178.0);

        runner.tick(1.0 / 60.0).unwrap();
        assert_eq!(runner.ball_count(), 1);

        tick_until_settled(&mut runner, 1, 1200);
        let stats = runner.session().stats();
        assert_eq!(stats.games(), 1);
        assert!(runner.session().active_balls().is_empty());
        assert_eq!(runner.engine().live_ball_count(), 0);
        assert_eq!(runner.outcome_count(), 1);
        assert_eq!(runner.ball_count(), 0);
        assert!(runner.effect_count() > 0);
        assert!((runner.session().balance() - (178.0 + 1.0 + stats.profit)).abs() < 1e-9);
        assert_eq!(runner.history_len(), 2);

        // Outcomes are per-frame
        runner.tick(1.0 / 60.0).unwrap();
        assert_eq!(runner.outcome_count(), 0);
    }

    #[test]
    fn auto_bet_drops_and_stops() {
        let mut runner = runner();
        runner.auto_start(3);
        assert!(runner.is_auto_betting());
        assert_eq!(runner.session().active_balls().len(), 1);

        for _ in 0..120 {
            runner.tick(1.0 / 60.0).unwrap();
        }
        assert!(!runner.is_auto_betting());
        // Three bets debited, whatever has landed so far credited
        let stats = runner.session().stats();
        let expected = 176.0 + stats.profit + stats.games() as f64;
        assert!((runner.session().balance() - expected).abs() < 1e-9);
    }

    #[test]
    fn invalid_configure_keeps_board() {
        let mut runner = runner();
        assert!(runner.configure(30, RiskLevel::Low).is_err());
        assert_eq!(runner.bucket_count(), 17);
        runner.configure(8, RiskLevel::High).unwrap();
        assert_eq!(runner.bucket_count(), 9);
        assert_eq!(runner.session().board().rows, 8);
    }

    #[test]
    fn insufficient_funds_leave_world_untouched() {
        let mut runner = runner();
        runner.session_mut().set_bet_amount(500.0).unwrap();
        assert!(matches!(
            runner.drop_ball(),
            Err(SessionError::InsufficientBalance { .. })
        ));
        runner.tick(1.0 / 60.0).unwrap();
        assert_eq!(runner.ball_count(), 0);
    }

    #[test]
    fn teardown_clears_buffers() {
        let mut runner = runner();
        runner.drop_ball().unwrap();
        runner.tick(1.0 / 60.0).unwrap();
        runner.teardown();
        assert_eq!(runner.ball_count(), 0);
        assert_eq!(runner.peg_count(), 0);
        assert!(runner.engine().layout().is_none());
    }
}
