use glam::Vec2;

use crate::api::config::EngineConfig;
use crate::api::error::{ConfigError, FrameError};
use crate::api::types::{Ball, BallId, BoardConfig, CollisionEvent, ColorTag, PayoutResult, RiskLevel};
use crate::board::layout::{generate_layout, BoardLayout};
use crate::board::multipliers::MultiplierTable;
use crate::core::physics::{PhysicsBackend, PhysicsWorld, RawContact};
use crate::sim::arena::BodyArena;
use crate::sim::payout::calculate_payout;
use crate::sim::resolver::CollisionResolver;
use crate::sim::stall::StallWatch;
use crate::sim::statics;
use crate::sim::sync::{BallSetSynchronizer, SyncReport};
use crate::systems::effects::{EffectScheduler, TransientEffect};

/// Callback invoked once per resolved ball, inside the resolving frame.
pub type OutcomeHandler = Box<dyn FnMut(&PayoutResult)>;

/// What one [`PlinkoEngine::step_frame`] produced.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Frames stepped since the board was configured.
    pub frame: u64,
    pub events: Vec<CollisionEvent>,
    /// One per priced event, same order. A frame that fails with
    /// [`FrameError`] has fewer outcomes than events.
    pub outcomes: Vec<PayoutResult>,
}

/// A ball still in flight, for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallView {
    pub id: BallId,
    pub pos: Vec2,
    pub rotation: f32,
    pub color: ColorTag,
}

/// Drop simulation and outcome resolution for one board at a time.
///
/// The caller owns the balls. Each frame it hands the engine its active set
/// with [`sync_active_balls`](Self::sync_active_balls), advances the world
/// with [`step_frame`](Self::step_frame) and settles the payouts that come
/// back. A resolved ball's body is removed before `step_frame` returns.
pub struct PlinkoEngine<B: PhysicsBackend = PhysicsWorld> {
    config: EngineConfig,
    table: MultiplierTable,
    backend: B,
    board: Option<BoardLayout>,
    arena: BodyArena<B::Handle>,
    sync: BallSetSynchronizer,
    resolver: CollisionResolver,
    stall: StallWatch,
    effects: EffectScheduler,
    on_outcome: Option<OutcomeHandler>,
    contacts: Vec<RawContact>,
    frame: u64,
}

impl PlinkoEngine<PhysicsWorld> {
    /// Rapier-backed engine with the built-in multiplier table.
    pub fn new(config: EngineConfig) -> Self {
        let world = PhysicsWorld::new(config.physics.gravity_vec());
        Self::with_backend(config, MultiplierTable::builtin(), world)
    }
}

impl<B: PhysicsBackend> PlinkoEngine<B> {
    pub fn with_backend(config: EngineConfig, table: MultiplierTable, mut backend: B) -> Self {
        backend.set_dt(config.fixed_dt);
        Self {
            sync: BallSetSynchronizer::new(config.spawn, config.physics, config.seed),
            effects: EffectScheduler::new(config.effects),
            stall: StallWatch::new(config.stall),
            config,
            table,
            backend,
            board: None,
            arena: BodyArena::new(),
            resolver: CollisionResolver::new(),
            on_outcome: None,
            contacts: Vec::with_capacity(32),
            frame: 0,
        }
    }

    /// Build (or rebuild) the board.
    ///
    /// On error nothing changes: the previous board, its bodies and its
    /// balls stay as they were. On success every body is replaced, so balls
    /// still in flight are dropped again on the next sync.
    pub fn configure_board(&mut self, rows: u8, risk: RiskLevel) -> Result<&BoardLayout, ConfigError> {
        let layout = generate_layout(BoardConfig::new(rows, risk), &self.table, &self.config.board)?;

        self.backend.clear();
        self.arena = BodyArena::new();
        self.effects.clear();
        self.contacts.clear();
        self.frame = 0;
        statics::populate(&mut self.backend, &layout, &self.config.physics);

        log::info!(
            "Board configured: {} rows, {:?} risk, {} pegs, {} buckets",
            rows,
            risk,
            layout.pegs.len(),
            layout.buckets.len()
        );
        Ok(self.board.insert(layout))
    }

    /// Reconcile the simulated balls with the caller's active set.
    /// A no-op until a board is configured.
    pub fn sync_active_balls(&mut self, balls: &[Ball]) -> SyncReport {
        if self.board.is_none() {
            return SyncReport::default();
        }
        self.sync.reconcile(&mut self.backend, &mut self.arena, balls)
    }

    /// Register the outcome callback, replacing any previous one.
    pub fn on_outcome(&mut self, handler: impl FnMut(&PayoutResult) + 'static) {
        self.on_outcome = Some(Box::new(handler));
    }

    /// Advance one fixed timestep and resolve every ball that reached a bucket.
    ///
    /// For each resolution, in order: price it, notify the outcome callback,
    /// raise its effects, remove its body. Balls that have come to rest
    /// short of the buckets are then nudged loose.
    ///
    /// A sensor naming a bucket the multiplier table does not have fails the
    /// frame, but only after every resolution in it has been handled: the
    /// valid ones are priced as usual and every resolved body is removed.
    /// The completed report travels inside the [`FrameError`].
    pub fn step_frame(&mut self) -> Result<FrameReport, FrameError> {
        let Some(layout) = self.board.as_ref() else {
            return Ok(FrameReport::default());
        };

        self.contacts.clear();
        self.backend.step_into(&mut self.contacts);
        self.frame += 1;
        let now = self.now();

        for (_, slot) in self.arena.live_mut() {
            if let Some((pos, rotation)) = slot.handle.and_then(|h| self.backend.body_position(h)) {
                self.stall.observe(slot, pos);
                slot.pos = pos;
                slot.rotation = rotation;
            }
        }

        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };
        self.resolver
            .resolve(&mut self.arena, &self.contacts, &mut report.events);

        let mut failure = None;
        for event in &report.events {
            let Some(slot) = self.arena.get(event.ball_id) else {
                continue;
            };
            let (bet, color, pos) = (slot.bet_amount, slot.color, slot.pos);
            match calculate_payout(*event, bet, &layout.config, &self.table) {
                Ok(result) => {
                    log::debug!(
                        "Ball {} landed in bucket {}: {}x, payout {:.2}",
                        event.ball_id.0,
                        event.bucket_index,
                        result.multiplier,
                        result.payout
                    );
                    if let Some(handler) = self.on_outcome.as_mut() {
                        handler(&result);
                    }
                    self.effects.emit(&result, pos, color, layout, now);
                    report.outcomes.push(result);
                }
                Err(e) => {
                    log::error!("Ball {} could not be priced: {}", event.ball_id.0, e);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
            self.sync.retire(&mut self.backend, &mut self.arena, event.ball_id);
        }

        self.stall
            .nudge_stalled(&mut self.backend, &mut self.arena, layout.dimensions.width / 2.0);
        self.effects.purge(now);
        match failure {
            Some(source) => Err(FrameError { report, source }),
            None => Ok(report),
        }
    }

    /// Release every body and the outcome callback. The engine is back to
    /// its unconfigured state and can be configured again.
    pub fn teardown(&mut self) {
        let released = self.arena.drain_handles().len();
        self.backend.clear();
        self.board = None;
        self.effects.clear();
        self.contacts.clear();
        self.on_outcome = None;
        self.frame = 0;
        log::info!("Board torn down ({} balls in flight released)", released);
    }

    /// Balls that still have a body, in id order.
    pub fn balls(&self) -> impl Iterator<Item = BallView> + '_ {
        self.arena.live().map(|(id, slot)| BallView {
            id,
            pos: slot.pos,
            rotation: slot.rotation,
            color: slot.color,
        })
    }

    pub fn ball_position(&self, id: BallId) -> Option<Vec2> {
        self.arena
            .get(id)
            .filter(|slot| !slot.is_tombstone())
            .map(|slot| slot.pos)
    }

    pub fn layout(&self) -> Option<&BoardLayout> {
        self.board.as_ref()
    }

    pub fn effects(&self) -> &[TransientEffect] {
        self.effects.effects()
    }

    /// Simulation time in seconds since the board was configured.
    pub fn now(&self) -> f32 {
        self.frame as f32 * self.config.fixed_dt
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn live_ball_count(&self) -> usize {
        self.arena.live_count()
    }

    pub fn body_count(&self) -> usize {
        self.backend.body_count()
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    /// How many times a stalled ball has been nudged.
    pub fn stall_nudges(&self) -> u64 {
        self.stall.nudges()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &MultiplierTable {
        &self.table
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::SpawnConfig;
    use crate::core::physics::BodyTag;
    use crate::core::scripted::ScriptedWorld;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scripted_engine() -> PlinkoEngine<ScriptedWorld> {
        let config = EngineConfig {
            spawn: SpawnConfig {
                jitter: 0.0,
                ..SpawnConfig::default()
            },
            ..EngineConfig::default()
        }
        .with_seed(7);
        PlinkoEngine::with_backend(config, MultiplierTable::builtin(), ScriptedWorld::default())
    }

    fn collect_outcomes<B: PhysicsBackend>(engine: &mut PlinkoEngine<B>) -> Rc<RefCell<Vec<PayoutResult>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_outcome(move |r| sink.borrow_mut().push(*r));
        seen
    }

    /// Step until something resolves or `max` frames pass.
    fn run_until_outcome<B: PhysicsBackend>(engine: &mut PlinkoEngine<B>, max: usize) -> FrameReport {
        for _ in 0..max {
            let report = engine.step_frame().unwrap();
            if !report.outcomes.is_empty() {
                return report;
            }
        }
        FrameReport::default()
    }

    fn ball(id: u64, bet: f64) -> Ball {
        Ball::new(BallId(id), 300.0, bet)
    }

    #[test]
    fn unconfigured_engine_is_inert() {
        let mut engine = scripted_engine();
        assert!(engine.sync_active_balls(&[ball(1, 1.0)]).is_empty());
        let report = engine.step_frame().unwrap();
        assert!(report.events.is_empty());
        assert_eq!(engine.body_count(), 0);
        assert!(engine.layout().is_none());
    }

    #[test]
    fn configure_builds_static_catalog() {
        let mut engine = scripted_engine();
        let pegs = engine.configure_board(16, RiskLevel::Medium).unwrap().pegs.len();
        assert_eq!(engine.body_count(), 2 + pegs + 18 + 17);
    }

    #[test]
    fn failed_reconfigure_keeps_previous_board() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);
        let bodies = engine.body_count();

        let err = engine.configure_board(20, RiskLevel::High).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedBoard { rows: 20, .. }));
        assert_eq!(engine.layout().unwrap().config, BoardConfig::new(16, RiskLevel::Medium));
        assert_eq!(engine.body_count(), bodies);
        assert_eq!(engine.live_ball_count(), 1);
    }

    #[test]
    fn center_drop_resolves_exactly_once() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        let seen = collect_outcomes(&mut engine);
        let balls = vec![ball(1, 10.0)];
        engine.sync_active_balls(&balls);

        let report = run_until_outcome(&mut engine, 300);
        assert_eq!(report.outcomes.len(), 1);
        let result = report.outcomes[0];
        assert_eq!(result.bucket_index, 8);
        assert_eq!(result.multiplier, 0.3);
        assert!(!result.is_win);

        // Body gone in the same frame, before any render
        assert_eq!(engine.live_ball_count(), 0);
        assert!(engine.ball_position(BallId(1)).is_none());

        // Caller syncs before settling: no respawn
        assert!(engine.sync_active_balls(&balls).is_empty());
        for _ in 0..60 {
            engine.step_frame().unwrap();
        }
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn duplicate_raw_contacts_pay_once() {
        let mut engine = scripted_engine();
        engine.configure_board(8, RiskLevel::High).unwrap();
        let seen = collect_outcomes(&mut engine);
        engine.sync_active_balls(&[ball(5, 5.0)]);

        let contact = RawContact {
            a: BodyTag::Sensor(0),
            b: BodyTag::Ball(BallId(5)),
            started: true,
        };
        engine.backend_mut().inject(contact);
        engine.backend_mut().inject(RawContact {
            a: contact.b,
            b: contact.a,
            ..contact
        });
        let report = engine.step_frame().unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].payout, 145.0);
        assert!(report.outcomes[0].is_win);

        // A late notification after the body is gone is still discarded
        engine.backend_mut().inject(contact);
        let report = engine.step_frame().unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(engine.resolver().duplicates_discarded(), 2);
    }

    #[test]
    fn simultaneous_balls_get_separate_results() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(1, 10.0), ball(2, 4.0)]);

        let report = run_until_outcome(&mut engine, 300);
        assert_eq!(report.outcomes.len(), 2);
        let (a, b) = (report.outcomes[0], report.outcomes[1]);
        assert_eq!((a.ball_id, b.ball_id), (BallId(1), BallId(2)));
        assert_eq!(a.bucket_index, b.bucket_index);
        assert_eq!(a.bet_amount, 10.0);
        assert_eq!(b.bet_amount, 4.0);
        assert!((a.payout - 3.0).abs() < 1e-9);
        assert!((b.payout - 1.2).abs() < 1e-9);
    }

    #[test]
    fn ball_on_a_divider_lands_in_one_bucket() {
        // 9 rows: a bucket boundary sits at the board center
        let mut engine = scripted_engine();
        engine.configure_board(9, RiskLevel::Low).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);

        let report = run_until_outcome(&mut engine, 300);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].bucket_index, 4);
    }

    #[test]
    fn removed_ball_loses_its_body() {
        let mut engine = scripted_engine();
        engine.configure_board(12, RiskLevel::Low).unwrap();
        let statics = engine.body_count();

        let report = engine.sync_active_balls(&[ball(1, 1.0), ball(2, 1.0)]);
        assert_eq!(report.added.len(), 2);
        assert_eq!(engine.body_count(), statics + 2);

        let report = engine.sync_active_balls(&[ball(2, 1.0)]);
        assert_eq!(report.removed, vec![BallId(1)]);
        assert_eq!(engine.body_count(), statics + 1);
        assert!(engine.balls().all(|b| b.id == BallId(2)));
    }

    #[test]
    fn reconfigure_drops_balls_in_flight() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        let balls = vec![ball(1, 1.0)];
        engine.sync_active_balls(&balls);
        for _ in 0..10 {
            engine.step_frame().unwrap();
        }

        engine.configure_board(8, RiskLevel::Low).unwrap();
        assert_eq!(engine.live_ball_count(), 0);
        assert_eq!(engine.frame(), 0);
        let report = engine.sync_active_balls(&balls);
        assert_eq!(report.added, vec![BallId(1)]);
        assert_eq!(engine.ball_position(BallId(1)).unwrap().y, 20.0);
    }

    #[test]
    fn bucket_outside_table_is_an_error() {
        let mut engine = scripted_engine();
        engine.configure_board(8, RiskLevel::Low).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);
        engine.backend_mut().inject(RawContact {
            a: BodyTag::Ball(BallId(1)),
            b: BodyTag::Sensor(40),
            started: true,
        });
        assert!(matches!(
            engine.step_frame(),
            Err(FrameError {
                source: ConfigError::BucketOutOfRange { index: 40, len: 9 },
                ..
            })
        ));
    }

    #[test]
    fn bad_bucket_does_not_strand_other_balls() {
        let mut engine = scripted_engine();
        engine.configure_board(8, RiskLevel::Low).unwrap();
        let seen = collect_outcomes(&mut engine);
        let statics = engine.body_count();
        engine.sync_active_balls(&[ball(1, 1.0), ball(2, 2.0)]);

        engine.backend_mut().inject(RawContact {
            a: BodyTag::Ball(BallId(1)),
            b: BodyTag::Sensor(40),
            started: true,
        });
        engine.backend_mut().inject(RawContact {
            a: BodyTag::Sensor(3),
            b: BodyTag::Ball(BallId(2)),
            started: true,
        });

        let err = engine.step_frame().unwrap_err();
        assert!(matches!(err.source, ConfigError::BucketOutOfRange { index: 40, .. }));
        assert_eq!(err.report.events.len(), 2);
        assert_eq!(err.report.outcomes.len(), 1);
        let paid = err.report.outcomes[0];
        assert_eq!((paid.ball_id, paid.bucket_index), (BallId(2), 3));
        assert_eq!(seen.borrow().len(), 1);

        // Both bodies are gone; nothing lingers to pay later
        assert_eq!(engine.live_ball_count(), 0);
        assert_eq!(engine.body_count(), statics);
        for _ in 0..600 {
            assert!(engine.step_frame().unwrap().outcomes.is_empty());
        }
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn stalled_ball_is_freed_and_pays() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);
        for _ in 0..30 {
            engine.step_frame().unwrap();
        }
        let handle = engine.backend().handle_of(BodyTag::Ball(BallId(1))).unwrap();
        engine.backend_mut().hold(handle);
        let stuck_at = engine.ball_position(BallId(1)).unwrap();

        let frames = engine.config().stall.frames as usize;
        for _ in 0..frames - 1 {
            engine.step_frame().unwrap();
        }
        assert_eq!(engine.ball_position(BallId(1)), Some(stuck_at));
        assert_eq!(engine.stall_nudges(), 0);

        engine.step_frame().unwrap();
        assert_eq!(engine.stall_nudges(), 1);
        assert!(!engine.backend().is_held(handle));

        let report = run_until_outcome(&mut engine, 300);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(engine.live_ball_count(), 0);
    }

    #[test]
    fn resolution_raises_effects_that_expire() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);
        run_until_outcome(&mut engine, 300);
        assert_eq!(engine.effects().len(), 3);

        // The label is the longest lived at 1.5 s
        for _ in 0..95 {
            engine.step_frame().unwrap();
        }
        assert!(engine.effects().is_empty());
    }

    #[test]
    fn teardown_releases_everything() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        let seen = collect_outcomes(&mut engine);
        engine.sync_active_balls(&[ball(1, 1.0)]);

        engine.teardown();
        assert_eq!(engine.body_count(), 0);
        assert!(engine.layout().is_none());
        assert_eq!(engine.live_ball_count(), 0);

        // The old callback is gone
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(2, 1.0)]);
        let report = run_until_outcome(&mut engine, 300);
        assert_eq!(report.outcomes.len(), 1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn balls_track_backend_positions() {
        let mut engine = scripted_engine();
        engine.configure_board(16, RiskLevel::Medium).unwrap();
        engine.sync_active_balls(&[ball(1, 1.0)]);
        engine.step_frame().unwrap();
        let view = engine.balls().next().unwrap();
        assert_eq!(view.id, BallId(1));
        assert!(view.pos.y > 20.0);
        assert_eq!(view.color, ColorTag::RED);
    }

    #[test]
    fn rapier_ball_lands_in_a_bucket() {
        let config = EngineConfig::default().with_seed(2024);
        let mut engine = PlinkoEngine::new(config);
        engine.configure_board(8, RiskLevel::Medium).unwrap();
        let seen = collect_outcomes(&mut engine);
        let statics = engine.body_count();
        engine.sync_active_balls(&[ball(1, 2.0)]);

        let report = run_until_outcome(&mut engine, 1200);
        assert_eq!(report.outcomes.len(), 1, "ball never reached a bucket");
        let result = report.outcomes[0];
        assert!(result.bucket_index < 9);
        let expected = MultiplierTable::builtin()
            .multiplier(&BoardConfig::new(8, RiskLevel::Medium), result.bucket_index)
            .unwrap();
        assert_eq!(result.multiplier, expected);
        assert_eq!(engine.body_count(), statics);

        for _ in 0..120 {
            engine.step_frame().unwrap();
        }
        assert_eq!(seen.borrow().len(), 1);
    }

    /// Balls dropped at the auto-bet cadence on tall boards, where the
    /// outermost pegs leave pockets narrower than a ball against the walls.
    #[test]
    fn rapier_every_ball_lands_on_tall_boards() {
        const BALLS: u64 = 40;
        const CADENCE: usize = 30;

        for rows in [12u8, 14, 16] {
            let mut engine = PlinkoEngine::new(EngineConfig::default().with_seed(rows as u64));
            engine.configure_board(rows, RiskLevel::Medium).unwrap();
            let seen = collect_outcomes(&mut engine);
            let statics = engine.body_count();

            let mut active: Vec<Ball> = Vec::new();
            let mut next = 0;
            let mut frames = 0;
            while frames < BALLS as usize * CADENCE + 3000 {
                if frames % CADENCE == 0 && next < BALLS {
                    next += 1;
                    active.push(ball(next, 1.0));
                }
                engine.sync_active_balls(&active);
                let report = engine.step_frame().unwrap();
                active.retain(|b| report.outcomes.iter().all(|r| r.ball_id != b.id));
                engine.sync_active_balls(&active);
                frames += 1;
                if next == BALLS && active.is_empty() {
                    break;
                }
            }

            let stuck: Vec<_> = engine.balls().map(|b| (b.pos.x, b.pos.y)).collect();
            assert_eq!(seen.borrow().len(), BALLS as usize, "{} rows, stuck: {:?}", rows, stuck);
            assert!(active.is_empty());
            assert_eq!(engine.body_count(), statics);
        }
    }
}
