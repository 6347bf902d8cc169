use std::collections::BTreeSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::api::config::{PhysicsTuning, SpawnConfig};
use crate::api::types::{Ball, BallId};
use crate::core::physics::{BodyDesc, BodyTag, ColliderDesc, PhysicsBackend};
use crate::sim::arena::{BallBody, BodyArena};

/// What one reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Balls that received a new physics body, in caller order.
    pub added: Vec<BallId>,
    /// Balls whose slot was dropped because the caller no longer has them.
    pub removed: Vec<BallId>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Keeps the dynamic bodies of a backend in one-to-one correspondence with
/// the caller's active balls.
pub struct BallSetSynchronizer {
    spawn: SpawnConfig,
    tuning: PhysicsTuning,
    rng: Pcg32,
}

impl BallSetSynchronizer {
    /// `seed` makes the spawn jitter reproducible; `None` draws a seed from
    /// the thread RNG.
    pub fn new(spawn: SpawnConfig, tuning: PhysicsTuning, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Self { spawn, tuning, rng }
    }

    /// Apply the set difference between `balls` and `arena`.
    ///
    /// Ids in `balls` without a slot get a body; slots whose id is absent
    /// from `balls` are dropped along with their body. Tombstones of
    /// resolved balls still in `balls` are left alone, so a resolved ball
    /// is never respawned. Running it twice on the same set is a no-op.
    pub fn reconcile<B: PhysicsBackend>(
        &mut self,
        backend: &mut B,
        arena: &mut BodyArena<B::Handle>,
        balls: &[Ball],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let active: BTreeSet<BallId> = balls.iter().map(|b| b.id).collect();

        let stale: Vec<BallId> = arena.ids().filter(|id| !active.contains(id)).collect();
        for id in stale {
            if let Some(handle) = arena.remove(id).and_then(|slot| slot.handle) {
                backend.remove_body(handle);
                log::debug!("Removed body of ball {}", id.0);
            }
            report.removed.push(id);
        }

        for ball in balls {
            if arena.contains(ball.id) {
                continue;
            }
            let pos = Vec2::new(ball.spawn_x + self.jitter(), self.spawn.y);
            let desc = BodyDesc::dynamic(ColliderDesc::Ball {
                radius: self.tuning.ball_radius,
            })
            .with_position(pos)
            .with_ccd(true)
            .with_linear_damping(self.tuning.ball_linear_damping);
            let handle = backend.create_body(BodyTag::Ball(ball.id), &desc, self.tuning.ball_material);
            arena.insert(ball.id, BallBody::new(handle, ball.bet_amount, ball.color, pos));
            log::debug!("Spawned ball {} at ({:.1}, {:.1})", ball.id.0, pos.x, pos.y);
            report.added.push(ball.id);
        }

        report
    }

    /// Remove the body of a resolved ball, keeping its slot as a tombstone.
    pub fn retire<B: PhysicsBackend>(
        &self,
        backend: &mut B,
        arena: &mut BodyArena<B::Handle>,
        id: BallId,
    ) {
        if let Some(handle) = arena.retire(id) {
            backend.remove_body(handle);
            log::debug!("Retired body of ball {}", id.0);
        }
    }

    fn jitter(&mut self) -> f32 {
        let j = self.spawn.jitter;
        if j > 0.0 {
            self.rng.random_range(-j..=j)
        } else {
            0.0
        }
    }
}
