use glam::Vec2;

use crate::api::config::StallConfig;
use crate::core::physics::PhysicsBackend;
use crate::sim::arena::{BallBody, BodyArena};

/// Frees balls that came to rest before reaching a bucket.
///
/// A ball that stays within `radius` of one spot for `frames` frames gets
/// its velocity replaced by a kick toward the board center and slightly
/// upward. Setting `frames` to 0 disables the watch.
pub struct StallWatch {
    config: StallConfig,
    nudges: u64,
}

impl StallWatch {
    pub fn new(config: StallConfig) -> Self {
        Self { config, nudges: 0 }
    }

    /// Record a freshly read-back position.
    pub fn observe<H>(&self, slot: &mut BallBody<H>, pos: Vec2) {
        if pos.distance(slot.anchor) > self.config.radius {
            slot.anchor = pos;
            slot.still_frames = 0;
        } else {
            slot.still_frames = slot.still_frames.saturating_add(1);
        }
    }

    /// Kick every live ball that has been still for too long. Returns how
    /// many were kicked.
    pub fn nudge_stalled<B: PhysicsBackend>(
        &mut self,
        backend: &mut B,
        arena: &mut BodyArena<B::Handle>,
        center_x: f32,
    ) -> usize {
        if self.config.frames == 0 {
            return 0;
        }
        let speed = self.config.nudge_speed;
        let mut kicked = 0;
        for (id, slot) in arena.live_mut() {
            if slot.still_frames < self.config.frames {
                continue;
            }
            let Some(handle) = slot.handle else {
                continue;
            };
            let dir = if slot.pos.x < center_x { 1.0 } else { -1.0 };
            backend.set_velocity(handle, Vec2::new(dir * speed, -0.5 * speed));
            slot.anchor = slot.pos;
            slot.still_frames = 0;
            log::debug!(
                "Nudged stalled ball {} at ({:.1}, {:.1})",
                id.0,
                slot.pos.x,
                slot.pos.y
            );
            kicked += 1;
        }
        self.nudges += kicked as u64;
        kicked
    }

    /// Total kicks since creation.
    pub fn nudges(&self) -> u64 {
        self.nudges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{BallId, ColorTag};
    use crate::core::physics::{BodyDesc, BodyTag, ColliderDesc, ColliderMaterial};
    use crate::core::scripted::{ScriptedHandle, ScriptedWorld};

    fn config() -> StallConfig {
        StallConfig {
            frames: 10,
            radius: 2.0,
            nudge_speed: 120.0,
        }
    }

    fn spawn(world: &mut ScriptedWorld, arena: &mut BodyArena<ScriptedHandle>, id: u64, pos: Vec2) -> ScriptedHandle {
        let handle = world.create_body(
            BodyTag::Ball(BallId(id)),
            &BodyDesc::dynamic(ColliderDesc::Ball { radius: 10.0 }).with_position(pos),
            ColliderMaterial::default(),
        );
        arena.insert(BallId(id), BallBody::new(handle, 1.0, ColorTag::RED, pos));
        handle
    }

    /// Step the world and feed positions back, as the engine does.
    fn frame(world: &mut ScriptedWorld, arena: &mut BodyArena<ScriptedHandle>, watch: &StallWatch) {
        let mut contacts = Vec::new();
        world.step_into(&mut contacts);
        for (_, slot) in arena.live_mut() {
            if let Some((pos, _)) = slot.handle.and_then(|h| world.body_position(h)) {
                watch.observe(slot, pos);
                slot.pos = pos;
            }
        }
    }

    #[test]
    fn moving_ball_is_left_alone() {
        let mut world = ScriptedWorld::default();
        let mut arena = BodyArena::new();
        let mut watch = StallWatch::new(config());
        spawn(&mut world, &mut arena, 1, Vec2::new(300.0, 20.0));

        for _ in 0..60 {
            frame(&mut world, &mut arena, &watch);
            assert_eq!(watch.nudge_stalled(&mut world, &mut arena, 300.0), 0);
        }
        assert_eq!(arena.get(BallId(1)).unwrap().still_frames, 0);
    }

    #[test]
    fn wedged_ball_is_kicked_toward_center() {
        let mut world = ScriptedWorld::default();
        let mut arena = BodyArena::new();
        let mut watch = StallWatch::new(config());
        let left = spawn(&mut world, &mut arena, 1, Vec2::new(10.0, 540.0));
        let right = spawn(&mut world, &mut arena, 2, Vec2::new(590.0, 540.0));
        world.hold(left);
        world.hold(right);

        for _ in 0..9 {
            frame(&mut world, &mut arena, &watch);
            assert_eq!(watch.nudge_stalled(&mut world, &mut arena, 300.0), 0);
        }
        frame(&mut world, &mut arena, &watch);
        assert_eq!(watch.nudge_stalled(&mut world, &mut arena, 300.0), 2);
        assert!(!world.is_held(left));
        assert!(!world.is_held(right));

        frame(&mut world, &mut arena, &watch);
        assert!(world.body_position(left).unwrap().0.x > 10.0);
        assert!(world.body_position(right).unwrap().0.x < 590.0);
        assert_eq!(watch.nudges(), 2);
    }

    #[test]
    fn zero_frames_disables_the_watch() {
        let mut world = ScriptedWorld::default();
        let mut arena = BodyArena::new();
        let mut watch = StallWatch::new(StallConfig {
            frames: 0,
            ..config()
        });
        let ball = spawn(&mut world, &mut arena, 1, Vec2::new(10.0, 540.0));
        world.hold(ball);

        for _ in 0..100 {
            frame(&mut world, &mut arena, &watch);
            assert_eq!(watch.nudge_stalled(&mut world, &mut arena, 300.0), 0);
        }
        assert!(world.is_held(ball));
    }
}
