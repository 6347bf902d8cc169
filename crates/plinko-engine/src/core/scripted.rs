//! Deterministic stand-in for the rapier backend.
//!
//! Dynamic bodies fall in a straight line at a constant speed and never
//! collide with anything. Every step, each ball overlapping a sensor reports
//! a fresh contact start, so a ball lingering in a bucket produces the
//! duplicate notifications a real engine can emit. Extra raw contacts can be
//! queued with [`ScriptedWorld::inject`]. A ball can be pinned in place with
//! [`ScriptedWorld::hold`] to stand in for one wedged between bodies; setting
//! its velocity frees it and moves it by one step of that velocity.

use glam::Vec2;

use crate::core::physics::{
    BodyDesc, BodyTag, BodyType, ColliderDesc, ColliderMaterial, PhysicsBackend, RawContact,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedHandle(usize);

#[derive(Debug, Clone)]
struct ScriptedBody {
    tag: BodyTag,
    desc: BodyDesc,
    position: Vec2,
    held: bool,
    /// Velocity set since the last step, applied once.
    kick: Option<Vec2>,
}

pub struct ScriptedWorld {
    bodies: Vec<Option<ScriptedBody>>,
    fall_speed: f32,
    dt: f32,
    injected: Vec<RawContact>,
    steps: u64,
}

impl ScriptedWorld {
    /// Dynamic bodies fall `fall_speed` units per second.
    pub fn new(fall_speed: f32) -> Self {
        Self {
            bodies: Vec::new(),
            fall_speed,
            dt: 1.0 / 60.0,
            injected: Vec::new(),
            steps: 0,
        }
    }

    /// Queue a raw contact to be reported by the next step.
    pub fn inject(&mut self, contact: RawContact) {
        self.injected.push(contact);
    }

    /// Handle of the first live body carrying `tag`.
    pub fn handle_of(&self, tag: BodyTag) -> Option<ScriptedHandle> {
        self.bodies
            .iter()
            .position(|b| b.as_ref().is_some_and(|b| b.tag == tag))
            .map(ScriptedHandle)
    }

    /// Pin a body where it is until its velocity is set.
    pub fn hold(&mut self, handle: ScriptedHandle) {
        if let Some(Some(body)) = self.bodies.get_mut(handle.0) {
            body.held = true;
        }
    }

    pub fn is_held(&self, handle: ScriptedHandle) -> bool {
        matches!(self.bodies.get(handle.0), Some(Some(body)) if body.held)
    }

    /// Teleport a body.
    pub fn set_position(&mut self, handle: ScriptedHandle, pos: Vec2) {
        if let Some(Some(body)) = self.bodies.get_mut(handle.0) {
            body.position = pos;
        }
    }

    /// Number of steps taken since creation or the last clear.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Tags of every live body, in creation order.
    pub fn tags(&self) -> impl Iterator<Item = BodyTag> + '_ {
        self.bodies.iter().flatten().map(|b| b.tag)
    }

    fn ball_radius(desc: &BodyDesc) -> f32 {
        match desc.collider {
            ColliderDesc::Ball { radius } => radius,
            ColliderDesc::Cuboid { half_width, half_height } => {
                half_width.max(half_height)
            }
        }
    }
}

impl Default for ScriptedWorld {
    fn default() -> Self {
        Self::new(300.0)
    }
}

impl PhysicsBackend for ScriptedWorld {
    type Handle = ScriptedHandle;

    fn set_dt(&mut self, dt: f32) {
        self.dt = dt;
    }

    fn create_body(
        &mut self,
        tag: BodyTag,
        desc: &BodyDesc,
        _material: ColliderMaterial,
    ) -> ScriptedHandle {
        self.bodies.push(Some(ScriptedBody {
            tag,
            desc: desc.clone(),
            position: desc.position,
            held: false,
            kick: None,
        }));
        ScriptedHandle(self.bodies.len() - 1)
    }

    fn remove_body(&mut self, handle: ScriptedHandle) {
        if let Some(slot) = self.bodies.get_mut(handle.0) {
            *slot = None;
        }
    }

    fn step_into(&mut self, contacts: &mut Vec<RawContact>) {
        let fall = self.fall_speed * self.dt;
        for body in self.bodies.iter_mut().flatten() {
            if body.desc.body_type != BodyType::Dynamic {
                continue;
            }
            if let Some(kick) = body.kick.take() {
                body.position += kick * self.dt;
            }
            if !body.held {
                body.position.y += fall;
            }
        }

        let sensors: Vec<&ScriptedBody> = self
            .bodies
            .iter()
            .flatten()
            .filter(|b| b.desc.sensor)
            .collect();
        for ball in self.bodies.iter().flatten() {
            if !matches!(ball.tag, BodyTag::Ball(_)) {
                continue;
            }
            let radius = Self::ball_radius(&ball.desc);
            for sensor in &sensors {
                if sensor
                    .desc
                    .collider
                    .overlaps_circle(sensor.position, ball.position, radius)
                {
                    contacts.push(RawContact {
                        a: sensor.tag,
                        b: ball.tag,
                        started: true,
                    });
                }
            }
        }

        contacts.append(&mut self.injected);
        self.steps += 1;
    }

    fn body_position(&self, handle: ScriptedHandle) -> Option<(Vec2, f32)> {
        self.bodies
            .get(handle.0)
            .and_then(Option::as_ref)
            .map(|b| (b.position, 0.0))
    }

    fn set_velocity(&mut self, handle: ScriptedHandle, velocity: Vec2) {
        if let Some(Some(body)) = self.bodies.get_mut(handle.0) {
            body.held = false;
            body.kick = Some(velocity);
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.injected.clear();
        self.steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::BallId;

    fn sensor_at(world: &mut ScriptedWorld, index: usize, pos: Vec2) -> ScriptedHandle {
        world.create_body(
            BodyTag::Sensor(index),
            &BodyDesc::sensor(ColliderDesc::Cuboid {
                half_width: 15.0,
                half_height: 5.0,
            })
            .with_position(pos),
            ColliderMaterial::default(),
        )
    }

    fn ball_at(world: &mut ScriptedWorld, id: u64, pos: Vec2) -> ScriptedHandle {
        world.create_body(
            BodyTag::Ball(BallId(id)),
            &BodyDesc::dynamic(ColliderDesc::Ball { radius: 10.0 }).with_position(pos),
            ColliderMaterial::default(),
        )
    }

    #[test]
    fn dynamic_bodies_fall_and_static_ones_stay() {
        let mut world = ScriptedWorld::new(60.0);
        let sensor = sensor_at(&mut world, 0, Vec2::new(0.0, 500.0));
        let ball = ball_at(&mut world, 1, Vec2::ZERO);

        let mut contacts = Vec::new();
        world.step_into(&mut contacts);

        let (pos, _) = world.body_position(ball).unwrap();
        assert!((pos.y - 1.0).abs() < 1e-4, "ball should fall one unit: y={}", pos.y);
        assert_eq!(world.body_position(sensor).unwrap().0, Vec2::new(0.0, 500.0));
        assert_eq!(world.steps(), 1);
    }

    #[test]
    fn lingering_ball_reports_every_step() {
        let mut world = ScriptedWorld::new(0.0);
        sensor_at(&mut world, 4, Vec2::new(0.0, 100.0));
        ball_at(&mut world, 7, Vec2::new(0.0, 95.0));

        let mut contacts = Vec::new();
        for _ in 0..3 {
            world.step_into(&mut contacts);
        }
        assert_eq!(contacts.len(), 3);
        assert!(contacts.iter().all(|c| c.a == BodyTag::Sensor(4)
            && c.b == BodyTag::Ball(BallId(7))
            && c.started));
    }

    #[test]
    fn injected_contacts_delivered_once() {
        let mut world = ScriptedWorld::default();
        world.inject(RawContact {
            a: BodyTag::Ball(BallId(1)),
            b: BodyTag::Sensor(0),
            started: true,
        });
        let mut contacts = Vec::new();
        world.step_into(&mut contacts);
        world.step_into(&mut contacts);
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn held_ball_stays_until_kicked() {
        let mut world = ScriptedWorld::new(60.0);
        let ball = ball_at(&mut world, 3, Vec2::new(50.0, 0.0));
        assert_eq!(world.handle_of(BodyTag::Ball(BallId(3))), Some(ball));
        world.hold(ball);

        let mut contacts = Vec::new();
        for _ in 0..10 {
            world.step_into(&mut contacts);
        }
        assert_eq!(world.body_position(ball).unwrap().0, Vec2::new(50.0, 0.0));

        world.set_velocity(ball, Vec2::new(120.0, -60.0));
        assert!(!world.is_held(ball));
        world.step_into(&mut contacts);
        let (pos, _) = world.body_position(ball).unwrap();
        assert!((pos.x - 52.0).abs() < 1e-4);
        assert!((pos.y - 0.0).abs() < 1e-4, "kick up and fall cancel: y={}", pos.y);

        // The kick is spent; the ball just falls now
        world.step_into(&mut contacts);
        let (next, _) = world.body_position(ball).unwrap();
        assert!((next.x - 52.0).abs() < 1e-4);
        assert!((next.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn removed_bodies_are_gone() {
        let mut world = ScriptedWorld::default();
        let ball = ball_at(&mut world, 1, Vec2::ZERO);
        assert_eq!(world.body_count(), 1);
        world.remove_body(ball);
        world.remove_body(ball);
        assert_eq!(world.body_count(), 0);
        assert!(world.body_position(ball).is_none());
    }
}
