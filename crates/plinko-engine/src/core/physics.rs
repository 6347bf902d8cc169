use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::api::types::BallId;

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam to nalgebra and back
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn na_iso_to_pos_rot(iso: &nalgebra::Isometry2<f32>) -> (Vec2, f32) {
    let pos = Vec2::new(iso.translation.x, iso.translation.y);
    let rot = iso.rotation.angle();
    (pos, rot)
}

// ---------------------------------------------------------------------------
// Backend-neutral types
// ---------------------------------------------------------------------------

/// Business identity of a simulated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Wall,
    Peg,
    Divider,
    /// Bucket arrival zone, labeled with its bucket index.
    Sensor(usize),
    Ball(BallId),
}

const TAG_KIND_SHIFT: u32 = 64;
const TAG_PAYLOAD_MASK: u128 = u64::MAX as u128;

impl BodyTag {
    /// Pack into a rigid body's `user_data`: kind in bits 64.., payload below.
    pub fn to_user_data(self) -> u128 {
        let (kind, payload): (u128, u64) = match self {
            BodyTag::Wall => (1, 0),
            BodyTag::Peg => (2, 0),
            BodyTag::Divider => (3, 0),
            BodyTag::Sensor(index) => (4, index as u64),
            BodyTag::Ball(id) => (5, id.0),
        };
        (kind << TAG_KIND_SHIFT) | payload as u128
    }

    /// Inverse of [`to_user_data`](Self::to_user_data). `None` for untagged bodies.
    pub fn from_user_data(data: u128) -> Option<Self> {
        let payload = (data & TAG_PAYLOAD_MASK) as u64;
        match data >> TAG_KIND_SHIFT {
            1 => Some(BodyTag::Wall),
            2 => Some(BodyTag::Peg),
            3 => Some(BodyTag::Divider),
            4 => Some(BodyTag::Sensor(payload as usize)),
            5 => Some(BodyTag::Ball(BallId(payload))),
            _ => None,
        }
    }
}

/// A contact notification straight from the backend, before any
/// at-most-once filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawContact {
    pub a: BodyTag,
    pub b: BodyTag,
    /// `true` when the overlap just started, `false` when it ended.
    pub started: bool,
}

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
        }
    }
}

/// Shape description for a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
}

impl ColliderDesc {
    fn build_collider(&self) -> ColliderBuilder {
        match *self {
            ColliderDesc::Ball { radius } => ColliderBuilder::ball(radius),
            ColliderDesc::Cuboid { half_width, half_height } => {
                ColliderBuilder::cuboid(half_width, half_height)
            }
        }
    }

    /// Whether a circle at `center` with `radius` overlaps this shape placed at `origin`.
    pub fn overlaps_circle(&self, origin: Vec2, center: Vec2, radius: f32) -> bool {
        match *self {
            ColliderDesc::Ball { radius: r } => origin.distance(center) < r + radius,
            ColliderDesc::Cuboid { half_width, half_height } => {
                let half = Vec2::new(half_width, half_height);
                let closest = center.clamp(origin - half, origin + half);
                closest.distance(center) < radius
            }
        }
    }
}

/// Physical material properties for a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl ColliderMaterial {
    pub fn new(restitution: f32, friction: f32) -> Self {
        Self {
            restitution,
            friction,
            ..Self::default()
        }
    }
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.5,
            density: 1.0,
        }
    }
}

/// Builder for describing a rigid body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub ccd: bool,
    /// Sensors report overlaps but produce no contact response.
    pub sensor: bool,
    pub collider: ColliderDesc,
    pub linear_damping: f32,
}

impl BodyDesc {
    /// Create a dynamic body description with the given collider shape.
    pub fn dynamic(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            ccd: false,
            sensor: false,
            collider,
            linear_damping: 0.0,
        }
    }

    /// Create a fixed (static) body description with the given collider shape.
    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Fixed,
            ..Self::dynamic(collider)
        }
    }

    /// A fixed, response-free overlap zone.
    pub fn sensor(collider: ColliderDesc) -> Self {
        Self {
            sensor: true,
            ..Self::fixed(collider)
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    /// Set the linear damping (velocity decay). Higher values slow the body faster.
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }
}

/// Narrow capability surface the simulation needs from a physics engine.
///
/// Bodies are only ever added or removed between steps.
pub trait PhysicsBackend {
    type Handle: Copy + std::fmt::Debug;

    /// Set the integration timestep.
    fn set_dt(&mut self, dt: f32);

    fn create_body(
        &mut self,
        tag: BodyTag,
        desc: &BodyDesc,
        material: ColliderMaterial,
    ) -> Self::Handle;

    /// Remove a body. Unknown handles are ignored.
    fn remove_body(&mut self, handle: Self::Handle);

    /// Advance one timestep and append the contacts it produced.
    fn step_into(&mut self, contacts: &mut Vec<RawContact>);

    /// Position and rotation, or `None` once the body is gone.
    fn body_position(&self, handle: Self::Handle) -> Option<(Vec2, f32)>;

    /// Overwrite a dynamic body's linear velocity, waking it if asleep.
    fn set_velocity(&mut self, handle: Self::Handle, velocity: Vec2);

    fn body_count(&self) -> usize;

    /// Drop every body, keeping gravity and timestep.
    fn clear(&mut self);
}

// ---------------------------------------------------------------------------
// WASM-safe event collector (no crossbeam)
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        match self.collisions.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match self.collisions.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Rapier2D-backed [`PhysicsBackend`].
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
}

impl PhysicsWorld {
    /// Create a new physics world with the given gravity vector.
    /// Y points down, so downward gravity has positive Y.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
        }
    }

    /// Current linear velocity of a body.
    pub fn velocity(&self, handle: RigidBodyHandle) -> Vec2 {
        self.bodies
            .get(handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    fn collider_to_tag(&self, collider_handle: ColliderHandle) -> Option<BodyTag> {
        let collider = self.colliders.get(collider_handle)?;
        let body_handle = collider.parent()?;
        let body = self.bodies.get(body_handle)?;
        BodyTag::from_user_data(body.user_data)
    }
}

impl PhysicsBackend for PhysicsWorld {
    type Handle = RigidBodyHandle;

    fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// The tag is stored in the body's `user_data` for contact lookups.
    fn create_body(
        &mut self,
        tag: BodyTag,
        desc: &BodyDesc,
        material: ColliderMaterial,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(vec2_to_na(desc.position))
            .linvel(vec2_to_na(desc.velocity))
            .ccd_enabled(desc.ccd)
            .linear_damping(desc.linear_damping)
            .user_data(tag.to_user_data())
            .build();

        let body_handle = self.bodies.insert(rb);

        let mut builder = desc
            .collider
            .build_collider()
            .restitution(material.restitution)
            .friction(material.friction)
            .density(material.density)
            .sensor(desc.sensor);
        // Only sensors report; ball-vs-peg contacts never reach the resolver.
        if desc.sensor {
            builder = builder.active_events(ActiveEvents::COLLISION_EVENTS);
        }

        self.colliders
            .insert_with_parent(builder.build(), body_handle, &mut self.bodies);

        body_handle
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn step_into(&mut self, contacts: &mut Vec<RawContact>) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        // Resolve collider handles → body handles → tags
        for event in self.event_collector.drain_collisions() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };

            if let (Some(a), Some(b)) = (self.collider_to_tag(h1), self.collider_to_tag(h2)) {
                contacts.push(RawContact { a, b, started });
            }
        }
    }

    fn body_position(&self, handle: RigidBodyHandle) -> Option<(Vec2, f32)> {
        self.bodies
            .get(handle)
            .map(|rb| na_iso_to_pos_rot(rb.position()))
    }

    fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_linvel(vec2_to_na(velocity), true);
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn clear(&mut self) {
        let dt = self.integration_parameters.dt;
        *self = Self::new(na_to_vec2(&self.gravity));
        self.set_dt(dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
