use glam::Vec2;

use crate::api::config::PhysicsTuning;
use crate::board::layout::BoardLayout;
use crate::core::physics::{BodyDesc, BodyTag, ColliderDesc, ColliderMaterial, PhysicsBackend};

/// How far the sensor band reaches above the divider tops. A ball resting
/// on a divider still overlaps the sensor next to it.
const SENSOR_LIFT: f32 = 4.0;

/// One static body to create.
#[derive(Debug, Clone)]
pub struct StaticBody {
    pub tag: BodyTag,
    pub desc: BodyDesc,
    pub material: ColliderMaterial,
}

impl StaticBody {
    fn new(tag: BodyTag, desc: BodyDesc, material: ColliderMaterial) -> Self {
        Self { tag, desc, material }
    }
}

/// The static catalog of a board: two side walls, a circle per peg, a
/// divider on every bucket boundary and a sensor per bucket.
pub fn static_bodies(layout: &BoardLayout, tuning: &PhysicsTuning) -> Vec<StaticBody> {
    let dims = &layout.dimensions;
    let mut bodies = Vec::with_capacity(2 + layout.pegs.len() + 2 * layout.buckets.len() + 1);

    let wall = ColliderDesc::Cuboid {
        half_width: tuning.wall_thickness / 2.0,
        half_height: dims.height / 2.0,
    };
    for x in [-tuning.wall_thickness / 2.0, dims.width + tuning.wall_thickness / 2.0] {
        bodies.push(StaticBody::new(
            BodyTag::Wall,
            BodyDesc::fixed(wall).with_position(Vec2::new(x, dims.height / 2.0)),
            ColliderMaterial::default(),
        ));
    }

    let peg = ColliderDesc::Ball {
        radius: tuning.peg_radius,
    };
    for p in &layout.pegs {
        bodies.push(StaticBody::new(
            BodyTag::Peg,
            BodyDesc::fixed(peg).with_position(p.pos()),
            tuning.peg_material,
        ));
    }

    let divider = ColliderDesc::Cuboid {
        half_width: tuning.divider_width / 2.0,
        half_height: dims.bucket_height / 2.0,
    };
    let divider_y = layout.bucket_y + dims.bucket_height / 2.0;
    for x in layout.bucket_boundaries() {
        bodies.push(StaticBody::new(
            BodyTag::Divider,
            BodyDesc::fixed(divider).with_position(Vec2::new(x, divider_y)),
            ColliderMaterial::default(),
        ));
    }

    let sensor = ColliderDesc::Cuboid {
        half_width: layout.bucket_width() * tuning.sensor_width_fraction / 2.0,
        half_height: tuning.sensor_height / 2.0,
    };
    let sensor_y = layout.bucket_y - SENSOR_LIFT + tuning.sensor_height / 2.0;
    for bucket in &layout.buckets {
        bodies.push(StaticBody::new(
            BodyTag::Sensor(bucket.index),
            BodyDesc::sensor(sensor).with_position(Vec2::new(bucket.x, sensor_y)),
            ColliderMaterial::default(),
        ));
    }

    bodies
}

/// Create the static catalog in `backend`. Returns how many bodies were added.
pub fn populate<B: PhysicsBackend>(
    backend: &mut B,
    layout: &BoardLayout,
    tuning: &PhysicsTuning,
) -> usize {
    let bodies = static_bodies(layout, tuning);
    for body in &bodies {
        backend.create_body(body.tag, &body.desc, body.material);
    }
    log::debug!(
        "Static catalog: {} pegs, {} buckets, {} bodies total",
        layout.pegs.len(),
        layout.buckets.len(),
        bodies.len()
    );
    bodies.len()
}
