use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::api::types::{ColorTag, PayoutResult};
use crate::board::layout::BoardLayout;
use crate::systems::effects::{EffectKind, TransientEffect};

/// One ball as read by the JS renderer: 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BallInstance {
    pub x: f32,
    pub y: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub radius: f32,
    /// Color channels in 0.0..=1.0.
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub alpha: f32,
}

impl BallInstance {
    pub const FLOATS: usize = 8;

    pub fn new(pos: Vec2, rotation: f32, radius: f32, color: ColorTag) -> Self {
        let [r, g, b] = unpack_rgb(color);
        Self {
            x: pos.x,
            y: pos.y,
            rotation,
            radius,
            r,
            g,
            b,
            alpha: 1.0,
        }
    }
}

/// One transient effect: 8 floats = 32 bytes stride.
///
/// `a`/`b` depend on `kind`: multiplier/payout for a label, bucket/color
/// for a glow, bucket/unused for a squash.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct EffectInstance {
    pub x: f32,
    pub y: f32,
    pub kind: f32,
    /// Lifetime elapsed, 0.0 to 1.0.
    pub progress: f32,
    pub a: f32,
    pub b: f32,
    /// 1.0 for a winning label, 0.0 otherwise.
    pub win: f32,
    pub _pad: f32,
}

impl EffectInstance {
    pub const FLOATS: usize = 8;

    pub fn from_effect(effect: &TransientEffect, now: f32) -> Self {
        let (a, b, win) = match effect.kind {
            EffectKind::PayoutLabel {
                multiplier,
                payout,
                is_win,
            } => (multiplier as f32, payout as f32, if is_win { 1.0 } else { 0.0 }),
            // 24-bit colors are exact in an f32
            EffectKind::BucketGlow {
                bucket_index,
                color,
            } => (bucket_index as f32, color.0 as f32, 0.0),
            EffectKind::BucketSquash { bucket_index } => (bucket_index as f32, 0.0, 0.0),
        };
        Self {
            x: effect.position.x,
            y: effect.position.y,
            kind: effect.kind.code() as f32,
            progress: effect.progress(now),
            a,
            b,
            win,
            _pad: 0.0,
        }
    }
}

/// A resolved ball for the host's balance display: 6 doubles = 48 bytes.
/// Money stays in f64 end to end.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OutcomeRecord {
    pub ball_id: f64,
    pub bucket_index: f64,
    pub multiplier: f64,
    pub payout: f64,
    pub bet_amount: f64,
    pub win: f64,
}

impl OutcomeRecord {
    pub const FLOATS: usize = 6;
}

impl From<&PayoutResult> for OutcomeRecord {
    fn from(result: &PayoutResult) -> Self {
        Self {
            ball_id: result.ball_id.0 as f64,
            bucket_index: result.bucket_index as f64,
            multiplier: result.multiplier,
            payout: result.payout,
            bet_amount: result.bet_amount,
            win: if result.is_win { 1.0 } else { 0.0 },
        }
    }
}

/// Per-frame output rebuilt every tick and read through raw pointers.
pub struct FrameBuffers {
    pub balls: Vec<BallInstance>,
    pub effects: Vec<EffectInstance>,
    /// Outcomes resolved during the last tick only.
    pub outcomes: Vec<OutcomeRecord>,
}

impl FrameBuffers {
    pub fn new() -> Self {
        Self {
            balls: Vec::with_capacity(128),
            effects: Vec::with_capacity(64),
            outcomes: Vec::with_capacity(16),
        }
    }

    pub fn clear(&mut self) {
        self.balls.clear();
        self.effects.clear();
        self.outcomes.clear();
    }

    pub fn balls_ptr(&self) -> *const f32 {
        self.balls.as_ptr() as *const f32
    }

    pub fn effects_ptr(&self) -> *const f32 {
        self.effects.as_ptr() as *const f32
    }

    pub fn outcomes_ptr(&self) -> *const f64 {
        self.outcomes.as_ptr() as *const f64
    }

    /// Ball instances as a flat float slice.
    pub fn ball_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.balls)
    }
}

impl Default for FrameBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Static board geometry, rebuilt only when the board changes.
/// Pegs are `[x, y]` pairs; buckets are `[x, y, multiplier]` triples.
#[derive(Debug, Default)]
pub struct BoardBuffers {
    pub pegs: Vec<f32>,
    pub buckets: Vec<f32>,
}

impl BoardBuffers {
    pub fn from_layout(layout: &BoardLayout) -> Self {
        let pegs = layout.pegs.iter().flat_map(|p| [p.x, p.y]).collect();
        let buckets = layout
            .buckets
            .iter()
            .flat_map(|b| [b.x, b.y, b.multiplier as f32])
            .collect();
        Self { pegs, buckets }
    }

    pub fn peg_count(&self) -> usize {
        self.pegs.len() / 2
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len() / 3
    }
}

fn unpack_rgb(color: ColorTag) -> [f32; 3] {
    let c = color.0;
    [
        ((c >> 16) & 0xff) as f32 / 255.0,
        ((c >> 8) & 0xff) as f32 / 255.0,
        (c & 0xff) as f32 / 255.0,
    ]
}
