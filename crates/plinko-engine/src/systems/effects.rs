//! Transient, purely cosmetic effects raised by resolved balls.
//!
//! Nothing here feeds back into payouts. Losing or duplicating an effect
//! is a visual glitch, never a correctness bug.

use glam::Vec2;

use crate::api::config::EffectLifetimes;
use crate::api::types::{ColorTag, PayoutResult};
use crate::board::layout::BoardLayout;

/// Offset of the payout label above the bucket row.
const LABEL_RISE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    /// Floating "×multiplier / +payout" text where the ball landed.
    PayoutLabel {
        multiplier: f64,
        payout: f64,
        is_win: bool,
    },
    /// Colored glow inside the bucket, tinted with the ball's color.
    BucketGlow { bucket_index: usize, color: ColorTag },
    /// Short squash of the bucket's multiplier tile.
    BucketSquash { bucket_index: usize },
}

impl EffectKind {
    /// Stable numeric code for the packed render buffer.
    pub fn code(&self) -> u32 {
        match self {
            EffectKind::PayoutLabel { .. } => 0,
            EffectKind::BucketGlow { .. } => 1,
            EffectKind::BucketSquash { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientEffect {
    pub id: u64,
    pub kind: EffectKind,
    pub position: Vec2,
    /// Simulation time (seconds) at which the effect was raised.
    pub started_at: f32,
    /// Simulation time (seconds) after which the effect is purged.
    pub expires_at: f32,
}

impl TransientEffect {
    /// Fraction of the lifetime already elapsed at `now`, clamped to 0..=1.
    pub fn progress(&self, now: f32) -> f32 {
        let span = self.expires_at - self.started_at;
        if span <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / span).clamp(0.0, 1.0)
    }
}

/// Append-only list of live effects, purged by expiry.
pub struct EffectScheduler {
    lifetimes: EffectLifetimes,
    effects: Vec<TransientEffect>,
    next_id: u64,
}

impl EffectScheduler {
    pub fn new(lifetimes: EffectLifetimes) -> Self {
        Self {
            lifetimes,
            effects: Vec::with_capacity(64),
            next_id: 1,
        }
    }

    /// Raise the label, glow and squash for one resolved ball.
    /// `ball_pos` is where the ball was when it entered the bucket.
    pub fn emit(
        &mut self,
        result: &PayoutResult,
        ball_pos: Vec2,
        color: ColorTag,
        layout: &BoardLayout,
        now: f32,
    ) {
        let label_pos = Vec2::new(ball_pos.x, layout.bucket_y - LABEL_RISE);
        self.push(
            EffectKind::PayoutLabel {
                multiplier: result.multiplier,
                payout: result.payout,
                is_win: result.is_win,
            },
            label_pos,
            now,
            self.lifetimes.payout_label,
        );

        let Some(bucket) = layout.bucket(result.bucket_index) else {
            return;
        };
        let bucket_center = bucket.pos() + Vec2::new(0.0, layout.dimensions.bucket_height / 2.0);
        self.push(
            EffectKind::BucketGlow {
                bucket_index: bucket.index,
                color,
            },
            bucket_center,
            now,
            self.lifetimes.bucket_glow,
        );
        self.push(
            EffectKind::BucketSquash {
                bucket_index: bucket.index,
            },
            bucket_center,
            now,
            self.lifetimes.bucket_squash,
        );
    }

    /// Drop every effect whose expiry is at or before `now`.
    pub fn purge(&mut self, now: f32) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| e.expires_at > now);
        before - self.effects.len()
    }

    pub fn effects(&self) -> &[TransientEffect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    fn push(&mut self, kind: EffectKind, position: Vec2, now: f32, lifetime: f32) {
        self.effects.push(TransientEffect {
            id: self.next_id,
            kind,
            position,
            started_at: now,
            expires_at: now + lifetime,
        });
        self.next_id += 1;
    }
}

impl Default for EffectScheduler {
    fn default() -> Self {
        Self::new(EffectLifetimes::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{BallId, BoardConfig, RiskLevel};
    use crate::board::layout::{generate_layout, BoardDimensions};
    use crate::board::multipliers::MultiplierTable;

    fn layout() -> BoardLayout {
        generate_layout(
            BoardConfig::new(16, RiskLevel::Medium),
            &MultiplierTable::builtin(),
            &BoardDimensions::default(),
        )
        .unwrap()
    }

    fn result(bucket_index: usize) -> PayoutResult {
        PayoutResult {
            ball_id: BallId(1),
            bucket_index,
            multiplier: 0.3,
            payout: 3.0,
            bet_amount: 10.0,
            is_win: false,
        }
    }

    #[test]
    fn emit_raises_three_effects() {
        let l = layout();
        let mut scheduler = EffectScheduler::default();
        scheduler.emit(&result(8), Vec2::new(302.0, 595.0), ColorTag::RED, &l, 10.0);

        let effects = scheduler.effects();
        assert_eq!(effects.len(), 3);
        assert!(matches!(effects[0].kind, EffectKind::PayoutLabel { is_win: false, .. }));
        assert_eq!(effects[0].position, Vec2::new(302.0, l.bucket_y - 20.0));
        assert!(matches!(
            effects[1].kind,
            EffectKind::BucketGlow { bucket_index: 8, color: ColorTag::RED }
        ));
        assert!((effects[1].position.y - (l.bucket_y + 20.0)).abs() < 1e-4);
        assert!(matches!(effects[2].kind, EffectKind::BucketSquash { bucket_index: 8 }));

        let ids: Vec<_> = effects.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn effects_expire_on_their_own_schedule() {
        let l = layout();
        let mut scheduler = EffectScheduler::default();
        scheduler.emit(&result(0), Vec2::new(20.0, 590.0), ColorTag::RED, &l, 0.0);

        assert_eq!(scheduler.purge(0.1), 0);
        assert_eq!(scheduler.purge(0.25), 1); // squash
        assert_eq!(scheduler.purge(1.0), 1); // glow
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.purge(1.6), 1); // label
        assert!(scheduler.is_empty());
    }

    #[test]
    fn unknown_bucket_only_gets_a_label() {
        let l = layout();
        let mut scheduler = EffectScheduler::default();
        scheduler.emit(&result(40), Vec2::ZERO, ColorTag::RED, &l, 0.0);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn progress_runs_from_zero_to_one() {
        let l = layout();
        let mut scheduler = EffectScheduler::default();
        scheduler.emit(&result(3), Vec2::ZERO, ColorTag::RED, &l, 2.0);
        let label = scheduler.effects()[0];
        assert_eq!(label.progress(2.0), 0.0);
        assert!((label.progress(2.75) - 0.5).abs() < 1e-5);
        assert_eq!(label.progress(10.0), 1.0);
    }
}
