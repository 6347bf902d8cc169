use std::collections::BTreeMap;

use glam::Vec2;

use crate::api::types::{BallId, ColorTag};

/// The derived physical projection of one caller-owned ball.
#[derive(Debug, Clone)]
pub struct BallBody<H> {
    /// Backend handle, or `None` once the body has been retired.
    pub handle: Option<H>,
    /// Set when the ball produced its one collision event.
    pub handled: bool,
    pub bet_amount: f64,
    pub color: ColorTag,
    /// Last position read back from the backend.
    pub pos: Vec2,
    pub rotation: f32,
    /// Where the ball was when it last moved noticeably.
    pub anchor: Vec2,
    /// Frames spent near `anchor`.
    pub still_frames: u32,
}

impl<H> BallBody<H> {
    pub fn new(handle: H, bet_amount: f64, color: ColorTag, pos: Vec2) -> Self {
        Self {
            handle: Some(handle),
            handled: false,
            bet_amount,
            color,
            pos,
            rotation: 0.0,
            anchor: pos,
            still_frames: 0,
        }
    }

    /// A resolved ball whose body is gone but whose id is still in the
    /// caller's active set.
    pub fn is_tombstone(&self) -> bool {
        self.handle.is_none()
    }
}

/// Ball bodies keyed by ball id, iterated in id order.
///
/// A slot outlives its physics body: retiring a ball drops the handle but
/// keeps the slot, so a caller that has not yet removed the id cannot cause
/// a respawn. The slot goes away when the id leaves the caller's set.
pub struct BodyArena<H> {
    slots: BTreeMap<BallId, BallBody<H>>,
}

impl<H: Copy> BodyArena<H> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: BallId, body: BallBody<H>) {
        self.slots.insert(id, body);
    }

    /// Drop the slot entirely. Returns it so the caller can release the handle.
    pub fn remove(&mut self, id: BallId) -> Option<BallBody<H>> {
        self.slots.remove(&id)
    }

    /// Take the backend handle out of a slot, leaving a tombstone.
    pub fn retire(&mut self, id: BallId) -> Option<H> {
        self.slots.get_mut(&id).and_then(|slot| slot.handle.take())
    }

    pub fn get(&self, id: BallId) -> Option<&BallBody<H>> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut BallBody<H>> {
        self.slots.get_mut(&id)
    }

    pub fn contains(&self, id: BallId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = BallId> + '_ {
        self.slots.keys().copied()
    }

    /// Slots that still own a physics body.
    pub fn live(&self) -> impl Iterator<Item = (BallId, &BallBody<H>)> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.handle.is_some())
            .map(|(&id, slot)| (id, slot))
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = (BallId, &mut BallBody<H>)> {
        self.slots
            .iter_mut()
            .filter(|(_, slot)| slot.handle.is_some())
            .map(|(&id, slot)| (id, slot))
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Empty the arena, returning every handle still held.
    pub fn drain_handles(&mut self) -> Vec<H> {
        let handles = self.slots.values().filter_map(|slot| slot.handle).collect();
        self.slots.clear();
        handles
    }
}

impl<H: Copy> Default for BodyArena<H> {
    fn default() -> Self {
        Self::new()
    }
}
