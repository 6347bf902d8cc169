//! The per-frame pipeline: spawn/remove bodies, resolve sensor contacts,
//! price the outcomes.

pub mod arena;
pub mod payout;
pub mod resolver;
pub mod stall;
pub mod statics;
pub mod sync;
