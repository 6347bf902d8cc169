pub mod api;
pub mod board;
pub mod core;
pub mod renderer;
pub mod session;
pub mod sim;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::config::{EffectLifetimes, EngineConfig, PhysicsTuning, SpawnConfig, StallConfig};
pub use api::engine::{BallView, FrameReport, OutcomeHandler, PlinkoEngine};
pub use api::error::{ConfigError, FrameError, SessionError};
pub use api::types::{
    Ball, BallId, BoardConfig, CollisionEvent, ColorTag, PayoutResult, RiskLevel,
};
pub use board::layout::{generate_layout, BoardDimensions, BoardLayout, BucketSlot, PegPosition};
pub use board::multipliers::MultiplierTable;
pub use core::physics::{
    BodyDesc, BodyTag, BodyType, ColliderDesc, ColliderMaterial, PhysicsBackend, PhysicsWorld,
    RawContact,
};
pub use core::scripted::ScriptedWorld;
pub use core::time::Interval;
pub use renderer::instance::{BallInstance, BoardBuffers, EffectInstance, FrameBuffers, OutcomeRecord};
pub use session::{AutoBet, BetMode, ProfitHistory, ProfitPoint, Session, Stats};
pub use sim::payout::calculate_payout;
pub use sim::sync::SyncReport;
pub use systems::effects::{EffectKind, EffectScheduler, TransientEffect};
