pub mod physics;
pub mod scripted;
pub mod time;
