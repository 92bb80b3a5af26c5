//! Log Roller - a log-rolling strongman arcade game
//!
//! Core modules:
//! - `sim`: Per-frame balance simulation (drift accumulators, fail check, parallax)
//! - `scene`: Gameplay scene lifecycle over a physics backend
//! - `physics`: Physics capability trait plus Rapier2D and kinematic backends
//! - `events`: Scene-scoped ready notification
//! - `tuning`: Data-driven game balance and scene variants

pub mod events;
pub mod physics;
pub mod scene;
pub mod sim;
pub mod tuning;

pub use scene::{GameScene, SceneDirector, SceneError};
pub use tuning::{Tuning, TuningError, Variant};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Playfield dimensions (pixels)
    pub const PLAYFIELD_WIDTH: f32 = 1024.0;
    pub const PLAYFIELD_HEIGHT: f32 = 768.0;
    /// World bounds stop short of the bottom edge so the log falls behind the player
    pub const WORLD_FLOOR_RATIO: f32 = 0.97;

    /// Frames per second the host drives the scene at
    pub const FRAME_RATE: f32 = 60.0;
    /// Duration of one frame (seconds)
    pub const FRAME_DT: f32 = 1.0 / FRAME_RATE;

    /// Unscaled log collider size
    pub const LOG_WIDTH: f32 = 96.0;
    pub const LOG_HEIGHT: f32 = 20.0;
    /// Unscaled box collider size
    pub const BOX_SIZE: f32 = 16.0;
    /// Vertical gap between stacked boxes at spawn
    pub const BOX_SPACING: f32 = 100.0;
    /// Unscaled player frame height
    pub const PLAYER_HEIGHT: f32 = 32.0;

    /// Scale applied to player, log, ghost and box sprites (and their bodies)
    pub const SPRITE_SCALE: f32 = 4.0;
    /// Scale applied to the background image
    pub const BACKGROUND_SCALE: f32 = 3.3;

    /// Upper bound on stacked boxes per scene entry
    pub const MAX_BOXES: u32 = 5;
}

/// Centre of the playfield
#[inline]
pub fn playfield_center() -> Vec2 {
    Vec2::new(consts::PLAYFIELD_WIDTH * 0.5, consts::PLAYFIELD_HEIGHT * 0.5)
}

/// Lateral drift produced by a log tilted `angle_deg` degrees
#[inline]
pub fn tilt_drift(angle_deg: f32, drift_per_degree: f32) -> f32 {
    angle_deg * drift_per_degree
}
