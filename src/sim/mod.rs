//! Gameplay simulation
//!
//! All per-frame gameplay logic lives here:
//! - Drift accumulators and their growth
//! - Log tilt to lateral drift
//! - Fail check and anti-stall impulse
//! - Parallax line scrolling
//! - No rendering and no rigid-body integration (see `physics`)

pub mod autopilot;
pub mod parallax;
pub mod state;
pub mod tick;

pub use autopilot::Autopilot;
pub use parallax::Line;
pub use state::{Drift, SceneBodies, SceneError, ScenePhase, SceneState, Sprite};
pub use tick::{FrameInput, TickOutcome, tick};
