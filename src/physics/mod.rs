//! Physics capability consumed by the gameplay scene
//!
//! The scene never integrates rigid bodies itself. It spawns bodies from a
//! [`BodyDesc`], issues position/angle/velocity commands and reads back
//! [`BodyState`] through [`PhysicsBackend`]. Units at this boundary:
//! - positions in pixels, y pointing down
//! - angles in degrees
//! - angular velocity in radians per step

pub mod kinematic;
pub mod rapier;

pub use kinematic::KinematicWorld;
pub use rapier::RapierWorld;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a body owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// A collision category bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionCategory(u32);

impl CollisionCategory {
    /// Category given to bodies (and world walls) that never asked for one
    pub const DEFAULT: CollisionCategory = CollisionCategory(1);

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Hands out distinct category bits, one per call
#[derive(Debug, Clone)]
pub struct CollisionCategories {
    next_bit: u32,
}

impl Default for CollisionCategories {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionCategories {
    pub fn new() -> Self {
        // Bit 0 is the default category
        Self { next_bit: 1 }
    }

    /// Allocate the next free category, or None once all 32 bits are used
    pub fn next(&mut self) -> Option<CollisionCategory> {
        if self.next_bit >= u32::BITS {
            return None;
        }
        let category = CollisionCategory(1 << self.next_bit);
        self.next_bit += 1;
        Some(category)
    }
}

/// Which category a body belongs to and which categories it accepts contacts from
///
/// Two bodies collide only if each one's category is in the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub category: CollisionCategory,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: CollisionCategory::DEFAULT,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    /// Member of `category`, colliding with everything
    pub fn member(category: CollisionCategory) -> Self {
        Self {
            category,
            mask: u32::MAX,
        }
    }

    /// Restrict contacts to the listed categories
    pub fn colliding_with(mut self, allowed: &[CollisionCategory]) -> Self {
        self.mask = allowed.iter().fold(0, |mask, c| mask | c.bits());
        self
    }

    pub fn accepts(&self, other: CollisionCategory) -> bool {
        self.mask & other.bits() != 0
    }

    pub fn collides(&self, other: &CollisionFilter) -> bool {
        self.accepts(other.category) && other.accepts(self.category)
    }
}

/// Everything needed to spawn a rectangular body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Unscaled size of the rectangle
    pub size: Vec2,
    /// Multiplier applied to `size`
    pub scale: f32,
    pub position: Vec2,
    /// Degrees
    pub angle: f32,
    /// Explicit mass; overrides `density` when set
    pub mass: Option<f32>,
    pub density: f32,
    pub friction: f32,
    pub friction_air: f32,
    pub bounce: f32,
    pub ignore_gravity: bool,
    pub is_static: bool,
    pub visible: bool,
    pub filter: CollisionFilter,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            size: Vec2::ONE,
            scale: 1.0,
            position: Vec2::ZERO,
            angle: 0.0,
            mass: None,
            density: 0.001,
            friction: 0.1,
            friction_air: 0.01,
            bounce: 0.0,
            ignore_gravity: false,
            is_static: false,
            visible: true,
            filter: CollisionFilter::default(),
        }
    }
}

impl BodyDesc {
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            ..Default::default()
        }
    }

    /// World-space extent after scaling
    pub fn scaled_size(&self) -> Vec2 {
        self.size * self.scale
    }
}

/// Snapshot of a body as the backend currently sees it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec2,
    /// Degrees
    pub angle: f32,
    /// Radians per step
    pub angular_velocity: f32,
    /// Pixels per step
    pub velocity: Vec2,
    pub ignore_gravity: bool,
    pub is_static: bool,
    pub visible: bool,
}

/// Rigid-body world driven once per frame by the host
///
/// Setters on an unknown handle are ignored; `body` returns None for it.
pub trait PhysicsBackend {
    /// Confine dynamic bodies to the rectangle `min..max`
    fn set_bounds(&mut self, min: Vec2, max: Vec2);

    fn spawn(&mut self, desc: &BodyDesc) -> BodyHandle;

    fn despawn(&mut self, handle: BodyHandle);

    fn body(&self, handle: BodyHandle) -> Option<BodyState>;

    fn set_position(&mut self, handle: BodyHandle, position: Vec2);

    fn set_angle(&mut self, handle: BodyHandle, degrees: f32);

    fn set_angular_velocity(&mut self, handle: BodyHandle, radians_per_step: f32);

    fn set_velocity(&mut self, handle: BodyHandle, pixels_per_step: Vec2);

    fn set_ignore_gravity(&mut self, handle: BodyHandle, ignore: bool);

    /// Advance every dynamic body by one frame
    fn step(&mut self);
}
