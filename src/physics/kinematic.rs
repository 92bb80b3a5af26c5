//! Collision-free physics backend
//!
//! Integrates velocity, angular velocity, gravity and air friction with no
//! contact resolution beyond clamping dynamic bodies to the world bounds.
//! Used for headless runs and tests that need exact control over body state.

use std::collections::BTreeMap;

use glam::Vec2;

use super::{BodyDesc, BodyHandle, BodyState, PhysicsBackend};
use crate::consts::FRAME_DT;

/// Downward gravity (pixels/s²)
pub const GRAVITY: f32 = 981.0;

#[derive(Debug, Clone)]
struct KinematicBody {
    state: BodyState,
    half_extent: Vec2,
    friction_air: f32,
}

/// Bodies integrated independently, in handle order
#[derive(Debug, Clone, Default)]
pub struct KinematicWorld {
    bodies: BTreeMap<u64, KinematicBody>,
    bounds: Option<(Vec2, Vec2)>,
    next_handle: u64,
    frame: u64,
}

impl KinematicWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of steps taken
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut BodyState> {
        let body = self.bodies.get_mut(&handle.0);
        if body.is_none() {
            log::warn!("Ignoring command for unknown body {:?}", handle);
        }
        body.map(|b| &mut b.state)
    }
}

impl PhysicsBackend for KinematicWorld {
    fn set_bounds(&mut self, min: Vec2, max: Vec2) {
        self.bounds = Some((min, max));
    }

    fn spawn(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle.0,
            KinematicBody {
                state: BodyState {
                    position: desc.position,
                    angle: desc.angle,
                    angular_velocity: 0.0,
                    velocity: Vec2::ZERO,
                    ignore_gravity: desc.ignore_gravity,
                    is_static: desc.is_static,
                    visible: desc.visible,
                },
                half_extent: desc.scaled_size() * 0.5,
                friction_air: desc.friction_air,
            },
        );
        handle
    }

    fn despawn(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle.0);
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&handle.0).map(|b| b.state)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
        }
    }

    fn set_angle(&mut self, handle: BodyHandle, degrees: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.angle = degrees;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, radians_per_step: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.angular_velocity = radians_per_step;
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, pixels_per_step: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            body.velocity = pixels_per_step;
        }
    }

    fn set_ignore_gravity(&mut self, handle: BodyHandle, ignore: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.ignore_gravity = ignore;
        }
    }

    fn step(&mut self) {
        let gravity_per_step = GRAVITY * FRAME_DT * FRAME_DT;

        for body in self.bodies.values_mut() {
            let state = &mut body.state;
            if state.is_static {
                continue;
            }

            if !state.ignore_gravity {
                state.velocity.y += gravity_per_step;
            }
            let damping = 1.0 - body.friction_air;
            state.velocity *= damping;
            state.angular_velocity *= damping;

            state.position += state.velocity;
            state.angle += state.angular_velocity.to_degrees();

            if let Some((min, max)) = self.bounds {
                let lo = min + body.half_extent;
                let hi = (max - body.half_extent).max(lo);
                let clamped = state.position.clamp(lo, hi);
                if clamped.x != state.position.x {
                    state.velocity.x = 0.0;
                }
                if clamped.y != state.position.y {
                    state.velocity.y = 0.0;
                }
                state.position = clamped;
            }
        }

        self.frame += 1;
    }
}
