//! Rapier2D physics backend
//!
//! Plays the part of the host engine's physics plugin. Conversions at this
//! boundary: degrees <-> radians for angles, per-step <-> per-second for
//! velocities, and collision filters <-> [`InteractionGroups`].

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use glam::Vec2;
use rapier2d::prelude::*;

use super::{BodyDesc, BodyHandle, BodyState, CollisionFilter, PhysicsBackend};
use crate::consts::FRAME_DT;

/// Fixed timestep for physics simulation (one host frame)
pub const PHYSICS_DT: f32 = FRAME_DT;

/// Thickness of the walls placed around the world bounds
pub const WALL_THICKNESS: f32 = 64.0;

/// Default gravity vector (downward, in pixels/s²)
pub fn default_gravity() -> Vector {
    Vector::new(0.0, 981.0)
}

fn interaction_groups(filter: &CollisionFilter) -> InteractionGroups {
    InteractionGroups {
        memberships: Group::from_bits_truncate(filter.category.bits()),
        filter: Group::from_bits_truncate(filter.mask),
        ..InteractionGroups::all()
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: RigidBodyHandle,
    visible: bool,
}

/// Rapier world plus the bookkeeping needed to serve [`PhysicsBackend`]
pub struct RapierWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    bodies: BTreeMap<u64, Entry>,
    walls: Vec<ColliderHandle>,
    next_handle: u64,
    frame: u64,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapierWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl RapierWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vector) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            bodies: BTreeMap::new(),
            walls: Vec::new(),
            next_handle: 0,
            frame: 0,
        }
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Computes a deterministic hash of the current physics state.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.frame.hash(&mut hasher);

        for &id in self.bodies.keys() {
            id.hash(&mut hasher);
            if let Some(state) = self.body(BodyHandle(id)) {
                for value in [
                    state.position.x,
                    state.position.y,
                    state.angle,
                    state.angular_velocity,
                    state.velocity.x,
                    state.velocity.y,
                ] {
                    value.to_bits().hash(&mut hasher);
                }
            }
        }

        hasher.finish()
    }

    fn rigid_body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let body = self
            .bodies
            .get(&handle.0)
            .and_then(|entry| self.rigid_body_set.get_mut(entry.handle));
        if body.is_none() {
            log::warn!("Ignoring command for unknown body {:?}", handle);
        }
        body
    }

    fn remove_walls(&mut self) {
        for wall in self.walls.drain(..) {
            self.collider_set.remove(
                wall,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                true,
            );
        }
    }
}

impl PhysicsBackend for RapierWorld {
    fn set_bounds(&mut self, min: Vec2, max: Vec2) {
        self.remove_walls();

        let size = max - min;
        let center = (min + max) * 0.5;
        let half = WALL_THICKNESS * 0.5;
        // (center, half extents) of the four walls just outside the rectangle
        let walls = [
            (
                Vec2::new(center.x, min.y - half),
                Vec2::new(size.x * 0.5 + WALL_THICKNESS, half),
            ),
            (
                Vec2::new(center.x, max.y + half),
                Vec2::new(size.x * 0.5 + WALL_THICKNESS, half),
            ),
            (
                Vec2::new(min.x - half, center.y),
                Vec2::new(half, size.y * 0.5 + WALL_THICKNESS),
            ),
            (
                Vec2::new(max.x + half, center.y),
                Vec2::new(half, size.y * 0.5 + WALL_THICKNESS),
            ),
        ];

        for (position, half_extents) in walls {
            let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
                .translation(Vector::new(position.x, position.y))
                .friction(0.1)
                .collision_groups(interaction_groups(&CollisionFilter::default()))
                .build();
            self.walls.push(self.collider_set.insert(collider));
        }
    }

    fn spawn(&mut self, desc: &BodyDesc) -> BodyHandle {
        let damping = desc.friction_air / PHYSICS_DT;
        let builder = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let rigid_body = builder
            .translation(Vector::new(desc.position.x, desc.position.y))
            .rotation(desc.angle.to_radians())
            .gravity_scale(if desc.ignore_gravity { 0.0 } else { 1.0 })
            .linear_damping(damping)
            .angular_damping(damping)
            .can_sleep(false)
            .build();
        let rigid_handle = self.rigid_body_set.insert(rigid_body);

        let half = desc.scaled_size() * 0.5;
        let mut collider = ColliderBuilder::cuboid(half.x, half.y)
            .friction(desc.friction)
            .restitution(desc.bounce)
            .collision_groups(interaction_groups(&desc.filter));
        collider = match desc.mass {
            Some(mass) => collider.mass(mass),
            None => collider.density(desc.density),
        };
        self.collider_set.insert_with_parent(
            collider.build(),
            rigid_handle,
            &mut self.rigid_body_set,
        );

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle.0,
            Entry {
                handle: rigid_handle,
                visible: desc.visible,
            },
        );
        handle
    }

    fn despawn(&mut self, handle: BodyHandle) {
        if let Some(entry) = self.bodies.remove(&handle.0) {
            self.rigid_body_set.remove(
                entry.handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        let entry = self.bodies.get(&handle.0)?;
        let body = self.rigid_body_set.get(entry.handle)?;
        let translation = body.translation();
        let linvel = body.linvel();

        Some(BodyState {
            position: Vec2::new(translation.x, translation.y),
            angle: body.rotation().angle().to_degrees(),
            angular_velocity: body.angvel() * PHYSICS_DT,
            velocity: Vec2::new(linvel.x, linvel.y) * PHYSICS_DT,
            ignore_gravity: body.gravity_scale() == 0.0,
            is_static: body.is_fixed(),
            visible: entry.visible,
        })
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.rigid_body_mut(handle) {
            body.set_translation(Vector::new(position.x, position.y), true);
        }
    }

    fn set_angle(&mut self, handle: BodyHandle, degrees: f32) {
        if let Some(body) = self.rigid_body_mut(handle) {
            body.set_rotation(Rotation::from_angle(degrees.to_radians()), true);
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, radians_per_step: f32) {
        if let Some(body) = self.rigid_body_mut(handle) {
            body.set_angvel(radians_per_step / PHYSICS_DT, true);
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, pixels_per_step: Vec2) {
        if let Some(body) = self.rigid_body_mut(handle) {
            let velocity = pixels_per_step / PHYSICS_DT;
            body.set_linvel(Vector::new(velocity.x, velocity.y), true);
        }
    }

    fn set_ignore_gravity(&mut self, handle: BodyHandle, ignore: bool) {
        if let Some(body) = self.rigid_body_mut(handle) {
            body.set_gravity_scale(if ignore { 0.0 } else { 1.0 }, true);
        }
    }

    /// Advances the physics simulation by one fixed timestep.
    fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.frame += 1;
    }
}
