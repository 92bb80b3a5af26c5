//! Scene state and entity spawning
//!
//! Everything the gameplay scene owns between entry and exit lives in
//! [`SceneState`]. Bodies are spawned into a [`PhysicsBackend`] on entry and
//! referenced by handle afterwards.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::parallax::{self, Line};
use crate::consts::*;
use crate::physics::{
    BodyDesc, BodyHandle, BodyState, CollisionCategories, CollisionFilter, PhysicsBackend,
};
use crate::tuning::{Tuning, TuningError};

/// Lifecycle of one scene entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenePhase {
    /// Entities spawned, no frame run yet
    Created,
    /// Player in control
    Active,
    /// Log tilted past the fail angle; physics owns it from here
    GameOver,
}

/// Errors surfaced by the scene while talking to its backend
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("Physics backend has no {0} body")]
    MissingBody(&'static str),

    #[error("Scene has not been created")]
    NotCreated,

    #[error("Physics backend ran out of collision categories")]
    CategoriesExhausted,

    #[error(transparent)]
    Tuning(#[from] TuningError),
}

/// Drift accumulators integrated every active frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    /// Horizontal drift; drives the log's angular velocity
    pub log_x: f32,
    /// Vertical drift of the log
    pub log_y: f32,
    /// Vertical drift of the player
    pub player_y: f32,
}

/// Render intent for an image or sprite; drawing is up to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub asset: String,
    pub position: Vec2,
    pub origin: Vec2,
    pub scale: f32,
    pub depth: i32,
    pub alpha: f32,
    pub visible: bool,
}

impl Sprite {
    pub fn new(asset: &str, position: Vec2) -> Self {
        Self {
            asset: asset.to_string(),
            position,
            origin: Vec2::splat(0.5),
            scale: 1.0,
            depth: 0,
            alpha: 1.0,
            visible: true,
        }
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Physics bodies spawned for one scene entry
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBodies {
    pub log: BodyHandle,
    pub ghost_log: BodyHandle,
    pub boxes: Vec<BodyHandle>,
}

/// Player start (the scene places the player using the playfield width for both axes)
pub fn player_start() -> Vec2 {
    Vec2::splat(PLAYFIELD_WIDTH * 0.5)
}

/// Log start: above the player's head
pub fn log_start() -> Vec2 {
    let player = player_start();
    Vec2::new(player.x, player.y - PLAYER_HEIGHT - LOG_HEIGHT * 2.0)
}

const LOG_DENSITY: f32 = 1000.0;

fn log_desc(position: Vec2) -> BodyDesc {
    BodyDesc {
        position,
        scale: SPRITE_SCALE,
        ..BodyDesc::rectangle(LOG_WIDTH, LOG_HEIGHT)
    }
}

/// The log the player stands on. Its mass comes from density over the
/// scaled shape, so it outweighs the boxes by many orders of magnitude.
fn rolling_log_desc(position: Vec2, filter: CollisionFilter) -> BodyDesc {
    BodyDesc {
        mass: None,
        density: LOG_DENSITY,
        friction_air: 0.0,
        bounce: 0.0,
        ignore_gravity: true,
        filter,
        ..log_desc(position)
    }
}

/// Complete state of one gameplay scene entry
#[derive(Debug, Clone)]
pub struct SceneState {
    /// Seed this entry's RNG was built from
    pub seed: u64,
    pub tuning: Tuning,
    pub phase: ScenePhase,
    pub drift: Drift,
    /// Frames run since entry
    pub frame: u64,
    /// Frame on which the fail happened
    pub game_over_frame: Option<u64>,
    /// Whether the game over scene has been requested
    pub transition_requested: bool,
    pub background: Sprite,
    pub player: Sprite,
    pub lines: Vec<Line>,
    pub bodies: Option<SceneBodies>,
    pub(crate) rng: Pcg32,
}

impl SceneState {
    /// Build the scene's sprites and accumulators without touching physics
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let background = Sprite::new("background", Vec2::ZERO)
            .with_origin(Vec2::ZERO)
            .with_scale(BACKGROUND_SCALE);
        let player = Sprite::new("strongman", player_start())
            .with_scale(SPRITE_SCALE)
            .with_depth(1);
        let lines = tuning
            .parallax
            .as_ref()
            .map(parallax::spawn_lines)
            .unwrap_or_default();

        Self {
            seed,
            tuning,
            phase: ScenePhase::Created,
            drift: Drift::default(),
            frame: 0,
            game_over_frame: None,
            transition_requested: false,
            background,
            player,
            lines,
            bodies: None,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Build the scene and spawn its log, ghost log and boxes
    ///
    /// The tuning is validated first; nothing is spawned if it is rejected.
    pub fn spawn<P: PhysicsBackend + ?Sized>(
        tuning: Tuning,
        seed: u64,
        physics: &mut P,
    ) -> Result<Self, SceneError> {
        tuning.validate()?;
        let mut state = Self::new(tuning, seed);

        let mut categories = CollisionCategories::new();
        let mut next_category = || categories.next().ok_or(SceneError::CategoriesExhausted);
        let log_category = next_category()?;
        let ghost_category = next_category()?;
        let box_category = next_category()?;

        physics.set_bounds(
            Vec2::ZERO,
            Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT * WORLD_FLOOR_RATIO),
        );

        let log_position = log_start();
        let log = physics.spawn(&rolling_log_desc(
            log_position,
            CollisionFilter::member(log_category),
        ));

        let ghost_log = physics.spawn(&BodyDesc {
            is_static: true,
            visible: false,
            filter: CollisionFilter::member(ghost_category).colliding_with(&[box_category]),
            ..log_desc(log_position)
        });

        let box_count = state.roll_box_count();
        let boxes = (0..box_count)
            .map(|i| {
                let position = Vec2::new(
                    log_position.x,
                    log_position.y - LOG_HEIGHT * 2.0 - BOX_SPACING * i as f32,
                );
                let handle = physics.spawn(&BodyDesc {
                    position,
                    scale: SPRITE_SCALE,
                    mass: Some(0.0001),
                    friction_air: 0.0,
                    bounce: 0.0,
                    filter: CollisionFilter::member(box_category)
                        .colliding_with(&[ghost_category, box_category]),
                    ..BodyDesc::rectangle(BOX_SIZE, BOX_SIZE)
                });
                physics.set_velocity(handle, Vec2::ZERO);
                physics.set_angular_velocity(handle, 0.0);
                handle
            })
            .collect();

        state.bodies = Some(SceneBodies {
            log,
            ghost_log,
            boxes,
        });

        log::info!(
            "Scene created: seed={} boxes={} lines={}",
            seed,
            box_count,
            state.lines.len()
        );
        Ok(state)
    }

    fn roll_box_count(&mut self) -> u32 {
        let (min, max) = (self.tuning.box_count_min, self.tuning.box_count_max);
        self.rng.random_range(min..=max)
    }

    /// Remove this entry's bodies from the backend
    pub fn despawn<P: PhysicsBackend + ?Sized>(&mut self, physics: &mut P) {
        if let Some(bodies) = self.bodies.take() {
            physics.despawn(bodies.log);
            physics.despawn(bodies.ghost_log);
            for handle in bodies.boxes {
                physics.despawn(handle);
            }
        }
    }

    pub fn bodies(&self) -> Result<&SceneBodies, SceneError> {
        self.bodies.as_ref().ok_or(SceneError::NotCreated)
    }

    pub fn box_count(&self) -> usize {
        self.bodies.as_ref().map_or(0, |b| b.boxes.len())
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == ScenePhase::GameOver
    }

    /// Current state of the log as the backend sees it
    pub fn log_body<P: PhysicsBackend + ?Sized>(&self, physics: &P) -> Result<BodyState, SceneError> {
        physics
            .body(self.bodies()?.log)
            .ok_or(SceneError::MissingBody("log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicWorld;
    use crate::tuning::Variant;

    #[test]
    fn test_new_state_is_created() {
        let state = SceneState::new(Tuning::default(), 3);
        assert_eq!(state.phase, ScenePhase::Created);
        assert_eq!(state.drift, Drift::default());
        assert_eq!(state.player.position, Vec2::new(512.0, 512.0));
        assert_eq!(state.player.depth, 1);
        assert!(state.lines.is_empty());
        assert!(matches!(state.bodies(), Err(SceneError::NotCreated)));
    }

    #[test]
    fn test_spawn_layout() {
        let mut physics = KinematicWorld::new();
        let state = SceneState::spawn(Tuning::default(), 11, &mut physics).unwrap();
        let bodies = state.bodies().unwrap();

        let log = physics.body(bodies.log).unwrap();
        assert_eq!(log.position, Vec2::new(512.0, 440.0));
        assert!(log.ignore_gravity);
        assert!(!log.is_static);

        let ghost = physics.body(bodies.ghost_log).unwrap();
        assert_eq!(ghost.position, log.position);
        assert!(ghost.is_static);
        assert!(!ghost.visible);

        for (i, handle) in bodies.boxes.iter().enumerate() {
            let body = physics.body(*handle).unwrap();
            assert_eq!(body.position.x, 512.0);
            assert_eq!(body.position.y, 440.0 - 40.0 - 100.0 * i as f32);
            assert!(!body.ignore_gravity);
        }
    }

    #[test]
    fn test_log_mass_follows_density() {
        let desc = rolling_log_desc(log_start(), CollisionFilter::default());
        assert_eq!(desc.mass, None);
        assert_eq!(desc.density, 1000.0);
        assert!(desc.ignore_gravity);
        assert_eq!(desc.scaled_size(), Vec2::new(384.0, 80.0));
    }

    #[test]
    fn test_box_count_range_per_seed() {
        let mut seen = [false; 6];
        for seed in 0..200 {
            let mut physics = KinematicWorld::new();
            let state = SceneState::spawn(Tuning::default(), seed, &mut physics).unwrap();
            let count = state.box_count();
            assert!((1..=5).contains(&count), "seed {seed} spawned {count} boxes");
            seen[count] = true;
        }
        assert!(seen[1..].iter().all(|s| *s), "every count in 1..=5 should appear");
    }

    #[test]
    fn test_variants_without_boxes() {
        let mut physics = KinematicWorld::new();
        let state = SceneState::spawn(Variant::Balance.tuning(), 5, &mut physics).unwrap();
        assert_eq!(state.box_count(), 0);
        assert_eq!(physics.body_count(), 2);
    }

    #[test]
    fn test_parallax_variant_spawns_lines() {
        let state = SceneState::new(Variant::Parallax.tuning(), 5);
        assert_eq!(state.lines.len(), 8);
    }

    #[test]
    fn test_spawn_rejects_bad_box_range() {
        let mut physics = KinematicWorld::new();
        let crowded = Tuning {
            box_count_min: 7,
            box_count_max: 9,
            ..Tuning::default()
        };
        assert!(matches!(
            SceneState::spawn(crowded, 1, &mut physics),
            Err(SceneError::Tuning(TuningError::TooManyBoxes(9)))
        ));

        let inverted = Tuning {
            box_count_min: 4,
            box_count_max: 2,
            ..Tuning::default()
        };
        assert!(matches!(
            SceneState::spawn(inverted, 1, &mut physics),
            Err(SceneError::Tuning(TuningError::EmptyBoxRange { min: 4, max: 2 }))
        ));
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_despawn_removes_bodies() {
        let mut physics = KinematicWorld::new();
        let mut state = SceneState::spawn(Tuning::default(), 2, &mut physics).unwrap();
        state.despawn(&mut physics);
        assert_eq!(physics.body_count(), 0);
        assert!(state.bodies.is_none());
    }
}
