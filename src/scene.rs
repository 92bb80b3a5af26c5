//! Gameplay scene lifecycle
//!
//! [`GameScene`] is what the host engine drives: `create` on scene entry,
//! `frame` once per rendered frame, `restart` or `shutdown` on exit. Each
//! entry gets a fresh [`SceneState`] with its own seed, so box counts and
//! random impulses are independent across restarts.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::events::{SceneEvent, SceneEvents};
use crate::physics::PhysicsBackend;
use crate::sim::{FrameInput, SceneState, TickOutcome, tick};
use crate::tuning::Tuning;

pub use crate::sim::SceneError;

/// Scene names known to the host engine
pub mod names {
    pub const BOOT: &str = "Boot";
    pub const PRELOADER: &str = "Preloader";
    pub const MAIN_MENU: &str = "MainMenu";
    pub const GAME: &str = "Game";
    pub const GAME_OVER: &str = "GameOver";
}

/// Host capability for switching scenes
pub trait SceneDirector {
    fn start(&mut self, scene: &str);
}

impl<F: FnMut(&str)> SceneDirector for F {
    fn start(&mut self, scene: &str) {
        self(scene)
    }
}

/// The gameplay scene
#[derive(Debug)]
pub struct GameScene {
    tuning: Tuning,
    seeds: Pcg32,
    events: SceneEvents,
    state: Option<SceneState>,
    entries: u32,
}

impl GameScene {
    /// Create a scene that derives each entry's seed from `seed`
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        Self {
            tuning,
            seeds: Pcg32::seed_from_u64(seed),
            events: SceneEvents::new(),
            state: None,
            entries: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        names::GAME
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Listeners registered here live as long as this scene
    pub fn events_mut(&mut self) -> &mut SceneEvents {
        &mut self.events
    }

    /// State of the current entry, if the scene has been created
    pub fn state(&self) -> Option<&SceneState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut SceneState> {
        self.state.as_mut()
    }

    /// Number of times the scene has been entered
    pub fn entries(&self) -> u32 {
        self.entries
    }

    /// Enter the scene: spawn entities and notify listeners
    ///
    /// Any previous entry is torn down first.
    pub fn create<P: PhysicsBackend + ?Sized>(
        &mut self,
        physics: &mut P,
    ) -> Result<&SceneState, SceneError> {
        self.shutdown(physics);

        let seed = self.seeds.random::<u64>();
        let state = SceneState::spawn(self.tuning.clone(), seed, physics)?;
        self.entries += 1;

        let state = self.state.insert(state);
        self.events.emit(&SceneEvent::Ready { scene: state });
        Ok(state)
    }

    /// Leave the scene, removing its bodies from the backend
    pub fn shutdown<P: PhysicsBackend + ?Sized>(&mut self, physics: &mut P) {
        if let Some(mut state) = self.state.take() {
            state.despawn(physics);
            log::debug!("Scene shut down after {} frame(s)", state.frame);
        }
    }

    /// Start over from `Created`
    pub fn restart<P: PhysicsBackend + ?Sized>(
        &mut self,
        physics: &mut P,
    ) -> Result<&SceneState, SceneError> {
        log::info!("Restarting scene (entry {})", self.entries + 1);
        self.create(physics)
    }

    /// Run the scene's per-frame update without stepping physics
    pub fn update<P: PhysicsBackend + ?Sized, D: SceneDirector + ?Sized>(
        &mut self,
        physics: &mut P,
        input: &FrameInput,
        director: &mut D,
    ) -> Result<TickOutcome, SceneError> {
        let state = self.state.as_mut().ok_or(SceneError::NotCreated)?;
        let outcome = tick(state, physics, input)?;
        if outcome.request_game_over_scene {
            log::info!("Starting {} scene", names::GAME_OVER);
            director.start(names::GAME_OVER);
        }
        Ok(outcome)
    }

    /// One host frame: apply the scene's commands, then let physics settle
    pub fn frame<P: PhysicsBackend + ?Sized, D: SceneDirector + ?Sized>(
        &mut self,
        physics: &mut P,
        input: &FrameInput,
        director: &mut D,
    ) -> Result<TickOutcome, SceneError> {
        let outcome = self.update(physics, input, director)?;
        physics.step();
        Ok(outcome)
    }
}
