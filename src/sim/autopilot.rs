//! Demo mode: a simple controller that plays the scene
//!
//! Produces the same five signals a keyboard would, so the scene cannot tell
//! it apart from a player.

use super::state::{ScenePhase, SceneState};
use super::tick::FrameInput;

/// Counter-steering controller
///
/// Aims the horizontal drift at a value that rolls the log back toward level,
/// `-log_angle * angle_gain`, and only presses a key once the drift strays
/// more than `dead_zone` from that target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Autopilot {
    pub dead_zone: f32,
    pub angle_gain: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            dead_zone: 0.5,
            angle_gain: 0.05,
        }
    }
}

impl Autopilot {
    pub fn new(dead_zone: f32) -> Self {
        Self {
            dead_zone: dead_zone.abs(),
            ..Default::default()
        }
    }

    /// Choose this frame's input from the scene and the log's tilt in degrees
    pub fn steer(&self, state: &SceneState, log_angle: f32) -> FrameInput {
        let mut input = FrameInput::default();
        if state.phase == ScenePhase::GameOver {
            return input;
        }

        let target = -log_angle * self.angle_gain;
        let error = state.drift.log_x - target;
        if error > self.dead_zone {
            input.left = true;
        } else if error < -self.dead_zone {
            input.right = true;
        }

        // Catch balance whenever vertical drift carries the player away from the band centre
        if state.tuning.vertical_drift {
            let tuning = &state.tuning;
            let middle = (tuning.stall_band_top + tuning.stall_band_bottom) * 0.5;
            let comfort = (tuning.stall_band_bottom - tuning.stall_band_top) * 0.25;
            let offset = state.player.position.y - middle;
            let drifting_away = offset * state.drift.player_y > 0.0;
            if drifting_away {
                input.action = true;
            } else if state.drift.player_y == 0.0 && offset.abs() > comfort {
                // Walk back toward the middle of the band
                if offset > 0.0 {
                    input.up = true;
                } else {
                    input.down = true;
                }
            }
        }

        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::physics::{KinematicWorld, PhysicsBackend};
    use crate::sim::tick;

    fn state() -> SceneState {
        SceneState::new(Tuning::default(), 9)
    }

    #[test]
    fn test_counter_steers_outside_dead_zone() {
        let pilot = Autopilot::new(0.1);
        let mut state = state();
        state.player.position.y = 484.0;

        state.drift.log_x = 0.05;
        assert_eq!(pilot.steer(&state, 0.0), FrameInput::default());

        state.drift.log_x = 0.2;
        assert!(pilot.steer(&state, 0.0).left);

        state.drift.log_x = -0.2;
        assert!(pilot.steer(&state, 0.0).right);

        // A log tilted right wants negative drift
        state.drift.log_x = 0.0;
        assert!(pilot.steer(&state, 10.0).left);
    }

    #[test]
    fn test_catches_vertical_drift() {
        let pilot = Autopilot::default();
        let mut state = state();
        // Below the band centre and still sinking
        state.player.position.y = 540.0;
        state.drift.player_y = 0.2;
        assert!(pilot.steer(&state, 0.0).action);

        // Settled below the centre: walk back up
        state.drift.player_y = 0.0;
        let input = pilot.steer(&state, 0.0);
        assert!(input.up && !input.action);
    }

    #[test]
    fn test_idle_after_game_over() {
        let pilot = Autopilot::new(0.0);
        let mut state = state();
        state.phase = ScenePhase::GameOver;
        state.drift.log_x = 3.0;
        assert_eq!(pilot.steer(&state, 20.0), FrameInput::default());
    }

    #[test]
    fn test_keeps_log_balanced() {
        let pilot = Autopilot::new(0.2);
        let mut physics = KinematicWorld::new();
        let mut state = SceneState::spawn(Tuning::default(), 77, &mut physics).unwrap();
        state.drift.log_x = 0.3;

        for _ in 0..1200 {
            let angle = state.log_body(&physics).unwrap().angle;
            let input = pilot.steer(&state, angle);
            tick(&mut state, &mut physics, &input).unwrap();
            physics.step();
        }
        assert!(!state.is_game_over());
    }
}
