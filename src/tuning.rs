//! Game balance and scene variants
//!
//! Every tuning knob of the gameplay scene lives in [`Tuning`]. The four
//! historical builds of the scene are [`Variant`] presets of the same struct.
//! Tunings can be loaded from JSON; missing fields fall back to the
//! [`Variant::Stacked`] preset.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Scene variant presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Horizontal drift only; seeds the drift when it sits at exactly zero
    Original,
    /// Adds the vertical drift model and the action-key reset
    Balance,
    /// Adds 1-5 stacked boxes riding on the log
    #[default]
    Stacked,
    /// Adds scrolling parallax lines
    Parallax,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Original,
        Variant::Balance,
        Variant::Stacked,
        Variant::Parallax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Balance => "balance",
            Variant::Stacked => "stacked",
            Variant::Parallax => "parallax",
        }
    }

    /// Build the tuning preset for this variant
    pub fn tuning(self) -> Tuning {
        let stacked = Tuning::stacked();
        match self {
            Variant::Original => Tuning {
                vertical_drift: false,
                idle_seed: Some(0.01),
                box_count_min: 0,
                box_count_max: 0,
                ..stacked
            },
            Variant::Balance => Tuning {
                box_count_min: 0,
                box_count_max: 0,
                ..stacked
            },
            Variant::Stacked => stacked,
            Variant::Parallax => Tuning {
                parallax: Some(ParallaxTuning::default()),
                ..stacked
            },
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = TuningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" | "v1" => Ok(Variant::Original),
            "balance" | "v2" => Ok(Variant::Balance),
            "stacked" | "v3" => Ok(Variant::Stacked),
            "parallax" | "lines" | "v4" => Ok(Variant::Parallax),
            _ => Err(TuningError::UnknownVariant(s.to_string())),
        }
    }
}

/// Errors raised while loading or validating a tuning
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("Failed to read tuning file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Unknown variant '{0}' (expected original, balance, stacked or parallax)")]
    UnknownVariant(String),

    #[error("'{field}' must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("Box count range {min}..={max} is empty")]
    EmptyBoxRange { min: u32, max: u32 },

    #[error("At most {max} boxes fit on the log, got {0}", max = MAX_BOXES)]
    TooManyBoxes(u32),

    #[error("Invalid parallax tuning: {0}")]
    Parallax(&'static str),
}

/// Decorative parallax line settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxTuning {
    /// Number of line sprites
    pub line_count: u32,
    /// Visible vertical band the lines scroll through
    pub band_top: f32,
    pub band_bottom: f32,
    /// Horizontal offset of the first line from screen centre
    pub base_spread: f32,
    /// Extra offset per line index
    pub spread_step: f32,
    /// Offsets are kept within this range
    pub min_spread: f32,
    pub max_spread: f32,
    /// Vertical scroll per frame at full speed ratio
    pub max_speed: f32,
    /// Fractional offset change per frame at full speed ratio
    pub spread_rate: f32,
    /// Player above `H/2 + forward_margin` is advancing
    pub forward_margin: f32,
    /// Player below `H/2 + backward_margin` is retreating
    pub backward_margin: f32,
    /// Distance past a trigger at which the speed ratio saturates
    pub trigger_range: f32,
}

impl Default for ParallaxTuning {
    fn default() -> Self {
        Self {
            line_count: 8,
            band_top: PLAYFIELD_HEIGHT * 0.5,
            band_bottom: PLAYFIELD_HEIGHT * WORLD_FLOOR_RATIO,
            base_spread: 160.0,
            spread_step: 24.0,
            min_spread: 16.0,
            max_spread: PLAYFIELD_WIDTH * 0.5,
            max_speed: 6.0,
            spread_rate: 0.02,
            forward_margin: LOG_HEIGHT * 2.0,
            backward_margin: LOG_HEIGHT * 8.0,
            trigger_range: LOG_HEIGHT * 4.0,
        }
    }
}

/// Gameplay scene tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Horizontal drift change per frame of left/right input
    pub x_step: f32,
    /// Vertical drift change per frame of up/down input
    pub y_step: f32,
    /// Per-frame multiplier applied to every drift accumulator
    pub growth: f32,
    /// Horizontal drift is divided by this to get the log's angular velocity
    pub angular_divisor: f32,
    /// Lateral drift per degree of log tilt
    pub drift_per_degree: f32,
    /// Tilt (degrees) past which the log falls
    pub fail_angle: f32,
    /// Anti-stall impulse range: [-stall_impulse, stall_impulse)
    pub stall_impulse: f32,
    /// Player y outside [stall_band_top, stall_band_bottom] jiggles the log
    pub stall_band_top: f32,
    pub stall_band_bottom: f32,
    /// Model vertical drift (up/down/action)
    pub vertical_drift: bool,
    /// Seed horizontal drift from [-v, v] whenever it is exactly zero
    pub idle_seed: Option<f32>,
    /// Inclusive range of stacked boxes spawned per scene entry
    pub box_count_min: u32,
    pub box_count_max: u32,
    /// Frames between the fail and the request for the game over scene
    pub game_over_delay_frames: u32,
    /// Parallax lines, when present
    pub parallax: Option<ParallaxTuning>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::stacked()
    }
}

impl Tuning {
    fn stacked() -> Self {
        Self {
            x_step: 0.05,
            y_step: 0.05,
            growth: 1.01,
            angular_divisor: 100.0,
            drift_per_degree: 0.05,
            fail_angle: 25.0,
            stall_impulse: 0.5,
            stall_band_top: PLAYFIELD_HEIGHT / 2.0,
            stall_band_bottom: PLAYFIELD_HEIGHT / 2.0 + LOG_HEIGHT * 10.0,
            vertical_drift: true,
            idle_seed: None,
            box_count_min: 1,
            box_count_max: MAX_BOXES,
            game_over_delay_frames: 120,
            parallax: None,
        }
    }

    /// Parse and validate a JSON tuning
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a JSON tuning file
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json_pretty(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the scene cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        for (field, value) in [
            ("growth", self.growth),
            ("angular_divisor", self.angular_divisor),
            ("fail_angle", self.fail_angle),
        ] {
            if !(value > 0.0) {
                return Err(TuningError::NotPositive { field, value });
            }
        }
        if self.box_count_min > self.box_count_max {
            return Err(TuningError::EmptyBoxRange {
                min: self.box_count_min,
                max: self.box_count_max,
            });
        }
        if self.box_count_max > MAX_BOXES {
            return Err(TuningError::TooManyBoxes(self.box_count_max));
        }
        if let Some(parallax) = &self.parallax {
            if parallax.line_count == 0 {
                return Err(TuningError::Parallax("line_count must be at least 1"));
            }
            if parallax.band_top >= parallax.band_bottom {
                return Err(TuningError::Parallax("band_top must lie above band_bottom"));
            }
            if parallax.min_spread > parallax.max_spread {
                return Err(TuningError::Parallax("min_spread exceeds max_spread"));
            }
            if !(parallax.trigger_range > 0.0) {
                return Err(TuningError::Parallax("trigger_range must be positive"));
            }
        }
        Ok(())
    }

    /// Whether this tuning spawns boxes at all
    pub fn has_boxes(&self) -> bool {
        self.box_count_max > 0
    }
}
