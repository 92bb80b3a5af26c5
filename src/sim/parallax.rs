//! Decorative parallax lines
//!
//! Lines scroll through a vertical band to fake forward/backward motion of the
//! player. Scroll speed is proportional to how far the player has pushed past
//! the forward or backward trigger; lines leaving the band wrap to the other
//! edge.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::Sprite;
use crate::playfield_center;
use crate::tuning::ParallaxTuning;

/// One scrolling line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub sprite: Sprite,
    /// Signed horizontal offset from screen centre at spawn and after each wrap
    pub base_offset: f32,
    /// Current signed offset from screen centre
    pub offset: f32,
}

impl Line {
    fn place(&mut self, y: f32) {
        self.sprite.position = Vec2::new(playfield_center().x + self.offset, y);
    }
}

/// Spread `line_count` lines evenly over the band, alternating sides of the centre
pub fn spawn_lines(tuning: &ParallaxTuning) -> Vec<Line> {
    let count = tuning.line_count.max(1);
    let height = tuning.band_bottom - tuning.band_top;

    (0..tuning.line_count)
        .map(|i| {
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            let spread = (tuning.base_spread + tuning.spread_step * i as f32)
                .clamp(tuning.min_spread, tuning.max_spread);
            let y = tuning.band_top + height * (i as f32 + 0.5) / count as f32;

            let mut line = Line {
                sprite: Sprite::new("line", Vec2::ZERO).with_alpha(0.6),
                base_offset: side * spread,
                offset: side * spread,
            };
            line.place(y);
            line
        })
        .collect()
}

/// Signed scroll ratio for a player at `player_y`
///
/// Positive while advancing (above the forward trigger), negative while
/// retreating (below the backward trigger), zero in between. Saturates at ±1
/// once the player is `trigger_range` past a trigger.
pub fn speed_ratio(tuning: &ParallaxTuning, player_y: f32) -> f32 {
    let center = playfield_center().y;
    let forward = center + tuning.forward_margin;
    let backward = center + tuning.backward_margin;

    if player_y < forward {
        ((forward - player_y) / tuning.trigger_range).min(1.0)
    } else if player_y > backward {
        -((player_y - backward) / tuning.trigger_range).min(1.0)
    } else {
        0.0
    }
}

/// Scroll every line for one frame. Returns how many lines wrapped.
pub fn advance(lines: &mut [Line], tuning: &ParallaxTuning, player_y: f32) -> usize {
    let ratio = speed_ratio(tuning, player_y);
    if ratio == 0.0 {
        return 0;
    }

    let height = tuning.band_bottom - tuning.band_top;
    let mut wrapped = 0;

    for line in lines.iter_mut() {
        let mut y = line.sprite.position.y + ratio * tuning.max_speed;

        // Advancing pushes lines outward, retreating pulls them toward the centre
        let magnitude = (line.offset.abs() * (1.0 + ratio * tuning.spread_rate))
            .clamp(tuning.min_spread, tuning.max_spread);
        line.offset = magnitude.copysign(line.base_offset);

        if y > tuning.band_bottom || y < tuning.band_top {
            // Steps longer than the band wrap more than once
            y = (tuning.band_top + (y - tuning.band_top).rem_euclid(height))
                .min(tuning.band_bottom);
            line.offset = line.base_offset;
            wrapped += 1;
        }

        line.place(y);
    }

    if wrapped > 0 {
        log::debug!("Parallax wrapped {} line(s) at ratio {:.2}", wrapped, ratio);
    }
    wrapped
}
