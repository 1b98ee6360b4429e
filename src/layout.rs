//! Lane placement and scroll velocity.
//!
//! Coordinates are clip space: both axes run from -1.0 to 1.0 across the
//! overlay. Lanes are spread along the cross axis; notes spawn at the
//! upstream edge of the scroll axis and travel toward the other edge.

use crate::types::*;
use serde::{Deserialize, Serialize};

// ─── Display order ──────────────────────────────────────────────────────────

/// User-arranged display order of the lanes: slot `i` holds the lane drawn
/// at the `i`-th position across the overlay. Always a permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Lane>", into = "Vec<Lane>")]
pub struct LaneOrder([Lane; LANE_COUNT]);

impl Default for LaneOrder {
    fn default() -> Self {
        Self(Lane::ALL)
    }
}

impl LaneOrder {
    pub fn lanes(&self) -> &[Lane; LANE_COUNT] {
        &self.0
    }

    /// Display slot of a lane.
    pub fn slot_of(&self, lane: Lane) -> usize {
        self.0.iter().position(|&l| l == lane).unwrap_or(lane.index())
    }

    /// Drag-and-drop reorder: the lane at `source` moves to `target` and the
    /// lanes in between shift one slot toward where it came from.
    /// Returns false when either slot is out of range or they are equal.
    pub fn move_lane(&mut self, source: usize, target: usize) -> bool {
        if source >= LANE_COUNT || target >= LANE_COUNT || source == target {
            return false;
        }
        if source < target {
            self.0[source..=target].rotate_left(1);
        } else {
            self.0[target..=source].rotate_right(1);
        }
        true
    }
}

impl TryFrom<Vec<Lane>> for LaneOrder {
    type Error = String;

    fn try_from(lanes: Vec<Lane>) -> Result<Self, Self::Error> {
        let arr: [Lane; LANE_COUNT] = lanes
            .try_into()
            .map_err(|v: Vec<Lane>| format!("lane order needs {} lanes, got {}", LANE_COUNT, v.len()))?;
        for lane in Lane::ALL {
            if !arr.contains(&lane) {
                return Err(format!("lane order is missing {}", lane));
            }
        }
        Ok(Self(arr))
    }
}

impl From<LaneOrder> for Vec<Lane> {
    fn from(order: LaneOrder) -> Self {
        order.0.to_vec()
    }
}

// ─── Spawn positions ────────────────────────────────────────────────────────

/// Spawn point of every lane, indexed by [`Lane::index`].
///
/// The cross-axis coordinate of display slot `i` is
/// `LANE_START + i * LANE_STEP` (mirrored when `lefty_flip`). Along the
/// scroll axis notes start at the upstream edge, pulled in by the stats bar
/// thickness when the stats bar is shown. The z component is the sprite's
/// horizontal mirror sign; it only flips for vertical scrolling, where x
/// runs across the lanes.
pub fn compute_spawn_positions(
    direction: ScrollDirection,
    viewport: Viewport,
    show_stats: bool,
    order: &LaneOrder,
    lefty_flip: bool,
) -> [[f32; 3]; LANE_COUNT] {
    let axis = direction.axis();
    let cross = direction.cross_axis();

    let reserved = if show_stats {
        stats_bar_reserve(viewport.extent(axis))
    } else {
        0.0
    };
    let edge = -direction.sign() * (1.0 - reserved);
    let mirror = if lefty_flip { -1.0 } else { 1.0 };
    let sprite_mirror = if cross == 0 { mirror } else { 1.0 };

    let mut positions = [[0.0, 0.0, sprite_mirror]; LANE_COUNT];
    for (slot, lane) in order.lanes().iter().enumerate() {
        let p = &mut positions[lane.index()];
        p[axis] = edge;
        p[cross] = mirror * (LANE_START + slot as f32 * LANE_STEP);
    }
    positions
}

/// Clip-space thickness of the stats bar for a viewport extent in pixels.
fn stats_bar_reserve(extent_px: f32) -> f32 {
    if extent_px <= 0.0 {
        return 0.0;
    }
    (2.0 * STATS_BAR_PIXELS / extent_px).min(2.0)
}

// ─── Velocity ───────────────────────────────────────────────────────────────

/// Per-frame displacement: the direction's unit vector times `speed * dt`.
pub fn compute_velocity(direction: ScrollDirection, speed: f32, delta_seconds: f64) -> [f32; 2] {
    let step = (delta_seconds * speed as f64) as f32;
    let unit = direction.unit();
    [unit[0] * step, unit[1] * step]
}
