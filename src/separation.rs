//! Retroactive de-overlap of consecutive notes in one lane.
//!
//! When a note spawns while the previous note of its lane is still within
//! one note length of the spawn point, the previous note gives up its
//! trailing part: its leading edge stays put and its trailing edge is pulled
//! forward until it clears the new note by `gap`. All four scroll directions
//! go through the same code, parameterized by axis and travel sign.

use crate::note_store::{NoteInstanceStore, SlotRef};
use crate::types::*;

/// The new note's size along the scroll axis plus the required gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteGeometry {
    pub half_extent: f32,
    pub gap: f32,
}

impl NoteGeometry {
    pub fn extent(&self) -> f32 {
        2.0 * self.half_extent
    }

    /// Minimum center-to-center spacing between a previous note of length
    /// `previous_extent` and a new note of this geometry.
    pub fn allowed_distance(&self, previous_extent: f32) -> f32 {
        previous_extent * 0.5 + self.half_extent + self.gap
    }
}

/// What was done to the previous note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub slot: usize,
    pub adjustment: f32,
    /// Fraction of the note's length removed, 0.0–1.0.
    pub percent: f32,
}

/// Overlap math: `Some((adjustment, percent))` when `distance < allowed`.
/// `percent` is clamped to 1.0 (the note is consumed entirely).
pub fn overlap(distance: f32, allowed: f32, extent: f32) -> Option<(f32, f32)> {
    if distance >= allowed || extent <= 0.0 {
        return None;
    }
    let adjustment = allowed - distance;
    let percent = (adjustment / extent).clamp(0.0, 1.0);
    Some((adjustment, percent))
}

/// Shrink the note at `previous` so it no longer overlaps a note about to
/// spawn at `new_position`. Returns `None` when the mode is `None`, the
/// reference is stale, or there is no overlap.
pub fn adjust_for_new_note(
    store: &mut NoteInstanceStore,
    previous: SlotRef,
    new_position: [f32; 3],
    direction: ScrollDirection,
    geometry: NoteGeometry,
    mode: NoteSeparationMode,
) -> Option<Separation> {
    if mode == NoteSeparationMode::None {
        return None;
    }
    let slot = store.resolve(previous)?;

    let axis = direction.axis();
    let sign = direction.sign();
    let distance = (store.offset(slot)[axis] - new_position[axis]) * sign;
    // The previous note keeps the length it spawned with (or was cut to),
    // even if the note size changed since.
    let extent = store.scale(slot)[axis];

    let (adjustment, percent) = overlap(distance, geometry.allowed_distance(extent), extent)?;

    let geom = store.slot_mut(slot);

    // Trailing edge moves forward by the removed length; the center by half.
    let removed = extent * percent;
    geom.offset[axis] += sign * removed * 0.5;
    geom.scale[axis] *= 1.0 - percent;

    if mode == NoteSeparationMode::Cutoff {
        // Texture coordinates run with the axis, so the trailing edge is the
        // low end when travelling positive and the high end otherwise.
        let window = geom.tex_coord_scale[axis];
        if sign > 0.0 {
            geom.tex_coord_offset[axis] += window * percent;
        }
        geom.tex_coord_scale[axis] = window * (1.0 - percent);
    }

    Some(Separation {
        slot,
        adjustment,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note_store::NoteSprite;

    const GEOM: NoteGeometry = NoteGeometry { half_extent: 0.0125, gap: 0.005 };

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn spawn_at(store: &mut NoteInstanceStore, direction: ScrollDirection, pos: [f32; 3]) -> SlotRef {
        let mut scale = [0.1, 0.1];
        scale[direction.axis()] = GEOM.extent();
        store.spawn(NoteSprite {
            position: pos,
            scale,
            color: [1.0; 3],
            texture_id: 0,
        })
    }

    /// Previous note spawned at `spawn`, scrolled `travel` along the direction.
    fn scrolled_pair(direction: ScrollDirection, spawn: [f32; 3], travel: f32) -> (NoteInstanceStore, SlotRef) {
        let mut store = NoteInstanceStore::new();
        let prev = spawn_at(&mut store, direction, spawn);
        let unit = direction.unit();
        store.advance([unit[0] * travel, unit[1] * travel]);
        (store, prev)
    }

    #[test]
    fn test_overlap_math_at_half_distance() {
        let d = GEOM.allowed_distance(GEOM.extent());
        let (adjustment, percent) = overlap(d / 2.0, d, GEOM.extent()).unwrap();
        assert!(approx(adjustment, d / 2.0));
        assert!(approx(percent, (d / 2.0) / GEOM.extent()));
        assert!(overlap(d, d, GEOM.extent()).is_none());
    }

    #[test]
    fn test_down_scale_reduced_by_percent() {
        let spawn = [0.0, 0.875, 1.0];
        let d = GEOM.allowed_distance(GEOM.extent());
        let (mut store, prev) = scrolled_pair(ScrollDirection::Down, spawn, d / 2.0);

        let sep = adjust_for_new_note(&mut store, prev, spawn, ScrollDirection::Down, GEOM, NoteSeparationMode::Squish)
            .unwrap();
        let expected_percent = (d / 2.0) / GEOM.extent();
        assert!(approx(sep.percent, expected_percent));
        assert!(approx(store.scale(prev.index)[1], GEOM.extent() * (1.0 - expected_percent)));
        // Cross axis untouched.
        assert!(approx(store.scale(prev.index)[0], 0.1));
    }

    #[test]
    fn test_gap_is_restored_in_every_direction() {
        let d = GEOM.allowed_distance(GEOM.extent());
        for direction in ScrollDirection::ALL {
            let mut spawn = [0.15, 0.15, 1.0];
            spawn[direction.axis()] = -direction.sign() * 0.9;
            let (mut store, prev) = scrolled_pair(direction, spawn, d * 0.3);

            adjust_for_new_note(&mut store, prev, spawn, direction, GEOM, NoteSeparationMode::Cutoff).unwrap();

            let axis = direction.axis();
            let sign = direction.sign();
            let center = store.offset(prev.index)[axis];
            let half = store.scale(prev.index)[axis] / 2.0;
            let trailing = center - sign * half;
            let leading = center + sign * half;
            let new_leading = spawn[axis] + sign * GEOM.half_extent;

            assert!(approx((trailing - new_leading) * sign, GEOM.gap), "{:?}: gap", direction);
            let original_leading = spawn[axis] + sign * (d * 0.3 + GEOM.half_extent);
            assert!(approx(leading, original_leading), "{:?}: leading edge moved", direction);
        }
    }

    #[test]
    fn test_cutoff_trims_trailing_texture_edge() {
        let d = GEOM.allowed_distance(GEOM.extent());
        for direction in ScrollDirection::ALL {
            let axis = direction.axis();
            let cross = direction.cross_axis();
            let mut spawn = [0.0, 0.0, 1.0];
            spawn[axis] = -direction.sign();
            let (mut store, prev) = scrolled_pair(direction, spawn, d / 2.0);

            let sep = adjust_for_new_note(&mut store, prev, spawn, direction, GEOM, NoteSeparationMode::Cutoff).unwrap();
            let (off, scale) = store.tex_coord_window(prev.index);

            // Positive travel trims the low end of the window, negative the high end.
            let expected_offset = if direction.sign() > 0.0 { sep.percent } else { 0.0 };
            assert!(approx(off[axis], expected_offset), "{:?}: offset", direction);
            assert!(approx(scale[axis], 1.0 - sep.percent), "{:?}: scale", direction);
            assert_eq!((off[cross], scale[cross]), (0.0, 1.0), "{:?}: cross axis", direction);
        }
    }

    #[test]
    fn test_previous_note_keeps_its_own_length() {
        // Previous note spawned at the old size; the new note is larger.
        let bigger = NoteGeometry { half_extent: 0.015, ..GEOM };
        for direction in ScrollDirection::ALL {
            let axis = direction.axis();
            let sign = direction.sign();
            let mut spawn = [0.0, 0.0, 1.0];
            spawn[axis] = -sign * 0.9;
            let (mut store, prev) = scrolled_pair(direction, spawn, 0.03);

            let sep = adjust_for_new_note(&mut store, prev, spawn, direction, bigger, NoteSeparationMode::Squish).unwrap();
            assert!(approx(sep.percent, 0.1), "{:?}: percent", direction);

            let center = store.offset(prev.index)[axis];
            let half = store.scale(prev.index)[axis] / 2.0;
            let leading = center + sign * half;
            let trailing = center - sign * half;
            assert!(approx(leading, spawn[axis] + sign * (0.03 + GEOM.half_extent)), "{:?}: leading edge moved", direction);
            assert!(approx((trailing - (spawn[axis] + sign * bigger.half_extent)) * sign, GEOM.gap), "{:?}: gap", direction);
        }
    }

    #[test]
    fn test_squish_keeps_texture_window() {
        let d = GEOM.allowed_distance(GEOM.extent());
        let (mut store, prev) = scrolled_pair(ScrollDirection::Up, [0.0, -1.0, 1.0], d / 4.0);
        adjust_for_new_note(&mut store, prev, [0.0, -1.0, 1.0], ScrollDirection::Up, GEOM, NoteSeparationMode::Squish)
            .unwrap();
        assert_eq!(store.tex_coord_window(prev.index), ([0.0, 0.0], [1.0, 1.0]));
    }

    #[test]
    fn test_none_mode_and_far_notes_untouched() {
        let d = GEOM.allowed_distance(GEOM.extent());
        let (mut store, prev) = scrolled_pair(ScrollDirection::Down, [0.0, 1.0, 1.0], d / 2.0);
        assert!(adjust_for_new_note(&mut store, prev, [0.0, 1.0, 1.0], ScrollDirection::Down, GEOM, NoteSeparationMode::None)
            .is_none());

        let (mut store, prev) = scrolled_pair(ScrollDirection::Down, [0.0, 1.0, 1.0], d * 2.0);
        assert!(adjust_for_new_note(&mut store, prev, [0.0, 1.0, 1.0], ScrollDirection::Down, GEOM, NoteSeparationMode::Cutoff)
            .is_none());
        assert!(approx(store.scale(prev.index)[1], GEOM.extent()));
    }

    #[test]
    fn test_simultaneous_hit_consumes_previous_note() {
        let mut store = NoteInstanceStore::new();
        let prev = spawn_at(&mut store, ScrollDirection::Down, [0.0, 1.0, 1.0]);
        let sep = adjust_for_new_note(&mut store, prev, [0.0, 1.0, 1.0], ScrollDirection::Down, GEOM, NoteSeparationMode::Cutoff)
            .unwrap();
        assert_eq!(sep.percent, 1.0);
        assert_eq!(store.scale(prev.index)[1], 0.0);
    }

    #[test]
    fn test_stale_reference_is_ignored() {
        let (mut store, prev) = scrolled_pair(ScrollDirection::Down, [0.0, 1.0, 1.0], 0.001);
        store.clear_notes();
        assert!(adjust_for_new_note(&mut store, prev, [0.0, 1.0, 1.0], ScrollDirection::Down, GEOM, NoteSeparationMode::Cutoff)
            .is_none());
    }
}
