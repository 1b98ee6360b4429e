//! The seam between the frame loop and whatever draws the notes.

use crate::engine::LaneStats;
use crate::layout::LaneOrder;
use crate::note_store::InstanceView;
use crate::types::*;

/// Per-lane counters shown in the stats bar, in display order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsOverlay {
    pub lanes: [LaneStats; LANE_COUNT],
    pub order: LaneOrder,
    pub direction: ScrollDirection,
    pub show_dynamics: bool,
}

impl StatsOverlay {
    /// `(lane, hits, ghosts)` for each display slot, left to right.
    pub fn rows(&self) -> impl Iterator<Item = (Lane, u32, u32)> + '_ {
        self.order.lanes().iter().map(|&lane| {
            let s = &self.lanes[lane.index()];
            (lane, s.hit_count, s.ghost_count)
        })
    }

    /// Label for one lane, e.g. `"Snare 12"` or `"Snare 12/3"` with ghosts.
    pub fn label(&self, lane: Lane) -> String {
        let s = &self.lanes[lane.index()];
        if self.show_dynamics {
            format!("{} {}/{}", lane.name(), s.hit_count, s.ghost_count)
        } else {
            format!("{} {}", lane.name(), s.hit_count)
        }
    }
}

/// A consumer of note instance buffers. Only the render thread calls it.
pub trait RenderBackend {
    /// Upload every instance array. Slices are `MAX_NOTES` long.
    fn flush_instance_buffers(&mut self, instances: &InstanceView<'_>);

    /// Draw `count` instances of the note quad from the last upload.
    fn draw_instanced(&mut self, count: usize);

    /// Draw the stats bar. Backends without one ignore it.
    fn draw_stats(&mut self, _stats: &StatsOverlay) {}
}

/// Backend for runs without a display. Keeps the visible note count so
/// headless sessions can still log what would be on screen.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    visible: usize,
}

impl HeadlessBackend {
    pub fn visible(&self) -> usize {
        self.visible
    }
}

impl RenderBackend for HeadlessBackend {
    fn flush_instance_buffers(&mut self, instances: &InstanceView<'_>) {
        self.visible = (0..instances.len()).filter(|&i| instances.is_visible(i)).count();
    }

    fn draw_instanced(&mut self, _count: usize) {}
}
