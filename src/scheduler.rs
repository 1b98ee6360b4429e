use crate::engine::{lock_engine, SharedEngine};
use crate::layout::compute_velocity;
use crate::note_store::InstanceSnapshot;
use crate::render::{RenderBackend, StatsOverlay};
use crate::types::*;

/// Drives one frame: scroll every note, then hand a copy of the instance
/// arrays to the backend with the engine lock already released.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    snapshot: InstanceSnapshot,
    frames: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `speed * delta_seconds` along the current direction and
    /// draw. `show_dynamics` only affects the stats labels.
    pub fn tick(
        &mut self,
        engine: &SharedEngine,
        speed: f32,
        delta_seconds: f64,
        show_dynamics: bool,
        backend: &mut dyn RenderBackend,
    ) {
        let stats = {
            let mut engine = lock_engine(engine);
            let style = *engine.style();
            engine.advance(compute_velocity(style.direction, speed, delta_seconds));
            self.snapshot.copy_from(&engine.store().read_for_upload());
            style.show_stats.then(|| StatsOverlay {
                lanes: engine.lane_stats(),
                order: style.lane_order,
                direction: style.direction,
                show_dynamics,
            })
        };

        backend.flush_instance_buffers(&self.snapshot.view());
        backend.draw_instanced(MAX_NOTES);
        if let Some(stats) = stats {
            backend.draw_stats(&stats);
        }
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The arrays handed to the backend on the last tick.
    pub fn snapshot(&self) -> &InstanceSnapshot {
        &self.snapshot
    }
}
