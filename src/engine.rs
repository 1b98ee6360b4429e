use crate::layout::{compute_spawn_positions, LaneOrder};
use crate::mapping::{Dynamics, Hit, MappingTable};
use crate::note_store::{NoteInstanceStore, NoteSprite, SlotRef};
use crate::separation::{adjust_for_new_note, NoteGeometry};
use crate::types::*;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// Per-lane spawn point, back-reference and counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneStats {
    pub spawn: [f32; 3],
    /// Most recent note spawned in this lane, for separation.
    pub last_spawned: Option<SlotRef>,
    pub hit_count: u32,
    pub ghost_count: u32,
}

impl Default for LaneStats {
    fn default() -> Self {
        Self {
            spawn: SENTINEL_OFFSET,
            last_spawned: None,
            hit_count: 0,
            ghost_count: 0,
        }
    }
}

/// How a lane's notes look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneConfig {
    pub color: [f32; 3],
    pub texture_id: u32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            texture_id: 0,
        }
    }
}

/// The slice of settings the engine reads while spawning and laying out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteStyle {
    pub direction: ScrollDirection,
    pub viewport: Viewport,
    pub show_stats: bool,
    pub lefty_flip: bool,
    pub lane_order: LaneOrder,
    /// Note size across the lane.
    pub note_width: f32,
    /// Note size along the scroll axis.
    pub note_height: f32,
    pub note_gap: f32,
    pub separation: NoteSeparationMode,
    pub dynamics: Dynamics,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            direction: ScrollDirection::Down,
            viewport: Viewport::new(350.0, 800.0),
            show_stats: true,
            lefty_flip: false,
            lane_order: LaneOrder::default(),
            note_width: 0.1,
            note_height: 0.025,
            note_gap: 0.005,
            separation: NoteSeparationMode::Cutoff,
            dynamics: Dynamics::default(),
        }
    }
}

impl NoteStyle {
    fn geometry(&self) -> NoteGeometry {
        NoteGeometry {
            half_extent: self.note_height * 0.5,
            gap: self.note_gap,
        }
    }

    /// Sprite scale: height along the scroll axis, width across it.
    fn scale(&self) -> [f32; 2] {
        let mut s = [0.0; 2];
        s[self.direction.axis()] = self.note_height;
        s[self.direction.cross_axis()] = self.note_width;
        s
    }

    fn layout_differs(&self, other: &NoteStyle) -> bool {
        self.direction != other.direction
            || self.viewport != other.viewport
            || self.show_stats != other.show_stats
            || self.lefty_flip != other.lefty_flip
            || self.lane_order != other.lane_order
    }
}

/// All state touched by MIDI input: mappings, the instance ring buffer and
/// the lane table. One instance per process, shared behind a single mutex.
#[derive(Debug)]
pub struct VisualizerEngine {
    mappings: MappingTable,
    store: NoteInstanceStore,
    lanes: [LaneStats; LANE_COUNT],
    lane_configs: [LaneConfig; LANE_COUNT],
    style: NoteStyle,
    /// Integrated input clock in seconds (sum of transport deltas).
    clock: f64,
}

impl VisualizerEngine {
    pub fn new(mappings: MappingTable, style: NoteStyle, lane_configs: [LaneConfig; LANE_COUNT]) -> Self {
        let mut engine = Self {
            mappings,
            store: NoteInstanceStore::new(),
            lanes: [LaneStats::default(); LANE_COUNT],
            lane_configs,
            style,
            clock: 0.0,
        };
        engine.relayout();
        engine
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    // ─── MIDI path ──────────────────────────────────────────────────────

    /// Feed one transport message. `delta` is the time since the previous
    /// message as reported by the transport.
    pub fn ingest(&mut self, delta: f64, bytes: &[u8]) -> Option<Hit> {
        self.clock += delta;
        let note = RawNoteOn::parse(bytes)?;
        let hit = self.mappings.classify(note, self.clock, self.style.dynamics)?;
        let slot = self.spawn_hit(&hit);
        debug!(
            "{} vel={} ghost={} → slot {} (t={:.3}s)",
            hit.lane, hit.velocity, hit.ghost, slot.index, self.clock
        );
        Some(hit)
    }

    /// Spawn the note for an accepted hit and count it.
    pub fn spawn_hit(&mut self, hit: &Hit) -> SlotRef {
        let i = hit.lane.index();
        let config = self.lane_configs[i];
        let spawn = self.lanes[i].spawn;

        if let Some(previous) = self.lanes[i].last_spawned {
            adjust_for_new_note(
                &mut self.store,
                previous,
                spawn,
                self.style.direction,
                self.style.geometry(),
                self.style.separation,
            );
        }

        let c = config.color;
        let slot = self.store.spawn(NoteSprite {
            position: spawn,
            scale: self.style.scale(),
            color: [c[0] * hit.dynamic, c[1] * hit.dynamic, c[2] * hit.dynamic],
            texture_id: config.texture_id,
        });

        let lane = &mut self.lanes[i];
        lane.last_spawned = Some(slot);
        lane.hit_count += 1;
        if hit.ghost {
            lane.ghost_count += 1;
        }
        slot
    }

    // ─── Layout ─────────────────────────────────────────────────────────

    /// Recompute spawn points and drop every note on screen.
    pub fn relayout(&mut self) {
        let s = &self.style;
        let spawns = compute_spawn_positions(s.direction, s.viewport, s.show_stats, &s.lane_order, s.lefty_flip);
        for (lane, spawn) in self.lanes.iter_mut().zip(spawns) {
            lane.spawn = spawn;
        }
        self.clear_notes();
    }

    /// Park every slot off-screen; no lane may refer back to a cleared note.
    pub fn clear_notes(&mut self) {
        self.store.clear_notes();
        for lane in &mut self.lanes {
            lane.last_spawned = None;
        }
    }

    pub fn set_scroll_direction(&mut self, direction: ScrollDirection) {
        self.style.direction = direction;
        self.relayout();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.style.viewport = viewport;
        self.relayout();
    }

    /// Replace the settings snapshot; relayouts only if placement changed.
    pub fn set_style(&mut self, style: NoteStyle) {
        let relayout = style.layout_differs(&self.style);
        self.style = style;
        if relayout {
            self.relayout();
        }
    }

    pub fn set_lane_configs(&mut self, configs: [LaneConfig; LANE_COUNT]) {
        self.lane_configs = configs;
    }

    // ─── Render path ────────────────────────────────────────────────────

    pub fn advance(&mut self, velocity: [f32; 2]) {
        self.store.advance(velocity);
    }

    pub fn store(&self) -> &NoteInstanceStore {
        &self.store
    }

    // ─── Stats ──────────────────────────────────────────────────────────

    pub fn lane_stats(&self) -> [LaneStats; LANE_COUNT] {
        self.lanes
    }

    pub fn lane(&self, lane: Lane) -> &LaneStats {
        &self.lanes[lane.index()]
    }

    pub fn reset_stats(&mut self) {
        for lane in &mut self.lanes {
            lane.hit_count = 0;
            lane.ghost_count = 0;
        }
    }

    pub fn style(&self) -> &NoteStyle {
        &self.style
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }
}

// ─── Sharing ────────────────────────────────────────────────────────────────

pub type SharedEngine = Arc<Mutex<VisualizerEngine>>;

/// Lock the engine. A panic while holding the lock leaves plain data
/// behind, so a poisoned lock is taken over rather than propagated.
pub fn lock_engine(engine: &SharedEngine) -> MutexGuard<'_, VisualizerEngine> {
    engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transport-side handle. Cheap to clone; every clone feeds the same engine.
#[derive(Clone)]
pub struct MidiIngestion {
    engine: SharedEngine,
}

impl MidiIngestion {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    /// Transport callback: integrate the clock, classify and spawn, all
    /// under the engine lock.
    pub fn on_message(&self, delta_seconds: f64, bytes: &[u8]) -> Option<Hit> {
        lock_engine(&self.engine).ingest(delta_seconds, bytes)
    }
}
