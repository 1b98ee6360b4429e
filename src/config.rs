//! Persistent settings, loaded at startup and saved on shutdown.
//!
//! Any field missing from the file takes its default, and a missing or
//! malformed file yields `None` so callers fall back to `Settings::default()`.

use crate::engine::NoteStyle;
use crate::layout::LaneOrder;
use crate::mapping::Dynamics;
use crate::types::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Position and size of a window, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub settings_window: WindowGeometry,
    pub visualizer_window: WindowGeometry,

    /// MIDI input port to open (index suffix excluded).
    pub port_name: String,
    pub color_profile_name: String,
    pub midi_profile_name: String,
    /// Selected player profile; `None` until one is chosen.
    pub profile_id: Option<usize>,

    pub dynamic_threshold: u32,
    pub lefty_flip: bool,
    pub show_dynamics: bool,
    pub show_stats: bool,

    pub scroll_speed: f32,
    pub scroll_direction: ScrollDirection,
    pub note_width: f32,
    pub note_height: f32,
    pub note_gap: f32,
    pub note_separation_mode: NoteSeparationMode,

    pub tom_texture_name: String,
    pub cymbal_texture_name: String,
    pub kick_texture_name: String,

    pub lane_order: LaneOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settings_window: WindowGeometry { x: 100, y: 100, width: 630, height: 800 },
            visualizer_window: WindowGeometry { x: 730, y: 100, width: 350, height: 800 },
            port_name: "loopMIDI Visualizer".into(),
            color_profile_name: String::new(),
            midi_profile_name: "loopMIDI CH".into(),
            profile_id: None,
            dynamic_threshold: 100,
            lefty_flip: false,
            show_dynamics: true,
            show_stats: true,
            scroll_speed: 1.0,
            scroll_direction: ScrollDirection::Down,
            note_width: 0.1,
            note_height: 0.025,
            note_gap: 0.005,
            note_separation_mode: NoteSeparationMode::Cutoff,
            tom_texture_name: "square".into(),
            cymbal_texture_name: "triangle".into(),
            kick_texture_name: "square".into(),
            lane_order: LaneOrder::default(),
        }
    }
}

/// Limits shared by the speed hotkeys.
pub const MIN_KEY_SCROLL_SPEED: f32 = 0.5;
pub const MAX_SCROLL_SPEED: f32 = 5.0;
pub const SCROLL_SPEED_STEP: f32 = 0.25;
/// The settings window allows slower speeds than the hotkeys do.
pub const MIN_SCROLL_SPEED: f32 = 0.25;
/// Note width/height range offered by the settings window.
pub const NOTE_SIZE_RANGE: (f32, f32) = (0.01, 0.125);
pub const MAX_NOTE_GAP: f32 = 0.1;

impl Settings {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(s) => {
                info!("Loaded settings from {:?}", path);
                Some(s)
            }
            Err(e) => {
                warn!("Failed to parse settings file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|| {
            info!("No usable settings at {:?}, using defaults", path);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, json)?;
        info!("Settings saved to {:?}", path);
        Ok(())
    }

    pub fn texture_name(&self, kind: LaneKind) -> &str {
        match kind {
            LaneKind::Tom => &self.tom_texture_name,
            LaneKind::Cymbal => &self.cymbal_texture_name,
            LaneKind::Kick => &self.kick_texture_name,
        }
    }

    pub fn dynamics(&self) -> Dynamics {
        Dynamics {
            threshold: self.dynamic_threshold.min(u8::MAX as u32) as u8,
            show: self.show_dynamics,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.visualizer_window.width.max(1) as f32,
            self.visualizer_window.height.max(1) as f32,
        )
    }

    /// The engine's view of these settings.
    pub fn note_style(&self) -> NoteStyle {
        NoteStyle {
            direction: self.scroll_direction,
            viewport: self.viewport(),
            show_stats: self.show_stats,
            lefty_flip: self.lefty_flip,
            lane_order: self.lane_order,
            note_width: self.note_width,
            note_height: self.note_height,
            note_gap: self.note_gap,
            separation: self.note_separation_mode,
            dynamics: self.dynamics(),
        }
    }

    pub fn speed_down(&mut self) {
        self.scroll_speed = (self.scroll_speed - SCROLL_SPEED_STEP).max(MIN_KEY_SCROLL_SPEED);
    }

    pub fn speed_up(&mut self) {
        self.scroll_speed = (self.scroll_speed + SCROLL_SPEED_STEP).min(MAX_SCROLL_SPEED);
    }
}
