use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Lanes ──────────────────────────────────────────────────────────────────

/// One of the eight fixed drum lanes.
///
/// Declaration order is the default display order, left to right
/// (or bottom to top when scrolling horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Snare,
    Kick,
    Cymbal1,
    Tom1,
    Cymbal2,
    Tom2,
    Cymbal3,
    Tom3,
}

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [
        Lane::Snare,
        Lane::Kick,
        Lane::Cymbal1,
        Lane::Tom1,
        Lane::Cymbal2,
        Lane::Tom2,
        Lane::Cymbal3,
        Lane::Tom3,
    ];

    /// Stable index used for every per-lane table.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        LANE_NAMES[self.index()]
    }

    pub fn kind(self) -> LaneKind {
        match self {
            Lane::Kick => LaneKind::Kick,
            Lane::Cymbal1 | Lane::Cymbal2 | Lane::Cymbal3 => LaneKind::Cymbal,
            Lane::Snare | Lane::Tom1 | Lane::Tom2 | Lane::Tom3 => LaneKind::Tom,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Texture family a lane draws with. The snare shares the tom texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneKind {
    Tom,
    Cymbal,
    Kick,
}

// ─── Scrolling ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub const ALL: [ScrollDirection; 4] = [
        ScrollDirection::Up,
        ScrollDirection::Down,
        ScrollDirection::Left,
        ScrollDirection::Right,
    ];

    /// Component index of the scroll axis: 0 = x, 1 = y.
    pub fn axis(self) -> usize {
        match self {
            ScrollDirection::Up | ScrollDirection::Down => 1,
            ScrollDirection::Left | ScrollDirection::Right => 0,
        }
    }

    /// Component index of the axis lanes are spread across.
    pub fn cross_axis(self) -> usize {
        1 - self.axis()
    }

    /// Sign of travel along the scroll axis.
    pub fn sign(self) -> f32 {
        match self {
            ScrollDirection::Up | ScrollDirection::Right => 1.0,
            ScrollDirection::Down | ScrollDirection::Left => -1.0,
        }
    }

    pub fn unit(self) -> [f32; 2] {
        let mut v = [0.0; 2];
        v[self.axis()] = self.sign();
        v
    }

    /// Rotation used by the direction hotkey: Down → Right → Up → Left → Down.
    pub fn next(self) -> Self {
        match self {
            ScrollDirection::Down => ScrollDirection::Right,
            ScrollDirection::Right => ScrollDirection::Up,
            ScrollDirection::Up => ScrollDirection::Left,
            ScrollDirection::Left => ScrollDirection::Down,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Some(ScrollDirection::Up),
            "down" => Some(ScrollDirection::Down),
            "left" => Some(ScrollDirection::Left),
            "right" => Some(ScrollDirection::Right),
            _ => None,
        }
    }
}

/// How consecutive notes in one lane avoid overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteSeparationMode {
    /// Notes may overlap freely.
    None,
    /// The previous note's sprite is cut off on its trailing edge.
    #[default]
    Cutoff,
    /// The previous note's sprite is squashed to fit.
    Squish,
}

impl NoteSeparationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(NoteSeparationMode::None),
            "cutoff" => Some(NoteSeparationMode::Cutoff),
            "squish" => Some(NoteSeparationMode::Squish),
            _ => None,
        }
    }
}

// ─── MIDI ───────────────────────────────────────────────────────────────────

/// Note-on status on channel 1.
pub const NOTE_ON: u8 = 0x90;
/// Note-on status on channel 10, the General MIDI drum channel.
pub const NOTE_ON_DRUMS: u8 = 0x99;

/// The first three bytes of a channel message, unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNoteOn {
    pub status: u8,
    pub key: u8,
    pub velocity: u8,
}

impl RawNoteOn {
    /// Needs at least three bytes; anything shorter is not a note message.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [status, key, velocity, ..] => Some(Self {
                status: *status,
                key: *key,
                velocity: *velocity,
            }),
            _ => None,
        }
    }

    pub fn is_note_on(&self) -> bool {
        self.status == NOTE_ON || self.status == NOTE_ON_DRUMS
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.key, self.velocity]
    }
}

impl fmt::Display for RawNoteOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status=0x{:02X} key={:>3} vel={:>3}",
            self.status, self.key, self.velocity
        )
    }
}

// ─── Viewport ───────────────────────────────────────────────────────────────

/// Pixel size of the overlay the notes are drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel extent along a component axis (0 = x, 1 = y).
    pub fn extent(&self, axis: usize) -> f32 {
        if axis == 0 {
            self.width
        } else {
            self.height
        }
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

pub const LANE_COUNT: usize = 8;

/// Ring buffer capacity: notes visible at once.
pub const MAX_NOTES: usize = 200;

/// Off-screen offset marking an inactive slot. Far enough outside clip
/// space that a frame of scrolling never brings it into view.
pub const SENTINEL_OFFSET: [f32; 3] = [-100.0, -100.0, 1.0];

/// Thickness of the stats bar along the scroll axis, in pixels.
pub const STATS_BAR_PIXELS: f32 = 50.0;

/// Lane coordinate of the first display slot, in clip space.
pub const LANE_START: f32 = -0.35;
/// Spacing between adjacent lanes, in clip space.
pub const LANE_STEP: f32 = 0.1;

/// Color multiplier for ghost notes when dynamics are shown.
pub const GHOST_DYNAMIC: f32 = 0.5;

pub const LANE_NAMES: [&str; LANE_COUNT] = [
    "Snare", "Kick", "Cymbal 1", "Tom 1", "Cymbal 2", "Tom 2", "Cymbal 3", "Tom 3",
];
