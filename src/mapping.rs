use crate::types::*;
use log::trace;
use serde::{Deserialize, Serialize};

/// One MIDI note number bound to a lane, with its own sensitivity and
/// debounce window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub lane: Lane,
    pub midi_value: u8,
    /// Minimum velocity (inclusive) for a hit to count.
    pub velocity_threshold: u8,
    /// Seconds that must pass after an accepted hit before the same
    /// MIDI value is accepted again (inclusive).
    pub overhit_threshold: f64,
    /// Input clock time of the last accepted hit. `None` until first hit.
    #[serde(skip)]
    pub last_hit: Option<f64>,
}

impl Mapping {
    pub fn new(lane: Lane, midi_value: u8, velocity_threshold: u8, overhit_threshold: f64) -> Self {
        Self {
            lane,
            midi_value,
            velocity_threshold,
            overhit_threshold,
            last_hit: None,
        }
    }

    fn debounced(&self, now: f64) -> bool {
        match self.last_hit {
            Some(last) => now - last < self.overhit_threshold,
            None => false,
        }
    }
}

/// Global dynamics settings applied to every accepted hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dynamics {
    /// Hits with velocity strictly below this are ghost notes.
    pub threshold: u8,
    /// When false, ghost notes are still counted but drawn at full color.
    pub show: bool,
}

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            threshold: 100,
            show: true,
        }
    }
}

/// An accepted note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub lane: Lane,
    pub velocity: u8,
    pub ghost: bool,
    /// Color multiplier: [`GHOST_DYNAMIC`] for shown ghost notes, else 1.0.
    pub dynamic: f32,
}

/// Ordered MIDI-value → lane table. Searched in insertion order; the first
/// mapping with a matching value decides, even when it rejects the hit.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    mappings: Vec<Mapping>,
}

impl MappingTable {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// First mapping for a MIDI value, if any.
    pub fn find(&self, midi_value: u8) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.midi_value == midi_value)
    }

    /// Classify a note message at input clock time `now` (seconds).
    pub fn classify(&mut self, note: RawNoteOn, now: f64, dynamics: Dynamics) -> Option<Hit> {
        if !note.is_note_on() {
            trace!("drop {}: not a note-on", note);
            return None;
        }

        let Some(mapping) = self.mappings.iter_mut().find(|m| m.midi_value == note.key) else {
            trace!("drop {}: unmapped", note);
            return None;
        };

        if note.velocity < mapping.velocity_threshold {
            trace!("drop {}: below velocity threshold {}", note, mapping.velocity_threshold);
            return None;
        }
        if mapping.debounced(now) {
            trace!("drop {}: overhit within {:.3}s", note, mapping.overhit_threshold);
            return None;
        }

        mapping.last_hit = Some(now);

        let ghost = note.velocity < dynamics.threshold;
        let dynamic = if ghost && dynamics.show { GHOST_DYNAMIC } else { 1.0 };

        Some(Hit {
            lane: mapping.lane,
            velocity: note.velocity,
            ghost,
            dynamic,
        })
    }
}
