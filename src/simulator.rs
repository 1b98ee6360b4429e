use crate::engine::MidiIngestion;
use crate::types::*;
use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

/// General MIDI drum notes the groove plays.
pub mod gm {
    pub const KICK: u8 = 36;
    pub const SNARE: u8 = 38;
    pub const HI_HAT: u8 = 42;
    pub const CRASH: u8 = 49;
    pub const HIGH_TOM: u8 = 48;
    pub const MID_TOM: u8 = 45;
    pub const FLOOR_TOM: u8 = 43;
}

/// Delay of the sensor double-trigger after a real hit.
const BOUNCE_SECONDS: f64 = 0.004;

/// One note-on at a time offset from the start of its bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrooveHit {
    pub at: f64,
    pub note: RawNoteOn,
}

fn hit(at: f64, key: u8, velocity: u8) -> GrooveHit {
    GrooveHit {
        at,
        note: RawNoteOn {
            status: NOTE_ON_DRUMS,
            key,
            velocity,
        },
    }
}

/// Small deterministic velocity wobble so repeated bars are not identical.
fn humanize(base: u8, seed: u32) -> u8 {
    let wobble = (seed.wrapping_mul(2_654_435_761) >> 28) as u8; // 0..=15
    base.saturating_sub(wobble / 2).max(1)
}

/// Hits of bar `bar` (0-based) of a 4/4 rock groove at `bpm`, sorted by time.
///
/// Hi-hat eighths accented on the beat, kick on 1 and 3, snare on 2 and 4
/// with ghost notes between. Every fourth bar ends in a tom fill and the
/// bar after it opens on a crash. Odd bars' backbeats carry a sensor bounce.
pub fn groove_bar(bar: u32, bpm: f32) -> Vec<GrooveHit> {
    let beat = 60.0 / bpm.max(1.0) as f64;
    let eighth = beat / 2.0;
    let sixteenth = beat / 4.0;
    let fill = bar % 4 == 3;
    let crash = bar > 0 && bar % 4 == 0;
    let seed = bar * 16;

    let mut hits = Vec::with_capacity(24);

    for i in 0..8u32 {
        let t = i as f64 * eighth;
        if fill && i >= 6 {
            continue;
        }
        if crash && i == 0 {
            hits.push(hit(t, gm::CRASH, humanize(120, seed + i)));
        } else {
            let accent = if i % 2 == 0 { 100 } else { 72 };
            hits.push(hit(t, gm::HI_HAT, humanize(accent, seed + i)));
        }
    }

    hits.push(hit(0.0, gm::KICK, humanize(112, seed + 8)));
    hits.push(hit(2.0 * beat, gm::KICK, humanize(108, seed + 9)));
    if bar % 2 == 1 {
        hits.push(hit(2.5 * beat, gm::KICK, humanize(96, seed + 10)));
    }

    for (n, b) in [1.0, 3.0].into_iter().enumerate() {
        if fill && b == 3.0 {
            break;
        }
        let t = b * beat;
        hits.push(hit(t, gm::SNARE, humanize(118, seed + 11 + n as u32)));
        if bar % 2 == 1 {
            hits.push(hit(t + BOUNCE_SECONDS, gm::SNARE, 9));
        }
    }

    // Ghost notes on the "a" of 2 and, outside fills, the "e" of 4.
    hits.push(hit(beat + 3.0 * sixteenth, gm::SNARE, humanize(34, seed + 13)));
    if !fill {
        hits.push(hit(3.0 * beat + sixteenth, gm::SNARE, humanize(30, seed + 14)));
    }

    if fill {
        let toms = [gm::HIGH_TOM, gm::HIGH_TOM, gm::MID_TOM, gm::MID_TOM, gm::FLOOR_TOM, gm::FLOOR_TOM, gm::FLOOR_TOM, gm::KICK];
        for (k, &key) in toms.iter().enumerate() {
            let t = 3.0 * beat + k as f64 * sixteenth / 2.0;
            hits.push(hit(t, key, humanize(104 + k as u8 * 2, seed + 15 + k as u32)));
        }
    }

    hits.sort_by(|a, b| a.at.total_cmp(&b.at));
    hits
}

/// Length of one 4/4 bar in seconds.
pub fn bar_seconds(bpm: f32) -> f64 {
    4.0 * 60.0 / bpm.max(1.0) as f64
}

/// A synthetic drum kit. Plays the groove in real time from its own
/// thread, delivering each message like a MIDI transport would: with the
/// wall-clock time since the previous message.
pub struct Simulator {
    ingestion: MidiIngestion,
    bpm: f32,
    bars: Option<u32>,
}

impl Simulator {
    pub fn new(ingestion: MidiIngestion, bpm: f32) -> Self {
        Self {
            ingestion,
            bpm,
            bars: None,
        }
    }

    /// Stop after this many bars instead of playing forever.
    pub fn with_bars(mut self, bars: Option<u32>) -> Self {
        self.bars = bars;
        self
    }

    /// Blocks the calling thread.
    pub fn run(&mut self) {
        info!("Simulator playing groove at {:.0} bpm", self.bpm);
        let start = Instant::now();
        let mut last = start;
        let bar_len = bar_seconds(self.bpm);
        let mut accepted = 0u64;

        let mut bar = 0u32;
        while self.bars.map_or(true, |max| bar < max) {
            let bar_start = bar as f64 * bar_len;
            for h in groove_bar(bar, self.bpm) {
                let due = start + Duration::from_secs_f64(bar_start + h.at);
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
                let sent = Instant::now();
                let delta = sent.duration_since(last).as_secs_f64();
                last = sent;
                if self.ingestion.on_message(delta, &h.note.to_bytes()).is_some() {
                    accepted += 1;
                }
            }
            bar += 1;
            if bar % 8 == 0 {
                debug!("Simulator: {} bars, {} hits accepted", bar, accepted);
            }
        }

        info!("Simulator finished after {} bars ({} hits accepted)", bar, accepted);
    }
}
