//! Player, color and MIDI profiles, plus the texture catalog.
//!
//! Layout of a config directory:
//!
//! ```text
//! players.json          [{"name": ..., "color_profile": ..., ...}, ...]
//! colors/<name>.json    {"snare": "#FF0000", ...}
//! midi/<name>.json      {"mappings": [{"lane": "Snare", "midi_value": 38, ...}]}
//! ```
//!
//! Every loader falls back to built-in defaults and never fails.

use crate::config::Settings;
use crate::engine::LaneConfig;
use crate::mapping::{Mapping, MappingTable};
use crate::types::*;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ─── Colors ─────────────────────────────────────────────────────────────────

/// Linear RGB color stored in files as `"#RRGGBB"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    /// Parse `RRGGBB` with or without a leading `#`. Malformed input is black.
    pub fn from_hex(hex: &str) -> Self {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        let rgb = if digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            u32::from_str_radix(digits, 16).unwrap_or(0)
        } else {
            0
        };
        Rgb([
            ((rgb >> 16) & 0xFF) as f32 / 255.0,
            ((rgb >> 8) & 0xFF) as f32 / 255.0,
            (rgb & 0xFF) as f32 / 255.0,
        ])
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl From<String> for Rgb {
    fn from(s: String) -> Self {
        Rgb::from_hex(&s)
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorProfile {
    pub snare: Rgb,
    pub kick: Rgb,
    pub cymbal1: Rgb,
    pub tom1: Rgb,
    pub cymbal2: Rgb,
    pub tom2: Rgb,
    pub cymbal3: Rgb,
    pub tom3: Rgb,
}

impl Default for ColorProfile {
    fn default() -> Self {
        Self {
            snare: Rgb([1.0, 0.0, 0.0]),
            kick: Rgb([1.0, 0.274_509_82, 0.0]),
            cymbal1: Rgb([1.0, 0.898_039_2, 0.192_156_87]),
            tom1: Rgb([1.0, 1.0, 0.0]),
            cymbal2: Rgb([0.113_725_49, 0.388_235_3, 1.0]),
            tom2: Rgb([0.0, 0.537_254_93, 1.0]),
            cymbal3: Rgb([0.047_058_824, 1.0, 0.047_058_824]),
            tom3: Rgb([0.0, 1.0, 0.0]),
        }
    }
}

impl ColorProfile {
    pub fn color(&self, lane: Lane) -> [f32; 3] {
        let c = match lane {
            Lane::Snare => self.snare,
            Lane::Kick => self.kick,
            Lane::Cymbal1 => self.cymbal1,
            Lane::Tom1 => self.tom1,
            Lane::Cymbal2 => self.cymbal2,
            Lane::Tom2 => self.tom2,
            Lane::Cymbal3 => self.cymbal3,
            Lane::Tom3 => self.tom3,
        };
        c.0
    }
}

// ─── Players ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    #[serde(default)]
    pub color_profile: String,
    #[serde(default = "default_dynamic_threshold")]
    pub dynamic_threshold: u32,
    #[serde(default)]
    pub lefty_flip: bool,
}

fn default_dynamic_threshold() -> u32 {
    100
}

impl PlayerProfile {
    pub fn guest() -> Self {
        Self {
            name: "Guest".into(),
            color_profile: "DefaultColors".into(),
            dynamic_threshold: default_dynamic_threshold(),
            lefty_flip: false,
        }
    }

    /// Copy this player's preferences into the settings.
    pub fn apply(&self, settings: &mut Settings) {
        settings.dynamic_threshold = self.dynamic_threshold;
        settings.lefty_flip = self.lefty_flip;
        settings.color_profile_name = self.color_profile.clone();
    }
}

// ─── MIDI profiles ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiProfile {
    #[serde(default)]
    pub name: String,
    pub mappings: Vec<Mapping>,
}

impl MidiProfile {
    pub fn table(&self) -> MappingTable {
        MappingTable::new(self.mappings.clone())
    }
}

/// General MIDI drum map, used when no MIDI profile can be read.
pub fn default_midi_profile() -> MidiProfile {
    const OVERHIT: f64 = 0.02;
    let groups: [(Lane, &[u8]); LANE_COUNT] = [
        (Lane::Snare, &[38, 40, 37]),
        (Lane::Kick, &[36, 35]),
        (Lane::Cymbal1, &[42, 46, 44]),
        (Lane::Tom1, &[48, 50]),
        (Lane::Cymbal2, &[51, 53, 59]),
        (Lane::Tom2, &[45, 47]),
        (Lane::Cymbal3, &[49, 57, 55, 52]),
        (Lane::Tom3, &[43, 41]),
    ];
    let mappings = groups
        .iter()
        .flat_map(|(lane, notes)| notes.iter().map(move |&n| Mapping::new(*lane, n, 1, OVERHIT)))
        .collect();
    MidiProfile {
        name: "General MIDI".into(),
        mappings,
    }
}

// ─── Library ────────────────────────────────────────────────────────────────

/// Profiles found under one config directory.
#[derive(Debug, Clone)]
pub struct ProfileLibrary {
    root: PathBuf,
    pub players: Vec<PlayerProfile>,
}

impl ProfileLibrary {
    pub fn load(root: &Path) -> Self {
        let players = match read_json::<Vec<PlayerProfile>>(&root.join("players.json")) {
            Some(p) if !p.is_empty() => p,
            _ => {
                warn!("No player profiles in {:?}, using Guest", root);
                vec![PlayerProfile::guest()]
            }
        };
        info!("Loaded {} player profile(s)", players.len());
        Self {
            root: root.to_path_buf(),
            players,
        }
    }

    pub fn player(&self, id: usize) -> Option<&PlayerProfile> {
        self.players.get(id)
    }

    pub fn colors(&self, name: &str) -> ColorProfile {
        if name.is_empty() {
            return ColorProfile::default();
        }
        read_json(&self.root.join("colors").join(format!("{}.json", name))).unwrap_or_else(|| {
            warn!("Failed to load color profile '{}', using default colors", name);
            ColorProfile::default()
        })
    }

    pub fn midi_profile(&self, name: &str) -> MidiProfile {
        read_json(&self.root.join("midi").join(format!("{}.json", name))).unwrap_or_else(|| {
            warn!("Failed to load MIDI profile '{}', using General MIDI map", name);
            default_midi_profile()
        })
    }

    /// Select a player: pick the first one if none was chosen, then copy the
    /// player's preferences into the settings.
    pub fn apply_player(&self, settings: &mut Settings) {
        let id = match settings.profile_id {
            Some(id) if id < self.players.len() => id,
            _ => 0,
        };
        settings.profile_id = Some(id);
        if let Some(player) = self.player(id) {
            info!("Player profile: {}", player.name);
            player.apply(settings);
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Failed to parse {:?}: {}", path, e);
            None
        }
    }
}

// ─── Textures ───────────────────────────────────────────────────────────────

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tga", "jfif", "tiff"];

/// Texture names in id order. Ids are positions in this list.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureCatalog {
    names: Vec<String>,
}

impl Default for TextureCatalog {
    fn default() -> Self {
        Self::new(vec!["square".into(), "triangle".into()])
    }
}

impl TextureCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Collect image file stems from an assets directory, sorted by name.
    /// An unreadable or empty directory gives the built-in catalog.
    pub fn scan(dir: &Path) -> Self {
        let Ok(entries) = std::fs::read_dir(dir) else {
            warn!("Assets directory {:?} not readable, using built-in textures", dir);
            return Self::default();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|x| x.to_str())
                    .is_some_and(|x| IMAGE_EXTENSIONS.contains(&x.to_ascii_lowercase().as_str()))
            })
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        if names.is_empty() {
            return Self::default();
        }
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Id of a texture; unknown names use the first texture.
    pub fn id_of(&self, name: &str) -> u32 {
        self.names.iter().position(|n| n == name).unwrap_or(0) as u32
    }
}

/// Per-lane color and texture from the active profiles and settings.
pub fn lane_configs(colors: &ColorProfile, textures: &TextureCatalog, settings: &Settings) -> [LaneConfig; LANE_COUNT] {
    Lane::ALL.map(|lane| LaneConfig {
        color: colors.color(lane),
        texture_id: textures.id_of(settings.texture_name(lane.kind())),
    })
}
