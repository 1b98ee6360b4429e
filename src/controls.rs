//! Control events for the render loop, and a line-based command reader
//! standing in for the key handler and settings window.

use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    // Hotkeys, always live.
    ToggleConfigure,
    CycleDirection,
    SpeedUp,
    SpeedDown,
    Resize { width: i32, height: i32 },
    Quit,

    // Settings window actions, only honored in configure mode.
    SetDirection(ScrollDirection),
    SetScrollSpeed(f32),
    SetNoteWidth(f32),
    SetNoteHeight(f32),
    SetNoteGap(f32),
    SetSeparation(NoteSeparationMode),
    SetTexture { kind: LaneKind, name: String },
    ToggleStats,
    ToggleDynamics,
    ToggleLefty,
    ResetStats,
    MoveLane { source: usize, target: usize },
    SelectProfile(usize),
}

impl ControlEvent {
    /// True for events that need configure mode to be on.
    pub fn needs_configure_mode(&self) -> bool {
        !matches!(
            self,
            ControlEvent::ToggleConfigure
                | ControlEvent::CycleDirection
                | ControlEvent::SpeedUp
                | ControlEvent::SpeedDown
                | ControlEvent::Resize { .. }
                | ControlEvent::Quit
        )
    }
}

pub const COMMAND_HELP: &str = "\
f1 | f2 | + | - | q
dir <down|up|left|right>   speed <x>   width <x>   height <x>   gap <x>
sep <none|cutoff|squish>   texture <tom|cymbal|kick> <name>
stats | dynamics | lefty | reset | move <from> <to> | profile <n> | resize <w> <h>";

/// Parse one command line.
pub fn parse_command(line: &str) -> Result<ControlEvent, String> {
    let mut words = line.split_whitespace();
    let cmd = words.next().ok_or("empty command")?.to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let event = match (cmd.as_str(), args.as_slice()) {
        ("f1" | "configure", []) => ControlEvent::ToggleConfigure,
        ("f2" | "cycle", []) => ControlEvent::CycleDirection,
        ("+" | "=" | "faster", []) => ControlEvent::SpeedUp,
        ("-" | "slower", []) => ControlEvent::SpeedDown,
        ("q" | "quit" | "esc", []) => ControlEvent::Quit,
        ("resize", [w, h]) => ControlEvent::Resize {
            width: parse_num(w)?,
            height: parse_num(h)?,
        },
        ("dir" | "direction", [d]) => {
            ControlEvent::SetDirection(ScrollDirection::parse(d).ok_or_else(|| format!("unknown direction '{}'", d))?)
        }
        ("speed", [x]) => ControlEvent::SetScrollSpeed(parse_num(x)?),
        ("width", [x]) => ControlEvent::SetNoteWidth(parse_num(x)?),
        ("height", [x]) => ControlEvent::SetNoteHeight(parse_num(x)?),
        ("gap", [x]) => ControlEvent::SetNoteGap(parse_num(x)?),
        ("sep" | "separation", [m]) => ControlEvent::SetSeparation(
            NoteSeparationMode::parse(m).ok_or_else(|| format!("unknown separation mode '{}'", m))?,
        ),
        ("texture", [kind, name]) => ControlEvent::SetTexture {
            kind: match kind.to_ascii_lowercase().as_str() {
                "tom" => LaneKind::Tom,
                "cymbal" => LaneKind::Cymbal,
                "kick" => LaneKind::Kick,
                other => return Err(format!("unknown lane kind '{}'", other)),
            },
            name: name.to_string(),
        },
        ("stats", []) => ControlEvent::ToggleStats,
        ("dynamics", []) => ControlEvent::ToggleDynamics,
        ("lefty", []) => ControlEvent::ToggleLefty,
        ("reset", []) => ControlEvent::ResetStats,
        ("move", [from, to]) => ControlEvent::MoveLane {
            source: parse_num(from)?,
            target: parse_num(to)?,
        },
        ("profile", [n]) => ControlEvent::SelectProfile(parse_num(n)?),
        _ => return Err(format!("unrecognized command '{}'", line.trim())),
    };
    Ok(event)
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("invalid number '{}'", s))
}

/// Forward parsed commands until end of input, a quit, or the receiver
/// going away. Bad lines are logged and skipped.
pub fn forward_commands<R: BufRead>(reader: R, tx: &Sender<ControlEvent>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(event) => {
                let quit = event == ControlEvent::Quit;
                if tx.send(event).is_err() || quit {
                    return;
                }
            }
            Err(e) => warn!("{} (commands: {})", e, COMMAND_HELP.replace('\n', "; ")),
        }
    }
}

/// Read commands from stdin on a background thread.
pub fn spawn_stdin_reader(tx: Sender<ControlEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("controls".into()).spawn(move || {
        info!("Reading commands from stdin:\n{}", COMMAND_HELP);
        forward_commands(io::stdin().lock(), &tx);
    })
}
