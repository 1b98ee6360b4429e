//! Real MIDI input through `midir`.

use crate::engine::MidiIngestion;
use log::{debug, info, warn};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use std::error::Error;

const CLIENT_NAME: &str = "drum-visualizer";

/// Port names as the OS reports them, e.g. `"loopMIDI Visualizer 1"`.
pub fn list_ports() -> Result<Vec<String>, Box<dyn Error>> {
    let midi_in = MidiInput::new(CLIENT_NAME)?;
    Ok(midi_in.ports().iter().filter_map(|p| midi_in.port_name(p).ok()).collect())
}

/// Port name with the two-character index suffix (`" 1"`) removed.
fn base_name(port_name: &str) -> &str {
    let cut = port_name.char_indices().rev().nth(1).map_or(0, |(i, _)| i);
    &port_name[..cut]
}

/// True when `port_name` is the configured port.
pub fn port_matches(port_name: &str, wanted: &str) -> bool {
    let base = base_name(port_name);
    base == wanted || port_name.contains(wanted)
}

struct CallbackState {
    ingestion: MidiIngestion,
    last_stamp: Option<u64>,
    thru: Option<midir::MidiOutputConnection>,
}

/// An open input port. Messages stop flowing when this is dropped.
pub struct MidiConnection {
    connection: MidiInputConnection<CallbackState>,
    port_name: String,
}

impl MidiConnection {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn close(self) {
        let _ = self.connection.close();
        info!("MIDI input {} closed", self.port_name);
    }
}

/// Open the first input port matching `wanted` and feed every message to
/// `ingestion`. With `thru`, each raw message is also forwarded to a
/// virtual output port of the same name before processing.
pub fn connect(wanted: &str, ingestion: MidiIngestion, thru: bool) -> Result<MidiConnection, Box<dyn Error>> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    midi_in.ignore(Ignore::Sysex | Ignore::Time | Ignore::ActiveSense);

    let ports = midi_in.ports();
    let (port, port_name): (MidiInputPort, String) = ports
        .iter()
        .find_map(|p| {
            let name = midi_in.port_name(p).ok()?;
            port_matches(&name, wanted).then(|| (p.clone(), name))
        })
        .ok_or_else(|| format!("MIDI input port '{}' not found", wanted))?;

    let state = CallbackState {
        ingestion,
        last_stamp: None,
        thru: if thru { open_thru(wanted) } else { None },
    };

    let connection = midi_in.connect(
        &port,
        "drum-visualizer-in",
        |stamp_us, message, state| {
            if let Some(out) = state.thru.as_mut() {
                if let Err(e) = out.send(message) {
                    debug!("MIDI thru send failed: {}", e);
                }
            }
            // midir stamps are microseconds on a backend-defined clock; the
            // engine wants the time since the previous message.
            let delta = state.last_stamp.map_or(0.0, |last| stamp_us.saturating_sub(last) as f64 / 1_000_000.0);
            state.last_stamp = Some(stamp_us);
            state.ingestion.on_message(delta, message);
        },
        state,
    )?;

    info!("MIDI input connected: {}", port_name);
    Ok(MidiConnection {
        connection,
        port_name,
    })
}

#[cfg(unix)]
fn open_thru(name: &str) -> Option<midir::MidiOutputConnection> {
    use midir::os::unix::VirtualOutput;
    let out = match midir::MidiOutput::new(CLIENT_NAME) {
        Ok(out) => out,
        Err(e) => {
            warn!("MIDI thru unavailable: {}", e);
            return None;
        }
    };
    match out.create_virtual(name) {
        Ok(conn) => {
            info!("MIDI thru on virtual port '{}'", name);
            Some(conn)
        }
        Err(e) => {
            warn!("MIDI thru unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn open_thru(_name: &str) -> Option<midir::MidiOutputConnection> {
    warn!("MIDI thru needs virtual ports, which this platform lacks");
    None
}
