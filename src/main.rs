use drum_visualizer::config::Settings;
use drum_visualizer::console_display::ConsoleRenderer;
use drum_visualizer::controls;
use drum_visualizer::coordinator::Coordinator;
use drum_visualizer::engine::{MidiIngestion, VisualizerEngine};
#[cfg(feature = "midi")]
use drum_visualizer::midi_input;
use drum_visualizer::profile::{lane_configs, ProfileLibrary, TextureCatalog};
use drum_visualizer::render::{HeadlessBackend, RenderBackend};
use drum_visualizer::simulator::Simulator;
use drum_visualizer::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(name = "drum-visualizer")]
#[command(about = "Real-time MIDI drum hit visualizer")]
struct Cli {
    /// Directory holding settings.json, players.json, colors/, midi/ and assets/
    #[arg(long, default_value = "./config")]
    config_dir: PathBuf,

    /// Settings file (defaults to <config-dir>/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// MIDI input port name, overriding the settings file
    #[arg(long)]
    port: Option<String>,

    /// Play a synthetic groove instead of opening a MIDI port
    #[arg(long)]
    simulate: bool,

    /// Simulator tempo
    #[arg(long, default_value_t = 110.0)]
    bpm: f32,

    /// Render loop rate (Hz)
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Console redraw rate (Hz)
    #[arg(long, default_value_t = 20)]
    display_hz: u32,

    /// Console grid width in characters
    #[arg(long, default_value_t = 48)]
    cols: usize,

    /// Console grid height in characters
    #[arg(long, default_value_t = 32)]
    rows: usize,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Scroll direction (down, up, left, right), overriding the settings file
    #[arg(long, value_parser = parse_direction)]
    direction: Option<ScrollDirection>,

    /// Run without drawing to the terminal
    #[arg(long)]
    no_console: bool,

    /// Forward raw MIDI to a virtual output port of the same name
    #[arg(long)]
    thru: bool,
}

fn parse_direction(s: &str) -> Result<ScrollDirection, String> {
    ScrollDirection::parse(s).ok_or_else(|| format!("unknown direction '{}'", s))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings_path = cli.settings.clone().unwrap_or_else(|| cli.config_dir.join("settings.json"));
    let mut settings = Settings::load_or_default(&settings_path);
    if let Some(port) = &cli.port {
        settings.port_name = port.clone();
    }
    if let Some(direction) = cli.direction {
        settings.scroll_direction = direction;
    }

    let library = ProfileLibrary::load(&cli.config_dir);
    library.apply_player(&mut settings);
    let midi_profile = library.midi_profile(&settings.midi_profile_name);
    let textures = TextureCatalog::scan(&cli.config_dir.join("assets"));
    let colors = library.colors(&settings.color_profile_name);

    let engine = VisualizerEngine::new(
        midi_profile.table(),
        settings.note_style(),
        lane_configs(&colors, &textures, &settings),
    )
    .into_shared();
    let ingestion = MidiIngestion::new(engine.clone());

    info!("═══════════════════════════════════════════════");
    info!("  DRUM VISUALIZER v{}", env!("CARGO_PKG_VERSION"));
    info!("  Input: {}", if cli.simulate { "SIMULATOR".to_string() } else { settings.port_name.clone() });
    info!("  MIDI profile: {} ({} mappings)", midi_profile.name, midi_profile.mappings.len());
    info!("  Textures: {}", textures.names().join(", "));
    info!("  Direction: {:?}, speed {:.2}", settings.scroll_direction, settings.scroll_speed);
    info!("═══════════════════════════════════════════════");

    // ─── Control input ──────────────────────────────────────────────
    let (control_tx, control_rx) = bounded(64);
    controls::spawn_stdin_reader(control_tx)?;

    // ─── Input source ───────────────────────────────────────────────
    #[cfg(feature = "midi")]
    let mut connection = None;
    if cli.simulate {
        start_simulator(ingestion, cli.bpm)?;
    } else {
        #[cfg(feature = "midi")]
        {
            match midi_input::connect(&settings.port_name, ingestion, cli.thru) {
                Ok(c) => connection = Some(c),
                Err(e) => {
                    if let Ok(ports) = midi_input::list_ports() {
                        info!("Available MIDI inputs: {:?}", ports);
                    }
                    return Err(format!("Cannot open MIDI input '{}': {}", settings.port_name, e).into());
                }
            }
        }
        #[cfg(not(feature = "midi"))]
        {
            error!("MIDI input requires the 'midi' feature. Falling back to simulator.");
            start_simulator(ingestion, cli.bpm)?;
        }
    }

    // ─── Render loop (this thread) ──────────────────────────────────
    let settings = if cli.no_console {
        info!("Running headless. Type q and Enter to stop.");
        let (settings, backend) = render_loop(&cli, control_rx, engine, HeadlessBackend::default(), settings, library, textures);
        info!("{} notes on screen at shutdown", backend.visible());
        settings
    } else {
        let console = ConsoleRenderer::stdout(cli.cols, cli.rows, cli.fps, cli.display_hz);
        render_loop(&cli, control_rx, engine, console, settings, library, textures).0
    };

    #[cfg(feature = "midi")]
    if let Some(c) = connection {
        c.close();
    }

    if let Err(e) = settings.save(&settings_path) {
        error!("Failed to save settings to {:?}: {}", settings_path, e);
    }
    Ok(())
}

fn start_simulator(ingestion: MidiIngestion, bpm: f32) -> std::io::Result<()> {
    info!("Starting simulator...");
    thread::Builder::new()
        .name("simulator".into())
        .spawn(move || Simulator::new(ingestion, bpm).run())?;
    Ok(())
}

fn render_loop<B: RenderBackend>(
    cli: &Cli,
    control_rx: Receiver<controls::ControlEvent>,
    engine: drum_visualizer::engine::SharedEngine,
    backend: B,
    settings: Settings,
    library: ProfileLibrary,
    textures: TextureCatalog,
) -> (Settings, B) {
    let mut coord = Coordinator::new(control_rx, engine, backend, settings, library, textures)
        .with_frame_rate(cli.fps)
        .with_frame_limit(cli.frames);
    coord.run();
    coord.into_parts()
}
