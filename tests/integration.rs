//! End-to-end tests for the drum visualizer pipeline.
//!
//! These drive the public API the way the binary wires it:
//!   transport (groove / simulator thread) → MidiIngestion → shared engine
//!   → FrameScheduler / Coordinator → RenderBackend → assertions

use crossbeam_channel::bounded;
use std::thread;

use drum_visualizer::config::Settings;
use drum_visualizer::controls::ControlEvent;
use drum_visualizer::coordinator::Coordinator;
use drum_visualizer::engine::{lock_engine, LaneConfig, MidiIngestion, SharedEngine, VisualizerEngine};
use drum_visualizer::mapping::{Mapping, MappingTable};
use drum_visualizer::note_store::InstanceView;
use drum_visualizer::profile::{default_midi_profile, lane_configs, ProfileLibrary, TextureCatalog};
use drum_visualizer::render::{RenderBackend, StatsOverlay};
use drum_visualizer::scheduler::FrameScheduler;
use drum_visualizer::simulator::{bar_seconds, groove_bar, gm, Simulator};
use drum_visualizer::types::*;

// ─── Helpers ───────────────────────────────────────────────────────────────

/// Backend that records what each frame would have drawn.
#[derive(Default)]
struct RecordingBackend {
    frames: usize,
    visible: Vec<usize>,
    draw_counts: Vec<usize>,
    last_stats: Option<StatsOverlay>,
}

impl RenderBackend for RecordingBackend {
    fn flush_instance_buffers(&mut self, instances: &InstanceView<'_>) {
        assert_eq!(instances.len(), MAX_NOTES);
        self.frames += 1;
        self.visible.push((0..instances.len()).filter(|&i| instances.is_visible(i)).count());
    }

    fn draw_instanced(&mut self, count: usize) {
        self.draw_counts.push(count);
    }

    fn draw_stats(&mut self, stats: &StatsOverlay) {
        self.last_stats = Some(*stats);
    }
}

fn gm_engine(settings: &Settings) -> SharedEngine {
    let configs = lane_configs(&Default::default(), &TextureCatalog::default(), settings);
    VisualizerEngine::new(default_midi_profile().table(), settings.note_style(), configs).into_shared()
}

fn total_hits(engine: &SharedEngine) -> u32 {
    lock_engine(engine).lane_stats().iter().map(|l| l.hit_count).sum()
}

/// Feed `bars` of groove through ingestion, ticking the scheduler at `fps`
/// between messages like a render thread would.
fn play_groove(engine: &SharedEngine, bars: u32, bpm: f32, fps: f64, backend: &mut RecordingBackend) -> usize {
    let midi = MidiIngestion::new(engine.clone());
    let mut sched = FrameScheduler::new();
    let frame = 1.0 / fps;
    let mut now = 0.0;
    let mut last_msg = 0.0;
    let mut next_frame = 0.0;
    let mut sent = 0;

    for bar in 0..bars {
        for h in groove_bar(bar, bpm) {
            let at = bar as f64 * bar_seconds(bpm) + h.at;
            while next_frame <= at {
                sched.tick(engine, 1.0, next_frame - now, true, backend);
                now = next_frame;
                next_frame += frame;
            }
            midi.on_message(at - last_msg, &h.note.to_bytes());
            last_msg = at;
            sent += 1;
        }
    }
    sent
}

// ─── Integration Tests ─────────────────────────────────────────────────────

#[test]
fn test_groove_through_scheduler() {
    let settings = Settings::default();
    let engine = gm_engine(&settings);
    let mut backend = RecordingBackend::default();

    let sent = play_groove(&engine, 5, 120.0, 60.0, &mut backend);

    // Bars 1 and 3 carry three sensor bounces between them; the GM map's
    // overhit window swallows each one.
    assert_eq!(total_hits(&engine) as usize, sent - 3);
    let e = lock_engine(&engine);
    assert_eq!(e.lane(Lane::Cymbal3).hit_count, 1);
    assert_eq!(e.lane(Lane::Cymbal1).hit_count, 8 + 8 + 8 + 6 + 7);
    assert!(e.lane(Lane::Snare).ghost_count >= 8);
    drop(e);

    assert!(backend.frames > 500);
    assert!(backend.draw_counts.iter().all(|&c| c == MAX_NOTES));
    let peak = backend.visible.iter().copied().max().unwrap();
    assert!(peak > 5 && peak <= MAX_NOTES, "peak visible {}", peak);
    let stats = backend.last_stats.unwrap();
    assert_eq!(stats.lanes[Lane::Cymbal3.index()].hit_count, 1);
}

#[test]
fn test_notes_scroll_off_after_input_stops() {
    let settings = Settings::default();
    let engine = gm_engine(&settings);
    let mut backend = RecordingBackend::default();
    play_groove(&engine, 1, 120.0, 60.0, &mut backend);

    // Two seconds more at speed 1 moves every note past the far edge.
    let mut sched = FrameScheduler::new();
    for _ in 0..120 {
        sched.tick(&engine, 1.0, 1.0 / 60.0, true, &mut backend);
    }
    assert_eq!(*backend.visible.last().unwrap(), 0);
}

#[test]
fn test_ring_buffer_wraps_under_dense_input() {
    let engine = VisualizerEngine::new(
        MappingTable::new(vec![Mapping::new(Lane::Kick, 36, 1, 0.0)]),
        Default::default(),
        [LaneConfig::default(); LANE_COUNT],
    )
    .into_shared();
    let midi = MidiIngestion::new(engine.clone());

    for _ in 0..MAX_NOTES + 5 {
        midi.on_message(0.001, &[NOTE_ON, 36, 100]);
    }
    let e = lock_engine(&engine);
    assert_eq!(e.store().next_index(), 5);
    assert_eq!(e.lane(Lane::Kick).hit_count as usize, MAX_NOTES + 5);
    assert_eq!(e.lane(Lane::Kick).last_spawned.unwrap().index, 4);
}

#[test]
fn test_concurrent_ingestion_and_rendering() {
    let engine = VisualizerEngine::new(
        MappingTable::new(vec![Mapping::new(Lane::Snare, 38, 1, 0.0), Mapping::new(Lane::Kick, 36, 1, 0.0)]),
        Default::default(),
        [LaneConfig::default(); LANE_COUNT],
    )
    .into_shared();

    let senders: Vec<_> = [38u8, 36]
        .into_iter()
        .map(|key| {
            let midi = MidiIngestion::new(engine.clone());
            thread::spawn(move || {
                for _ in 0..150 {
                    midi.on_message(0.001, &[NOTE_ON_DRUMS, key, 90]);
                    thread::yield_now();
                }
            })
        })
        .collect();

    let mut sched = FrameScheduler::new();
    let mut backend = RecordingBackend::default();
    while !senders.iter().all(|h| h.is_finished()) {
        sched.tick(&engine, 1.0, 0.001, false, &mut backend);
    }
    for h in senders {
        h.join().unwrap();
    }
    sched.tick(&engine, 1.0, 0.001, false, &mut backend);

    let e = lock_engine(&engine);
    assert_eq!(e.lane(Lane::Snare).hit_count, 150);
    assert_eq!(e.lane(Lane::Kick).hit_count, 150);
    assert!((e.clock() - 0.3).abs() < 1e-6);
}

#[test]
fn test_simulator_thread_with_coordinator() {
    let settings = Settings::default();
    let engine = gm_engine(&settings);
    let library = ProfileLibrary::load(&std::env::temp_dir().join("drum-visualizer-no-such-dir"));

    let midi = MidiIngestion::new(engine.clone());
    let sim = thread::spawn(move || Simulator::new(midi, 240.0).with_bars(Some(1)).run());

    let (_control_tx, control_rx) = bounded(8);
    let mut coord = Coordinator::new(
        control_rx,
        engine.clone(),
        RecordingBackend::default(),
        settings,
        library,
        TextureCatalog::default(),
    )
    .with_frame_rate(60)
    .with_frame_limit(Some(20));
    coord.run();
    sim.join().unwrap();

    assert_eq!(coord.frames(), 20);
    // Bar 0: eight hi-hats, two kicks, two backbeats and two ghosts.
    assert_eq!(total_hits(&engine), 14);
    let e = lock_engine(&engine);
    assert_eq!(e.lane(Lane::Kick).hit_count, 2);
    assert_eq!(e.lane(Lane::Snare).hit_count, 4);
}

#[test]
fn test_profiles_drive_colors_and_mappings() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(
        root.join("players.json"),
        r#"[{"name": "Guest"}, {"name": "Sam", "color_profile": "Blue", "dynamic_threshold": 50}]"#,
    )
    .unwrap();
    std::fs::create_dir_all(root.join("colors")).unwrap();
    std::fs::write(root.join("colors/Blue.json"), r##"{"snare": "#0000FF"}"##).unwrap();
    std::fs::create_dir_all(root.join("midi")).unwrap();
    std::fs::write(
        root.join("midi/Pads.json"),
        r#"{"name": "Pads", "mappings": [{"lane": "Snare", "midi_value": 60, "velocity_threshold": 5, "overhit_threshold": 0.05}]}"#,
    )
    .unwrap();

    let mut settings = Settings {
        midi_profile_name: "Pads".into(),
        ..Settings::default()
    };
    let library = ProfileLibrary::load(root);
    library.apply_player(&mut settings);
    let colors = library.colors(&settings.color_profile_name);
    let engine = VisualizerEngine::new(
        library.midi_profile(&settings.midi_profile_name).table(),
        settings.note_style(),
        lane_configs(&colors, &TextureCatalog::default(), &settings),
    )
    .into_shared();

    let midi = MidiIngestion::new(engine.clone());
    assert!(midi.on_message(0.0, &[NOTE_ON, 38, 100]).is_none(), "GM snare is not in this profile");
    let hit = midi.on_message(0.0, &[NOTE_ON, 60, 100]).unwrap();
    assert_eq!(hit.lane, Lane::Snare);
    let first = lock_engine(&engine).lane(Lane::Snare).last_spawned.unwrap();
    assert_eq!(lock_engine(&engine).store().color(first.index), [1.0, 0.0, 0.0]);

    // Switching to Sam in configure mode recolors later notes and applies
    // Sam's dynamics threshold.
    let (control_tx, control_rx) = bounded(8);
    let mut coord = Coordinator::new(
        control_rx,
        engine.clone(),
        RecordingBackend::default(),
        settings,
        library,
        TextureCatalog::default(),
    );
    control_tx.send(ControlEvent::ToggleConfigure).unwrap();
    control_tx.send(ControlEvent::SelectProfile(1)).unwrap();
    control_tx.send(ControlEvent::Quit).unwrap();
    coord.run();

    let hit = midi.on_message(0.1, &[NOTE_ON, 60, 40]).unwrap();
    assert!(hit.ghost);
    let second = lock_engine(&engine).lane(Lane::Snare).last_spawned.unwrap();
    assert_eq!(lock_engine(&engine).store().color(second.index), [0.0, 0.0, 0.5]);

    let (saved, _) = coord.into_parts();
    assert_eq!(saved.profile_id, Some(1));
    assert_eq!(saved.dynamic_threshold, 50);
}

#[test]
fn test_direction_cycle_keeps_spawns_on_screen() {
    let settings = Settings::default();
    let engine = gm_engine(&settings);
    let library = ProfileLibrary::load(&std::env::temp_dir().join("drum-visualizer-no-such-dir"));
    let (_tx, rx) = bounded(1);
    let mut coord = Coordinator::new(rx, engine.clone(), RecordingBackend::default(), settings, library, TextureCatalog::default());
    let midi = MidiIngestion::new(engine.clone());

    for expected in [ScrollDirection::Right, ScrollDirection::Up, ScrollDirection::Left, ScrollDirection::Down] {
        midi.on_message(0.1, &[NOTE_ON_DRUMS, gm::SNARE, 100]);
        coord.handle_control(ControlEvent::CycleDirection);
        assert_eq!(coord.settings().scroll_direction, expected);

        let e = lock_engine(&engine);
        assert_eq!(e.store().live_count(), 0);
        for lane in Lane::ALL {
            let spawn = e.lane(lane).spawn;
            assert!(spawn[0].abs() <= 1.0 && spawn[1].abs() <= 1.0, "{:?} {} off screen", expected, lane);
        }
        drop(e);

        coord.step(0.1);
        let hit = midi.on_message(0.1, &[NOTE_ON_DRUMS, gm::SNARE, 100]);
        assert!(hit.is_some());
    }
}
