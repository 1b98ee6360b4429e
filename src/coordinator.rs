use crate::config::*;
use crate::controls::ControlEvent;
use crate::engine::{lock_engine, SharedEngine};
use crate::profile::{lane_configs, ColorProfile, ProfileLibrary, TextureCatalog};
use crate::render::RenderBackend;
use crate::scheduler::FrameScheduler;
use crate::types::{LaneKind, ScrollDirection};
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// The render/update loop. Owns the settings and the backend, drains
/// control events once per frame and ticks the scheduler.
///
/// Settings changes are mirrored into the shared engine as they happen,
/// so the MIDI thread sees new colors, sizes and layout on its next hit.
/// The settings returned by [`Coordinator::into_parts`] carry every live
/// change and are what gets saved on shutdown.
pub struct Coordinator<B: RenderBackend> {
    control_rx: Receiver<ControlEvent>,
    engine: SharedEngine,
    backend: B,
    scheduler: FrameScheduler,
    settings: Settings,
    library: ProfileLibrary,
    textures: TextureCatalog,
    colors: ColorProfile,
    configure_mode: bool,
    controls_open: bool,
    frame_interval: Duration,
    max_frames: Option<u64>,
}

impl<B: RenderBackend> Coordinator<B> {
    pub fn new(
        control_rx: Receiver<ControlEvent>,
        engine: SharedEngine,
        backend: B,
        settings: Settings,
        library: ProfileLibrary,
        textures: TextureCatalog,
    ) -> Self {
        let colors = library.colors(&settings.color_profile_name);
        Self {
            control_rx,
            engine,
            backend,
            scheduler: FrameScheduler::new(),
            settings,
            library,
            textures,
            colors,
            configure_mode: false,
            controls_open: true,
            frame_interval: Duration::from_secs_f64(1.0 / 60.0),
            max_frames: None,
        }
    }

    /// Target frame rate; 0 runs unpaced.
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 { Duration::ZERO } else { Duration::from_secs_f64(1.0 / fps as f64) };
        self
    }

    /// Stop after this many frames.
    pub fn with_frame_limit(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    /// Run until `Quit` or the frame limit. A closed control channel does
    /// not stop the loop.
    pub fn run(&mut self) {
        info!(
            "Coordinator running ({} fps target, direction {:?}, speed {:.2})",
            if self.frame_interval.is_zero() { 0.0 } else { 1.0 / self.frame_interval.as_secs_f64() },
            self.settings.scroll_direction,
            self.settings.scroll_speed
        );

        let mut last = Instant::now();
        loop {
            if !self.drain_controls() {
                break;
            }

            let now = Instant::now();
            self.step(now.duration_since(last).as_secs_f64());
            last = now;

            let frames = self.scheduler.frames();
            if frames % 1000 == 0 {
                debug!("Coordinator: {} frames rendered", frames);
                trace!("Engine clock: {:.3}s", lock_engine(&self.engine).clock());
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break;
            }

            let spent = now.elapsed();
            if spent < self.frame_interval {
                thread::sleep(self.frame_interval - spent);
            }
        }

        info!("Coordinator shutting down after {} frames", self.scheduler.frames());
    }

    /// Apply every pending control event. Returns false once `Quit` arrives.
    pub fn drain_controls(&mut self) -> bool {
        while self.controls_open {
            match self.control_rx.try_recv() {
                Ok(event) => {
                    if !self.handle_control(event) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Control input closed");
                    self.controls_open = false;
                }
            }
        }
        true
    }

    /// One frame: scroll by `delta_seconds` of travel and draw.
    pub fn step(&mut self, delta_seconds: f64) {
        self.scheduler.tick(
            &self.engine,
            self.settings.scroll_speed,
            delta_seconds,
            self.settings.show_dynamics,
            &mut self.backend,
        );
    }

    /// Apply one control event. Returns false when the loop should stop.
    pub fn handle_control(&mut self, event: ControlEvent) -> bool {
        if event.needs_configure_mode() && !self.configure_mode {
            debug!("Ignoring {:?}: configure mode is off", event);
            return true;
        }

        let s = &mut self.settings;
        match event {
            ControlEvent::Quit => {
                info!("Quit requested");
                return false;
            }
            ControlEvent::ToggleConfigure => {
                self.configure_mode = !self.configure_mode;
                info!("Configure mode {}", if self.configure_mode { "on" } else { "off" });
            }
            ControlEvent::CycleDirection => {
                let next = s.scroll_direction.next();
                self.set_direction(next);
            }
            ControlEvent::SetDirection(direction) => self.set_direction(direction),
            ControlEvent::SpeedUp => {
                s.speed_up();
                info!("Scroll speed {:.2}", s.scroll_speed);
            }
            ControlEvent::SpeedDown => {
                s.speed_down();
                info!("Scroll speed {:.2}", s.scroll_speed);
            }
            ControlEvent::SetScrollSpeed(speed) => {
                s.scroll_speed = speed.clamp(MIN_SCROLL_SPEED, MAX_SCROLL_SPEED);
            }
            ControlEvent::Resize { width, height } => {
                s.visualizer_window.width = width.max(1);
                s.visualizer_window.height = height.max(1);
                let viewport = s.viewport();
                lock_engine(&self.engine).set_viewport(viewport);
            }
            ControlEvent::SetNoteWidth(w) => {
                s.note_width = w.clamp(NOTE_SIZE_RANGE.0, NOTE_SIZE_RANGE.1);
                self.push_style();
            }
            ControlEvent::SetNoteHeight(h) => {
                s.note_height = h.clamp(NOTE_SIZE_RANGE.0, NOTE_SIZE_RANGE.1);
                self.push_style();
            }
            ControlEvent::SetNoteGap(g) => {
                s.note_gap = g.clamp(0.0, MAX_NOTE_GAP);
                self.push_style();
            }
            ControlEvent::SetSeparation(mode) => {
                s.note_separation_mode = mode;
                self.push_style();
            }
            ControlEvent::ToggleStats => {
                s.show_stats = !s.show_stats;
                self.push_style();
            }
            ControlEvent::ToggleDynamics => {
                s.show_dynamics = !s.show_dynamics;
                self.push_style();
            }
            ControlEvent::ToggleLefty => {
                s.lefty_flip = !s.lefty_flip;
                self.push_style();
            }
            ControlEvent::ResetStats => lock_engine(&self.engine).reset_stats(),
            ControlEvent::MoveLane { source, target } => {
                if s.lane_order.move_lane(source, target) {
                    self.push_style();
                } else {
                    warn!("Cannot move lane from slot {} to {}", source, target);
                }
            }
            ControlEvent::SetTexture { kind, name } => {
                let field = match kind {
                    LaneKind::Tom => &mut s.tom_texture_name,
                    LaneKind::Cymbal => &mut s.cymbal_texture_name,
                    LaneKind::Kick => &mut s.kick_texture_name,
                };
                *field = name;
                self.push_lane_configs();
            }
            ControlEvent::SelectProfile(id) => {
                if self.library.player(id).is_none() {
                    warn!("No player profile {}", id);
                    return true;
                }
                s.profile_id = Some(id);
                self.library.apply_player(&mut self.settings);
                self.colors = self.library.colors(&self.settings.color_profile_name);
                self.push_style();
                self.push_lane_configs();
            }
        }
        true
    }

    fn set_direction(&mut self, direction: ScrollDirection) {
        self.settings.scroll_direction = direction;
        lock_engine(&self.engine).set_scroll_direction(direction);
        info!("Scroll direction {:?}", direction);
    }

    fn push_style(&self) {
        lock_engine(&self.engine).set_style(self.settings.note_style());
    }

    fn push_lane_configs(&self) {
        let configs = lane_configs(&self.colors, &self.textures, &self.settings);
        lock_engine(&self.engine).set_lane_configs(configs);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn configure_mode(&self) -> bool {
        self.configure_mode
    }

    pub fn frames(&self) -> u64 {
        self.scheduler.frames()
    }

    pub fn into_parts(self) -> (Settings, B) {
        (self.settings, self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LaneConfig, VisualizerEngine};
    use crate::mapping::{Mapping, MappingTable};
    use crate::note_store::InstanceView;
    use crate::types::*;
    use crossbeam_channel::{bounded, Sender};

    #[derive(Default)]
    struct CountingBackend {
        flushes: usize,
    }

    impl RenderBackend for CountingBackend {
        fn flush_instance_buffers(&mut self, _instances: &InstanceView<'_>) {
            self.flushes += 1;
        }

        fn draw_instanced(&mut self, _count: usize) {}
    }

    fn setup() -> (Sender<ControlEvent>, SharedEngine, Coordinator<CountingBackend>) {
        let settings = Settings::default();
        let table = MappingTable::new(vec![Mapping::new(Lane::Snare, 38, 1, 0.0)]);
        let engine =
            VisualizerEngine::new(table, settings.note_style(), [LaneConfig::default(); LANE_COUNT]).into_shared();
        let (tx, rx) = bounded(64);
        let dir = std::env::temp_dir().join("drum-visualizer-no-profiles");
        let coord = Coordinator::new(
            rx,
            engine.clone(),
            CountingBackend::default(),
            settings,
            ProfileLibrary::load(&dir),
            TextureCatalog::default(),
        )
        .with_frame_rate(0);
        (tx, engine, coord)
    }

    #[test]
    fn test_cycle_direction_clears_notes() {
        let (_tx, engine, mut coord) = setup();
        lock_engine(&engine).ingest(0.0, &[0x99, 38, 100]);

        assert!(coord.handle_control(ControlEvent::CycleDirection));
        assert_eq!(coord.settings().scroll_direction, ScrollDirection::Right);
        let e = lock_engine(&engine);
        assert_eq!(e.style().direction, ScrollDirection::Right);
        assert_eq!(e.store().live_count(), 0);
    }

    #[test]
    fn test_settings_actions_need_configure_mode() {
        let (_tx, engine, mut coord) = setup();
        coord.handle_control(ControlEvent::ToggleStats);
        assert!(coord.settings().show_stats);

        coord.handle_control(ControlEvent::ToggleConfigure);
        assert!(coord.configure_mode());
        coord.handle_control(ControlEvent::ToggleStats);
        assert!(!coord.settings().show_stats);
        assert!(!lock_engine(&engine).style().show_stats);
    }

    #[test]
    fn test_size_and_speed_are_clamped() {
        let (_tx, engine, mut coord) = setup();
        coord.handle_control(ControlEvent::ToggleConfigure);
        coord.handle_control(ControlEvent::SetNoteWidth(1.0));
        coord.handle_control(ControlEvent::SetScrollSpeed(0.1));
        assert_eq!(coord.settings().note_width, NOTE_SIZE_RANGE.1);
        assert_eq!(coord.settings().scroll_speed, MIN_SCROLL_SPEED);
        assert_eq!(lock_engine(&engine).style().note_width, NOTE_SIZE_RANGE.1);
    }

    #[test]
    fn test_move_lane_relayouts() {
        let (_tx, engine, mut coord) = setup();
        let before = lock_engine(&engine).lane(Lane::Snare).spawn;
        coord.handle_control(ControlEvent::ToggleConfigure);
        coord.handle_control(ControlEvent::MoveLane { source: 0, target: 7 });
        let after = lock_engine(&engine).lane(Lane::Snare).spawn;
        assert_eq!(coord.settings().lane_order.slot_of(Lane::Snare), 7);
        assert!((after[0] - before[0] - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_run_stops_on_quit() {
        let (tx, _engine, mut coord) = setup();
        tx.send(ControlEvent::SpeedUp).unwrap();
        tx.send(ControlEvent::Quit).unwrap();
        coord.run();
        assert_eq!(coord.frames(), 0);
        assert_eq!(coord.into_parts().0.scroll_speed, 1.25);
    }

    #[test]
    fn test_closed_controls_keep_the_loop_alive() {
        let (tx, _engine, mut coord) = setup();
        tx.send(ControlEvent::SpeedUp).unwrap();
        drop(tx);
        assert!(coord.drain_controls());
        assert!(coord.drain_controls());
        assert_eq!(coord.settings().scroll_speed, 1.25);
    }

    #[test]
    fn test_run_honors_frame_limit_after_disconnect() {
        let (tx, _engine, coord) = setup();
        drop(tx);
        let mut coord = coord.with_frame_limit(Some(25));
        coord.run();
        assert_eq!(coord.frames(), 25);
        assert_eq!(coord.backend().flushes, 25);
    }
}
