//! The session: one object owning everything the sampler does at runtime.
//!
//! It holds the output sink, the decoded buffers, trims, the recorder, the
//! replayer with its timeline, and the sequence list. The driving loop calls
//! [`Session::tick`] regularly; that is where replay hits fire and where
//! ended voices are collected. Nothing in here blocks except
//! [`Session::export_sequence`], which renders on the calling thread.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::export::{self, ExportError, PendingExport, RenderSettings, WavExport};
use super::persistence::SessionConfig;
use super::playback::{PlaybackScheduler, TriggerOptions, VoiceHandle};
use super::recorder::{SequenceRecorder, StopOutcome};
use super::replayer::{ReplayStep, ReplayTask, SequenceReplayer};
use super::sample_store::SampleStore;
use super::sequence::{Sequence, SequenceId, SequenceList};
use super::timeline::Timeline;
use super::trim::{TrimRegistry, TrimWindow};
use crate::audio::{OfflineRenderer, OutputSink, SampleBuffer, VoiceId};
use crate::loader::{LoadError, Preset, SampleSource};
use crate::shared::PadId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PadLoadState {
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    VoiceEnded(VoiceId),
    ReplayHit(PadId),
    ReplayFinished(SequenceId),
}

/// One sample to decode for the preset being loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub pad: PadId,
    pub locator: String,
}

/// Work handed out by [`Session::begin_preset_load`]. Results must come back
/// through [`Session::finish_load`] with the same generation.
#[derive(Clone, Debug)]
pub struct PresetLoad {
    pub generation: u64,
    pub target_rate: u32,
    pub requests: Vec<LoadRequest>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

pub struct Session<S: OutputSink> {
    sink: S,
    config: SessionConfig,
    offline: Option<Box<dyn OfflineRenderer>>,

    store: SampleStore,
    trims: TrimRegistry,
    pad_states: Vec<PadLoadState>,
    preset: Option<Preset>,
    generation: u64,

    scheduler: PlaybackScheduler,
    current: Option<(PadId, VoiceHandle)>, // the voice the playhead follows
    sounding: Vec<(PadId, VoiceHandle)>,
    selected: PadId,

    recorder: SequenceRecorder,
    replayer: SequenceReplayer,
    timeline: Timeline<ReplayTask>,
    sequences: SequenceList,
}

impl<S: OutputSink> Session<S> {
    pub fn new(sink: S, config: SessionConfig, offline: Option<Box<dyn OfflineRenderer>>) -> Self {
        let pad_count = config.pad_count.max(1);
        Self {
            sink,
            offline,
            store: SampleStore::new(pad_count),
            trims: TrimRegistry::new(config.min_trim_gap_sec),
            pad_states: vec![PadLoadState::Empty; pad_count],
            preset: None,
            generation: 0,
            scheduler: PlaybackScheduler::new(config.trigger_lookahead_sec, config.min_voice_sec),
            current: None,
            sounding: Vec::new(),
            selected: PadId(0),
            recorder: SequenceRecorder::new(),
            replayer: SequenceReplayer::new(config.replay_lookahead_sec, config.replay_guard_margin_sec),
            timeline: Timeline::new(),
            sequences: SequenceList::new(),
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn now(&self) -> f64 {
        self.sink.current_time()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Presets and loading ───────────────────────────────────────

    /// Clears every pad for `preset` and returns the decode work. Results of
    /// earlier loads are stale from here on.
    pub fn begin_preset_load(&mut self, preset: Preset) -> PresetLoad {
        self.stop_replay();
        self.stop_current();
        self.generation += 1;

        let pad_count = preset.files.len().max(self.config.pad_count).max(1);
        self.store.reset(pad_count);
        self.trims.reset();
        self.pad_states = vec![PadLoadState::Empty; pad_count];
        self.sounding.clear();
        self.selected = PadId(0);

        let requests: Vec<LoadRequest> = preset
            .files
            .iter()
            .enumerate()
            .map(|(i, locator)| LoadRequest {
                pad: PadId(i),
                locator: locator.clone(),
            })
            .collect();
        for req in &requests {
            self.pad_states[req.pad.index()] = PadLoadState::Loading;
        }

        info!(
            preset = %preset.name,
            files = preset.files.len(),
            pads = pad_count,
            generation = self.generation,
            "preset load started"
        );
        self.preset = Some(preset);
        PresetLoad {
            generation: self.generation,
            target_rate: self.sink.sample_rate(),
            requests,
        }
    }

    /// Applies one decode result. Returns false for results of a replaced
    /// preset, which are dropped.
    pub fn finish_load(
        &mut self,
        generation: u64,
        pad: PadId,
        result: Result<SampleBuffer, LoadError>,
    ) -> bool {
        if generation != self.generation || !self.store.contains(pad) {
            debug!(%pad, generation, current = self.generation, "stale load result dropped");
            return false;
        }
        self.pad_states[pad.index()] = match result {
            Ok(buffer) => {
                let duration = buffer.duration_sec();
                debug!(%pad, duration, "sample loaded");
                self.store.set(pad, Arc::new(buffer));
                if self.trims.has_trim(pad) {
                    // set while loading, so it was never bounded by the buffer
                    let w = self.trims.get_trim(pad, duration);
                    self.trims.set_trim(pad, w.start_sec, w.end_sec, Some(duration));
                }
                PadLoadState::Loaded
            }
            Err(e) => {
                warn!(%pad, "sample failed to load: {e}");
                PadLoadState::Failed(e.to_string())
            }
        };
        if self.pad_states[self.selected.index()] != PadLoadState::Loaded && self.store.get(pad).is_some() {
            // follow the first sample that shows up
            self.selected = self.store.first_loaded().unwrap_or(pad);
        }
        true
    }

    /// Loads a preset on the calling thread. A failing pad never stops the
    /// others.
    pub fn load_preset(&mut self, preset: Preset, source: &dyn SampleSource) -> LoadSummary {
        let load = self.begin_preset_load(preset);
        let mut summary = LoadSummary::default();
        for req in load.requests {
            let result = source.fetch(&req.locator, load.target_rate);
            if result.is_ok() {
                summary.loaded += 1;
            } else {
                summary.failed += 1;
            }
            self.finish_load(load.generation, req.pad, result);
        }
        summary
    }

    pub fn preset(&self) -> Option<&Preset> {
        self.preset.as_ref()
    }

    pub fn pad_count(&self) -> usize {
        self.store.len()
    }

    pub fn pad_state(&self, pad: PadId) -> PadLoadState {
        self.pad_states.get(pad.index()).cloned().unwrap_or_default()
    }

    /// The locator's file stem, for display.
    pub fn pad_label(&self, pad: PadId) -> Option<String> {
        let locator = self.preset.as_ref()?.files.get(pad.index())?;
        let stem = Path::new(locator).file_stem()?;
        Some(stem.to_string_lossy().into_owned())
    }

    pub fn buffer(&self, pad: PadId) -> Option<&Arc<SampleBuffer>> {
        self.store.get(pad)
    }

    pub fn load_counts(&self) -> LoadSummary {
        self.pad_states
            .iter()
            .fold(LoadSummary::default(), |mut acc, s| {
                match s {
                    PadLoadState::Loaded => acc.loaded += 1,
                    PadLoadState::Failed(_) => acc.failed += 1,
                    _ => {}
                }
                acc
            })
    }

    pub fn is_loading(&self) -> bool {
        self.pad_states.contains(&PadLoadState::Loading)
    }

    // ── Pads ──────────────────────────────────────────────────────

    pub fn selected_pad(&self) -> PadId {
        self.selected
    }

    pub fn select_pad(&mut self, pad: PadId) -> bool {
        if !self.store.contains(pad) {
            return false;
        }
        self.selected = pad;
        true
    }

    /// A tap from the grid: selects the pad, records the hit when recording,
    /// and plays the pad's trim window. Out-of-range pads do nothing at all.
    pub fn tap_pad(&mut self, pad: PadId) -> Option<VoiceHandle> {
        let gain = self.config.tap_gain;
        self.tap_with_gain(pad, gain)
    }

    /// Note-number input (MIDI style): wraps over the preset's files rather
    /// than the padded grid, velocity 0..=127 becomes gain.
    pub fn trigger_note(&mut self, note: u8, velocity: u8) -> Option<VoiceHandle> {
        let files = self
            .preset
            .as_ref()
            .map_or(0, |p| p.files.len().min(self.pad_count()));
        let wrap = if files > 0 { files } else { self.pad_count() };
        let pad = PadId(note as usize % wrap.max(1));
        let gain = velocity.min(127) as f32 / 127.0;
        self.tap_with_gain(pad, gain)
    }

    fn tap_with_gain(&mut self, pad: PadId, gain: f32) -> Option<VoiceHandle> {
        if !self.store.contains(pad) {
            return None;
        }
        self.selected = pad;
        let now = self.now();
        self.recorder.record(pad, now);
        let handle = self.trigger_pad(pad, TriggerOptions { gain, at: None })?;
        self.current = Some((pad, handle));
        Some(handle)
    }

    /// Plays a pad's current trim window without selecting or recording it.
    pub fn trigger_pad(&mut self, pad: PadId, options: TriggerOptions) -> Option<VoiceHandle> {
        let buffer = self.store.get(pad)?;
        let window = self.trims.get_trim(pad, buffer.duration_sec());
        let handle = self
            .scheduler
            .trigger(&mut self.sink, Some(buffer), window, options)?;
        self.sounding.push((pad, handle));
        Some(handle)
    }

    /// Restarts the selected pad from its trim start.
    pub fn preview_selected(&mut self) -> Option<VoiceHandle> {
        self.stop_current();
        let pad = self.selected;
        let handle = self.trigger_pad(pad, TriggerOptions::default())?;
        self.current = Some((pad, handle));
        Some(handle)
    }

    fn stop_current(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.stop(&mut self.sink);
            self.sounding.retain(|(_, h)| h.id() != handle.id());
        }
    }

    /// Stops the preview voice and the replay.
    pub fn stop_all(&mut self) {
        self.stop_current();
        self.stop_replay();
    }

    /// Position inside the selected pad's buffer of the voice playing it.
    pub fn playhead(&self) -> Option<f64> {
        let (pad, handle) = self.current.as_ref()?;
        let now = self.now();
        if *pad != self.selected || now < handle.start_at() || now >= handle.end_at() {
            return None;
        }
        Some(handle.position_at(now))
    }

    pub fn is_sounding(&self, pad: PadId) -> bool {
        let now = self.now();
        self.sounding
            .iter()
            .any(|(p, h)| *p == pad && h.start_at() <= now && now < h.end_at())
    }

    // ── Trims ─────────────────────────────────────────────────────

    /// The window a pad would play now; the whole buffer unless trimmed.
    pub fn trim(&self, pad: PadId) -> Option<TrimWindow> {
        let duration = self.store.duration_sec(pad)?;
        Some(self.trims.get_trim(pad, duration))
    }

    /// Sets a window, clamped to the buffer when there is one. Pads without a
    /// buffer keep the window until their sample arrives.
    pub fn set_trim(&mut self, pad: PadId, start_sec: f64, end_sec: f64) -> Option<TrimWindow> {
        if !self.store.contains(pad) {
            return None;
        }
        let duration = self.store.duration_sec(pad);
        Some(self.trims.set_trim(pad, start_sec, end_sec, duration))
    }

    pub fn adjust_trim_start(&mut self, delta_sec: f64) -> Option<TrimWindow> {
        let pad = self.selected;
        let duration = self.store.duration_sec(pad)?;
        let current = self.trims.get_trim(pad, duration);
        Some(self.trims.set_start(pad, current.start_sec + delta_sec, duration))
    }

    pub fn adjust_trim_end(&mut self, delta_sec: f64) -> Option<TrimWindow> {
        let pad = self.selected;
        let duration = self.store.duration_sec(pad)?;
        let current = self.trims.get_trim(pad, duration);
        Some(self.trims.set_end(pad, current.end_sec + delta_sec, duration))
    }

    pub fn shift_trim(&mut self, delta_sec: f64) -> Option<TrimWindow> {
        let pad = self.selected;
        let duration = self.store.duration_sec(pad)?;
        Some(self.trims.shift(pad, delta_sec, duration))
    }

    pub fn reset_trim(&mut self) {
        self.trims.clear(self.selected);
    }

    // ── Recording ─────────────────────────────────────────────────

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorded_hits(&self) -> usize {
        self.recorder.event_count()
    }

    /// Recording and replay share the output, so a running replay and the
    /// preview voice are stopped first.
    pub fn start_recording(&mut self) -> bool {
        if self.recorder.is_recording() {
            return false;
        }
        self.stop_replay();
        self.stop_current();
        let now = self.now();
        info!(at = now, "recording started");
        self.recorder.start(now)
    }

    pub fn stop_recording(&mut self) -> StopOutcome {
        let outcome = self.recorder.stop(&mut self.sequences);
        match outcome {
            StopOutcome::Created(id) => {
                if let Some(seq) = self.sequences.get(id) {
                    info!(sequence = seq.name(), duration = seq.duration_sec(), "sequence recorded");
                }
            }
            StopOutcome::Empty => info!("recording stopped, nothing recorded"),
            StopOutcome::NotRecording => {}
        }
        outcome
    }

    // ── Sequences ─────────────────────────────────────────────────

    pub fn sequences(&self) -> &SequenceList {
        &self.sequences
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    /// Starts a live replay, replacing any running one and the preview voice.
    /// Refused while recording.
    pub fn play_sequence(&mut self, id: SequenceId) -> bool {
        if self.recorder.is_recording() || self.sequences.get(id).is_none() {
            return false;
        }
        self.stop_current();
        let Some(sequence) = self.sequences.get(id) else {
            return false;
        };
        let now = self.sink.current_time();
        self.replayer.play(sequence, &mut self.timeline, now);
        true
    }

    /// Pending hits are dropped; voices already sounding play out.
    pub fn stop_replay(&mut self) -> bool {
        self.replayer.stop(&mut self.timeline)
    }

    pub fn is_replaying(&self) -> bool {
        self.replayer.is_playing()
    }

    pub fn replaying_sequence(&self) -> Option<SequenceId> {
        self.replayer.current_sequence()
    }

    pub fn replay_progress(&self) -> Option<f64> {
        self.replayer.progress(self.now())
    }

    pub fn delete_sequence(&mut self, id: SequenceId) -> bool {
        if self.replayer.current_sequence() == Some(id) {
            self.stop_replay();
        }
        self.sequences.remove(id).is_some()
    }

    // ── Export ────────────────────────────────────────────────────

    fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            sample_rate: self
                .config
                .export_sample_rate
                .unwrap_or_else(|| self.sink.sample_rate()),
            channels: self.config.export_channels,
            tail_sec: self.config.render_tail_sec,
        }
    }

    /// Schedules the whole sequence on an offline context using the trims
    /// as they are now. The returned export can finish on another thread.
    pub fn prepare_export(&self, id: SequenceId) -> Result<PendingExport, ExportError> {
        let sequence = self
            .sequences
            .get(id)
            .ok_or(ExportError::UnknownSequence(id))?;
        export::prepare_render(
            sequence,
            &self.store,
            &self.trims,
            self.offline.as_deref(),
            &self.scheduler,
            self.render_settings(),
        )
    }

    pub fn export_sequence(&self, id: SequenceId) -> Result<WavExport, ExportError> {
        self.prepare_export(id)?.finish()
    }

    // ── Driving loop ──────────────────────────────────────────────

    /// Fires due timeline entries and collects ended voices.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for id in self.sink.drain_ended() {
            if self.current.as_ref().is_some_and(|(_, h)| h.id() == id) {
                self.current = None;
            }
            self.sounding.retain(|(_, h)| h.id() != id);
            events.push(SessionEvent::VoiceEnded(id));
        }

        let now = self.sink.current_time();
        while let Some((_, task)) = self.timeline.pop_due(now) {
            match self.replayer.on_task(task) {
                ReplayStep::Hit(pad) => {
                    // buffer and trim are read now, not when the hit was recorded
                    self.trigger_pad(pad, TriggerOptions::default());
                    events.push(SessionEvent::ReplayHit(pad));
                }
                ReplayStep::Finished(id) => {
                    debug!(?id, "replay finished");
                    events.push(SessionEvent::ReplayFinished(id));
                }
                ReplayStep::Ignored => {}
            }
        }

        self.sounding.retain(|(_, h)| h.end_at() > now);
        events
    }

    /// When the next timeline entry is due, on the sink's clock.
    pub fn next_wakeup(&self) -> Option<f64> {
        self.timeline.next_fire_time()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::audio::BlockRenderer;
    use crate::testutil::ManualSink;

    const RATE: u32 = 8000;
    const EPS: f64 = 1e-9;

    // Hands out flat mono buffers of a fixed length per locator.
    struct FakeSource {
        lengths: HashMap<&'static str, usize>,
    }

    impl SampleSource for FakeSource {
        fn fetch(&self, locator: &str, target_rate: u32) -> Result<SampleBuffer, LoadError> {
            match self.lengths.get(locator) {
                Some(&frames) => Ok(SampleBuffer::mono(target_rate, vec![0.5; frames])),
                None => Err(LoadError::UnsupportedLocator(locator.to_string())),
            }
        }
    }

    fn preset(files: &[&str]) -> Preset {
        Preset {
            name: "Test".to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn session_with(files: &[(&'static str, usize)]) -> Session<ManualSink> {
        let mut session = Session::new(
            ManualSink::new(RATE),
            SessionConfig::default(),
            Some(Box::new(BlockRenderer)),
        );
        let source = FakeSource {
            lengths: files.iter().copied().collect(),
        };
        let names: Vec<&str> = files.iter().map(|(n, _)| *n).collect();
        session.load_preset(preset(&names), &source);
        session
    }

    fn record(session: &mut Session<ManualSink>, hits: &[(usize, f64)]) -> SequenceId {
        session.sink.set_time(100.0);
        session.start_recording();
        for &(pad, t) in hits {
            session.sink.set_time(100.0 + t);
            session.tap_pad(PadId(pad));
        }
        match session.stop_recording() {
            StopOutcome::Created(id) => id,
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_preset_load_marks_pads() {
        let mut session = Session::new(ManualSink::new(RATE), SessionConfig::default(), None);
        let source = FakeSource {
            lengths: HashMap::from([("kick.wav", 800)]),
        };
        let summary = session.load_preset(preset(&["kick.wav", "http://x/snare.wav"]), &source);

        assert_eq!(summary, LoadSummary { loaded: 1, failed: 1 });
        assert_eq!(session.pad_count(), 16);
        assert_eq!(session.pad_state(PadId(0)), PadLoadState::Loaded);
        assert!(matches!(session.pad_state(PadId(1)), PadLoadState::Failed(_)));
        assert_eq!(session.pad_state(PadId(2)), PadLoadState::Empty);
        assert_eq!(session.pad_label(PadId(0)).as_deref(), Some("kick"));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_large_preset_grows_grid() {
        let files: Vec<String> = (0..20).map(|i| format!("{i}.wav")).collect();
        let names: Vec<&str> = files.iter().map(String::as_str).collect();
        let mut session = Session::new(ManualSink::new(RATE), SessionConfig::default(), None);
        let load = session.begin_preset_load(preset(&names));
        assert_eq!(session.pad_count(), 20);
        assert_eq!(load.requests.len(), 20);
        assert_eq!(load.target_rate, RATE);
        assert!(session.is_loading());
    }

    #[test]
    fn test_stale_load_results_are_dropped() {
        let mut session = Session::new(ManualSink::new(RATE), SessionConfig::default(), None);
        let first = session.begin_preset_load(preset(&["a.wav"]));
        let second = session.begin_preset_load(preset(&["b.wav"]));

        let late = SampleBuffer::mono(RATE, vec![0.1; 10]);
        assert!(!session.finish_load(first.generation, PadId(0), Ok(late)));
        assert!(session.buffer(PadId(0)).is_none());
        assert_eq!(session.pad_state(PadId(0)), PadLoadState::Loading);

        let fresh = SampleBuffer::mono(RATE, vec![0.1; 10]);
        assert!(session.finish_load(second.generation, PadId(0), Ok(fresh)));
        assert!(session.buffer(PadId(0)).is_some());
    }

    #[test]
    fn test_tap_plays_trim_window_after_lookahead() {
        let mut session = session_with(&[("a.wav", 8000)]);
        session.sink.set_time(3.0);
        session.set_trim(PadId(0), 0.2, 0.6);

        let handle = session.tap_pad(PadId(0)).unwrap();
        assert!((handle.start_at() - 3.005).abs() < EPS);
        assert!((handle.offset_sec() - 0.2).abs() < EPS);
        assert!((handle.duration_sec() - 0.4).abs() < EPS);
        assert_eq!(session.selected_pad(), PadId(0));
    }

    #[test]
    fn test_out_of_range_pad_is_ignored() {
        let mut session = session_with(&[("a.wav", 800)]);
        session.start_recording();
        assert!(session.tap_pad(PadId(99)).is_none());
        assert!(session.trigger_pad(PadId(99), TriggerOptions::default()).is_none());
        assert_eq!(session.recorded_hits(), 0);
        assert!(session.sink.started.is_empty());
        assert_eq!(session.selected_pad(), PadId(0));
    }

    #[test]
    fn test_tap_on_unloaded_pad_still_records() {
        let mut session = session_with(&[("a.wav", 800)]);
        session.start_recording();
        assert!(session.tap_pad(PadId(5)).is_none());
        assert_eq!(session.recorded_hits(), 1);
    }

    #[test]
    fn test_recorded_sequence_matches_taps() {
        let mut session = session_with(&[("a.wav", 800), ("b.wav", 800), ("c.wav", 800)]);
        let id = record(&mut session, &[(2, 0.10), (5, 0.80), (2, 1.50)]);
        let seq = session.sequence(id).unwrap();
        assert_eq!(seq.events().len(), 3);
        assert!((seq.duration_sec() - 1.5).abs() < 1e-6);
        assert_eq!(seq.name(), "Sequence 1 (3 hits)");
    }

    #[test]
    fn test_empty_recording_leaves_list_unchanged() {
        let mut session = session_with(&[("a.wav", 800)]);
        record(&mut session, &[(0, 0.2)]);
        session.start_recording();
        assert_eq!(session.stop_recording(), StopOutcome::Empty);
        assert_eq!(session.sequences().len(), 1);
    }

    #[test]
    fn test_replay_fires_hits_on_tick() {
        let mut session = session_with(&[("a.wav", 800), ("b.wav", 800)]);
        let id = record(&mut session, &[(0, 0.0), (1, 0.5)]);
        session.sink.started.clear();

        session.sink.set_time(10.0);
        assert!(session.play_sequence(id));
        assert!((session.next_wakeup().unwrap() - 10.05).abs() < EPS);

        session.sink.set_time(10.06);
        assert_eq!(session.tick(), vec![SessionEvent::ReplayHit(PadId(0))]);
        assert_eq!(session.sink.started.len(), 1);
        assert!((session.sink.started[0].1.start_at - 10.065).abs() < EPS);

        session.sink.set_time(10.56);
        let events = session.tick();
        assert!(events.contains(&SessionEvent::ReplayHit(PadId(1))));
        assert!(matches!(events[0], SessionEvent::VoiceEnded(_))); // first hit rang out

        session.sink.set_time(11.0);
        let events = session.tick();
        assert!(events.contains(&SessionEvent::ReplayFinished(id)));
        assert!(!session.is_replaying());
        assert_eq!(session.next_wakeup(), None);
    }

    #[test]
    fn test_stopped_replay_never_triggers_later_hits() {
        let mut session = session_with(&[("a.wav", 800), ("b.wav", 800)]);
        let id = record(&mut session, &[(0, 0.0), (1, 1.0)]);
        let second = Arc::clone(session.buffer(PadId(1)).unwrap());
        session.sink.started.clear();

        session.sink.set_time(0.0);
        session.play_sequence(id);
        session.sink.set_time(0.1);
        session.tick();
        assert_eq!(session.sink.started.len(), 1);

        let stopped_before = session.sink.stopped.len();
        assert!(session.stop_replay());
        session.sink.set_time(5.0);
        session.tick();
        assert_eq!(session.sink.started_with(&second), 0);
        assert_eq!(session.sink.stopped.len(), stopped_before); // first hit was left to ring out
    }

    #[test]
    fn test_replay_uses_trim_at_fire_time() {
        let mut session = session_with(&[("a.wav", 8000)]);
        let id = record(&mut session, &[(0, 0.0)]);
        session.set_trim(PadId(0), 0.5, 0.7);
        session.sink.started.clear();

        session.sink.set_time(0.0);
        session.play_sequence(id);
        session.sink.set_time(0.1);
        session.tick();

        let params = &session.sink.started[0].1;
        assert!((params.offset_sec - 0.5).abs() < EPS);
        assert!((params.duration_sec - 0.2).abs() < EPS);
    }

    #[test]
    fn test_recording_stops_replay() {
        let mut session = session_with(&[("a.wav", 800)]);
        let id = record(&mut session, &[(0, 0.0), (0, 1.0)]);
        session.play_sequence(id);
        assert!(session.start_recording());
        assert!(!session.is_replaying());
        assert!(!session.play_sequence(id));
    }

    #[test]
    fn test_deleting_playing_sequence_stops_it() {
        let mut session = session_with(&[("a.wav", 800)]);
        let id = record(&mut session, &[(0, 0.0), (0, 1.0)]);
        session.play_sequence(id);
        assert!(session.delete_sequence(id));
        assert!(!session.is_replaying());
        assert!(session.sequences().is_empty());
        assert!(!session.delete_sequence(id));
    }

    #[test]
    fn test_preview_restarts_current_voice() {
        let mut session = session_with(&[("a.wav", 8000)]);
        let first = session.preview_selected().unwrap();
        let second = session.preview_selected().unwrap();
        assert_eq!(session.sink.stopped, vec![first.id()]);

        session.sink.set_time(second.start_at() + 0.25);
        let pos = session.playhead().unwrap();
        assert!((pos - 0.25).abs() < 1e-6);

        session.sink.set_time(5.0);
        assert!(session.tick().contains(&SessionEvent::VoiceEnded(second.id())));
        assert_eq!(session.playhead(), None);
    }

    #[test]
    fn test_trim_adjustments_follow_selection() {
        let mut session = session_with(&[("a.wav", 8000), ("b.wav", 8000)]);
        session.select_pad(PadId(1));
        session.adjust_trim_start(0.25);
        let w = session.adjust_trim_end(-0.5).unwrap();
        assert!((w.start_sec - 0.25).abs() < EPS);
        assert!((w.end_sec - 0.5).abs() < EPS);

        let w = session.shift_trim(10.0).unwrap();
        assert!((w.end_sec - 1.0).abs() < EPS);
        assert_eq!(session.trim(PadId(0)), Some(TrimWindow::new(0.0, 1.0)));

        session.reset_trim();
        assert_eq!(session.trim(PadId(1)), Some(TrimWindow::new(0.0, 1.0)));
    }

    #[test]
    fn test_note_wraps_and_scales_gain() {
        let mut session = session_with(&[("a.wav", 800), ("b.wav", 800)]);
        let handle = session.trigger_note(17, 127).unwrap();
        assert_eq!(session.selected_pad(), PadId(1));
        assert_eq!(session.sink.started[0].0, handle.id());
        assert_eq!(session.sink.started[0].1.gain, 1.0);
    }

    #[test]
    fn test_note_wraps_over_preset_files_not_grid() {
        let mut session =
            session_with(&[("a.wav", 800), ("b.wav", 800), ("c.wav", 800), ("d.wav", 800)]);
        assert_eq!(session.pad_count(), 16);
        let handle = session.trigger_note(5, 127);
        assert!(handle.is_some());
        assert_eq!(session.selected_pad(), PadId(1));
    }

    #[test]
    fn test_trim_set_while_loading_is_clamped_on_arrival() {
        let mut session = Session::new(ManualSink::new(RATE), SessionConfig::default(), None);
        let load = session.begin_preset_load(preset(&["a.wav"]));
        let w = session.set_trim(PadId(0), 2.0, 30.0).unwrap();
        assert_eq!(w, TrimWindow::new(2.0, 30.0));

        let buffer = SampleBuffer::mono(RATE, vec![0.5; RATE as usize]); // 1 s
        assert!(session.finish_load(load.generation, PadId(0), Ok(buffer)));

        let w = session.trim(PadId(0)).unwrap();
        assert!(w.start_sec >= 0.0 && w.start_sec < w.end_sec && w.end_sec <= 1.0);
        assert!((w.end_sec - 1.0).abs() < EPS);
        assert!((w.start_sec - 0.99).abs() < EPS);

        let handle = session.tap_pad(PadId(0)).unwrap();
        assert!(handle.offset_sec() < 1.0);
        assert!(handle.offset_sec() + handle.duration_sec() <= 1.0 + EPS);
    }

    #[test]
    fn test_replay_stops_preview_voice() {
        let mut session = session_with(&[("a.wav", 8000)]);
        let id = record(&mut session, &[(0, 0.0)]);
        let preview = session.preview_selected().unwrap();
        assert!(session.play_sequence(id));
        assert!(session.sink.stopped.contains(&preview.id()));
        assert_eq!(session.playhead(), None);
    }

    #[test]
    fn test_export_uses_current_trims() {
        let mut session = session_with(&[("a.wav", 8000)]);
        let id = record(&mut session, &[(0, 0.0), (0, 0.5)]);
        session.set_trim(PadId(0), 0.0, 0.1);

        let export = session.export_sequence(id).unwrap();
        let mut reader = hound::WavReader::new(export.bytes.as_slice()).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, RATE);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 8000 * 2);
        // two 0.1 s hits, stereo
        assert_eq!(samples.iter().filter(|&&s| s != 0).count(), 2 * 800 * 2);
    }

    #[test]
    fn test_export_failures_leave_sequences_alone() {
        let mut session = Session::new(ManualSink::new(RATE), SessionConfig::default(), None);
        session.start_recording();
        session.tap_pad(PadId(0));
        let StopOutcome::Created(id) = session.stop_recording() else {
            panic!("expected a sequence");
        };

        assert!(matches!(session.export_sequence(id), Err(ExportError::OfflineUnsupported)));
        assert!(matches!(
            session.export_sequence(SequenceId(999)),
            Err(ExportError::UnknownSequence(_))
        ));
        assert_eq!(session.sequences().len(), 1);
    }
}
