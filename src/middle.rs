use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::audio::{OutputSink, SampleBuffer};
use crate::loader::{LoadError, Preset, SampleSource};
use crate::pipeline::export::{ExportError, WavExport};
use crate::pipeline::recorder::StopOutcome;
use crate::pipeline::sequence::SequenceId;
use crate::pipeline::session::{PadLoadState, Session, SessionEvent};
use crate::shared::{DisplayState, InputEvent, LedState, PadId, WaveformView};

/// Min/max columns kept per pad for the waveform; the view squeezes them to
/// whatever width it has.
const WAVEFORM_COLUMNS: usize = 256;

struct LoadResult {
    generation: u64,
    pad: PadId,
    result: Result<SampleBuffer, LoadError>,
}

struct ExportDone {
    sequence_name: String,
    result: Result<WavExport, ExportError>,
}

// Sits between the TUI and the session: turns input events into session
// calls, runs sample loading and exports on worker threads, and keeps the
// display state the view draws from.
pub struct Middle<S: OutputSink> {
    session: Session<S>,
    source: Arc<dyn SampleSource>,
    presets: Vec<Preset>,
    preset_index: usize,
    project_dir: PathBuf,

    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
    loading: bool,
    export_tx: Sender<ExportDone>,
    export_rx: Receiver<ExportDone>,
    exporting: bool,

    selected_sequence: usize,
    status: String,
    load_report: String,
    peaks: HashMap<PadId, Vec<(f32, f32)>>, // cleared on preset load
    display: DisplayState,
}

impl<S: OutputSink> Middle<S> {
    pub fn new(
        session: Session<S>,
        source: Arc<dyn SampleSource>,
        presets: Vec<Preset>,
        project_dir: PathBuf,
    ) -> Self {
        let (load_tx, load_rx) = crossbeam_channel::unbounded();
        let (export_tx, export_rx) = crossbeam_channel::unbounded();
        Self {
            session,
            source,
            presets,
            preset_index: 0,
            project_dir,
            load_tx,
            load_rx,
            loading: false,
            export_tx,
            export_rx,
            exporting: false,
            selected_sequence: 0,
            status: String::new(),
            load_report: String::new(),
            peaks: HashMap::new(),
            display: DisplayState::default(),
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<S> {
        &mut self.session
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.exporting
    }

    /// Loads the first preset, if there is one.
    pub fn start(&mut self) {
        if self.presets.is_empty() {
            self.status = "No presets".to_string();
            return;
        }
        self.load_preset(0);
    }

    // Decoding happens on a loader thread; results come back through poll()
    fn load_preset(&mut self, index: usize) {
        let Some(preset) = self.presets.get(index).cloned() else {
            return;
        };
        self.preset_index = index;
        self.peaks.clear();
        self.status = format!("Loading {}", preset.name);
        self.load_report.clear();

        let load = self.session.begin_preset_load(preset);
        self.loading = !load.requests.is_empty();
        let source = Arc::clone(&self.source);
        let tx = self.load_tx.clone();
        std::thread::spawn(move || {
            for req in load.requests {
                let result = source.fetch(&req.locator, load.target_rate);
                let msg = LoadResult {
                    generation: load.generation,
                    pad: req.pad,
                    result,
                };
                if tx.send(msg).is_err() {
                    return; // middle is gone
                }
            }
        });
        self.finish_loading_if_done();
    }

    fn cycle_preset(&mut self, step: isize) {
        let n = self.presets.len();
        if n < 2 {
            return;
        }
        let next = (self.preset_index as isize + step).rem_euclid(n as isize) as usize;
        self.load_preset(next);
    }

    fn finish_loading_if_done(&mut self) {
        if self.session.is_loading() {
            return;
        }
        let counts = self.session.load_counts();
        self.load_report = format!("Loaded: {} • Failed: {}", counts.loaded, counts.failed);
        if self.loading {
            info!(loaded = counts.loaded, failed = counts.failed, "preset loaded");
            if let Some(preset) = self.session.preset() {
                self.status = preset.name.clone();
            }
        }
        self.loading = false;
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::TapPad(n) => {
                self.session.tap_pad(PadId(n as usize));
            }
            InputEvent::PreviewPress => {
                self.session.preview_selected();
            }
            InputEvent::StopPress => self.session.stop_all(),
            InputEvent::RecordPress => self.toggle_recording(),

            InputEvent::SelectSequence(delta) => {
                let n = self.session.sequences().len();
                if n > 0 {
                    let idx = self.selected_sequence as i64 + delta as i64;
                    self.selected_sequence = idx.clamp(0, n as i64 - 1) as usize;
                }
            }
            InputEvent::PlaySequence => self.play_selected(),
            InputEvent::ExportSequence => self.export_selected(),
            InputEvent::DeleteSequence => {
                if let Some(id) = self.selected_sequence_id() {
                    self.session.delete_sequence(id);
                    let n = self.session.sequences().len();
                    self.selected_sequence = self.selected_sequence.min(n.saturating_sub(1));
                    self.status = "Sequence deleted".to_string();
                }
            }

            InputEvent::AdjustTrimStart(d) => {
                self.session.adjust_trim_start(d as f64);
            }
            InputEvent::AdjustTrimEnd(d) => {
                self.session.adjust_trim_end(d as f64);
            }
            InputEvent::ShiftTrim(d) => {
                self.session.shift_trim(d as f64);
            }
            InputEvent::ResetTrim => self.session.reset_trim(),

            InputEvent::NextPreset => self.cycle_preset(1),
            InputEvent::PrevPreset => self.cycle_preset(-1),

            InputEvent::Quit => {}
        }
    }

    fn toggle_recording(&mut self) {
        if !self.session.is_recording() {
            self.session.start_recording();
            self.status = "Recording".to_string();
            return;
        }
        match self.session.stop_recording() {
            StopOutcome::Created(id) => {
                self.selected_sequence = self.session.sequences().len().saturating_sub(1);
                if let Some(seq) = self.session.sequence(id) {
                    self.status = format!("Recorded {}", seq.name());
                }
            }
            StopOutcome::Empty => self.status = "Nothing recorded".to_string(),
            StopOutcome::NotRecording => {}
        }
    }

    fn selected_sequence_id(&self) -> Option<SequenceId> {
        self.session
            .sequences()
            .at(self.selected_sequence)
            .map(|s| s.id())
    }

    fn play_selected(&mut self) {
        let Some(id) = self.selected_sequence_id() else {
            self.status = "No sequence to play".to_string();
            return;
        };
        if self.session.play_sequence(id) {
            self.status = "Playing".to_string();
        } else if self.session.is_recording() {
            self.status = "Stop recording first".to_string();
        }
    }

    // Scheduling happens here; render + encode run on a worker thread
    fn export_selected(&mut self) {
        if self.exporting {
            self.status = "Export already running".to_string();
            return;
        }
        let Some(id) = self.selected_sequence_id() else {
            self.status = "No sequence to export".to_string();
            return;
        };
        let pending = match self.session.prepare_export(id) {
            Ok(pending) => pending,
            Err(e) => {
                warn!("export failed: {e}");
                self.status = format!("Export failed: {e}");
                return;
            }
        };
        self.exporting = true;
        self.status = format!("Exporting {}", pending.sequence_name());
        let tx = self.export_tx.clone();
        std::thread::spawn(move || {
            let sequence_name = pending.sequence_name().to_string();
            let result = pending.finish();
            let _ = tx.send(ExportDone {
                sequence_name,
                result,
            });
        });
    }

    /// Drains worker results and advances the session. Call once per loop.
    pub fn poll(&mut self) {
        let results: Vec<LoadResult> = self.load_rx.try_iter().collect();
        for r in results {
            self.session.finish_load(r.generation, r.pad, r.result);
        }
        if self.loading {
            self.finish_loading_if_done();
        }

        let done: Vec<ExportDone> = self.export_rx.try_iter().collect();
        for d in done {
            self.exporting = false;
            self.status = match d.result {
                Ok(export) => match write_export(&self.project_dir, &export) {
                    Ok(path) => {
                        info!(path = %path.display(), "export written");
                        format!("Exported {}", export.file_name)
                    }
                    Err(e) => {
                        warn!("could not write export: {e:#}");
                        format!("Export failed: {e:#}")
                    }
                },
                Err(e) => {
                    warn!(sequence = %d.sequence_name, "export failed: {e}");
                    format!("Export failed: {e}")
                }
            };
        }

        for event in self.session.tick() {
            if let SessionEvent::ReplayFinished(_) = event {
                self.status = "Replay finished".to_string();
            }
        }
    }

    /// How long until the session has timeline work, if any is pending.
    pub fn next_wakeup_in(&self) -> Option<Duration> {
        let at = self.session.next_wakeup()?;
        let wait = (at - self.session.now()).max(0.0);
        Some(Duration::from_secs_f64(wait))
    }

    pub fn display_state(&mut self) -> &DisplayState {
        let session = &self.session;
        let selected = session.selected_pad();

        self.display.leds = (0..session.pad_count())
            .map(PadId)
            .map(|pad| match session.pad_state(pad) {
                PadLoadState::Empty => LedState::Off,
                PadLoadState::Loading => LedState::Loading,
                PadLoadState::Failed(_) => LedState::Failed,
                PadLoadState::Loaded if session.is_sounding(pad) => LedState::Hit,
                PadLoadState::Loaded if pad == selected => LedState::Selected,
                PadLoadState::Loaded => LedState::Loaded,
            })
            .collect();

        self.display.preset_name = session
            .preset()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        self.display.selected_pad = Some(selected.index());
        self.display.pad_name = match session.pad_state(selected) {
            PadLoadState::Failed(msg) => format!("{selected}: {msg}"),
            _ => match session.pad_label(selected) {
                Some(label) => format!("{selected}: {label}"),
                None => format!("{selected}: empty"),
            },
        };

        self.display.waveform = match (session.buffer(selected), session.trim(selected)) {
            (Some(buffer), Some(trim)) => {
                let peaks = self
                    .peaks
                    .entry(selected)
                    .or_insert_with(|| buffer.peaks(WAVEFORM_COLUMNS))
                    .clone();
                Some(WaveformView {
                    peaks,
                    duration_sec: buffer.duration_sec(),
                    trim_start_sec: trim.start_sec,
                    trim_end_sec: trim.end_sec,
                    playhead_sec: session.playhead(),
                })
            }
            _ => None,
        };

        self.display.recording = session.is_recording();
        self.display.recorded_hits = session.recorded_hits();
        self.display.replaying = session.is_replaying();
        self.display.replay_progress = session.replay_progress().unwrap_or(0.0);

        let playing = session.replaying_sequence();
        self.display.sequences = session
            .sequences()
            .iter()
            .map(|s| {
                let marker = if Some(s.id()) == playing { "▶ " } else { "" };
                format!("{marker}{} {:.2}s", s.name(), s.duration_sec())
            })
            .collect();
        self.display.selected_sequence =
            (!self.display.sequences.is_empty()).then_some(self.selected_sequence);
        self.display.status_text = self.status.clone();
        self.display.load_report = self.load_report.clone();

        &self.display
    }
}

/// Writes the WAV next to the project and returns its path.
pub fn write_export(project_dir: &Path, export: &WavExport) -> anyhow::Result<PathBuf> {
    let path = project_dir.join(&export.file_name);
    std::fs::write(&path, &export.bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
