// Types shared between the session core, the middle layer and the TUI.
//
// Key plan for the terminal front-end:
//
// Grid buttons (the first 16 pads):
//   1 2 3 4       //  TapPad(0 ... 3)
//   q w e r       //  TapPad(4 ... 7)
//   a s d f       //  TapPad(8 ... 11)
//   z x c v       //  TapPad(12 ... 15)
//
// Transport:
//   Space         //  PreviewPress (play the selected pad's trim window)
//   .             //  StopPress (stop preview and sequence replay)
//   b             //  RecordPress (start / stop recording)
//
// Sequences:
//   j / k         //  SelectSequence(+1 / -1)
//   p / Enter     //  PlaySequence (StopPress while a replay runs)
//   o             //  ExportSequence
//   Backspace     //  DeleteSequence
//
// Trim:
//   [ / ]         //  AdjustTrimStart(-/+)
//   - / =         //  AdjustTrimEnd(-/+)
//   , / ;         //  ShiftTrim(-/+)
//   0             //  ResetTrim
//   Tab           //  coarse / fine trim steps
//
// Presets:
//   n / N         //  NextPreset / PrevPreset
//
// Quit:
//   Esc           //  Quit

pub const NUM_PADS: usize = 16;
pub const GRID_COLS: usize = 4;

/// Smallest distance between a trim window's start and end.
pub const MIN_TRIM_GAP_SEC: f64 = 0.01;
/// Shortest voice the scheduler will emit, whatever the trim says.
pub const MIN_VOICE_SEC: f64 = 0.01;
/// Headroom added to the clock for immediate triggers.
pub const TRIGGER_LOOKAHEAD_SEC: f64 = 0.005;
/// Headroom before the first event of a live replay.
pub const REPLAY_LOOKAHEAD_SEC: f64 = 0.05;
/// How long after the last event the replay guard fires.
pub const REPLAY_GUARD_MARGIN_SEC: f64 = 0.1;
pub const MIN_SEQUENCE_SEC: f64 = 0.1;
/// Silence rendered after the last event on export.
pub const RENDER_TAIL_SEC: f64 = 0.5;

// ye olde types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadId(pub usize);

impl PadId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // pads are shown 1-based like the labels on the grid
        write!(f, "{}", self.0 + 1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TapPad(u8),
    PreviewPress,
    StopPress,
    RecordPress,

    SelectSequence(i32), // relative move in the sequence list
    PlaySequence,
    ExportSequence,
    DeleteSequence,

    AdjustTrimStart(f32),
    AdjustTrimEnd(f32),
    ShiftTrim(f32),
    ResetTrim,

    NextPreset,
    PrevPreset,

    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    Off,      // nothing loaded
    Loading,
    Loaded,
    Failed,
    Selected, // loaded and shown in the waveform
    Hit,      // sounding right now
}

#[derive(Clone, Debug, Default)]
pub struct WaveformView {
    pub peaks: Vec<(f32, f32)>, // min/max per column, channel 0
    pub duration_sec: f64,
    pub trim_start_sec: f64,
    pub trim_end_sec: f64,
    pub playhead_sec: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    pub leds: Vec<LedState>,
    pub preset_name: String,
    pub selected_pad: Option<usize>,
    pub pad_name: String,
    pub waveform: Option<WaveformView>,
    pub recording: bool,
    pub recorded_hits: usize,
    pub replaying: bool,
    pub replay_progress: f64,
    pub sequences: Vec<String>,
    pub selected_sequence: Option<usize>,
    pub status_text: String,
    pub load_report: String,
}
