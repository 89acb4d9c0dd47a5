use super::sequence::{SequenceEvent, SequenceId, SequenceList};
use crate::shared::PadId;

#[derive(Clone, Debug, Default)]
enum RecorderState {
    #[default]
    Idle,
    Recording {
        started_at: f64,
        events: Vec<SequenceEvent>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    NotRecording,
    Empty, // stopped without a single hit, no sequence made
    Created(SequenceId),
}

// Idle -> Recording -> Idle. Times come from whatever clock the caller reads
// (the output sink's), so hits line up with what was heard.
#[derive(Clone, Debug, Default)]
pub struct SequenceRecorder {
    state: RecorderState,
}

impl SequenceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
    }

    pub fn event_count(&self) -> usize {
        match &self.state {
            RecorderState::Recording { events, .. } => events.len(),
            RecorderState::Idle => 0,
        }
    }

    /// No-op returning false when a recording is already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.is_recording() {
            return false;
        }
        self.state = RecorderState::Recording {
            started_at: now,
            events: Vec::new(),
        };
        true
    }

    /// Appends a hit; ignored outside a recording.
    pub fn record(&mut self, pad: PadId, now: f64) -> bool {
        match &mut self.state {
            RecorderState::Recording { started_at, events } => {
                events.push(SequenceEvent {
                    pad,
                    time_sec: (now - *started_at).max(0.0),
                });
                true
            }
            RecorderState::Idle => false,
        }
    }

    pub fn stop(&mut self, list: &mut SequenceList) -> StopOutcome {
        match std::mem::take(&mut self.state) {
            RecorderState::Idle => StopOutcome::NotRecording,
            RecorderState::Recording { events, .. } => match list.create(events) {
                Some(seq) => StopOutcome::Created(seq.id()),
                None => StopOutcome::Empty,
            },
        }
    }
}
