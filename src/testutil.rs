// Shared test fixtures.

use std::collections::HashSet;
use std::sync::Arc;

use crate::audio::{OutputSink, SampleBuffer, VoiceId, next_voice_id};
use crate::audio_api::TriggerParams;

/// An output sink with a hand-driven clock that remembers every voice.
pub struct ManualSink {
    now: f64,
    sample_rate: u32,
    pub started: Vec<(VoiceId, TriggerParams)>,
    pub stopped: Vec<VoiceId>,
    reported: HashSet<VoiceId>,
}

impl ManualSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            now: 0.0,
            sample_rate,
            started: Vec::new(),
            stopped: Vec::new(),
            reported: HashSet::new(),
        }
    }

    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    /// Voices started with exactly this buffer.
    pub fn started_with(&self, buffer: &Arc<SampleBuffer>) -> usize {
        self.started
            .iter()
            .filter(|(_, p)| Arc::ptr_eq(&p.buffer, buffer))
            .count()
    }

    fn natural_end(params: &TriggerParams) -> f64 {
        let left = (params.buffer.duration_sec() - params.offset_sec).max(0.0);
        params.start_at + params.duration_sec.min(left)
    }
}

impl OutputSink for ManualSink {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_voice(&mut self, params: TriggerParams) -> VoiceId {
        let id = next_voice_id();
        self.started.push((id, params));
        id
    }

    fn stop_voice(&mut self, id: VoiceId) {
        if !self.stopped.contains(&id) {
            self.stopped.push(id);
        }
    }

    fn drain_ended(&mut self) -> Vec<VoiceId> {
        let now = self.now;
        let ended: Vec<VoiceId> = self
            .started
            .iter()
            .filter(|(id, p)| {
                Self::natural_end(p) <= now
                    && !self.stopped.contains(id)
                    && !self.reported.contains(id)
            })
            .map(|(id, _)| *id)
            .collect();
        self.reported.extend(ended.iter().copied());
        ended
    }
}

/// A mono buffer of `frames` samples at `value`.
pub fn flat_buffer(sample_rate: u32, frames: usize, value: f32) -> Arc<SampleBuffer> {
    Arc::new(SampleBuffer::mono(sample_rate, vec![value; frames]))
}
