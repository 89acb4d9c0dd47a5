use std::sync::Arc;

use tracing::trace;

use super::trim::TrimWindow;
use crate::audio::{OutputSink, SampleBuffer, VoiceId};
use crate::audio_api::TriggerParams;
use crate::shared::{MIN_VOICE_SEC, TRIGGER_LOOKAHEAD_SEC};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerOptions {
    pub gain: f32,
    pub at: Option<f64>, // None = now + lookahead
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self { gain: 1.0, at: None }
    }
}

/// A voice that was handed to a sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceHandle {
    id: VoiceId,
    start_at: f64,
    offset_sec: f64,
    duration_sec: f64,
}

impl VoiceHandle {
    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn start_at(&self) -> f64 {
        self.start_at
    }

    pub fn offset_sec(&self) -> f64 {
        self.offset_sec
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    pub fn end_at(&self) -> f64 {
        self.start_at + self.duration_sec
    }

    /// Safe to call any number of times, also after the voice ended.
    pub fn stop<S: OutputSink + ?Sized>(&self, sink: &mut S) {
        sink.stop_voice(self.id);
    }

    /// 0 before the voice starts, 1 once its slice has played.
    pub fn progress_at(&self, now: f64) -> f64 {
        if self.duration_sec <= 0.0 {
            return 1.0;
        }
        ((now - self.start_at) / self.duration_sec).clamp(0.0, 1.0)
    }

    /// Where in the source buffer playback is at `now`.
    pub fn position_at(&self, now: f64) -> f64 {
        self.offset_sec + self.progress_at(now) * self.duration_sec
    }
}

// Turns a buffer and its trim window into a one-shot voice. Holds no voice
// state; concurrent triggers simply overlap in the sink's mix.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackScheduler {
    lookahead_sec: f64,
    min_duration_sec: f64,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(TRIGGER_LOOKAHEAD_SEC, MIN_VOICE_SEC)
    }
}

impl PlaybackScheduler {
    pub fn new(lookahead_sec: f64, min_duration_sec: f64) -> Self {
        Self {
            lookahead_sec: lookahead_sec.max(0.0),
            min_duration_sec: min_duration_sec.max(0.0),
        }
    }

    pub fn lookahead_sec(&self) -> f64 {
        self.lookahead_sec
    }

    /// `None` when there is no buffer to play; that is not an error.
    pub fn trigger<S: OutputSink + ?Sized>(
        &self,
        sink: &mut S,
        buffer: Option<&Arc<SampleBuffer>>,
        window: TrimWindow,
        options: TriggerOptions,
    ) -> Option<VoiceHandle> {
        let buffer = buffer?;
        let offset_sec = window.start_sec.max(0.0);
        let duration_sec = window.duration_sec().max(self.min_duration_sec);
        let start_at = options
            .at
            .unwrap_or_else(|| sink.current_time() + self.lookahead_sec);

        let id = sink.start_voice(TriggerParams {
            buffer: Arc::clone(buffer),
            start_at,
            offset_sec,
            duration_sec,
            gain: options.gain,
        });
        trace!(?id, start_at, offset_sec, duration_sec, "voice scheduled");

        Some(VoiceHandle {
            id,
            start_at,
            offset_sec,
            duration_sec,
        })
    }
}
