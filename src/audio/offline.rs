//! Non-realtime rendering.
//!
//! An [`OfflineContext`] accepts voices through the same [`OutputSink`]
//! interface as the live stream, then mixes all of them in one pass into an
//! interleaved buffer of a fixed length. Its clock starts at zero and does not
//! move, so a voice scheduled at `t` lands exactly on frame `round(t * rate)`.

use std::collections::TryReserveError;

use thiserror::Error;
use tracing::debug;

use super::sink::OutputSink;
use super::voice::Voice;
use super::voice_id::{VoiceId, next_voice_id};
use crate::audio_api::TriggerParams;

/// Frames mixed per pass over the voice list.
pub const RENDER_QUANTUM: usize = 128;

pub const MIN_SAMPLE_RATE: u32 = 3_000;
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// The export container is canonical 16-bit PCM, which stops at stereo.
pub const MAX_CHANNELS: u16 = 2;

/// Upper bound on interleaved samples in one render (about 23 minutes of
/// 48 kHz stereo).
pub const MAX_RENDER_SAMPLES: u64 = 1 << 27;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported channel count {0} (expected 1 or 2)")]
    InvalidChannels(u16),

    #[error("unsupported sample rate {0} Hz")]
    InvalidSampleRate(u32),

    #[error("render length must be at least one frame")]
    Empty,

    #[error("render of {frames} frames x {channels} channels is too large")]
    TooLarge { frames: u64, channels: u16 },

    #[error("could not allocate the render buffer: {0}")]
    Alloc(#[from] TryReserveError),
}

/// The result of an offline render: interleaved frames, channel 0 first.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl RenderedBuffer {
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn new(sample_rate: u32, channels: u16, mut samples: Vec<f32>) -> Self {
        let ch = channels.max(1) as usize;
        samples.truncate(samples.len() / ch * ch);
        Self {
            sample_rate,
            channels: channels.max(1),
            samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration_sec(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }
}

pub struct OfflineContext {
    sample_rate: u32,
    channels: u16,
    frame_count: u64,
    voices: Vec<Voice>,
}

impl OfflineContext {
    pub fn new(channels: u16, frame_count: u64, sample_rate: u32) -> Result<Self, RenderError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(RenderError::InvalidChannels(channels));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(RenderError::InvalidSampleRate(sample_rate));
        }
        if frame_count == 0 {
            return Err(RenderError::Empty);
        }
        if frame_count.saturating_mul(channels as u64) > MAX_RENDER_SAMPLES {
            return Err(RenderError::TooLarge {
                frames: frame_count,
                channels,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
            frame_count,
            voices: Vec::new(),
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn scheduled_voices(&self) -> usize {
        self.voices.len()
    }

    /// Mixes every scheduled voice. Blocks until the whole buffer is done.
    pub fn render(mut self) -> Result<RenderedBuffer, RenderError> {
        let ch = self.channels as usize;
        let total = self.frame_count as usize * ch;

        let mut samples: Vec<f32> = Vec::new();
        samples.try_reserve_exact(total)?;
        samples.resize(total, 0.0);

        for (quantum, block) in samples.chunks_mut(RENDER_QUANTUM * ch).enumerate() {
            let block_start = (quantum * RENDER_QUANTUM) as u64;
            let block_end = block_start + (block.len() / ch) as u64;
            for voice in &mut self.voices {
                if voice.start_frame() < block_end && !voice.is_finished() {
                    voice.render_into(block, ch, block_start);
                }
            }
        }

        debug!(
            frames = self.frame_count,
            channels = self.channels,
            voices = self.voices.len(),
            "offline render finished"
        );
        Ok(RenderedBuffer::new(self.sample_rate, self.channels, samples))
    }
}

impl OutputSink for OfflineContext {
    fn current_time(&self) -> f64 {
        0.0
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_voice(&mut self, params: TriggerParams) -> VoiceId {
        let id = next_voice_id();
        self.voices.push(Voice::new(id, params, self.sample_rate, 0));
        id
    }

    fn stop_voice(&mut self, id: VoiceId) {
        self.voices.retain(|v| v.id() != id);
    }

    fn drain_ended(&mut self) -> Vec<VoiceId> {
        // nothing plays before render(), so nothing can have ended
        Vec::new()
    }
}

/// The platform's offline rendering capability.
pub trait OfflineRenderer: Send + Sync {
    fn create_context(
        &self,
        channels: u16,
        frame_count: u64,
        sample_rate: u32,
    ) -> Result<OfflineContext, RenderError>;
}

/// Renders in [`RENDER_QUANTUM`]-frame blocks on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockRenderer;

impl OfflineRenderer for BlockRenderer {
    fn create_context(
        &self,
        channels: u16,
        frame_count: u64,
        sample_rate: u32,
    ) -> Result<OfflineContext, RenderError> {
        OfflineContext::new(channels, frame_count, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::SampleBuffer;

    fn hit(start_at: f64, frames: usize) -> TriggerParams {
        TriggerParams {
            buffer: Arc::new(SampleBuffer::mono(8000, vec![0.5; frames])),
            start_at,
            offset_sec: 0.0,
            duration_sec: frames as f64 / 8000.0,
            gain: 1.0,
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            OfflineContext::new(0, 10, 8000),
            Err(RenderError::InvalidChannels(0))
        ));
        assert!(matches!(
            OfflineContext::new(3, 10, 8000),
            Err(RenderError::InvalidChannels(3))
        ));
        assert!(matches!(
            OfflineContext::new(2, 10, 100),
            Err(RenderError::InvalidSampleRate(100))
        ));
        assert!(matches!(OfflineContext::new(2, 0, 8000), Err(RenderError::Empty)));
        assert!(matches!(
            OfflineContext::new(2, MAX_RENDER_SAMPLES, 8000),
            Err(RenderError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_empty_render_is_silent() {
        let ctx = OfflineContext::new(2, 300, 8000).unwrap();
        let out = ctx.render().unwrap();
        assert_eq!(out.frames(), 300);
        assert_eq!(out.channels(), 2);
        assert!(out.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_voice_lands_on_exact_frame_across_quanta() {
        let mut ctx = OfflineContext::new(1, 1000, 8000).unwrap();
        // 0.025 s * 8000 = frame 200, spanning the 128-frame boundary at 256
        ctx.start_voice(hit(0.025, 100));
        let out = ctx.render().unwrap();

        let s = out.samples();
        assert_eq!(s.iter().position(|&x| x != 0.0), Some(200));
        assert_eq!(s.iter().rposition(|&x| x != 0.0), Some(299));
        assert_eq!(s.iter().filter(|&&x| x != 0.0).count(), 100);
    }

    #[test]
    fn test_stopped_voice_is_not_rendered() {
        let mut ctx = OfflineContext::new(1, 100, 8000).unwrap();
        let id = ctx.start_voice(hit(0.0, 10));
        assert_eq!(ctx.scheduled_voices(), 1);
        ctx.stop_voice(id);
        ctx.stop_voice(id);
        assert!(ctx.drain_ended().is_empty());
        let out = ctx.render().unwrap();
        assert!(out.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_voice_past_the_end_is_cut() {
        let mut ctx = OfflineContext::new(2, 10, 8000).unwrap();
        ctx.start_voice(hit(0.0, 50));
        let out = ctx.render().unwrap();
        assert_eq!(out.samples().len(), 20);
        assert!(out.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_block_renderer_validates() {
        assert!(BlockRenderer.create_context(1, 10, 8000).is_ok());
        assert!(BlockRenderer.create_context(1, 10, 1).is_err());
    }
}
