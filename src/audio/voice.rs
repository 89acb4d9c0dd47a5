use std::sync::Arc;

use super::sample_buffer::SampleBuffer;
use super::voice_id::VoiceId;
use crate::audio_api::TriggerParams;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
fn sample_at(data: &[f32], idx: usize, frac: f32) -> f32 {
    let Some(&s0) = data.get(idx) else {
        return 0.0;
    };
    let s1 = data.get(idx + 1).copied().unwrap_or(s0);
    lerp(s0, s1, frac)
}

// A one-shot playback of a buffer slice, positioned on an output frame
// timeline. The live engine and the offline renderer both mix these, so a
// voice sounds the same whichever sink scheduled it.
#[derive(Clone, Debug)]
pub struct Voice {
    id: VoiceId,
    buffer: Arc<SampleBuffer>,
    start_frame: u64, // output frame where the voice becomes audible
    src_start: f64,   // source frame of the trim start
    step: f64,        // source frames per output frame
    length: u64,      // output frames to play
    played: u64,
    gain: f32,
}

impl Voice {
    /// `not_before` is the earliest output frame the sink can still render;
    /// voices scheduled before it start there, from the top of their slice.
    pub fn new(id: VoiceId, params: TriggerParams, out_rate: u32, not_before: u64) -> Self {
        let out_rate = out_rate.max(1) as f64;
        let src_rate = params.buffer.sample_rate() as f64;

        let requested = (params.start_at.max(0.0) * out_rate).round() as u64;
        let start_frame = requested.max(not_before);
        let src_start = params.offset_sec.max(0.0) * src_rate;
        let step = src_rate / out_rate;

        // playback stops at the end of the buffer even if the slice asks for more
        let wanted = (params.duration_sec.max(0.0) * out_rate).round() as u64;
        let available_src = (params.buffer.frames() as f64 - src_start).max(0.0);
        let available = (available_src / step).ceil() as u64;

        Self {
            id,
            buffer: params.buffer,
            start_frame,
            src_start,
            step,
            length: wanted.min(available),
            played: 0,
            gain: params.gain,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.length
    }

    pub fn is_finished(&self) -> bool {
        self.played >= self.length
    }

    /// Mixes this voice into an interleaved block whose first frame is
    /// `block_start` on the output timeline.
    pub fn render_into(&mut self, out: &mut [f32], channels: usize, block_start: u64) {
        if channels == 0 || self.is_finished() {
            return;
        }
        let frames = out.len() / channels;
        let block_end = block_start + frames as u64;
        if block_end <= self.start_frame {
            return; // not audible yet
        }
        let first = self.start_frame.saturating_sub(block_start) as usize;

        for frame in out.chunks_exact_mut(channels).skip(first) {
            if self.is_finished() {
                break;
            }
            // read position in the source, fractional when rates differ
            let pos = self.src_start + self.played as f64 * self.step;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            for (c, out_sample) in frame.iter_mut().enumerate() {
                *out_sample += self.read(idx, frac, c, channels) * self.gain;
            }
            self.played += 1;
        }
    }

    fn read(&self, idx: usize, frac: f32, out_channel: usize, out_channels: usize) -> f32 {
        let buf = &self.buffer;
        match buf.num_channels() {
            0 => 0.0,
            // mono fans out to every output channel
            1 => sample_at(buf.channel(0), idx, frac),
            // everything folds down into a mono output
            n if out_channels == 1 => {
                let sum: f32 = (0..n).map(|c| sample_at(buf.channel(c), idx, frac)).sum();
                sum / n as f32
            }
            _ => sample_at(buf.channel(out_channel), idx, frac),
        }
    }
}
