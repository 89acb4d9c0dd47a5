use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use super::voice::Voice;
use super::voice_id::VoiceId;
use crate::audio_api::AudioCommand;

// preallocated so ordinary playing never mallocs in the audio callback;
// polyphony is not capped, a busier pad grid just grows the pool
const VOICE_CAPACITY: usize = 64;

// The realtime mixer. Lives inside the output stream callback and only talks
// to the rest of the program through channels and the shared frame clock.
pub struct Engine {
    sample_rate: u32,
    voices: Vec<Voice>,
    frame_clock: Arc<AtomicU64>, // frames rendered so far
    ended_tx: Option<Sender<VoiceId>>,
}

impl Engine {
    pub fn new(sample_rate: u32, frame_clock: Arc<AtomicU64>) -> Self {
        Self {
            sample_rate,
            voices: Vec::with_capacity(VOICE_CAPACITY),
            frame_clock,
            ended_tx: None,
        }
    }

    pub fn set_ended_tx(&mut self, tx: Sender<VoiceId>) {
        self.ended_tx = Some(tx);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play { id, params } => {
                let now = self.frame_clock.load(Ordering::Acquire);
                self.voices.push(Voice::new(id, params, self.sample_rate, now));
            }
            AudioCommand::Stop(id) => self.voices.retain(|v| v.id() != id),
        }
    }

    /// Fills one interleaved output block and advances the clock past it.
    pub fn render_block(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 {
            return;
        }
        let block_start = self.frame_clock.load(Ordering::Acquire);
        for voice in &mut self.voices {
            voice.render_into(out, channels, block_start);
        }

        let ended_tx = &self.ended_tx;
        self.voices.retain(|v| {
            if !v.is_finished() {
                return true;
            }
            if let Some(tx) = ended_tx {
                let _ = tx.try_send(v.id());
            }
            false
        });

        let frames = (out.len() / channels) as u64;
        self.frame_clock.fetch_add(frames, Ordering::Release);
    }
}
