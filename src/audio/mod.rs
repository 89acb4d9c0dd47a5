use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::audio_api::{AudioCommand, TriggerParams};

mod engine;
pub mod offline;
mod sample_buffer;
mod sink;
mod voice;
mod voice_id;

pub use offline::{BlockRenderer, OfflineContext, OfflineRenderer, RenderError, RenderedBuffer};
pub use sample_buffer::SampleBuffer;
pub use sink::OutputSink;
pub use voice::Voice;
pub use voice_id::{VoiceId, next_voice_id};

use engine::Engine;

// Handle to the live output stream. Dropping it closes the stream.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    ended_rx: Receiver<VoiceId>,
    frame_clock: Arc<AtomicU64>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            warn!("audio command queue full, dropping command");
        }
    }
}

impl OutputSink for AudioHandle {
    fn current_time(&self) -> f64 {
        self.frame_clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_voice(&mut self, params: TriggerParams) -> VoiceId {
        let id = next_voice_id();
        self.send(AudioCommand::Play { id, params });
        id
    }

    fn stop_voice(&mut self, id: VoiceId) {
        self.send(AudioCommand::Stop(id));
    }

    fn drain_ended(&mut self) -> Vec<VoiceId> {
        self.ended_rx.try_iter().collect()
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (ended_tx, ended_rx) = crossbeam_channel::bounded::<VoiceId>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    let frame_clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let mut engine = Engine::new(sample_rate, Arc::clone(&frame_clock));
            engine.set_ended_tx(ended_tx);

            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, engine, channels)?;
            output_stream.play().context("failed to play output stream")?;
            info!(sample_rate, channels, "output stream started");

            Ok(AudioHandle {
                tx,
                ended_rx,
                frame_clock,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err: cpal::StreamError| warn!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }
            engine.render_block(data, channels);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
