use std::io::Read;
use std::path::Path;

// Decoded PCM: one float array per channel, all the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Builds a buffer from per-channel data. Channels longer than the shortest
    /// one are truncated so every channel has the same frame count.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in &mut channels {
            ch.truncate(frames);
        }
        Self {
            sample_rate: sample_rate.max(1),
            channels,
        }
    }

    pub fn mono(sample_rate: u32, data: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![data])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_sec(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        self.channels.get(index).map_or(&[], Vec::as_slice)
    }

    // Load a WAV file from disk, resampled to the engine rate
    pub fn load_wav(path: &Path, target_rate: u32) -> hound::Result<Self> {
        let reader = hound::WavReader::open(path)?;
        Self::from_wav_reader(reader, target_rate)
    }

    // Same as load_wav, for bytes that already sit in memory
    pub fn decode_wav<R: Read>(bytes: R, target_rate: u32) -> hound::Result<Self> {
        let reader = hound::WavReader::new(bytes)?;
        Self::from_wav_reader(reader, target_rate)
    }

    fn from_wav_reader<R: Read>(mut reader: hound::WavReader<R>, target_rate: u32) -> hound::Result<Self> {
        let spec = reader.spec();
        let num_channels = spec.channels.max(1) as usize;

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, scale down to [-1, 1]
                let max = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        // deinterleave
        let frames = samples.len() / num_channels;
        let mut channels: Vec<Vec<f32>> = (0..num_channels)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &x) in channels.iter_mut().zip(frame) {
                ch.push(x);
            }
        }

        if spec.sample_rate != target_rate && target_rate > 0 {
            channels = channels
                .iter()
                .map(|ch| resample_linear(ch, spec.sample_rate, target_rate))
                .collect();
            return Ok(Self::new(target_rate, channels));
        }
        Ok(Self::new(spec.sample_rate, channels))
    }

    /// Min/max pairs of channel 0, one per display column.
    pub fn peaks(&self, columns: usize) -> Vec<(f32, f32)> {
        let data = self.channel(0);
        if columns == 0 || data.is_empty() {
            return Vec::new();
        }
        let step = data.len().div_ceil(columns);
        (0..columns)
            .map(|x| {
                let s = (x * step).min(data.len());
                let e = ((x + 1) * step).min(data.len());
                if s >= e {
                    return (0.0, 0.0);
                }
                data[s..e]
                    .iter()
                    .fold((1.0f32, -1.0f32), |(lo, hi), &v| (lo.min(v), hi.max(v)))
            })
            .collect()
    }
}

fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    // Simple linear resampler, good enough for one-shot pads
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            // fractional position in the source buffer
            let src_pos = i as f64 / ratio; // ex. 3.7
            let idx = src_pos.floor() as usize; // ex. 3
            let frac = (src_pos - idx as f64) as f32; // ex. 0.7
            if idx >= last {
                samples[last]
            } else {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}
