use thiserror::Error;
use tracing::{debug, info};

use super::playback::{PlaybackScheduler, TriggerOptions};
use super::sample_store::SampleStore;
use super::sequence::{Sequence, SequenceId};
use super::trim::TrimRegistry;
use super::wav;
use crate::audio::{OfflineContext, OfflineRenderer, RenderError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no sequence with id {0:?}")]
    UnknownSequence(SequenceId),

    #[error("offline rendering is not available")]
    OfflineUnsupported,

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("wav encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// A finished export, ready to be written out.
#[derive(Clone, Debug, PartialEq)]
pub struct WavExport {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub tail_sec: f64,
}

/// An offline render with every hit already scheduled. Owns everything it
/// needs, so `finish` can run on another thread.
pub struct PendingExport {
    context: OfflineContext,
    sequence_name: String,
    file_name: String,
}

impl PendingExport {
    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn frame_count(&self) -> u64 {
        self.context.frame_count()
    }

    /// Renders and encodes. This is the slow part.
    pub fn finish(self) -> Result<WavExport, ExportError> {
        let rendered = self.context.render()?;
        let bytes = wav::encode(&rendered)?;
        info!(
            sequence = %self.sequence_name,
            frames = rendered.frames(),
            bytes = bytes.len(),
            "export rendered"
        );
        Ok(WavExport {
            bytes,
            file_name: self.file_name,
        })
    }
}

/// Sets up an offline render of `sequence`: one voice per hit whose pad has a
/// buffer, at the hit's exact time, with the pad's current trim.
pub fn prepare_render(
    sequence: &Sequence,
    store: &SampleStore,
    trims: &TrimRegistry,
    renderer: Option<&dyn OfflineRenderer>,
    scheduler: &PlaybackScheduler,
    settings: RenderSettings,
) -> Result<PendingExport, ExportError> {
    let renderer = renderer.ok_or(ExportError::OfflineUnsupported)?;

    let total_sec = sequence.duration_sec() + settings.tail_sec.max(0.0);
    let frame_count = (total_sec * settings.sample_rate as f64).ceil() as u64;
    let mut context = renderer.create_context(settings.channels, frame_count, settings.sample_rate)?;

    let mut skipped = 0usize;
    for event in sequence.events() {
        let Some(buffer) = store.get(event.pad) else {
            skipped += 1;
            continue;
        };
        let window = trims.get_trim(event.pad, buffer.duration_sec());
        let options = TriggerOptions {
            at: Some(event.time_sec),
            ..TriggerOptions::default()
        };
        scheduler.trigger(&mut context, Some(buffer), window, options);
    }
    debug!(
        sequence = sequence.name(),
        frame_count,
        scheduled = context.scheduled_voices(),
        skipped,
        "export prepared"
    );

    Ok(PendingExport {
        context,
        sequence_name: sequence.name().to_string(),
        file_name: sequence.export_file_name(),
    })
}

/// Prepares and finishes an export on the calling thread.
pub fn render_to_wav(
    sequence: &Sequence,
    store: &SampleStore,
    trims: &TrimRegistry,
    renderer: Option<&dyn OfflineRenderer>,
    scheduler: &PlaybackScheduler,
    settings: RenderSettings,
) -> Result<WavExport, ExportError> {
    prepare_render(sequence, store, trims, renderer, scheduler, settings)?.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{BlockRenderer, SampleBuffer};
    use crate::pipeline::sequence::{SequenceEvent, SequenceList};
    use crate::shared::PadId;

    const RATE: u32 = 8000;

    fn settings(channels: u16) -> RenderSettings {
        RenderSettings {
            sample_rate: RATE,
            channels,
            tail_sec: 0.5,
        }
    }

    fn one_sequence(hits: &[(usize, f64)]) -> Sequence {
        let mut list = SequenceList::new();
        let events = hits
            .iter()
            .map(|&(pad, time_sec)| SequenceEvent { pad: PadId(pad), time_sec })
            .collect();
        list.create(events).unwrap().clone()
    }

    fn read_back(export: &WavExport) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::new(export.bytes.as_slice()).unwrap();
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (reader.spec(), samples)
    }

    #[test]
    fn test_export_without_buffers_is_silent() {
        let seq = one_sequence(&[(0, 0.0), (3, 1.2)]);
        let store = SampleStore::new(16);
        let export = render_to_wav(
            &seq,
            &store,
            &TrimRegistry::default(),
            Some(&BlockRenderer),
            &PlaybackScheduler::default(),
            settings(2),
        )
        .unwrap();

        let (spec, samples) = read_back(&export);
        let frames = ((1.2 + 0.5) * RATE as f64).ceil() as usize;
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, RATE);
        assert_eq!(samples.len(), frames * 2);
        assert!(samples.iter().all(|&s| s == 0));
        assert_eq!(export.bytes.len(), 44 + frames * 4);
        assert_eq!(export.file_name, "Sequence_1__2_hits__export.wav");
    }

    #[test]
    fn test_hit_lands_on_its_frame() {
        let seq = one_sequence(&[(1, 0.25)]);
        let mut store = SampleStore::new(4);
        store.set(PadId(1), Arc::new(SampleBuffer::mono(RATE, vec![0.5; 4000])));
        let mut trims = TrimRegistry::default();
        trims.set_trim(PadId(1), 0.1, 0.2, Some(0.5));

        let export = render_to_wav(
            &seq,
            &store,
            &trims,
            Some(&BlockRenderer),
            &PlaybackScheduler::default(),
            settings(1),
        )
        .unwrap();

        let (_, samples) = read_back(&export);
        assert_eq!(samples.iter().position(|&s| s != 0), Some(2000));
        assert_eq!(samples.iter().filter(|&&s| s != 0).count(), 800);
        assert_eq!(samples[2000], 16384);
    }

    #[test]
    fn test_missing_renderer_fails_before_rendering() {
        let seq = one_sequence(&[(0, 0.0)]);
        let err = prepare_render(
            &seq,
            &SampleStore::new(1),
            &TrimRegistry::default(),
            None,
            &PlaybackScheduler::default(),
            settings(2),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::OfflineUnsupported));
    }

    #[test]
    fn test_invalid_shape_is_a_render_error() {
        let seq = one_sequence(&[(0, 0.0)]);
        let err = prepare_render(
            &seq,
            &SampleStore::new(1),
            &TrimRegistry::default(),
            Some(&BlockRenderer),
            &PlaybackScheduler::default(),
            settings(6),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::Render(RenderError::InvalidChannels(6))));
    }

    #[test]
    fn test_pending_export_finishes_on_another_thread() {
        let seq = one_sequence(&[(0, 0.0)]);
        let mut store = SampleStore::new(1);
        store.set(PadId(0), Arc::new(SampleBuffer::mono(RATE, vec![0.25; 80])));
        let pending = prepare_render(
            &seq,
            &store,
            &TrimRegistry::default(),
            Some(&BlockRenderer),
            &PlaybackScheduler::default(),
            settings(2),
        )
        .unwrap();
        assert_eq!(pending.frame_count(), 4800);

        let export = std::thread::spawn(move || pending.finish())
            .join()
            .unwrap()
            .unwrap();
        let (_, samples) = read_back(&export);
        assert_eq!(samples[0], 8192);
        assert_eq!(samples[1], 8192);
        assert_eq!(samples[160], 0);
    }
}
