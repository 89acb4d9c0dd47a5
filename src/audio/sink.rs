use super::voice_id::VoiceId;
use crate::audio_api::TriggerParams;

/// Anything voices can be scheduled on: the live output stream, an offline
/// render, or a manual clock in tests.
pub trait OutputSink {
    /// Seconds on this sink's clock.
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Schedules a voice; it sounds at `params.start_at` or as soon as
    /// possible if that moment has already passed.
    fn start_voice(&mut self, params: TriggerParams) -> VoiceId;

    /// Stops a voice early. Must be a no-op for unknown or finished voices.
    fn stop_voice(&mut self, id: VoiceId);

    /// Voices that ran to their natural end since the last call. Each voice
    /// shows up here at most once and never after being stopped.
    fn drain_ended(&mut self) -> Vec<VoiceId>;
}
