use std::sync::Arc;

pub use crate::audio::{SampleBuffer, VoiceId};

// One scheduled playback of a buffer slice. Times are in seconds on the
// clock of whichever sink receives it (the live frame clock, or the offline
// render timeline starting at 0).
#[derive(Clone, Debug)]
pub struct TriggerParams {
    pub buffer: Arc<SampleBuffer>,
    pub start_at: f64,     // when the voice becomes audible
    pub offset_sec: f64,   // where in the source buffer playback begins
    pub duration_sec: f64, // how much of the source to play
    pub gain: f32,
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't decode files (would block the audio thread), so buffers
    // travel already decoded inside the trigger, shared through an Arc.
    Play { id: VoiceId, params: TriggerParams },

    // Silences a voice early. Unknown or finished ids are ignored.
    Stop(VoiceId),
}
