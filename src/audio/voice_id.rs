use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

// atomic counter so live and offline sinks never hand out the same id
pub fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
