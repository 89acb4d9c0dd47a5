use std::sync::Arc;

use crate::audio::SampleBuffer;
use crate::shared::PadId;

// Decoded buffers, one optional slot per pad. Voices hold their own Arc, so
// resetting the store never cuts off something that is already sounding.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    slots: Vec<Option<Arc<SampleBuffer>>>,
}

impl SampleStore {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    /// Absent for empty slots and out-of-range pads alike.
    pub fn get(&self, pad: PadId) -> Option<&Arc<SampleBuffer>> {
        self.slots.get(pad.index())?.as_ref()
    }

    /// Returns false (and stores nothing) when the pad is outside the grid.
    pub fn set(&mut self, pad: PadId, buffer: Arc<SampleBuffer>) -> bool {
        match self.slots.get_mut(pad.index()) {
            Some(slot) => {
                *slot = Some(buffer);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self, size: usize) {
        self.slots.clear();
        self.slots.resize(size, None);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, pad: PadId) -> bool {
        pad.index() < self.slots.len()
    }

    pub fn duration_sec(&self, pad: PadId) -> Option<f64> {
        self.get(pad).map(|b| b.duration_sec())
    }

    pub fn loaded_pads(&self) -> impl Iterator<Item = PadId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| PadId(i))
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_pads().count()
    }

    pub fn first_loaded(&self) -> Option<PadId> {
        self.loaded_pads().next()
    }
}
