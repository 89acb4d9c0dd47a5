use crate::shared::{MIN_SEQUENCE_SEC, PadId};

/// One pad hit, timed from the moment recording started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequenceEvent {
    pub pad: PadId,
    pub time_sec: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    id: SequenceId,
    name: String,
    events: Vec<SequenceEvent>, // in trigger order, which is time order
    duration_sec: f64,
}

impl Sequence {
    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &[SequenceEvent] {
        &self.events
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    /// `Sequence 2 (5 hits)` becomes `Sequence_2__5_hits__export.wav`.
    pub fn export_file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}_export.wav")
    }
}

// Every sequence recorded this session. Append-only apart from deletion; the
// running count keeps numbering names after earlier sequences are deleted.
#[derive(Clone, Debug, Default)]
pub struct SequenceList {
    sequences: Vec<Sequence>,
    created: usize,
    next_id: u64,
}

impl SequenceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and appends a sequence; `None` for an empty recording.
    pub fn create(&mut self, events: Vec<SequenceEvent>) -> Option<&Sequence> {
        if events.is_empty() {
            return None;
        }
        let last = events.iter().map(|e| e.time_sec).fold(0.0, f64::max);
        self.created += 1;
        self.next_id += 1;
        let sequence = Sequence {
            id: SequenceId(self.next_id),
            name: format!("Sequence {} ({} hits)", self.created, events.len()),
            duration_sec: last.max(MIN_SEQUENCE_SEC),
            events,
        };
        self.sequences.push(sequence);
        self.sequences.last()
    }

    pub fn get(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: SequenceId) -> Option<Sequence> {
        let idx = self.sequences.iter().position(|s| s.id == id)?;
        Some(self.sequences.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.iter()
    }

    pub fn at(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}
