//! Time-ordered work queue.
//!
//! Everything that should happen "later" (replay hits, the replay guard) is an
//! entry here with a fire time. The session's tick pops due entries in time
//! order; entries with the same fire time come out in insertion order.
//! Cancelling an entry removes it, so it can never fire.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug)]
struct FireKey {
    at: f64,
    seq: u64,
}

impl PartialEq for FireKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FireKey {}

impl PartialOrd for FireKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FireKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.total_cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug)]
pub struct Timeline<A> {
    entries: BTreeMap<FireKey, A>,
    fire_times: HashMap<u64, f64>,
    next_seq: u64,
}

impl<A> Default for Timeline<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            fire_times: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<A> Timeline<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: f64, action: A) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(FireKey { at, seq }, action);
        self.fire_times.insert(seq, at);
        TimerId(seq)
    }

    /// Removes a pending entry. Returns false when it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.fire_times.remove(&id.0) {
            Some(at) => self.entries.remove(&FireKey { at, seq: id.0 }).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.fire_times.contains_key(&id.0)
    }

    /// The earliest entry with a fire time at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, A)> {
        let first = self.entries.first_key_value().map(|(k, _)| *k)?;
        if first.at > now {
            return None;
        }
        let action = self.entries.remove(&first)?;
        self.fire_times.remove(&first.seq);
        Some((first.at, action))
    }

    pub fn next_fire_time(&self) -> Option<f64> {
        self.entries.first_key_value().map(|(k, _)| k.at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.fire_times.clear();
    }
}
