use tracing::debug;

use super::sequence::{Sequence, SequenceId};
use super::timeline::{TimerId, Timeline};
use crate::shared::{PadId, REPLAY_GUARD_MARGIN_SEC, REPLAY_LOOKAHEAD_SEC};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReplayId(u64);

/// Timeline entries owned by a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayTask {
    Hit { replay: ReplayId, pad: PadId },
    Finish { replay: ReplayId },
}

/// What the session should do with a task that fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayStep {
    Hit(PadId),
    Finished(SequenceId),
    Ignored,
}

#[derive(Clone, Debug)]
struct ActiveReplay {
    id: ReplayId,
    sequence: SequenceId,
    start_at: f64,
    duration_sec: f64,
    timers: Vec<TimerId>,
}

// Live replay of one sequence at a time. Each event becomes a timeline entry;
// stopping removes the entries that have not fired yet. Voices that already
// started keep sounding.
#[derive(Clone, Debug)]
pub struct SequenceReplayer {
    lookahead_sec: f64,
    guard_margin_sec: f64,
    active: Option<ActiveReplay>,
    next_id: u64,
}

impl Default for SequenceReplayer {
    fn default() -> Self {
        Self::new(REPLAY_LOOKAHEAD_SEC, REPLAY_GUARD_MARGIN_SEC)
    }
}

impl SequenceReplayer {
    pub fn new(lookahead_sec: f64, guard_margin_sec: f64) -> Self {
        Self {
            lookahead_sec: lookahead_sec.max(0.0),
            guard_margin_sec: guard_margin_sec.max(0.0),
            active: None,
            next_id: 0,
        }
    }

    pub fn play(
        &mut self,
        sequence: &Sequence,
        timeline: &mut Timeline<ReplayTask>,
        now: f64,
    ) -> ReplayId {
        self.stop(timeline);

        self.next_id += 1;
        let id = ReplayId(self.next_id);
        let start_at = now + self.lookahead_sec;

        let mut timers: Vec<TimerId> = sequence
            .events()
            .iter()
            .map(|e| timeline.schedule(start_at + e.time_sec, ReplayTask::Hit { replay: id, pad: e.pad }))
            .collect();
        // guard: brings the replayer back to idle even if nobody stops it
        let guard_at = start_at + sequence.duration_sec() + self.guard_margin_sec;
        timers.push(timeline.schedule(guard_at, ReplayTask::Finish { replay: id }));

        debug!(sequence = sequence.name(), events = sequence.events().len(), start_at, "replay scheduled");
        self.active = Some(ActiveReplay {
            id,
            sequence: sequence.id(),
            start_at,
            duration_sec: sequence.duration_sec(),
            timers,
        });
        id
    }

    /// Cancels every pending hit of the current replay. False when idle.
    pub fn stop(&mut self, timeline: &mut Timeline<ReplayTask>) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        let cancelled = active.timers.into_iter().filter(|&t| timeline.cancel(t)).count();
        debug!(cancelled, "replay stopped");
        true
    }

    pub fn on_task(&mut self, task: ReplayTask) -> ReplayStep {
        let Some(active) = &self.active else {
            return ReplayStep::Ignored;
        };
        match task {
            ReplayTask::Hit { replay, pad } if replay == active.id => ReplayStep::Hit(pad),
            ReplayTask::Finish { replay } if replay == active.id => {
                let sequence = active.sequence;
                self.active = None;
                ReplayStep::Finished(sequence)
            }
            _ => ReplayStep::Ignored,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_sequence(&self) -> Option<SequenceId> {
        self.active.as_ref().map(|a| a.sequence)
    }

    /// Fraction of the sequence played at `now`, while a replay is active.
    pub fn progress(&self, now: f64) -> Option<f64> {
        let active = self.active.as_ref()?;
        if active.duration_sec <= 0.0 {
            return Some(1.0);
        }
        Some(((now - active.start_at) / active.duration_sec).clamp(0.0, 1.0))
    }
}
