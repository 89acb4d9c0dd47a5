use std::collections::HashMap;

use crate::shared::PadId;

/// The `[start_sec, end_sec)` slice of a buffer that a pad plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimWindow {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TrimWindow {
    pub fn new(start_sec: f64, end_sec: f64) -> Self {
        Self { start_sec, end_sec }
    }

    pub fn full(duration_sec: f64) -> Self {
        Self::new(0.0, duration_sec)
    }

    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

// Trim windows per pad. Independent of whether a buffer is loaded: a trim set
// before its sample arrives is kept and applies once the buffer exists.
#[derive(Clone, Debug)]
pub struct TrimRegistry {
    trims: HashMap<PadId, TrimWindow>,
    min_gap_sec: f64,
}

impl Default for TrimRegistry {
    fn default() -> Self {
        Self::new(crate::shared::MIN_TRIM_GAP_SEC)
    }
}

impl TrimRegistry {
    pub fn new(min_gap_sec: f64) -> Self {
        Self {
            trims: HashMap::new(),
            min_gap_sec: min_gap_sec.max(0.0),
        }
    }

    /// The stored trim, or the whole buffer when none was set.
    pub fn get_trim(&self, pad: PadId, default_duration_sec: f64) -> TrimWindow {
        self.trims
            .get(&pad)
            .copied()
            .unwrap_or_else(|| TrimWindow::full(default_duration_sec))
    }

    pub fn has_trim(&self, pad: PadId) -> bool {
        self.trims.contains_key(&pad)
    }

    /// Clamps and stores a window. Start is placed first, then end is kept at
    /// least one gap after it. `None` means the buffer length is unknown.
    pub fn set_trim(
        &mut self,
        pad: PadId,
        start_sec: f64,
        end_sec: f64,
        buffer_duration_sec: Option<f64>,
    ) -> TrimWindow {
        let (max, gap) = self.bounds(buffer_duration_sec);
        let start = if start_sec.is_nan() { 0.0 } else { start_sec };
        let end = if end_sec.is_nan() { max } else { end_sec };

        let start = start.clamp(0.0, max - gap);
        let end = end.clamp((start + gap).min(max), max);
        self.store(pad, TrimWindow::new(start, end))
    }

    /// Moves only the start handle; the end stays put.
    pub fn set_start(&mut self, pad: PadId, start_sec: f64, buffer_duration_sec: f64) -> TrimWindow {
        let (max, gap) = self.bounds(Some(buffer_duration_sec));
        let current = self.get_trim(pad, max);
        let end = current.end_sec.clamp(gap, max);
        let start = if start_sec.is_nan() { 0.0 } else { start_sec };
        let start = start.clamp(0.0, (end - gap).max(0.0));
        self.store(pad, TrimWindow::new(start, end))
    }

    /// Moves only the end handle; the start stays put.
    pub fn set_end(&mut self, pad: PadId, end_sec: f64, buffer_duration_sec: f64) -> TrimWindow {
        let (max, gap) = self.bounds(Some(buffer_duration_sec));
        let current = self.get_trim(pad, max);
        let start = current.start_sec.clamp(0.0, max - gap);
        let end = if end_sec.is_nan() { max } else { end_sec };
        let end = end.clamp((start + gap).min(max), max);
        self.store(pad, TrimWindow::new(start, end))
    }

    /// Slides the whole window, keeping its width, without leaving the buffer.
    pub fn shift(&mut self, pad: PadId, delta_sec: f64, buffer_duration_sec: f64) -> TrimWindow {
        let (max, gap) = self.bounds(Some(buffer_duration_sec));
        let current = self.get_trim(pad, max);
        let width = current.duration_sec().clamp(gap, max);
        let delta = if delta_sec.is_nan() { 0.0 } else { delta_sec };
        let start = (current.start_sec + delta).clamp(0.0, max - width);
        self.store(pad, TrimWindow::new(start, start + width))
    }

    pub fn clear(&mut self, pad: PadId) {
        self.trims.remove(&pad);
    }

    pub fn reset(&mut self) {
        self.trims.clear();
    }

    fn bounds(&self, buffer_duration_sec: Option<f64>) -> (f64, f64) {
        let max = match buffer_duration_sec {
            Some(d) if d.is_finite() => d.max(0.0),
            _ => f64::INFINITY,
        };
        // a buffer shorter than the gap gets a window as wide as itself
        (max, self.min_gap_sec.min(max))
    }

    fn store(&mut self, pad: PadId, window: TrimWindow) -> TrimWindow {
        self.trims.insert(pad, window);
        window
    }
}
