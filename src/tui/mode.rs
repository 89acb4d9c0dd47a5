// state local to the tui: toggles that change what keys mean
// replaying is synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    // Tab toggles fine trim steps
    pub fine_trim: bool,
    // synced from DisplayState each frame
    pub replaying: bool,
}

impl TuiState {
    pub fn trim_step(&self) -> f32 {
        if self.fine_trim { 0.005 } else { 0.05 }
    }
}
