// Session settings, read on startup from the project directory.
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::shared::{
    MIN_TRIM_GAP_SEC, MIN_VOICE_SEC, NUM_PADS, RENDER_TAIL_SEC, REPLAY_GUARD_MARGIN_SEC,
    REPLAY_LOOKAHEAD_SEC, TRIGGER_LOOKAHEAD_SEC,
};

const PADSEQ_DIR: &str = ".padseq";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "padseq.log";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub pad_count: usize, // grows with presets that have more files
    pub trigger_lookahead_sec: f64,
    pub replay_lookahead_sec: f64,
    pub replay_guard_margin_sec: f64,
    pub min_voice_sec: f64,
    pub min_trim_gap_sec: f64,
    pub render_tail_sec: f64,
    pub export_channels: u16,
    pub export_sample_rate: Option<u32>, // None = output device rate
    pub tap_gain: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pad_count: NUM_PADS,
            trigger_lookahead_sec: TRIGGER_LOOKAHEAD_SEC,
            replay_lookahead_sec: REPLAY_LOOKAHEAD_SEC,
            replay_guard_margin_sec: REPLAY_GUARD_MARGIN_SEC,
            min_voice_sec: MIN_VOICE_SEC,
            min_trim_gap_sec: MIN_TRIM_GAP_SEC,
            render_tail_sec: RENDER_TAIL_SEC,
            export_channels: 2,
            export_sample_rate: None,
            tap_gain: 1.0,
        }
    }
}

// <project_dir>/.padseq/
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(PADSEQ_DIR)
}

// <project_dir>/.padseq/config.json
fn config_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(CONFIG_FILE)
}

// <project_dir>/.padseq/padseq.log
pub fn log_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(LOG_FILE)
}

pub fn config_exists(project_dir: &Path) -> bool {
    config_file_path(project_dir).is_file()
}

/// Defaults when the file does not exist; an unreadable or malformed file is
/// an error so a typo doesn't silently reset every setting.
pub fn load_config(project_dir: &Path) -> anyhow::Result<SessionConfig> {
    let path = config_file_path(project_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

// Write the config to disk, making the directory if it doesn't exist already
pub fn save_config(project_dir: &Path, config: &SessionConfig) -> anyhow::Result<()> {
    let path = config_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .padseq/ if needed
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
