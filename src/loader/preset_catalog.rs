use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::sample_loader::index_wav_in_dir;

/// A named group of sample locators, one per pad in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub files: Vec<String>,
}

pub fn parse_catalog(json: &str) -> serde_json::Result<Vec<Preset>> {
    serde_json::from_str(json)
}

// catalog.json: [{ "name": "...", "files": ["kick.wav", ...] }, ...]
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<Preset>> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let presets = parse_catalog(&data).with_context(|| format!("parsing {}", path.display()))?;
    if presets.is_empty() {
        anyhow::bail!("{} lists no presets", path.display());
    }
    Ok(presets)
}

/// Every WAV file in `dir` as one preset named after the directory.
pub fn directory_preset(dir: &Path) -> anyhow::Result<Preset> {
    let files = index_wav_in_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    let name = dir
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "samples".to_string());
    Ok(Preset {
        name,
        files: files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    })
}
