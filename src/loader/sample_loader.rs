use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::SampleBuffer;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("unsupported sample location {0:?}")]
    UnsupportedLocator(String),

    #[error("{0} holds no audio")]
    Empty(PathBuf),
}

/// Turns a locator from a preset into a decoded buffer at `target_rate`.
/// Called off the UI thread.
pub trait SampleSource: Send + Sync {
    fn fetch(&self, locator: &str, target_rate: u32) -> Result<SampleBuffer, LoadError>;
}

// Local WAV files. Relative locators resolve against `base_dir`.
#[derive(Clone, Debug)]
pub struct FileSampleSource {
    base_dir: PathBuf,
}

impl FileSampleSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve(&self, locator: &str) -> Result<PathBuf, LoadError> {
        if locator.contains("://") {
            // remote fetching is not something this source does
            return Err(LoadError::UnsupportedLocator(locator.to_string()));
        }
        let path = Path::new(locator);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        })
    }
}

impl SampleSource for FileSampleSource {
    fn fetch(&self, locator: &str, target_rate: u32) -> Result<SampleBuffer, LoadError> {
        let path = self.resolve(locator)?;
        let file = File::open(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let buffer = SampleBuffer::decode_wav(BufReader::new(file), target_rate)
            .map_err(|source| LoadError::Decode {
                path: path.clone(),
                source,
            })?;
        if buffer.frames() == 0 {
            return Err(LoadError::Empty(path));
        }
        Ok(buffer)
    }
}

/// The `*.wav` files directly inside `dir`, sorted by name.
pub fn index_wav_in_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    files.sort();
    Ok(files)
}
