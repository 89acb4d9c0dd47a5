mod preset_catalog;
mod sample_loader;

pub use preset_catalog::{Preset, directory_preset, load_catalog, parse_catalog};
pub use sample_loader::{FileSampleSource, LoadError, SampleSource, index_wav_in_dir};
