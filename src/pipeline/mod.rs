pub mod export;
pub mod persistence;
pub mod playback;
pub mod recorder;
pub mod replayer;
pub mod sample_store;
pub mod sequence;
pub mod session;
pub mod timeline;
pub mod trim;
pub mod wav;
