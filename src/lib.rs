pub mod audio;
pub mod audio_api;
pub mod loader;
pub mod middle;
pub mod pipeline;
pub mod shared;

#[cfg(test)]
mod testutil;
