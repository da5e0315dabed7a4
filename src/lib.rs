pub mod analysis;
pub mod archive;
pub mod audio;
pub mod config;
pub mod error;
pub mod eval;
pub mod extract;
pub mod mel;

pub use config::PipelineConfig;
pub use error::{Error, Result};

/// Audio file extensions picked up when the input is a directory
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac"];

/// Application name for config paths
pub const APP_NAME: &str = "hrmel";
