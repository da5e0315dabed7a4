pub mod decode;
pub mod stft;

pub use decode::{load_mono, AudioData};
pub use stft::{power_spectrogram, StftParams};
