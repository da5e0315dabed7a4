pub mod band;
pub mod basis;
pub mod codec;
pub mod scale;

pub use band::{BandSet, BandSpec, Compression};
pub use basis::{build_basis, clip_fmax, mel_basis, MelBasis};
