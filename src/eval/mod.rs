pub mod reconstruct;
pub mod size;

pub use reconstruct::{relative_error, PseudoInverse, IDENTITY_ERROR};
pub use size::compressed_size_bytes;
