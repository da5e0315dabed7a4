use nalgebra::DMatrix;

use crate::archive::{npz_in_memory, Entry};
use crate::error::Result;

/// Byte length of a compressed `.npz` holding the named arrays.
///
/// Only a comparative metric: the archive is built in memory and dropped.
pub fn compressed_size_bytes(arrays: &[(&str, &DMatrix<f64>)]) -> Result<usize> {
    let entries: Vec<Entry<'_>> = arrays.iter().map(|&(name, m)| Entry::Array(name, m)).collect();
    Ok(npz_in_memory(&entries)?.len())
}
