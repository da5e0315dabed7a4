//! NumPy-compatible `.npz` payloads: a Deflate zip of `.npy` entries.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use nalgebra::DMatrix;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGN: usize = 64;

/// One entry of an archive.
pub enum Entry<'a> {
    /// Stored as `<name>.npy`, little-endian float32, C order.
    Array(&'a str, &'a DMatrix<f64>),
    /// Stored verbatim under `name`.
    Text(&'a str, &'a str),
}

/// Serialize a matrix as a version 1.0 `.npy` blob of `<f4` values.
pub fn npy_bytes(matrix: &DMatrix<f64>) -> Vec<u8> {
    let (rows, cols) = matrix.shape();
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );
    // magic(6) + version(2) + header length(2) + header, padded to the alignment
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + rows * cols * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for r in 0..rows {
        for c in 0..cols {
            out.extend_from_slice(&(matrix[(r, c)] as f32).to_le_bytes());
        }
    }
    out
}

/// Write `entries` as a compressed zip into `writer`.
pub fn write_npz<W: Write + Seek>(writer: W, entries: &[Entry<'_>]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        match entry {
            Entry::Array(name, matrix) => {
                zip.start_file(format!("{}.npy", name), options)?;
                zip.write_all(&npy_bytes(matrix))?;
            }
            Entry::Text(name, text) => {
                zip.start_file(*name, options)?;
                zip.write_all(text.as_bytes())?;
            }
        }
    }

    Ok(zip.finish()?)
}

/// Build the archive in memory.
pub fn npz_in_memory(entries: &[Entry<'_>]) -> Result<Vec<u8>> {
    let cursor = write_npz(Cursor::new(Vec::new()), entries)?;
    Ok(cursor.into_inner())
}

/// Write the archive to `path`, creating parent directories.
pub fn save_npz(path: &Path, entries: &[Entry<'_>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_npz(file, entries)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
