//! Low-level I/O primitives and size math shared by the container and the
//! pipeline.
//!
//! Each read function reads exactly the bytes it promises or returns an
//! error - there is no partial-read ambiguity. The one exception is
//! [`BlockReader`], whose final block may be short by design.

use std::io::{ErrorKind, Read};

use crate::{BLOCK_SIZE, Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read a little-endian `u64`.
#[inline]
pub(crate) fn le_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Yields a stream as consecutive [`BLOCK_SIZE`] slices.
///
/// Every block is exactly [`BLOCK_SIZE`] bytes except possibly the last,
/// which holds whatever the stream had left. A short read mid-stream is not
/// possible: the reader keeps filling until the block is full or the stream
/// ends.
pub struct BlockReader<R> {
    inner: R,
}

impl<R: Read> BlockReader<R> {
    /// Wrap a reader positioned at the first byte of the block stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next block, or `None` at end of stream.
    pub fn next_block(&mut self) -> Result<Option<Vec<u8>>> {
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.inner.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        block.truncate(filled);
        Ok(Some(block))
    }
}

/// Split a plaintext length into `(num_blocks, last_block_size)`.
///
/// `num_blocks` is the total count of [`BLOCK_SIZE`] blocks the data
/// occupies once the tail is padded; `last_block_size` is the number of
/// real bytes in the final block, zero when the length is an exact
/// multiple (or the data is empty).
pub fn block_layout(len: u64) -> (u64, u64) {
    (len.div_ceil(BLOCK_SIZE as u64), len % BLOCK_SIZE as u64)
}

/// Pad a block to exactly [`BLOCK_SIZE`] bytes with trailing `0x00`.
pub(crate) fn pad_block(block: &mut Vec<u8>) {
    block.resize(BLOCK_SIZE, 0);
}

/// Trim a decrypted final block back to its real byte count.
pub(crate) fn truncate_block(block: &mut Vec<u8>, last_block_size: u64) {
    block.truncate(last_block_size as usize);
}

/// Ciphertext body size for a plaintext of `len` bytes: rounded up to the
/// next whole MiB. The header is not included.
pub fn estimate_encrypted_size(len: u64) -> u64 {
    len.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
}

/// Format a byte count for humans, 1024-based: `"17.00 B"`, `"1.50 MB"`.
pub fn readable_size(len: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    let mut size = len as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}

/// Default worker count for the pipeline: half the hardware threads, never
/// fewer than two.
pub fn default_core_count() -> usize {
    let total = std::thread::available_parallelism().map_or(2, usize::from);
    (total / 2).max(2)
}
