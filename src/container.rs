//! The on-disk container: a small header followed by the 1 MiB-aligned
//! ciphertext body.
//!
//! ## Layout
//! ```text
//! [0x00] RsaFlag                   (u8, 0x00 or 0x01)
//! if RsaFlag == 1:
//!   [0x01] WrappedKeySize          (u32 LE)
//!   [0x05] WrappedKey              (WrappedKeySize bytes, RSA-OAEP block)
//! [next] LastBlockSize             (u64 LE, value in [0, 1 MiB))
//! [next] Body                      (num_blocks × 1 MiB)
//! ```
//!
//! ## Notes
//! * Both size fields are fixed little-endian. The baseline implementation
//!   wrote host-endian words, but only ever shipped on little-endian
//!   hosts, so this choice keeps every known ciphertext readable while
//!   making the format portable.
//! * `LastBlockSize` of zero means the plaintext was an exact multiple of
//!   1 MiB (or empty) and the final body block decrypts in full.
//! * There is no magic value; the flag byte is the entire signature, which
//!   is why [`Header::parse`] treats any other first byte as "not one of
//!   ours".

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::utils::{bytesv, le_u32, le_u64, u8 as read_u8};
use crate::{Error, Result};

/// Parsed container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The RSA-OAEP-wrapped passphrase, when the file was encrypted with a
    /// public key.
    pub wrapped_key: Option<Vec<u8>>,
    /// Real byte count of the final plaintext block; zero for exact
    /// multiples of 1 MiB.
    pub last_block_size: u64,
}

impl Header {
    /// Parse a header from `r`.
    ///
    /// The reader must be positioned at offset 0; on success it is left at
    /// the first body byte. A flag byte outside {0, 1} or a stream that
    /// ends inside the header yields [`Error::NotEncrypted`].
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let flag = short_is_not_encrypted(read_u8(r))?;
        let wrapped_key = match flag {
            0 => None,
            1 => {
                let size = short_is_not_encrypted(le_u32(r))?;
                Some(short_is_not_encrypted(bytesv(r, size as usize))?)
            }
            _ => return Err(Error::NotEncrypted),
        };
        let last_block_size = short_is_not_encrypted(le_u64(r))?;
        Ok(Self {
            wrapped_key,
            last_block_size,
        })
    }

    /// Write the header to `w`, bit-exactly reparseable.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        match &self.wrapped_key {
            None => w.write_all(&[0u8])?,
            Some(key) => {
                w.write_all(&[1u8])?;
                w.write_all(&(key.len() as u32).to_le_bytes())?;
                w.write_all(key)?;
            }
        }
        w.write_all(&self.last_block_size.to_le_bytes())?;
        Ok(())
    }

    /// Encoded size in bytes; the body starts at this offset.
    pub fn size(&self) -> u64 {
        match &self.wrapped_key {
            None => 1 + 8,
            Some(key) => 1 + 4 + key.len() as u64 + 8,
        }
    }
}

/// Whether `path` starts like an enigmatrix container.
///
/// A probe, not a validation: it only looks at the flag byte, and any
/// failure to read (missing file, empty file, no permission) is `false`.
pub fn is_encrypted(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut flag = [0u8; 1];
    match file.read_exact(&mut flag) {
        Ok(()) => flag[0] <= 1,
        Err(_) => false,
    }
}

/// Map a truncated-header read to [`Error::NotEncrypted`]; a file shorter
/// than its header cannot be one of ours.
fn short_is_not_encrypted<T>(result: Result<T>) -> Result<T> {
    match result {
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::NotEncrypted)
        }
        other => other,
    }
}
