//! The streaming block pipeline: encrypt and decrypt whole files with a
//! bounded pool of worker threads and strictly ordered output.
//!
//! ## Shape
//!
//! One driver owns all I/O. It reads 1 MiB blocks, hands `(index, block)`
//! jobs to the pool over a rendezvous channel, collects completions, and
//! writes finished blocks the moment the lowest pending index is ready.
//! Workers run the matrix kernels and nothing else - no reads, no writes,
//! no shared mutable state.
//!
//! At most `cores` blocks are ever in flight, so memory stays bounded by
//! roughly `3 * cores` MiB (in-flight inputs, the reorder buffer, and one
//! subkey per active worker) no matter how large the file is.
//!
//! ## Determinism
//!
//! Subkeys are a pure function of `(primary hash, passphrase, block
//! index)`, so workers can finish in any order and the output bytes are
//! identical to a serial run - the same file encrypted with one worker or
//! sixteen is byte-for-byte the same ciphertext.
//!
//! The first worker or I/O error aborts the run. Partial output is not
//! guaranteed to be valid; callers that need atomicity should write to a
//! temporary path and rename on success.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::thread;

use crossbeam_channel::bounded;
use log::{debug, info};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::container::Header;
use crate::crypto::kdf::{self, DIGEST_LEN};
use crate::crypto::matrix::{self, Matrix};
use crate::crypto::schedule::{Op, Schedule};
use crate::keys;
use crate::utils::{self, BlockReader};
use crate::{Error, MIN_KEY_LEN, Result};

/// The per-file cipher state shared read-only by every worker: primary
/// hash, passphrase, and the derived schedule.
struct BlockCipher<'a> {
    primary: [u8; DIGEST_LEN],
    passphrase: &'a [u8],
    schedule: Schedule,
}

impl<'a> BlockCipher<'a> {
    fn new(passphrase: &'a [u8]) -> Result<Self> {
        if passphrase.len() < MIN_KEY_LEN {
            return Err(Error::InvalidKey("key must be at least 8 bytes"));
        }
        let primary = kdf::primary_hash(passphrase);
        let (seed1, seed2) = kdf::extract_prng_seeds(&primary);
        Ok(Self {
            primary,
            passphrase,
            schedule: Schedule::derive(seed1, seed2),
        })
    }

    fn subkey(&self, index: u64) -> Result<Matrix> {
        Matrix::from_block(kdf::derive_subkey(&self.primary, self.passphrase, index))
    }

    /// Encrypt one block: pad to 1 MiB, then run the scheduled operations
    /// in order. The modular step is two passes, the second against the
    /// transposed subkey.
    fn encrypt_block(&self, index: u64, mut block: Vec<u8>) -> Result<Vec<u8>> {
        utils::pad_block(&mut block);
        let mut m = Matrix::from_block(block)?;
        let subkey = self.subkey(index)?;
        for op in self.schedule.op_order {
            match op {
                Op::Xor => matrix::apply_xor(&mut m, &subkey),
                Op::Modular => {
                    for (pass, mod_op) in self.schedule.mod_order.iter().enumerate() {
                        matrix::apply_modular(&mut m, &subkey, *mod_op, pass == 1);
                    }
                }
                Op::Permutation => matrix::apply_permutation(&mut m, &self.schedule),
            }
        }
        Ok(m.into_block())
    }

    /// Decrypt one block: undo the scheduled operations in reverse order.
    /// Each modular pass is undone by its opposite operator under the same
    /// transpose flag, so the passes unwind transposed-first.
    fn decrypt_block(&self, index: u64, block: Vec<u8>) -> Result<Vec<u8>> {
        let mut m = Matrix::from_block(block)?;
        let subkey = self.subkey(index)?;
        for op in self.schedule.op_order.iter().rev() {
            match op {
                Op::Xor => matrix::apply_xor(&mut m, &subkey),
                Op::Modular => {
                    for (pass, mod_op) in self.schedule.mod_order.iter().enumerate().rev() {
                        matrix::apply_modular(&mut m, &subkey, mod_op.inverse(), pass == 1);
                    }
                }
                Op::Permutation => matrix::reverse_permutation(&mut m, &self.schedule),
            }
        }
        Ok(m.into_block())
    }
}

/// Encrypt `input` into the container at `output`.
///
/// When `public_key` is given the passphrase is RSA-OAEP-wrapped into the
/// header, and the file can later be decrypted with the private key alone.
/// `cores` workers process blocks concurrently; any value produces the
/// same bytes. The output is truncated on open.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    passphrase: &[u8],
    public_key: Option<&RsaPublicKey>,
    cores: usize,
) -> Result<()> {
    let cipher = BlockCipher::new(passphrase)?;
    let input_len = std::fs::metadata(input)?.len();
    let (num_blocks, last_block_size) = utils::block_layout(input_len);

    let wrapped_key = match public_key {
        Some(key) => Some(keys::rsa_encrypt_key(passphrase, key)?),
        None => None,
    };
    let header = Header {
        wrapped_key,
        last_block_size,
    };

    info!(
        "encrypting {} ({num_blocks} blocks) with {} workers",
        utils::readable_size(input_len),
        cores.max(1),
    );
    let mut reader = BlockReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    header.write(&mut writer)?;
    debug!("header written: {} bytes", header.size());

    process_blocks(&mut reader, &mut writer, num_blocks, cores, |index, block| {
        cipher.encrypt_block(index, block)
    })?;
    writer.flush()?;
    Ok(())
}

/// Decrypt the container at `input` into `output`.
///
/// For an RSA-flagged container the passphrase is recovered from the
/// header with `private_key` and the `passphrase` argument is ignored;
/// otherwise `passphrase` is required. Missing key material, a wrong
/// private key, and a too-short passphrase all fail with
/// [`Error::InvalidKey`] before any output is written.
///
/// There is no authentication tag: decrypting with a wrong passphrase
/// succeeds and silently produces garbage. That is a property of the
/// scheme, not a bug in the caller.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    passphrase: Option<&[u8]>,
    private_key: Option<&RsaPrivateKey>,
    cores: usize,
) -> Result<()> {
    let input_len = std::fs::metadata(input)?.len();
    let mut input_file = File::open(input)?;
    let header = Header::parse(&mut input_file)?;

    let recovered;
    let passphrase: &[u8] = match &header.wrapped_key {
        Some(wrapped) => {
            let key = private_key
                .ok_or(Error::InvalidKey("an RSA private key is required for this file"))?;
            recovered = keys::rsa_decrypt_key(wrapped, key)?;
            &recovered
        }
        None => passphrase.ok_or(Error::InvalidKey("a key is required for this file"))?,
    };
    let cipher = BlockCipher::new(passphrase)?;

    let body_len = input_len.saturating_sub(header.size());
    let (num_blocks, _) = utils::block_layout(body_len);
    let last_index = num_blocks.saturating_sub(1);
    let last_block_size = header.last_block_size;

    info!(
        "decrypting {} ({num_blocks} blocks) with {} workers",
        utils::readable_size(body_len),
        cores.max(1),
    );
    let mut reader = BlockReader::new(input_file);
    let mut writer = BufWriter::new(File::create(output)?);

    process_blocks(&mut reader, &mut writer, num_blocks, cores, |index, block| {
        let mut plain = cipher.decrypt_block(index, block)?;
        if index == last_index && last_block_size != 0 {
            utils::truncate_block(&mut plain, last_block_size);
        }
        Ok(plain)
    })?;
    writer.flush()?;
    Ok(())
}

/// A completed job on its way back to the driver.
struct Done {
    index: u64,
    result: Result<Vec<u8>>,
}

/// Pump `num_blocks` blocks from `reader` through `transform` on a pool of
/// `cores` scoped threads, writing results to `writer` in index order.
///
/// The job channel is a rendezvous, so a block is only read once a worker
/// can take it; the completion channel holds at most the in-flight count.
/// Disconnection on either channel means a worker panicked, which the
/// transforms cannot do on their own - treated as a bug, not an error.
fn process_blocks<R, W, F>(
    reader: &mut BlockReader<R>,
    writer: &mut W,
    num_blocks: u64,
    cores: usize,
    transform: F,
) -> Result<()>
where
    R: Read,
    W: Write,
    F: Fn(u64, Vec<u8>) -> Result<Vec<u8>> + Sync,
{
    if num_blocks == 0 {
        return Ok(());
    }
    let cores = cores.max(1).min(num_blocks.min(usize::MAX as u64) as usize);

    thread::scope(|scope| -> Result<()> {
        let (job_tx, job_rx) = bounded::<(u64, Vec<u8>)>(0);
        let (done_tx, done_rx) = bounded::<Done>(cores);
        for _ in 0..cores {
            let jobs = job_rx.clone();
            let done = done_tx.clone();
            let transform = &transform;
            scope.spawn(move || {
                for (index, block) in jobs {
                    let result = transform(index, block);
                    if done.send(Done { index, result }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(done_tx);

        let mut next_submit = 0u64;
        let mut next_write = 0u64;
        let mut in_flight = 0usize;
        let mut completed: BTreeMap<u64, Vec<u8>> = BTreeMap::new();

        while in_flight < cores && next_submit < num_blocks {
            let block = read_block(reader)?;
            job_tx
                .send((next_submit, block))
                .expect("worker pool disconnected");
            next_submit += 1;
            in_flight += 1;
        }

        while in_flight > 0 {
            let done = done_rx.recv().expect("worker pool disconnected");
            in_flight -= 1;
            completed.insert(done.index, done.result?);
            while let Some(block) = completed.remove(&next_write) {
                writer.write_all(&block)?;
                next_write += 1;
            }
            if next_submit < num_blocks {
                let block = read_block(reader)?;
                job_tx
                    .send((next_submit, block))
                    .expect("worker pool disconnected");
                next_submit += 1;
                in_flight += 1;
            }
        }
        Ok(())
    })
}

fn read_block<R: Read>(reader: &mut BlockReader<R>) -> Result<Vec<u8>> {
    reader.next_block()?.ok_or_else(|| {
        Error::Io(io::Error::new(
            ErrorKind::UnexpectedEof,
            "input ended before the expected block count",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BLOCK_SIZE;
    use crate::crypto::kdf::{HashAlg, expand_subkey};
    use std::io::Cursor;

    #[test]
    fn short_passphrase_is_rejected() {
        assert!(matches!(
            BlockCipher::new(b"abcdef1"),
            Err(Error::InvalidKey(_))
        ));
        assert!(BlockCipher::new(b"abcdef12").is_ok());
    }

    #[test]
    fn block_round_trip() {
        let cipher = BlockCipher::new(b"password1").unwrap();
        let plain = expand_subkey(b"plaintext block", HashAlg::Blake2b);
        let encrypted = cipher.encrypt_block(9, plain.clone()).unwrap();
        assert_eq!(encrypted.len(), BLOCK_SIZE);
        assert_ne!(encrypted, plain);
        assert_eq!(cipher.decrypt_block(9, encrypted).unwrap(), plain);
    }

    #[test]
    fn block_encryption_depends_on_index() {
        let cipher = BlockCipher::new(b"password1").unwrap();
        let plain = vec![0u8; BLOCK_SIZE];
        let c0 = cipher.encrypt_block(0, plain.clone()).unwrap();
        let c1 = cipher.encrypt_block(1, plain).unwrap();
        assert_ne!(c0, c1);
    }

    #[test]
    fn short_final_block_is_zero_padded() {
        let cipher = BlockCipher::new(b"password1").unwrap();
        let encrypted = cipher.encrypt_block(0, b"hello".to_vec()).unwrap();
        let mut padded = b"hello".to_vec();
        padded.resize(BLOCK_SIZE, 0);
        assert_eq!(cipher.decrypt_block(0, encrypted).unwrap(), padded);
    }

    #[test]
    fn pool_preserves_block_order() {
        // Three blocks of distinct bytes through an identity transform;
        // whatever order workers finish in, the output must be the input.
        let mut data = Vec::with_capacity(3 * BLOCK_SIZE);
        for tag in [1u8, 2, 3] {
            data.extend(std::iter::repeat_n(tag, BLOCK_SIZE));
        }
        for cores in [1, 2, 4, 8] {
            let mut reader = BlockReader::new(Cursor::new(data.clone()));
            let mut out = Vec::new();
            process_blocks(&mut reader, &mut out, 3, cores, |_, block| Ok(block)).unwrap();
            assert_eq!(out, data);
        }
    }

    #[test]
    fn pool_surfaces_the_first_error() {
        let data = vec![0u8; 4 * BLOCK_SIZE];
        let mut reader = BlockReader::new(Cursor::new(data));
        let mut out = Vec::new();
        let result = process_blocks(&mut reader, &mut out, 4, 2, |index, block| {
            if index == 2 {
                Err(Error::Shape(0))
            } else {
                Ok(block)
            }
        });
        assert!(matches!(result, Err(Error::Shape(0))));
    }

    #[test]
    fn pool_rejects_truncated_input() {
        // Claim four blocks but supply one.
        let mut reader = BlockReader::new(Cursor::new(vec![0u8; BLOCK_SIZE]));
        let mut out = Vec::new();
        let result = process_blocks(&mut reader, &mut out, 4, 2, |_, block| Ok(block));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
