//! **enigmatrix** - a parallel file encryption engine built on 1 MiB block
//! matrices.
//!
//! Files are processed as 1024×1024 byte matrices. A passphrase is hashed
//! once (SHA-512); the hash seeds a reproducible schedule of three
//! composable transforms - XOR, modular add/sub, row/column permutation -
//! and every block gets its own 1 MiB subkey derived from the passphrase
//! and the block index. Because subkeys are index-keyed, blocks are
//! encrypted by a worker pool in whatever order the workers finish, while
//! the output stays byte-identical to a serial run. The passphrase can
//! optionally be RSA-OAEP-wrapped into the file header for key exchange.
//!
//! The scheme is custom and unauthenticated: no MAC, no nonce. It is a
//! faithful engine for an existing container format, not a general-purpose
//! AEAD - treat it accordingly.
//!
//! # Modules
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`pipeline`]  | `encrypt_file` / `decrypt_file` - bounded-parallel ordered streaming |
//! | [`container`] | On-disk header (RSA flag, wrapped key, last-block size) |
//! | [`crypto`]    | Key derivation, schedule PRNG, matrix transform kernels |
//! | [`keys`]      | RSA key pairs: generate, detect, load, wrap/unwrap |
//! | [`utils`]     | Block I/O primitives and size math |
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//!
//! fn main() -> enigmatrix::Result<()> {
//!     let cores = enigmatrix::utils::default_core_count();
//!     enigmatrix::encrypt_file(
//!         Path::new("report.pdf"),
//!         Path::new("report.pdf.enc"),
//!         b"correct horse battery staple",
//!         None,
//!         cores,
//!     )?;
//!     enigmatrix::decrypt_file(
//!         Path::new("report.pdf.enc"),
//!         Path::new("report.pdf.out"),
//!         Some(b"correct horse battery staple"),
//!         None,
//!         cores,
//!     )
//! }
//! ```

pub mod container;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod pipeline;
pub mod utils;

pub use error::{Error, Result};
pub use keys::{KeyKind, RSA_KEY_SIZE, detect_rsa_key, generate_rsa_keypair};
pub use pipeline::{decrypt_file, encrypt_file};

/// Bytes per block: 1 MiB, one full matrix.
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Rows (and columns) of the block matrix.
pub const MATRIX_SIZE: usize = 1024;

/// Minimum passphrase length, in bytes.
pub const MIN_KEY_LEN: usize = 8;

/// Row swaps (and, independently, column swaps) per permutation pass.
pub const SWAP_COUNT: usize = 128;
