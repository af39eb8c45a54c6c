//! The block cipher core: key derivation, the reproducible schedule PRNG,
//! and the matrix transform kernels.
//!
//! Everything in this layer is deterministic. Given the same passphrase and
//! block index, every function returns the same bytes on every platform -
//! that property is what lets the pipeline hand blocks to workers in any
//! order and still produce output identical to a serial run.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`kdf`] | SHA-512 primary hash, seed extraction, per-block 1 MiB subkey derivation |
//! | [`mt19937`] | Bit-exact 32-bit Mersenne Twister driving the schedule draws |
//! | [`schedule`] | Per-file operation ordering, swap lists, modular order |
//! | [`matrix`] | 1024×1024 byte matrix view and the XOR / modular / permutation kernels |
//!
//! The scheme is a custom construction, not a certified AEAD: there is no
//! authentication tag and no nonce. It is implemented here exactly as
//! designed; do not swap pieces of it for standard primitives.

pub mod kdf;
pub mod matrix;
pub mod mt19937;
pub mod schedule;
