//! The 1024×1024 byte matrix view of a block and the three transform
//! kernels.
//!
//! A block and its subkey are both exactly [`BLOCK_SIZE`] bytes, held
//! row-major. All kernels work in place on the block; the subkey is never
//! modified.
//!
//! ## Invertibility
//!
//! * XOR is its own inverse.
//! * A modular pass is undone by the opposite operator with the **same**
//!   transpose flag. The transpose applies to the subkey only - transposing
//!   the block instead breaks invertibility, because the two modular passes
//!   would then operate on moved bytes.
//! * A swap is an involution, so a permutation is undone by replaying the
//!   swap lists in reverse order, second-applied axis first.

use crate::crypto::schedule::{Axis, ModOp, Schedule};
use crate::{BLOCK_SIZE, Error, MATRIX_SIZE, Result};

/// A [`BLOCK_SIZE`] byte block viewed as a row-major 1024×1024 matrix.
pub struct Matrix {
    data: Vec<u8>,
}

impl Matrix {
    /// Wrap a block. Returns [`Error::Shape`] unless it is exactly
    /// [`BLOCK_SIZE`] bytes.
    pub fn from_block(block: Vec<u8>) -> Result<Self> {
        if block.len() != BLOCK_SIZE {
            return Err(Error::Shape(block.len()));
        }
        Ok(Self { data: block })
    }

    /// Unwrap back into the block bytes.
    pub fn into_block(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> u8 {
        self.data[row * MATRIX_SIZE + col]
    }

    /// Exchange rows `i` and `j`. `i == j` is a no-op.
    pub fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (lo, hi) = (i.min(j), i.max(j));
        let (head, tail) = self.data.split_at_mut(hi * MATRIX_SIZE);
        head[lo * MATRIX_SIZE..(lo + 1) * MATRIX_SIZE].swap_with_slice(&mut tail[..MATRIX_SIZE]);
    }

    /// Exchange columns `i` and `j`. `i == j` is a no-op.
    pub fn swap_cols(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for row in 0..MATRIX_SIZE {
            self.data.swap(row * MATRIX_SIZE + i, row * MATRIX_SIZE + j);
        }
    }
}

/// XOR the subkey into the block elementwise. Self-inverse.
pub fn apply_xor(block: &mut Matrix, subkey: &Matrix) {
    for (b, k) in block.data.iter_mut().zip(&subkey.data) {
        *b ^= k;
    }
}

/// One modular pass: `block <- block ± subkey' (mod 256)`, where the
/// subkey is transposed first when `transpose` is set.
pub fn apply_modular(block: &mut Matrix, subkey: &Matrix, op: ModOp, transpose: bool) {
    for row in 0..MATRIX_SIZE {
        for col in 0..MATRIX_SIZE {
            let k = if transpose {
                subkey.at(col, row)
            } else {
                subkey.at(row, col)
            };
            let b = &mut block.data[row * MATRIX_SIZE + col];
            *b = match op {
                ModOp::Add => b.wrapping_add(k),
                ModOp::Sub => b.wrapping_sub(k),
            };
        }
    }
}

/// The forward permutation step: both swap lists in list order, first axis
/// chosen by `permutation_order[0]`.
pub fn apply_permutation(block: &mut Matrix, schedule: &Schedule) {
    match schedule.permutation_order[0] {
        Axis::Row => {
            for &(i, j) in &schedule.row_swaps {
                block.swap_rows(i, j);
            }
            for &(i, j) in &schedule.col_swaps {
                block.swap_cols(i, j);
            }
        }
        Axis::Column => {
            for &(i, j) in &schedule.col_swaps {
                block.swap_cols(i, j);
            }
            for &(i, j) in &schedule.row_swaps {
                block.swap_rows(i, j);
            }
        }
    }
}

/// Undo [`apply_permutation`]: the second-applied axis replays its list in
/// reverse first, then the first-applied axis in reverse.
pub fn reverse_permutation(block: &mut Matrix, schedule: &Schedule) {
    match schedule.permutation_order[0] {
        Axis::Row => {
            for &(i, j) in schedule.col_swaps.iter().rev() {
                block.swap_cols(i, j);
            }
            for &(i, j) in schedule.row_swaps.iter().rev() {
                block.swap_rows(i, j);
            }
        }
        Axis::Column => {
            for &(i, j) in schedule.row_swaps.iter().rev() {
                block.swap_rows(i, j);
            }
            for &(i, j) in schedule.col_swaps.iter().rev() {
                block.swap_cols(i, j);
            }
        }
    }
}
