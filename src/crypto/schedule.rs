//! The per-file operation schedule.
//!
//! Derived once per encrypt or decrypt from the two seeds and shared
//! read-only with every worker. The draws happen on one thread, in one
//! fixed order; both the order and the PRNG itself are part of the cipher
//! contract (see [`mt19937`](super::mt19937)).

use crate::SWAP_COUNT;
use crate::crypto::mt19937::Mt19937;

/// Highest valid row/column index drawn for a swap.
const MAX_INDEX: u32 = crate::MATRIX_SIZE as u32 - 1;

/// One of the three primary block transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Permutation,
    Xor,
    Modular,
}

/// Direction of a modular pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Sub,
}

impl ModOp {
    /// The pass that undoes this one (same transpose flag).
    pub fn inverse(self) -> ModOp {
        match self {
            ModOp::Add => ModOp::Sub,
            ModOp::Sub => ModOp::Add,
        }
    }
}

/// Which axis a permutation pass touches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

/// Everything the kernels need to transform a block, fixed for the whole
/// file.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Order the three primary operations run in during encryption.
    pub op_order: [Op; 3],
    /// Row swap pairs, applied in list order.
    pub row_swaps: Vec<(usize, usize)>,
    /// Column swap pairs, applied in list order.
    pub col_swaps: Vec<(usize, usize)>,
    /// Which axis swaps first inside the permutation step.
    pub permutation_order: [Axis; 2],
    /// Order of the two modular passes.
    pub mod_order: [ModOp; 2],
}

impl Schedule {
    /// Derive the schedule from the two seeds.
    ///
    /// Draw order is load-bearing: op order from a PRNG seeded with
    /// `seed1`; then, from a fresh PRNG seeded with `seed2`, the row swap
    /// list, the column swap list, the modular-order shuffle, and last the
    /// permutation-order shuffle. Reordering any of these draws changes
    /// every ciphertext.
    pub fn derive(seed1: u128, seed2: u128) -> Self {
        let mut rng = Mt19937::new(seed1);
        let mut op_order = [Op::Permutation, Op::Xor, Op::Modular];
        rng.shuffle(&mut op_order);

        let mut rng = Mt19937::new(seed2);
        let row_swaps = draw_swaps(&mut rng);
        let col_swaps = draw_swaps(&mut rng);
        let mut mod_order = [ModOp::Add, ModOp::Sub];
        rng.shuffle(&mut mod_order);
        let mut permutation_order = [Axis::Row, Axis::Column];
        rng.shuffle(&mut permutation_order);

        Self {
            op_order,
            row_swaps,
            col_swaps,
            permutation_order,
            mod_order,
        }
    }
}

/// [`SWAP_COUNT`] index pairs; each pair is two independent inclusive
/// draws in `[0, 1023]`.
fn draw_swaps(rng: &mut Mt19937) -> Vec<(usize, usize)> {
    (0..SWAP_COUNT)
        .map(|_| {
            let i = rng.randint(MAX_INDEX) as usize;
            let j = rng.randint(MAX_INDEX) as usize;
            (i, j)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MATRIX_SIZE;

    #[test]
    fn derivation_is_deterministic() {
        let a = Schedule::derive(0x1234_5678, 0x9abc_def0);
        let b = Schedule::derive(0x1234_5678, 0x9abc_def0);
        assert_eq!(a.op_order, b.op_order);
        assert_eq!(a.row_swaps, b.row_swaps);
        assert_eq!(a.col_swaps, b.col_swaps);
        assert_eq!(a.permutation_order, b.permutation_order);
        assert_eq!(a.mod_order, b.mod_order);
    }

    #[test]
    fn orders_are_permutations() {
        let s = Schedule::derive(1, 2);
        for op in [Op::Permutation, Op::Xor, Op::Modular] {
            assert_eq!(s.op_order.iter().filter(|&&o| o == op).count(), 1);
        }
        assert_ne!(s.mod_order[0], s.mod_order[1]);
        assert_ne!(s.permutation_order[0], s.permutation_order[1]);
    }

    #[test]
    fn swap_lists_have_the_published_shape() {
        let s = Schedule::derive(7, 7);
        assert_eq!(s.row_swaps.len(), SWAP_COUNT);
        assert_eq!(s.col_swaps.len(), SWAP_COUNT);
        for &(i, j) in s.row_swaps.iter().chain(&s.col_swaps) {
            assert!(i < MATRIX_SIZE && j < MATRIX_SIZE);
        }
        // seed2 drives the swaps; the two lists coming out identical would
        // mean the PRNG state is not advancing.
        assert_ne!(s.row_swaps, s.col_swaps);
    }

    #[test]
    fn seeds_select_different_schedules() {
        let a = Schedule::derive(1, 2);
        let b = Schedule::derive(1, 3);
        assert_eq!(a.op_order, b.op_order);
        assert_ne!(a.row_swaps, b.row_swaps);

        let c = Schedule::derive(2, 2);
        assert_eq!(a.row_swaps, c.row_swaps);
    }

    #[test]
    fn mod_op_inverse_flips() {
        assert_eq!(ModOp::Add.inverse(), ModOp::Sub);
        assert_eq!(ModOp::Sub.inverse(), ModOp::Add);
    }
}
