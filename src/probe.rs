//! Perturbation probe sequence.
//!
//! Starts at `hash & mask`; each step shifts the perturbation right by
//! [`PERTURB_SHIFT`] and moves to `(5 * pos + perturb + 1) & mask`. Once the
//! perturbation is exhausted the recurrence `5 * pos + 1` visits every slot
//! of a power-of-two table, so the sequence always reaches a free slot while
//! the load stays below one.

pub const PERTURB_SHIFT: u32 = 5;

#[derive(Clone, Debug)]
pub struct Probe {
    pos: usize,
    perturb: u64,
    mask: usize,
}

impl Probe {
    #[inline]
    pub fn new(hash: u64, mask: usize) -> Self {
        debug_assert!(mask.wrapping_add(1).is_power_of_two());
        Self {
            pos: (hash as usize) & mask,
            perturb: hash,
            mask,
        }
    }

    /// Current probe position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn advance(&mut self) {
        self.perturb >>= PERTURB_SHIFT;
        self.pos = self
            .pos
            .wrapping_mul(5)
            .wrapping_add(self.perturb as usize)
            .wrapping_add(1)
            & self.mask;
    }
}

impl Iterator for Probe {
    type Item = usize;

    /// Yields positions forever; callers stop on their own condition.
    #[inline]
    fn next(&mut self) -> Option<usize> {
        let pos = self.pos;
        self.advance();
        Some(pos)
    }
}
