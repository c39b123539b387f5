//! Index Store: probe position -> entry index, EMPTY or DUMMY.
//!
//! The element width is the narrowest of u8/u16/u32/u64 that can address
//! every entry of a table with `2^size_exponent` slots. Each width reserves
//! its two largest values as sentinels: `MAX` is EMPTY, `MAX - 1` is DUMMY.

use crate::error::{Error, Result};

/// Decoded contents of one index slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    Empty,
    /// Reserved for deletion support; never written by current operations.
    Dummy,
    Live(usize),
}

pub trait IndexWord: Copy + Eq {
    const EMPTY: Self;
    const DUMMY: Self;
    fn from_index(ix: usize) -> Self;
    fn to_index(self) -> usize;

    #[inline]
    fn decode(self) -> Slot {
        if self == Self::EMPTY {
            Slot::Empty
        } else if self == Self::DUMMY {
            Slot::Dummy
        } else {
            Slot::Live(self.to_index())
        }
    }
}

macro_rules! impl_index_word {
    ($($t:ty),*) => {$(
        impl IndexWord for $t {
            const EMPTY: Self = <$t>::MAX;
            const DUMMY: Self = <$t>::MAX - 1;

            #[inline]
            fn from_index(ix: usize) -> Self {
                debug_assert!((ix as u64) < Self::DUMMY as u64);
                ix as $t
            }

            #[inline]
            fn to_index(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_index_word!(u8, u16, u32, u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndexWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IndexWidth {
    pub fn for_size_exponent(size_exponent: u32) -> Self {
        match size_exponent {
            0..=7 => IndexWidth::W8,
            8..=15 => IndexWidth::W16,
            16..=31 => IndexWidth::W32,
            _ => IndexWidth::W64,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IndexWidth::W8 => 8,
            IndexWidth::W16 => 16,
            IndexWidth::W32 => 32,
            IndexWidth::W64 => 64,
        }
    }

    /// log2 of the index array's size in bytes for a table of the given
    /// size exponent.
    pub fn log2_bytes(self, size_exponent: u32) -> u32 {
        size_exponent + (self.bits() / 8).trailing_zeros()
    }
}

pub enum IndexStore {
    W8(Box<[u8]>),
    W16(Box<[u16]>),
    W32(Box<[u32]>),
    W64(Box<[u64]>),
}

// Runs `$body` with `$s` bound to the backing slice, whatever its width.
macro_rules! with_slots {
    ($store:expr, $s:ident => $body:expr) => {
        match $store {
            IndexStore::W8($s) => $body,
            IndexStore::W16($s) => $body,
            IndexStore::W32($s) => $body,
            IndexStore::W64($s) => $body,
        }
    };
}

fn empty_slots<W: IndexWord>(len: usize) -> Result<Box<[W]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::alloc("index"))?;
    v.resize(len, W::EMPTY);
    Ok(v.into_boxed_slice())
}

impl IndexStore {
    /// All-EMPTY store with `2^size_exponent` slots.
    pub fn new(size_exponent: u32) -> Result<Self> {
        let len = 1usize
            .checked_shl(size_exponent)
            .ok_or(Error::CapacityOverflow {
                exponent: size_exponent,
            })?;
        Ok(match IndexWidth::for_size_exponent(size_exponent) {
            IndexWidth::W8 => IndexStore::W8(empty_slots(len)?),
            IndexWidth::W16 => IndexStore::W16(empty_slots(len)?),
            IndexWidth::W32 => IndexStore::W32(empty_slots(len)?),
            IndexWidth::W64 => IndexStore::W64(empty_slots(len)?),
        })
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            IndexStore::W8(_) => IndexWidth::W8,
            IndexStore::W16(_) => IndexWidth::W16,
            IndexStore::W32(_) => IndexWidth::W32,
            IndexStore::W64(_) => IndexWidth::W64,
        }
    }

    pub fn len(&self) -> usize {
        with_slots!(self, s => s.len())
    }

    #[inline]
    pub fn get(&self, pos: usize) -> Slot {
        with_slots!(self, s => s[pos].decode())
    }

    /// Point slot `pos` at entry `ix`.
    #[inline]
    pub fn set(&mut self, pos: usize, ix: usize) {
        with_slots!(self, s => s[pos] = IndexWord::from_index(ix))
    }
}

impl core::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexStore")
            .field("width", &self.width())
            .field("len", &self.len())
            .finish()
    }
}
