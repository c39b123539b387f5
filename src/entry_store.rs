//! Entry Store: append-only records of (digest, key bytes, value bytes).

use crate::error::{Error, Result};

/// Deep copy of `bytes` into a fresh exclusively owned buffer.
fn copy_bytes(bytes: &[u8], what: &'static str) -> Result<Box<[u8]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(bytes.len())
        .map_err(|_| Error::alloc(what))?;
    v.extend_from_slice(bytes);
    Ok(v.into_boxed_slice())
}

#[derive(Debug)]
pub struct Entry {
    hash: u64,
    key: Box<[u8]>,
    value: Box<[u8]>,
}

impl Entry {
    pub fn new(hash: u64, key: &[u8], value: &[u8]) -> Result<Self> {
        Ok(Self {
            hash,
            key: copy_bytes(key, "key")?,
            value: copy_bytes(value, "value")?,
        })
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Same digest, same length, same bytes.
    #[inline]
    pub fn matches(&self, hash: u64, key: &[u8]) -> bool {
        self.hash == hash && *self.key == *key
    }

    /// Swap in a copy of `value`; the old buffer is kept if the copy fails.
    pub fn replace_value(&mut self, value: &[u8]) -> Result<()> {
        self.value = copy_bytes(value, "value")?;
        Ok(())
    }
}

/// Entries in insertion order. Capacity is reserved up front for the
/// table's usable slots, so pushes never reallocate.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|_| Error::alloc("entry"))?;
        Ok(Self { entries })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, ix: usize) -> &Entry {
        &self.entries[ix]
    }

    #[inline]
    pub fn get_mut(&mut self, ix: usize) -> &mut Entry {
        &mut self.entries[ix]
    }

    /// Append and return the new entry's index.
    pub fn push(&mut self, entry: Entry) -> usize {
        debug_assert!(self.entries.len() < self.entries.capacity());
        let ix = self.entries.len();
        self.entries.push(entry);
        ix
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Move every entry out, leaving the store empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Entry> {
        self.entries.drain(..)
    }
}
