//! ByteHashMap: open-addressing map over byte keys and byte values.

use crate::entry_store::{Entry, EntryStore};
use crate::error::{Error, Result};
use crate::index_store::{IndexStore, IndexWidth, Slot};
use crate::probe::Probe;
use crate::secret::{HashKey, Secret};
use crate::siphash::hash_bytes;
use core::fmt;

/// Smallest table: 8 slots, 5 usable.
pub const MIN_SIZE_EXPONENT: u32 = 3;
/// Largest table whose slot count and doubled capacity still fit a `usize`.
pub const MAX_SIZE_EXPONENT: u32 = usize::BITS - 2;

/// Two thirds of the slots may hold entries; the rest is probe headroom.
#[inline]
const fn usable_fraction(capacity: usize) -> usize {
    (capacity << 1) / 3
}

/// Smallest exponent whose table has at least `3 * nentries` slots.
fn resize_exponent(nentries: usize) -> Result<u32> {
    let min_slots = nentries.checked_mul(3).ok_or(Error::CapacityOverflow {
        exponent: usize::BITS,
    })?;
    let mut e = MIN_SIZE_EXPONENT;
    while (1usize << e) < min_slots {
        e += 1;
        if e > MAX_SIZE_EXPONENT {
            return Err(Error::CapacityOverflow { exponent: e });
        }
    }
    Ok(e)
}

/// Smallest exponent whose table can take `entries` inserts without resizing.
fn exponent_for_capacity(entries: usize) -> Result<u32> {
    let mut e = MIN_SIZE_EXPONENT;
    while usable_fraction(1usize << e) < entries {
        e += 1;
        if e > MAX_SIZE_EXPONENT {
            return Err(Error::CapacityOverflow { exponent: e });
        }
    }
    Ok(e)
}

/// Backing storage of one table generation. Replaced wholesale on resize.
#[derive(Debug)]
pub(crate) struct Table {
    size_exponent: u32,
    usable: usize,
    index: IndexStore,
    entries: EntryStore,
}

impl Table {
    pub(crate) fn new(size_exponent: u32) -> Result<Self> {
        if size_exponent > MAX_SIZE_EXPONENT {
            return Err(Error::CapacityOverflow {
                exponent: size_exponent,
            });
        }
        let usable = usable_fraction(1usize << size_exponent);
        let index = IndexStore::new(size_exponent)?;
        let entries = EntryStore::with_capacity(usable)?;
        let width = index.width();
        tracing::trace!(
            size_exponent,
            usable,
            width_bits = width.bits(),
            index_bytes_log2 = width.log2_bytes(size_exponent),
            "allocated table"
        );
        Ok(Self {
            size_exponent,
            usable,
            index,
            entries,
        })
    }

    #[inline]
    pub(crate) fn mask(&self) -> usize {
        (1usize << self.size_exponent) - 1
    }

    /// Entry index holding `key`, stopping at the first EMPTY slot.
    pub(crate) fn lookup(&self, hash: u64, key: &[u8]) -> Option<usize> {
        let mut probe = Probe::new(hash, self.mask());
        loop {
            match self.index.get(probe.pos()) {
                Slot::Empty => return None,
                Slot::Live(ix) if self.entries.get(ix).matches(hash, key) => return Some(ix),
                Slot::Live(_) | Slot::Dummy => probe.advance(),
            }
        }
    }

    /// First probe position not holding a live entry.
    pub(crate) fn find_empty_slot(&self, hash: u64) -> usize {
        let mut probe = Probe::new(hash, self.mask());
        while let Slot::Live(_) = self.index.get(probe.pos()) {
            probe.advance();
        }
        probe.pos()
    }

    /// Record a new entry. The caller guarantees `usable > 0` and that the
    /// key is not already present.
    pub(crate) fn push(&mut self, entry: Entry) {
        debug_assert!(self.usable > 0);
        let pos = self.find_empty_slot(entry.hash());
        let ix = self.entries.push(entry);
        self.index.set(pos, ix);
        self.usable -= 1;
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, pos: usize) -> Slot {
        self.index.get(pos)
    }
}

/// Open-addressing hash map from byte strings to byte strings.
///
/// Keys and values are deep-copied on insert and owned by the map. Lookups
/// compare keys by content. Entries are never removed; when the usable slots
/// run out the map grows to the next table large enough to hold three times
/// its entry count.
pub struct ByteHashMap {
    key: HashKey,
    table: Table,
}

impl ByteHashMap {
    /// Map with `2^size_exponent` slots hashed with the process secret.
    /// Exponents below [`MIN_SIZE_EXPONENT`] are raised to it.
    pub fn new(size_exponent: u32) -> Result<Self> {
        Self::builder().size_exponent(size_exponent).build()
    }

    pub fn with_secret(size_exponent: u32, secret: Secret) -> Result<Self> {
        Self::builder()
            .size_exponent(size_exponent)
            .secret(secret)
            .build()
    }

    /// Map sized to take `entries` inserts before its first resize.
    pub fn with_capacity(entries: usize) -> Result<Self> {
        Self::builder().capacity(entries).build()
    }

    pub fn builder() -> ByteHashMapBuilder {
        ByteHashMapBuilder::default()
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> u64 {
        hash_bytes(&self.key, bytes)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.entries.is_empty()
    }

    /// Slot count of the current table.
    pub fn capacity(&self) -> usize {
        1usize << self.table.size_exponent
    }

    /// Inserts of new keys left before the next resize.
    pub fn usable(&self) -> usize {
        self.table.usable
    }

    pub fn size_exponent(&self) -> u32 {
        self.table.size_exponent
    }

    pub fn index_width(&self) -> IndexWidth {
        self.table.index.width()
    }

    /// Insert `key -> value`, or overwrite the value if `key` is present.
    ///
    /// On error the map is unchanged.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let hash = self.hash(key);
        if let Some(ix) = self.table.lookup(hash, key) {
            return self.table.entries.get_mut(ix).replace_value(value);
        }

        let entry = Entry::new(hash, key, value)?;
        if self.table.usable == 0 {
            self.resize()?;
        }
        self.table.push(entry);
        Ok(())
    }

    /// Borrow the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let hash = self.hash(key);
        self.table
            .lookup(hash, key)
            .map(|ix| self.table.entries.get(ix).value())
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        let hash = self.hash(key);
        self.table.lookup(hash, key).is_some()
    }

    /// Iterate over `(key, value)` pairs. No particular order is promised.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            it: self.table.entries.iter(),
        }
    }

    /// Move every entry into a freshly allocated larger table, then swap it in.
    ///
    /// Both stores of the new table are allocated before anything moves, so
    /// an allocation failure leaves the current table untouched.
    fn resize(&mut self) -> Result<()> {
        let nentries = self.len();
        let old_exponent = self.table.size_exponent;
        let mut fresh = Table::new(resize_exponent(nentries)?)?;
        debug_assert!(fresh.usable > nentries);

        for entry in self.table.entries.drain() {
            fresh.push(entry);
        }
        tracing::debug!(
            from = old_exponent,
            to = fresh.size_exponent,
            entries = nentries,
            "resized byte hash map"
        );
        self.table = fresh;
        Ok(())
    }
}

impl fmt::Debug for ByteHashMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteHashMap")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("usable", &self.usable())
            .field("index_width", &self.index_width())
            .finish()
    }
}

impl<'a> IntoIterator for &'a ByteHashMap {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over `(key, value)` pairs of a [`ByteHashMap`].
pub struct Iter<'a> {
    it: core::slice::Iter<'a, Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.key(), e.value()))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Configuration for a [`ByteHashMap`].
///
/// The table gets the larger of the requested size exponent and the one
/// needed for `capacity` inserts; both default to the minimum table.
#[derive(Clone, Debug, Default)]
pub struct ByteHashMapBuilder {
    size_exponent: Option<u32>,
    capacity: Option<usize>,
    key: HashKey,
}

impl ByteHashMapBuilder {
    pub fn size_exponent(mut self, size_exponent: u32) -> Self {
        self.size_exponent = Some(size_exponent);
        self
    }

    /// Pre-size for this many entries so inserts up to it never resize.
    pub fn capacity(mut self, entries: usize) -> Self {
        self.capacity = Some(entries);
        self
    }

    /// Hash with a fixed secret instead of the process-wide one.
    pub fn secret(mut self, secret: Secret) -> Self {
        self.key = HashKey::Fixed(secret);
        self
    }

    pub fn build(self) -> Result<ByteHashMap> {
        let requested = self
            .size_exponent
            .unwrap_or(MIN_SIZE_EXPONENT)
            .max(MIN_SIZE_EXPONENT);
        let needed = match self.capacity {
            Some(entries) => exponent_for_capacity(entries)?,
            None => MIN_SIZE_EXPONENT,
        };
        Ok(ByteHashMap {
            key: self.key,
            table: Table::new(requested.max(needed))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: Secret = Secret::new(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210);

    fn map(e: u32) -> ByteHashMap {
        ByteHashMap::with_secret(e, SECRET).unwrap()
    }

    #[test]
    fn minimum_table_has_five_usable_slots() {
        let m = map(MIN_SIZE_EXPONENT);
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.usable(), 5);
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
        assert_eq!(m.index_width(), IndexWidth::W8);
    }

    #[test]
    fn small_exponents_are_raised_to_minimum() {
        for e in 0..MIN_SIZE_EXPONENT {
            assert_eq!(map(e).size_exponent(), MIN_SIZE_EXPONENT);
        }
    }

    #[test]
    fn usable_is_two_thirds_of_capacity() {
        for e in MIN_SIZE_EXPONENT..12 {
            let m = map(e);
            assert_eq!(m.usable(), (2 * m.capacity()) / 3, "exponent {}", e);
        }
    }

    #[test]
    fn exponent_beyond_largest_width_overflows() {
        assert_eq!(
            ByteHashMap::with_secret(MAX_SIZE_EXPONENT + 1, SECRET).unwrap_err(),
            Error::CapacityOverflow {
                exponent: MAX_SIZE_EXPONENT + 1
            }
        );
    }

    #[test]
    fn set_get_roundtrip() {
        let mut m = map(3);
        m.set(b"alpha", b"1").unwrap();
        m.set(b"beta", &[0, 159, 146, 150]).unwrap();
        assert_eq!(m.get(b"alpha"), Some(&b"1"[..]));
        assert_eq!(m.get(b"beta"), Some(&[0u8, 159, 146, 150][..]));
        assert_eq!(m.get(b"gamma"), None);
        assert_eq!(m.len(), 2);
        assert_eq!(m.usable(), 3);
    }

    #[test]
    fn empty_key_and_empty_value() {
        let mut m = map(3);
        m.set(b"", b"empty-key").unwrap();
        m.set(b"empty-value", b"").unwrap();
        assert_eq!(m.get(b""), Some(&b"empty-key"[..]));
        assert_eq!(m.get(b"empty-value"), Some(&b""[..]));
    }

    #[test]
    fn set_existing_key_overwrites_in_place() {
        let mut m = map(3);
        m.set(b"a", &1i32.to_le_bytes()).unwrap();
        m.set(b"b", &2i32.to_le_bytes()).unwrap();
        m.set(b"a", &3i32.to_le_bytes()).unwrap();
        assert_eq!(m.get(b"a"), Some(&3i32.to_le_bytes()[..]));
        assert_eq!(m.get(b"b"), Some(&2i32.to_le_bytes()[..]));
        assert_eq!(m.len(), 2);
        assert_eq!(m.usable(), 3);
    }

    #[test]
    fn overwrite_does_not_consume_usable_or_resize() {
        let mut m = map(3);
        for i in 0u8..5 {
            m.set(&[i], b"x").unwrap();
        }
        assert_eq!(m.usable(), 0);
        for _ in 0..10 {
            m.set(&[0], b"y").unwrap();
        }
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.get(&[0]), Some(&b"y"[..]));
    }

    #[test]
    fn keys_sharing_initial_position_resolve_separately() {
        let mut m = map(3);
        let mask = m.capacity() - 1;
        // Nine keys over eight slots: at least two start at the same position.
        let keys: Vec<Vec<u8>> = (0u8..9).map(|i| vec![b'k', i]).collect();
        let (a, b) = {
            let mut found = None;
            'outer: for i in 0..keys.len() {
                for j in i + 1..keys.len() {
                    let hi = hash_bytes(&HashKey::Fixed(SECRET), &keys[i]) as usize & mask;
                    let hj = hash_bytes(&HashKey::Fixed(SECRET), &keys[j]) as usize & mask;
                    if hi == hj {
                        found = Some((i, j));
                        break 'outer;
                    }
                }
            }
            found.expect("pigeonhole guarantees a shared start")
        };
        m.set(&keys[a], b"first").unwrap();
        m.set(&keys[b], b"second").unwrap();
        assert_eq!(m.get(&keys[a]), Some(&b"first"[..]));
        assert_eq!(m.get(&keys[b]), Some(&b"second"[..]));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn exhausting_usable_resizes_once() {
        let mut m = map(3);
        for i in 0u8..5 {
            m.set(&[i], &[i]).unwrap();
            assert_eq!(m.capacity(), 8);
        }
        assert_eq!(m.usable(), 0);

        m.set(&[5], &[5]).unwrap();
        // 3 * 5 = 15 slots needed -> 16.
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.usable(), 10 - 6);
        assert_eq!(m.index_width(), IndexWidth::W8);
        for i in 0u8..6 {
            assert_eq!(m.get(&[i]), Some(&[i][..]));
        }
    }

    #[test]
    fn each_threshold_crossing_resizes_exactly_once() {
        let mut m = map(3);
        let mut resizes = 0;
        let mut capacity = m.capacity();
        for i in 0u32..2000 {
            let had_room = m.usable() > 0;
            m.set(&i.to_le_bytes(), &i.to_be_bytes()).unwrap();
            if m.capacity() != capacity {
                assert!(!had_room, "resized with usable slots left at insert {}", i);
                assert!(m.usable() > 0, "no headroom after resize at insert {}", i);
                resizes += 1;
                capacity = m.capacity();
            } else {
                assert!(had_room);
            }
            assert!(m.usable() + m.len() == usable_fraction(m.capacity()));
        }
        // Thresholds at 6, 11, 22, 43, 86, 171, 342, 683 and 1366 inserts.
        assert_eq!(resizes, 9);
        assert_eq!(m.capacity(), 4096);
        for i in 0u32..2000 {
            assert_eq!(m.get(&i.to_le_bytes()), Some(&i.to_be_bytes()[..]));
        }
    }

    #[test]
    fn growth_switches_index_width() {
        let mut m = map(7);
        assert_eq!(m.index_width(), IndexWidth::W8);
        for i in 0u32..200 {
            m.set(&i.to_le_bytes(), b"v").unwrap();
        }
        assert_eq!(m.index_width(), IndexWidth::W16);
        assert!(m.size_exponent() >= 8);
        for i in 0u32..200 {
            assert!(m.contains_key(&i.to_le_bytes()));
        }
    }

    #[test]
    fn with_capacity_avoids_resize() {
        let mut m = ByteHashMap::builder()
            .capacity(100)
            .secret(SECRET)
            .build()
            .unwrap();
        let capacity = m.capacity();
        assert!(m.usable() >= 100);
        for i in 0u32..100 {
            m.set(&i.to_le_bytes(), b"").unwrap();
        }
        assert_eq!(m.capacity(), capacity);
    }

    #[test]
    fn builder_takes_larger_of_exponent_and_capacity() {
        let m = ByteHashMap::builder()
            .size_exponent(10)
            .capacity(5)
            .secret(SECRET)
            .build()
            .unwrap();
        assert_eq!(m.size_exponent(), 10);

        let m = ByteHashMap::builder()
            .size_exponent(3)
            .capacity(6)
            .secret(SECRET)
            .build()
            .unwrap();
        assert_eq!(m.size_exponent(), 4);
    }

    #[test]
    fn resize_exponent_restores_headroom() {
        assert_eq!(resize_exponent(0).unwrap(), MIN_SIZE_EXPONENT);
        assert_eq!(resize_exponent(5).unwrap(), 4);
        assert_eq!(resize_exponent(10).unwrap(), 5);
        assert_eq!(resize_exponent(11).unwrap(), 6);
        for n in [5usize, 10, 21, 42, 85, 170, 1365] {
            let e = resize_exponent(n).unwrap();
            assert!(usable_fraction(1 << e) > n);
        }
    }

    #[test]
    fn resize_exponent_overflow_is_reported() {
        assert!(matches!(
            resize_exponent(usize::MAX),
            Err(Error::CapacityOverflow { .. })
        ));
        assert!(matches!(
            resize_exponent(usize::MAX / 3),
            Err(Error::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn iter_visits_every_entry_once() {
        let mut m = map(3);
        for i in 0u8..20 {
            m.set(&[i], &[i, i]).unwrap();
        }
        let mut seen: Vec<u8> = m
            .iter()
            .map(|(k, v)| {
                assert_eq!(v, &[k[0], k[0]]);
                k[0]
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0u8..20).collect::<Vec<_>>());
        assert_eq!((&m).into_iter().len(), 20);
    }

    #[test]
    fn process_secret_map_works() {
        let mut m = ByteHashMap::new(3).unwrap();
        m.set(b"k", b"v").unwrap();
        assert_eq!(m.get(b"k"), Some(&b"v"[..]));
    }

    #[test]
    fn debug_reports_shape() {
        let m = map(3);
        let s = format!("{:?}", m);
        assert!(s.contains("capacity: 8"));
        assert!(s.contains("usable: 5"));
    }
}
