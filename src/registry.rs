//! MapRegistry: create/set/get/destroy over stable map handles.
//!
//! Maps live in a generational slot map. A handle keeps naming the same map
//! across its resizes, and once the map is destroyed the handle never
//! resolves again, even if the slot is reused.

use crate::byte_hash_map::ByteHashMap;
use crate::error::{Error, Result};
use crate::secret::{HashKey, Secret};
use slotmap::{DefaultKey, SlotMap};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MapHandle(DefaultKey);

impl MapHandle {
    pub fn get<'a>(&self, registry: &'a MapRegistry, key: &[u8]) -> Result<Option<&'a [u8]>> {
        registry.get(*self, key)
    }

    pub fn set(&self, registry: &mut MapRegistry, key: &[u8], value: &[u8]) -> Result<()> {
        registry.set(*self, key, value)
    }
}

#[derive(Default)]
pub struct MapRegistry {
    maps: SlotMap<DefaultKey, ByteHashMap>,
    key: HashKey,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose maps all hash with `secret`.
    pub fn with_secret(secret: Secret) -> Self {
        Self {
            maps: SlotMap::with_key(),
            key: HashKey::Fixed(secret),
        }
    }

    /// Number of live maps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn create(&mut self, size_exponent: u32) -> Result<MapHandle> {
        let mut builder = ByteHashMap::builder().size_exponent(size_exponent);
        if let HashKey::Fixed(secret) = self.key {
            builder = builder.secret(secret);
        }
        let map = builder.build()?;
        Ok(MapHandle(self.maps.insert(map)))
    }

    pub fn set(&mut self, handle: MapHandle, key: &[u8], value: &[u8]) -> Result<()> {
        self.map_mut(handle)
            .ok_or(Error::InvalidHandle)?
            .set(key, value)
    }

    /// `Ok(None)` when the key is absent; `Err` only for a dead handle.
    pub fn get(&self, handle: MapHandle, key: &[u8]) -> Result<Option<&[u8]>> {
        Ok(self.map(handle).ok_or(Error::InvalidHandle)?.get(key))
    }

    /// Release the map and every buffer it owns. Returns false if the handle
    /// was already dead.
    pub fn destroy(&mut self, handle: MapHandle) -> bool {
        self.maps.remove(handle.0).is_some()
    }

    pub fn map(&self, handle: MapHandle) -> Option<&ByteHashMap> {
        self.maps.get(handle.0)
    }

    pub fn map_mut(&mut self, handle: MapHandle) -> Option<&mut ByteHashMap> {
        self.maps.get_mut(handle.0)
    }
}

impl core::fmt::Debug for MapRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.maps.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MapRegistry {
        MapRegistry::with_secret(Secret::new(11, 13))
    }

    #[test]
    fn create_set_get_destroy() {
        let mut r = registry();
        let h = r.create(3).unwrap();
        r.set(h, b"k", b"v").unwrap();
        assert_eq!(r.get(h, b"k").unwrap(), Some(&b"v"[..]));
        assert_eq!(r.get(h, b"missing").unwrap(), None);
        assert_eq!(r.len(), 1);
        assert!(r.destroy(h));
        assert!(r.is_empty());
    }

    #[test]
    fn destroyed_handle_is_rejected() {
        let mut r = registry();
        let h = r.create(3).unwrap();
        assert!(r.destroy(h));
        assert!(!r.destroy(h));
        assert_eq!(r.get(h, b"k"), Err(Error::InvalidHandle));
        assert_eq!(r.set(h, b"k", b"v"), Err(Error::InvalidHandle));
        assert!(r.map(h).is_none());
    }

    #[test]
    fn stale_handle_does_not_alias_new_map() {
        let mut r = registry();
        let old = r.create(3).unwrap();
        r.destroy(old);
        let new = r.create(3).unwrap();
        r.set(new, b"k", b"new").unwrap();
        assert_ne!(old, new);
        assert_eq!(r.get(old, b"k"), Err(Error::InvalidHandle));
        assert_eq!(r.get(new, b"k").unwrap(), Some(&b"new"[..]));
    }

    #[test]
    fn handle_survives_resize() {
        let mut r = registry();
        let h = r.create(3).unwrap();
        for i in 0u16..100 {
            h.set(&mut r, &i.to_le_bytes(), &i.to_be_bytes()).unwrap();
        }
        assert!(r.map(h).unwrap().capacity() > 8);
        for i in 0u16..100 {
            assert_eq!(
                h.get(&r, &i.to_le_bytes()).unwrap(),
                Some(&i.to_be_bytes()[..])
            );
        }
    }

    #[test]
    fn maps_are_independent() {
        let mut r = registry();
        let a = r.create(3).unwrap();
        let b = r.create(4).unwrap();
        r.set(a, b"k", b"a").unwrap();
        assert_eq!(r.get(b, b"k").unwrap(), None);
        assert_eq!(r.map(b).unwrap().capacity(), 16);
    }
}
