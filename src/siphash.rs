//! SipHash-1-3 over raw byte buffers.
//!
//! One compression round per 8-byte word and three finalization rounds.
//! Input words are read little-endian; the final block carries the input
//! length in its top byte.

use crate::secret::{HashKey, Secret};

const INIT: [u64; 4] = [
    0x736f_6d65_7073_6575,
    0x646f_7261_6e64_6f6d,
    0x6c79_6765_6e65_7261,
    0x7465_6462_7974_6573,
];

#[inline(always)]
fn half_round(a: &mut u64, b: &mut u64, c: &mut u64, d: &mut u64, s: u32, t: u32) {
    *a = a.wrapping_add(*b);
    *c = c.wrapping_add(*d);
    *b = b.rotate_left(s) ^ *a;
    *d = d.rotate_left(t) ^ *c;
    *a = a.rotate_left(32);
}

#[inline(always)]
fn sip_round(v: &mut [u64; 4]) {
    let [v0, v1, v2, v3] = v;
    half_round(v0, v1, v2, v3, 13, 16);
    half_round(v2, v1, v0, v3, 17, 21);
}

/// Raw SipHash-1-3 of `data` under `secret`. Empty input is hashed like any
/// other; see [`hash_bytes`] for the map's convention.
pub fn siphash13(secret: Secret, data: &[u8]) -> u64 {
    let (k0, k1) = secret.keys();
    let mut v = [k0 ^ INIT[0], k1 ^ INIT[1], k0 ^ INIT[2], k1 ^ INIT[3]];

    let mut words = data.chunks_exact(8);
    for word in &mut words {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(word);
        let m = u64::from_le_bytes(buf);
        v[3] ^= m;
        sip_round(&mut v);
        v[0] ^= m;
    }

    let mut tail = [0u8; 8];
    let rest = words.remainder();
    tail[..rest.len()].copy_from_slice(rest);
    let b = ((data.len() as u64) << 56) | u64::from_le_bytes(tail);

    v[3] ^= b;
    sip_round(&mut v);
    v[0] ^= b;

    v[2] ^= 0xff;
    for _ in 0..3 {
        sip_round(&mut v);
    }

    v[0] ^ v[1] ^ v[2] ^ v[3]
}

/// Digest used by the map. Zero-length buffers hash to 0 and never touch
/// the secret, so an empty key does not force the process secret to load.
#[inline]
pub fn hash_bytes(key: &HashKey, data: &[u8]) -> u64 {
    if data.is_empty() {
        return 0;
    }
    siphash13(key.secret(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use siphasher::sip::SipHasher13;
    use std::hash::Hasher;

    fn reference(secret: Secret, data: &[u8]) -> u64 {
        let (k0, k1) = secret.keys();
        let mut h = SipHasher13::new_with_keys(k0, k1);
        h.write(data);
        h.finish()
    }

    #[test]
    fn matches_reference_for_every_tail_length() {
        let secret = Secret::new(0x0706_0504_0302_0100, 0x0f0e_0d0c_0b0a_0908);
        let data: Vec<u8> = (0u8..64).collect();
        for len in 0..data.len() {
            assert_eq!(
                siphash13(secret, &data[..len]),
                reference(secret, &data[..len]),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn empty_input_hashes_to_zero_for_map() {
        assert_eq!(hash_bytes(&HashKey::Fixed(Secret::new(1, 2)), b""), 0);
        assert_eq!(hash_bytes(&HashKey::Process, b""), 0);
    }

    #[test]
    fn same_input_same_digest_within_process() {
        let a = hash_bytes(&HashKey::Process, b"repeatable");
        let b = hash_bytes(&HashKey::Process, b"repeatable");
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_digest() {
        let a = siphash13(Secret::new(1, 2), b"payload");
        let b = siphash13(Secret::new(2, 1), b"payload");
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_matches_siphasher(k0 in any::<u64>(), k1 in any::<u64>(),
                                  data in proptest::collection::vec(any::<u8>(), 0..100)) {
            let secret = Secret::new(k0, k1);
            prop_assert_eq!(siphash13(secret, &data), reference(secret, &data));
        }
    }
}
