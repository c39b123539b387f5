//! byte-hashmap: a single-threaded, open-addressing hash map whose keys and
//! values are arbitrary byte strings.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an associative container for opaque binary payloads with
//!   content-based key equality and hash-flooding resistance.
//! - Layers:
//!   - `siphash` + `secret`: SipHash-1-3 keyed with a 128-bit secret. The
//!     default secret is read from the OS once per process; maps can also be
//!     built with a fixed secret for reproducible layouts.
//!   - `probe`: the perturbation probe sequence shared by lookup and insert.
//!   - `index_store`: slot array mapping probe positions to entry indices,
//!     stored at the narrowest of u8/u16/u32/u64 that fits the table.
//!   - `entry_store`: append-only records of (digest, key, value).
//!   - `ByteHashMap`: ties the stores together; owns a `Table` that is
//!     rebuilt and swapped on resize.
//!   - `MapRegistry`: handle-based create/set/get/destroy surface with
//!     generational handles.
//!
//! Constraints
//! - Single-threaded and synchronous; mutation requires `&mut`.
//! - Two thirds of the slots are usable; the remaining third bounds the
//!   expected probe length.
//! - Entries are never deleted. The DUMMY sentinel is reserved for that and
//!   is never written.
//! - Setting a key that is already present overwrites its value in place.
//!
//! Resize
//! - Happens only when a new key arrives with no usable slots left. The new
//!   table has at least `3 * len` slots, is allocated in full before any
//!   entry moves, and entries are re-probed from their stored digests.
//! - Allocation failures surface as `Error::AllocationFailure` and leave the
//!   map as it was.
//!
//! Entropy
//! - Failing to read the OS entropy source for the process secret is fatal:
//!   the failure is logged and the process aborts. `Secret::from_os` is the
//!   fallible alternative.

pub mod byte_hash_map;
mod byte_hash_map_proptest;
mod entry_store;
pub mod error;
pub mod index_store;
mod probe;
pub mod registry;
pub mod secret;
pub mod siphash;

// Public surface
pub use byte_hash_map::{
    ByteHashMap, ByteHashMapBuilder, Iter, MAX_SIZE_EXPONENT, MIN_SIZE_EXPONENT,
};
pub use error::{Error, Result};
pub use index_store::IndexWidth;
pub use registry::{MapHandle, MapRegistry};
pub use secret::{HashKey, Secret};
