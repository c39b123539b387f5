//! SipHash keys: fixed, drawn once from the OS, or the lazily initialized
//! process-wide secret shared by every map that does not bring its own.

use crate::error::{Error, Result};
use core::fmt;
use once_cell::sync::OnceCell;

static PROCESS_SECRET: OnceCell<Secret> = OnceCell::new();

/// 128-bit SipHash key, stored as two 64-bit words.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Secret {
    k0: u64,
    k1: u64,
}

impl Secret {
    pub const fn new(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }

    /// Interpret 16 bytes as two little-endian key words.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut k0 = [0u8; 8];
        let mut k1 = [0u8; 8];
        k0.copy_from_slice(&bytes[..8]);
        k1.copy_from_slice(&bytes[8..]);
        Self::new(u64::from_le_bytes(k0), u64::from_le_bytes(k1))
    }

    /// Draw a fresh secret from the OS entropy source.
    pub fn from_os() -> Result<Self> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).map_err(|e| Error::EntropySource(e.to_string()))?;
        Ok(Self::from_bytes(bytes))
    }

    /// The process-wide secret, read from the OS on first use.
    ///
    /// Hashing cannot proceed safely without it, so failure to read the
    /// entropy source aborts the process.
    pub fn process() -> Secret {
        *PROCESS_SECRET.get_or_init(|| match Self::from_os() {
            Ok(secret) => secret,
            Err(err) => {
                tracing::error!(error = %err, "failed to initialize SipHash-1-3 secret");
                std::process::abort();
            }
        })
    }

    pub fn keys(&self) -> (u64, u64) {
        (self.k0, self.k1)
    }
}

// Keys stay out of logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Where a map takes its SipHash key from.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum HashKey {
    /// The shared process secret; resolved lazily on the first non-empty hash.
    #[default]
    Process,
    Fixed(Secret),
}

impl HashKey {
    #[inline]
    pub fn secret(&self) -> Secret {
        match self {
            HashKey::Process => Secret::process(),
            HashKey::Fixed(s) => *s,
        }
    }
}

impl From<Secret> for HashKey {
    fn from(s: Secret) -> Self {
        HashKey::Fixed(s)
    }
}
