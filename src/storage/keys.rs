//! Storage key generation
//!
//! Keys are `{folder}/{random_id}.{extension}` (folder optional). The random
//! component is 10 bytes from the thread-local CSPRNG, URL-safe base64
//! encoded. No uniqueness check is made against existing objects.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use std::fmt;

/// Bytes of entropy in a random identifier
pub const RANDOM_ID_BYTES: usize = 10;

/// Generate a URL-safe random identifier
pub fn random_id() -> String {
    let mut bytes = [0u8; RANDOM_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Key naming a stored asset within a bucket or asset root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey(String);

impl StorageKey {
    /// Generate a fresh key with an optional folder prefix
    pub fn generate(folder: Option<&str>, extension: &str) -> Self {
        Self::with_id(folder, &random_id(), extension)
    }

    fn with_id(folder: Option<&str>, id: &str, extension: &str) -> Self {
        match folder {
            Some(folder) => Self(format!("{}/{}.{}", folder, id, extension)),
            None => Self(format!("{}.{}", id, extension)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
