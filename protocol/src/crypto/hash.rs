//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function in Tally. Transaction hashes, asset ids
//! and issuance keys are all domain-separated BLAKE3 digests; the domain tags
//! live in [`crate::config`].
//!
//! This module also carries the serde helper used by every fixed-size byte
//! type in the crate: hex strings in human-readable formats (JSON fixtures,
//! logs), raw bytes in binary formats (bincode rows in sled).

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use tally_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"tally");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash several byte slices as if they were concatenated.
///
/// Avoids building a temporary buffer when the parts are already separate,
/// e.g. a domain tag followed by a canonical encoding.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Domain-separated hash: `BLAKE3(domain ‖ data)`.
pub fn tagged_hash(domain: &[u8], data: &[u8]) -> [u8; 32] {
    blake3_hash_multi(&[domain, data])
}

/// Serde adapter for byte strings: hex when the format is human readable,
/// raw bytes otherwise.
pub(crate) mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes.as_ref()))
        } else {
            serializer.serialize_bytes(bytes.as_ref())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(D::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }

    /// Same as [`deserialize`] but insists on exactly 32 bytes.
    pub fn deserialize_32<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = deserialize(deserializer)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| D::Error::invalid_length(bytes.len(), &"32 bytes"))
    }
}
