//! Deterministic digests
//!
//! Provides [`Digest`], a 32-byte Blake3 hash used for roster fingerprints and
//! filter signatures. Two values that must hit the same cache entry produce
//! the same digest; anything that changes query results changes the digest.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A 32-byte Blake3 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Wrap raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Start a structured, length-prefixed digest
    #[inline]
    #[must_use]
    pub fn builder(domain: &str) -> DigestBuilder {
        DigestBuilder::new(domain)
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Incremental digest over tagged fields
///
/// Every field is written as `tag, len, bytes`, so `("ab", "c")` and
/// `("a", "bc")` never collide.
#[derive(Debug, Clone)]
pub struct DigestBuilder {
    hasher: blake3::Hasher,
}

impl DigestBuilder {
    /// New builder scoped to a domain string
    #[must_use]
    pub fn new(domain: &str) -> Self {
        let mut builder = Self {
            hasher: blake3::Hasher::new(),
        };
        builder.push_bytes(0xFF, domain.as_bytes());
        builder
    }

    fn push_bytes(&mut self, tag: u8, bytes: &[u8]) {
        self.hasher.update(&[tag]);
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Append a string field
    #[must_use]
    pub fn str(mut self, value: &str) -> Self {
        self.push_bytes(1, value.as_bytes());
        self
    }

    /// Append raw bytes
    #[must_use]
    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.push_bytes(2, value);
        self
    }

    /// Append an integer field
    #[must_use]
    pub fn u64(mut self, value: u64) -> Self {
        self.push_bytes(3, &value.to_le_bytes());
        self
    }

    /// Append a nested digest
    #[must_use]
    pub fn digest(mut self, value: &Digest) -> Self {
        self.push_bytes(4, value.as_bytes());
        self
    }

    /// Finish hashing
    #[must_use]
    pub fn finish(self) -> Digest {
        Digest(*self.hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_boundaries_are_part_of_the_digest() {
        let a = Digest::builder("t").str("ab").str("c").finish();
        let b = Digest::builder("t").str("a").str("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn domain_separates_identical_fields() {
        let a = Digest::builder("roster").u64(1).finish();
        let b = Digest::builder("filter").u64(1).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn short_is_sixteen_hex_chars() {
        let d = Digest::compute(b"palate");
        assert_eq!(d.short().len(), 16);
        assert!(d.to_string().starts_with(&d.short()));
    }
}
