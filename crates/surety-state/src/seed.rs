//! # Auditable Index Assignment
//!
//! Oracle index sets and round request indexes are drawn from a deterministic
//! generator. The generator is fed a [`Seed`] derived by a [`SeedSource`] from
//! a secret key, the ledger nonce, and the caller's identity (or the flight
//! key), so:
//!
//! - a candidate cannot predict its indexes before the registration commits
//!   (the key is never exposed and the nonce advances with every draw);
//! - anyone holding the recorded seed can recompute the assignment with
//!   [`draw_indexes`] and confirm it was not tampered with.
//!
//! ## Generator
//!
//! The seed is expanded into a byte stream `SHA-256(seed || block_be)` for
//! `block = 0, 1, 2, ...`. Bytes at or above the largest multiple of the
//! range are discarded (rejection sampling), the rest are reduced modulo the
//! range. Duplicates are skipped until enough distinct indexes are found.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 32-byte generator seed. Serializes as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Render as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() != 64 || !s.is_ascii() {
            return Err(format!("seed must be 64 hex characters, got {}", s.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|e| format!("{pair:?}: {e}"))?;
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed({})", self.to_hex())
    }
}

impl TryFrom<String> for Seed {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Seed> for String {
    fn from(seed: Seed) -> Self {
        seed.to_hex()
    }
}

/// What a seed is being derived for. Domain-separates the derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedDomain {
    /// An oracle's index set at registration.
    OracleAssignment,
    /// The request index of a new consensus round.
    StatusRequest,
}

impl SeedDomain {
    fn tag(&self) -> &'static [u8] {
        match self {
            Self::OracleAssignment => b"surety/oracle-assignment/v1",
            Self::StatusRequest => b"surety/status-request/v1",
        }
    }
}

/// Source of generator seeds.
///
/// Implementations must be deterministic in their inputs so that recorded
/// seeds can be re-derived by an auditor holding the same key.
pub trait SeedSource: Send + Sync {
    /// Derive the seed for one draw.
    fn derive(&self, domain: SeedDomain, nonce: u64, material: &[u8]) -> Seed;
}

/// Seeds derived as `SHA-256(key || domain || nonce_be || material)`.
#[derive(Clone)]
pub struct KeyedSeedSource {
    key: [u8; 32],
}

impl KeyedSeedSource {
    /// Use an explicit key (tests, audits, restored deployments).
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generate a fresh key from the operating system's RNG.
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        Seed::from_hex(s).map(|seed| Self { key: seed.0 })
    }
}

impl std::fmt::Debug for KeyedSeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedSeedSource")
            .field("key", &"[redacted]")
            .finish()
    }
}

impl SeedSource for KeyedSeedSource {
    fn derive(&self, domain: SeedDomain, nonce: u64, material: &[u8]) -> Seed {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(domain.tag());
        hasher.update(nonce.to_be_bytes());
        hasher.update(material);
        Seed(hasher.finalize().into())
    }
}

/// Draws seeds from a [`SeedSource`], advancing the ledger nonce.
///
/// Lives for one transaction; the nonce it advances belongs to the working
/// copy of the ledger state, so a rejected operation does not burn nonces.
pub struct Entropy<'a> {
    source: &'a dyn SeedSource,
    nonce: &'a mut u64,
}

impl<'a> Entropy<'a> {
    /// Wrap a seed source and the ledger's nonce counter.
    pub fn new(source: &'a dyn SeedSource, nonce: &'a mut u64) -> Self {
        Self { source, nonce }
    }

    /// Derive the next seed. Returns the seed and the nonce it used.
    pub fn next_seed(&mut self, domain: SeedDomain, material: &[u8]) -> (Seed, u64) {
        let nonce = *self.nonce;
        *self.nonce = nonce.wrapping_add(1);
        (self.source.derive(domain, nonce, material), nonce)
    }
}

/// Iterator over generator bytes `SHA-256(seed || block_be)`.
struct ByteStream {
    seed: Seed,
    block: u64,
    buf: [u8; 32],
    pos: usize,
}

impl ByteStream {
    fn new(seed: Seed) -> Self {
        Self {
            seed,
            block: 0,
            buf: [0u8; 32],
            pos: 32,
        }
    }
}

impl Iterator for ByteStream {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos == self.buf.len() {
            let mut hasher = Sha256::new();
            hasher.update(self.seed.0);
            hasher.update(self.block.to_be_bytes());
            self.buf = hasher.finalize().into();
            self.block = self.block.wrapping_add(1);
            self.pos = 0;
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Some(b)
    }
}

fn uniform_indexes(seed: Seed, range: u8) -> impl Iterator<Item = u8> {
    let range = range.max(1);
    let limit = 256 - (256 % u16::from(range));
    ByteStream::new(seed)
        .filter(move |b| u16::from(*b) < limit)
        .map(move |b| b % range)
}

/// Draw `count` distinct indexes in `0..range`, in ascending order.
///
/// `count` is clamped to `range`, so the draw always terminates.
pub fn draw_indexes(seed: Seed, count: u8, range: u8) -> Vec<u8> {
    let count = usize::from(count.min(range));
    let mut picked: Vec<u8> = Vec::with_capacity(count);
    for index in uniform_indexes(seed, range) {
        if picked.len() == count {
            break;
        }
        if !picked.contains(&index) {
            picked.push(index);
        }
    }
    picked.sort_unstable();
    picked
}

/// Draw a single index in `0..range`.
pub fn draw_index(seed: Seed, range: u8) -> u8 {
    uniform_indexes(seed, range).next().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> KeyedSeedSource {
        KeyedSeedSource::new([7u8; 32])
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = fixed().derive(SeedDomain::OracleAssignment, 3, b"0xo1");
        let b = fixed().derive(SeedDomain::OracleAssignment, 3, b"0xo1");
        assert_eq!(a, b);
    }

    #[test]
    fn derivation_separates_domain_nonce_and_material() {
        let src = fixed();
        let base = src.derive(SeedDomain::OracleAssignment, 3, b"0xo1");
        assert_ne!(base, src.derive(SeedDomain::StatusRequest, 3, b"0xo1"));
        assert_ne!(base, src.derive(SeedDomain::OracleAssignment, 4, b"0xo1"));
        assert_ne!(base, src.derive(SeedDomain::OracleAssignment, 3, b"0xo2"));
        assert_ne!(
            base,
            KeyedSeedSource::new([8u8; 32]).derive(SeedDomain::OracleAssignment, 3, b"0xo1")
        );
    }

    #[test]
    fn entropy_advances_nonce() {
        let src = fixed();
        let mut nonce = 10;
        let mut entropy = Entropy::new(&src, &mut nonce);
        let (s1, n1) = entropy.next_seed(SeedDomain::StatusRequest, b"k");
        let (s2, n2) = entropy.next_seed(SeedDomain::StatusRequest, b"k");
        assert_eq!((n1, n2), (10, 11));
        assert_ne!(s1, s2);
        assert_eq!(nonce, 12);
    }

    #[test]
    fn seed_hex_round_trips() {
        let seed = fixed().derive(SeedDomain::StatusRequest, 0, b"");
        assert_eq!(Seed::from_hex(&seed.to_hex()).unwrap(), seed);
        assert!(Seed::from_hex("abc").is_err());
        assert!(Seed::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn random_sources_differ() {
        let a = KeyedSeedSource::random().derive(SeedDomain::StatusRequest, 0, b"");
        let b = KeyedSeedSource::random().derive(SeedDomain::StatusRequest, 0, b"");
        assert_ne!(a, b);
    }

    #[test]
    fn count_is_clamped_to_range() {
        let seed = fixed().derive(SeedDomain::OracleAssignment, 0, b"");
        assert_eq!(draw_indexes(seed, 5, 3), vec![0, 1, 2]);
    }

    proptest::proptest! {
        #[test]
        fn assignments_are_distinct_sorted_and_in_range(bytes in proptest::prelude::any::<[u8; 32]>()) {
            let indexes = draw_indexes(Seed(bytes), 3, 10);
            proptest::prop_assert_eq!(indexes.len(), 3);
            proptest::prop_assert!(indexes.windows(2).all(|w| w[0] < w[1]));
            proptest::prop_assert!(indexes.iter().all(|i| *i < 10));
            proptest::prop_assert_eq!(draw_indexes(Seed(bytes), 3, 10), indexes);
        }

        #[test]
        fn single_draw_is_in_range(bytes in proptest::prelude::any::<[u8; 32]>(), range in 1u8..=50) {
            proptest::prop_assert!(draw_index(Seed(bytes), range) < range);
        }
    }
}
