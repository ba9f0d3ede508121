//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier in the protocol. An `AccountId` is a
//! ledger account (airlines, passengers and oracles are all accounts and the
//! same account may hold several roles). A `FlightKey` is the composite
//! `(airline, designator, scheduled timestamp)` key of a flight.
//!
//! `FlightKey` serializes as the string `airline|designator|timestamp` so it
//! can be used directly as a JSON object key in ledger snapshots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

const MAX_ACCOUNT_LEN: usize = 128;
const KEY_SEPARATOR: char = '|';

/// A ledger account identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create a validated account identifier.
    ///
    /// Surrounding whitespace is trimmed. The identifier must be non-empty,
    /// at most 128 characters, and must not contain the flight-key separator.
    pub fn new(s: impl Into<String>) -> Result<Self, IdentityError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::EmptyAccount);
        }
        if trimmed.len() > MAX_ACCOUNT_LEN || trimmed.contains(KEY_SEPARATOR) {
            return Err(IdentityError::InvalidAccount(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Composite key of a registered flight.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlightKey {
    airline: AccountId,
    designator: String,
    scheduled_at: u64,
}

impl FlightKey {
    /// Build a flight key, validating the designator.
    ///
    /// Designators are 2–16 ASCII alphanumerics and are upper-cased
    /// (`ny9200` and `NY9200` name the same flight).
    pub fn new(
        airline: AccountId,
        designator: impl AsRef<str>,
        scheduled_at: u64,
    ) -> Result<Self, IdentityError> {
        let designator = designator.as_ref().trim();
        let valid = (2..=16).contains(&designator.len())
            && designator.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(IdentityError::InvalidDesignator(designator.to_string()));
        }
        Ok(Self {
            airline,
            designator: designator.to_ascii_uppercase(),
            scheduled_at,
        })
    }

    /// The airline operating the flight.
    pub fn airline(&self) -> &AccountId {
        &self.airline
    }

    /// The flight designator (e.g. `NY9200`).
    pub fn designator(&self) -> &str {
        &self.designator
    }

    /// Scheduled departure as Unix seconds.
    pub fn scheduled_at(&self) -> u64 {
        self.scheduled_at
    }

    /// Byte encoding used when deriving seeds from a flight key.
    pub fn seed_material(&self) -> Vec<u8> {
        String::from(self.clone()).into_bytes()
    }
}

impl TryFrom<String> for FlightKey {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FlightKey> for String {
    fn from(key: FlightKey) -> Self {
        format!(
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            key.airline, key.designator, key.scheduled_at
        )
    }
}

impl std::str::FromStr for FlightKey {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdentityError::MalformedFlightKey(s.to_string());
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        let [airline, designator, timestamp] = parts.as_slice() else {
            return Err(malformed());
        };
        let scheduled_at = timestamp.parse::<u64>().map_err(|_| malformed())?;
        Self::new(AccountId::new(*airline)?, designator, scheduled_at)
    }
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} ({})", self.designator, self.scheduled_at, self.airline)
    }
}

/// Unique identifier for an insurance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    /// Generate a new random policy identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy:{}", self.0)
    }
}

/// Monotonic identifier of a consensus round.
///
/// Round ids are allocated from the ledger and never reused, so a flight
/// resolved in round 4 can tell a late round-4 report from a fresh round 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub u64);

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round:{}", self.0)
    }
}
