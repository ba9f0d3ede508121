//! # Flight Status Codes
//!
//! The six status codes a flight can carry. The numeric codes are the wire
//! values reported by oracle clients; `Unknown` is the only non-terminal code.
//!
//! Serializes as the SCREAMING_SNAKE_CASE name. Deserializes from either the
//! name or the numeric code, so oracle clients may report `20` or
//! `"LATE_AIRLINE"` interchangeably.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Real-world status of a flight as agreed by oracle consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlightStatus {
    /// Awaiting resolution.
    Unknown,
    /// Departed on time.
    OnTime,
    /// Late through the carrier's fault. The only code that pays out.
    LateAirline,
    /// Late due to weather.
    LateWeather,
    /// Late due to a technical problem.
    LateTechnical,
    /// Late for any other reason.
    LateOther,
}

impl FlightStatus {
    /// All codes in wire order.
    pub const ALL: [FlightStatus; 6] = [
        Self::Unknown,
        Self::OnTime,
        Self::LateAirline,
        Self::LateWeather,
        Self::LateTechnical,
        Self::LateOther,
    ];

    /// Numeric wire code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::OnTime => 10,
            Self::LateAirline => 20,
            Self::LateWeather => 30,
            Self::LateTechnical => 40,
            Self::LateOther => 50,
        }
    }

    /// Look up a status by its numeric wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::OnTime => "ON_TIME",
            Self::LateAirline => "LATE_AIRLINE",
            Self::LateWeather => "LATE_WEATHER",
            Self::LateTechnical => "LATE_TECHNICAL",
            Self::LateOther => "LATE_OTHER",
        }
    }

    /// Look up a status by its canonical name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether this code ends a consensus round. Only `Unknown` does not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether this code obliges the insurance pool to pay out.
    pub fn triggers_payout(&self) -> bool {
        matches!(self, Self::LateAirline)
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let by_code = s.parse::<u8>().ok().and_then(Self::from_code);
        by_code
            .or_else(|| Self::from_name(s))
            .ok_or_else(|| format!("unknown flight status {s:?}"))
    }
}

impl Serialize for FlightStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlightStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StatusVisitor)
    }
}

struct StatusVisitor;

impl<'de> Visitor<'de> for StatusVisitor {
    type Value = FlightStatus;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a flight status name or numeric code (0, 10, 20, 30, 40, 50)")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        u8::try_from(v)
            .ok()
            .and_then(FlightStatus::from_code)
            .ok_or_else(|| E::custom(format!("unknown status code {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(format!("unknown status code {v}")))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}
