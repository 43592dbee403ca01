//! Telemetry sample value object
//!
//! A [`Reading`] is one acquired sample: three electrical quantities, the
//! acquisition instant, and a provenance tag. The tag is the only
//! authoritative way to tell a live sample from a simulated one — the value
//! ranges deliberately overlap, so downstream consumers must check
//! [`Reading::source`], never the values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the on-disk schema, UTC
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a sample came from.
///
/// Must faithfully reflect whether the sample was read from the device or
/// produced by the fallback generator; persistence and retrieval never drop
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Read from the physical meter
    Live,
    /// Produced by the fallback generator
    Simulated,
}

impl Source {
    /// True for fallback samples
    pub fn is_simulated(self) -> bool {
        matches!(self, Self::Simulated)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "live" => Ok(Self::Live),
            "simulated" => Ok(Self::Simulated),
            other => Err(format!("unknown source tag {other:?}")),
        }
    }
}

/// One electrical telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Acquisition instant, UTC, second precision
    pub timestamp: DateTime<Utc>,
    /// Line voltage, volts
    pub voltage: f64,
    /// Line current, amps
    pub current: f64,
    /// Active power, watts
    pub power: f64,
    /// Provenance tag
    pub source: Source,
}

impl Reading {
    /// Create a reading at an explicit instant.
    ///
    /// Sub-second components are truncated; the store's schema carries
    /// second precision only.
    pub fn new(
        timestamp: DateTime<Utc>,
        voltage: f64,
        current: f64,
        power: f64,
        source: Source,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            voltage,
            current,
            power,
            source,
        }
    }

    /// Create a reading stamped with the current wall-clock instant.
    pub fn now(voltage: f64, current: f64, power: f64, source: Source) -> Self {
        Self::new(Utc::now(), voltage, current, power, source)
    }

    /// True for fallback samples
    pub fn is_simulated(&self) -> bool {
        self.source.is_simulated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(750);
        let reading = Reading::new(instant, 230.0, 5.0, 1150.0, Source::Live);
        assert_eq!(reading.timestamp.timestamp_subsec_millis(), 0);
        assert_eq!(
            reading.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
        );
    }

    #[test]
    fn test_source_round_trip() {
        for source in [Source::Live, Source::Simulated] {
            let parsed: Source = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
        assert!("garbage".parse::<Source>().is_err());
    }

    #[test]
    fn test_timestamp_format_matches_schema() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap();
        assert_eq!(
            instant.format(TIMESTAMP_FORMAT).to_string(),
            "2024-03-01 08:05:09"
        );
    }
}
