//! Normalized metric records.
//!
//! A `MetricRecord` is the indexable form of one export. Field names on the
//! wire follow the documents already stored in the `qbserve-*` indices.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One tracking session, normalized for indexing.
///
/// `active_seconds` is always the sum of the three duration fields. The two
/// ratios are `None` when their denominator is zero and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(rename = "@timestamp", with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "distracted_in_seconds")]
    pub distracted_seconds: f64,
    #[serde(rename = "neutral_in_seconds")]
    pub neutral_seconds: f64,
    #[serde(rename = "productive_in_seconds")]
    pub productive_seconds: f64,
    #[serde(rename = "active_in_seconds")]
    pub active_seconds: f64,
    #[serde(rename = "total_in_seconds")]
    pub total_seconds: f64,
    pub active_ratio: Option<f64>,
    pub productive_ratio: Option<f64>,
}

impl MetricRecord {
    /// Build a record from epoch-second bounds and the per-category durations.
    ///
    /// Returns `None` if either bound cannot be represented as an instant.
    /// Callers are expected to have validated ordering and signs already.
    pub fn from_epoch_seconds(
        start_time: f64,
        end_time: f64,
        distracted_seconds: f64,
        neutral_seconds: f64,
        productive_seconds: f64,
    ) -> Option<Self> {
        let start = instant_from_seconds(start_time)?;
        let end = instant_from_seconds(end_time)?;

        let active_seconds = distracted_seconds + neutral_seconds + productive_seconds;
        let total_seconds = end_time - start_time;

        Some(Self {
            timestamp: start,
            start_time: start,
            end_time: end,
            distracted_seconds,
            neutral_seconds,
            productive_seconds,
            active_seconds,
            total_seconds,
            active_ratio: ratio(active_seconds, total_seconds),
            productive_ratio: ratio(productive_seconds, active_seconds),
        })
    }

    /// Deterministic document identity, see [`document_id`].
    pub fn document_id(&self) -> String {
        document_id(&self.start_time)
    }
}

/// Document identity for a session starting at `start_time`:
/// `computer:<epoch millis>`.
pub fn document_id(start_time: &DateTime<Utc>) -> String {
    format!("computer:{}", start_time.timestamp_millis())
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Fractional seconds are truncated to whole milliseconds.
fn instant_from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).trunc();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// ISO-8601 UTC with millisecond precision, e.g. `1970-01-01T00:16:40.000Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
