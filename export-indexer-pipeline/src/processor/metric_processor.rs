//! Metric processor implementation.
//!
//! Transforms raw exports into MetricRecord structures for indexing.

use tracing::debug;

use crate::errors::PipelineError;
use export_indexer_shared::{MetricRecord, RawExport};

/// Processor that transforms raw exports into metric records.
///
/// The processor is responsible for:
/// - Checking that every required numeric field is present
/// - Rejecting negative durations and sessions that end before they start
/// - Deriving totals and ratios
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricProcessor;

impl MetricProcessor {
    /// Create a new metric processor.
    pub fn new() -> Self {
        Self
    }

    /// Transform a single export, see [`transform`].
    pub fn process(&self, raw: &RawExport) -> Result<MetricRecord, PipelineError> {
        transform(raw)
    }
}

/// Convert one raw export into a metric record.
///
/// Fails with `MalformedExport` if a required field is missing or not a
/// finite number, if a duration is negative, or if `end_time < start_time`.
pub fn transform(raw: &RawExport) -> Result<MetricRecord, PipelineError> {
    let start_time = number(raw, "info", "start_time")?;
    let end_time = number(raw, "info", "end_time")?;
    let distracting = duration(raw, "distracting_duration")?;
    let neutral = duration(raw, "neutral_duration")?;
    let productive = duration(raw, "productive_duration")?;

    if end_time < start_time {
        return Err(PipelineError::malformed(format!(
            "info.end_time ({}) is before info.start_time ({})",
            end_time, start_time
        )));
    }

    let record =
        MetricRecord::from_epoch_seconds(start_time, end_time, distracting, neutral, productive)
            .ok_or_else(|| PipelineError::malformed("session times are out of range"))?;

    debug!(
        document_id = %record.document_id(),
        active_seconds = record.active_seconds,
        total_seconds = record.total_seconds,
        "Transformed export"
    );

    Ok(record)
}

fn number(raw: &RawExport, section: &str, field: &str) -> Result<f64, PipelineError> {
    let value = raw
        .field(section, field)
        .ok_or_else(|| PipelineError::malformed(format!("missing {}.{}", section, field)))?;

    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(PipelineError::malformed(format!(
            "{}.{} is not a number: {}",
            section, field, value
        ))),
    }
}

fn duration(raw: &RawExport, field: &str) -> Result<f64, PipelineError> {
    let seconds = number(raw, "totals", field)?;
    if seconds < 0.0 {
        return Err(PipelineError::malformed(format!(
            "totals.{} is negative: {}",
            field, seconds
        )));
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawExport {
        RawExport::from_value(value).unwrap()
    }

    fn session(start: Value, end: Value, distracting: Value, neutral: Value, productive: Value) -> RawExport {
        raw(json!({
            "info": { "start_time": start, "end_time": end },
            "totals": {
                "distracting_duration": distracting,
                "neutral_duration": neutral,
                "productive_duration": productive
            }
        }))
    }

    #[test]
    fn test_reference_session() {
        let record = transform(&session(
            json!(1000),
            json!(1100),
            json!(20),
            json!(30),
            json!(50),
        ))
        .unwrap();

        assert_eq!(record.active_seconds, 100.0);
        assert_eq!(record.total_seconds, 100.0);
        assert_eq!(record.active_ratio, Some(1.0));
        assert_eq!(record.productive_ratio, Some(0.5));
        assert_eq!(record.document_id(), "computer:1000000");
    }

    #[test]
    fn test_active_seconds_is_exact_sum() {
        let cases = [
            (0.1, 0.2, 0.3),
            (1234.5, 0.0, 17.25),
            (3600.0, 1800.0, 7200.0),
            (0.0, 0.0, 0.0),
        ];

        for (distracting, neutral, productive) in cases {
            let record = transform(&session(
                json!(1_700_000_000),
                json!(1_700_086_400),
                json!(distracting),
                json!(neutral),
                json!(productive),
            ))
            .unwrap();

            assert_eq!(record.active_seconds, distracting + neutral + productive);
            assert_eq!(record.distracted_seconds, distracting);
            assert_eq!(record.neutral_seconds, neutral);
            assert_eq!(record.productive_seconds, productive);
        }
    }

    #[test]
    fn test_zero_length_session_has_undefined_active_ratio() {
        let record = transform(&session(
            json!(5000),
            json!(5000),
            json!(1),
            json!(2),
            json!(3),
        ))
        .unwrap();

        assert_eq!(record.total_seconds, 0.0);
        assert!(record.active_ratio.is_none());
        assert_eq!(record.productive_ratio, Some(0.5));
    }

    #[test]
    fn test_idle_session_has_undefined_productive_ratio() {
        let record = transform(&session(json!(0), json!(60), json!(0), json!(0), json!(0))).unwrap();

        assert_eq!(record.active_ratio, Some(0.0));
        assert!(record.productive_ratio.is_none());
    }

    #[test]
    fn test_missing_field() {
        let result = transform(&raw(json!({
            "info": { "start_time": 1000 },
            "totals": {
                "distracting_duration": 1,
                "neutral_duration": 1,
                "productive_duration": 1
            }
        })));

        match result {
            Err(PipelineError::MalformedExport(msg)) => assert_eq!(msg, "missing info.end_time"),
            other => panic!("expected malformed export, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_section() {
        let result = transform(&raw(json!({ "info": { "start_time": 1, "end_time": 2 } })));
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_non_numeric_field() {
        let result = transform(&session(
            json!("1000"),
            json!(1100),
            json!(1),
            json!(1),
            json!(1),
        ));
        assert!(matches!(result, Err(PipelineError::MalformedExport(ref msg)) if msg.contains("start_time")));

        let result = transform(&session(json!(1000), json!(1100), json!(null), json!(1), json!(1)));
        assert!(matches!(result, Err(PipelineError::MalformedExport(_))));
    }

    #[test]
    fn test_end_before_start() {
        let result = transform(&session(json!(2000), json!(1000), json!(1), json!(1), json!(1)));
        assert!(matches!(result, Err(PipelineError::MalformedExport(ref msg)) if msg.contains("before")));
    }

    #[test]
    fn test_negative_duration() {
        let result = transform(&session(json!(0), json!(10), json!(1), json!(-1), json!(1)));
        assert!(matches!(result, Err(PipelineError::MalformedExport(ref msg)) if msg.contains("neutral_duration")));
    }

    #[test]
    fn test_out_of_range_times() {
        let result = transform(&session(json!(1e300), json!(1e301), json!(1), json!(1), json!(1)));
        assert!(matches!(result, Err(PipelineError::MalformedExport(ref msg)) if msg.contains("out of range")));
    }

    #[test]
    fn test_processor_delegates() {
        let processor = MetricProcessor::new();
        let record = processor
            .process(&session(json!(0), json!(100), json!(10), json!(10), json!(10)))
            .unwrap();
        assert_eq!(record.active_seconds, 30.0);
    }
}
