// SPDX-License-Identifier: MIT

/// Kind of a normalized telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    Request,
    Dependency,
    Trace,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EventKind::Request => write!(f, "REQUEST"),
            EventKind::Dependency => write!(f, "DEPENDENCY"),
            EventKind::Trace => write!(f, "TRACE"),
        }
    }
}

/// Descriptive tags assigned to an event by the telemetry fetcher.
/// Passed through opaquely: the analysis only uses them to partition
/// results, never to interpret the event itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EventTags {
    pub runtime: String,
    pub trigger: String,
    pub iteration_id: String,
    pub invoke_mode: String,
    pub invoke_input: String,
}

impl EventTags {
    pub fn is_empty(&self) -> bool {
        self.runtime.is_empty() && self.trigger.is_empty()
    }
}

/// One normalized telemetry event.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Normalized endpoint/operation name, see `source_records` for the
    /// normalization rules applied at ingestion.
    pub name: String,
    pub timestamp: chrono::NaiveDateTime,
    /// Correlation key linking all events of one logical invocation.
    /// May be empty, in which case the event is discarded before grouping.
    pub operation_id: String,
    /// Elapsed time reported by the source system, in ms.
    pub duration: Option<f64>,
    pub tags: EventTags,
}

/// Directive to re-tag every event carrying `old_operation_id` with
/// `new_operation_id`. Emitted by the system under test as a marker
/// trace message; never becomes a regular event.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationIdSwitch {
    pub old_operation_id: String,
    pub new_operation_id: String,
}

impl OperationIdSwitch {
    /// A switch with an empty replacement id must be ignored.
    pub fn is_noop(&self) -> bool {
        self.new_operation_id.is_empty()
    }
}

/// Parse a telemetry timestamp.
///
/// The fetcher normalizes timestamps to `"%Y-%m-%d %H:%M:%S%.f"`; the raw
/// ISO form with `T` separator and trailing `Z` is accepted as well.
pub fn parse_timestamp(value: &str) -> anyhow::Result<chrono::NaiveDateTime> {
    let normalized = value.trim().replace('T', " ");
    let normalized = normalized.trim_end_matches('Z');
    if let Ok(ts) = chrono::NaiveDateTime::parse_from_str(normalized, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts);
    }
    match chrono::NaiveDateTime::parse_from_str(normalized, "%Y-%m-%d %H:%M:%S") {
        Ok(ts) => Ok(ts),
        Err(err) => anyhow::bail!("invalid timestamp '{}': {}", value, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2022-02-23 15:34:00.123").unwrap();
        assert_eq!(ts.and_utc().timestamp_subsec_millis(), 123);

        let iso = parse_timestamp("2022-02-23T15:34:00.123Z").unwrap();
        assert_eq!(ts, iso);

        let plain = parse_timestamp("2022-02-23 15:34:00").unwrap();
        assert_eq!(plain.and_utc().timestamp_subsec_millis(), 0);

        // fractional part longer than ms is kept
        let micro = parse_timestamp("2022-02-23 15:34:00.123456").unwrap();
        assert_eq!(micro.and_utc().timestamp_subsec_micros(), 123456);

        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2022-23-02 15:34:00").is_err());
    }

    #[test]
    fn test_switch_noop() {
        let switch = OperationIdSwitch {
            old_operation_id: "abc".to_string(),
            new_operation_id: "".to_string(),
        };
        assert!(switch.is_noop());

        let switch = OperationIdSwitch {
            old_operation_id: "abc".to_string(),
            new_operation_id: "def".to_string(),
        };
        assert!(!switch.is_noop());
    }
}
