// SPDX-License-Identifier: MIT

use crate::event::{parse_timestamp, Event, EventKind, EventTags, OperationIdSwitch};

/// Marker substring identifying a trace message that carries an
/// operation-id switch instead of a regular event.
pub const SWITCH_MARKER: &str = "Custom operationId";

/// A request-track record as delivered by the telemetry backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestRecord {
    pub timestamp: String,
    pub full_name: String,
    pub operation_id: String,
    pub duration: Option<f64>,
}

impl RequestRecord {
    /// Normalize into an event: names are case-folded.
    pub fn into_event(self, tags: EventTags) -> anyhow::Result<Event> {
        anyhow::ensure!(!self.full_name.is_empty(), "request record without a name");
        Ok(Event {
            kind: EventKind::Request,
            name: self.full_name.to_lowercase(),
            timestamp: parse_timestamp(&self.timestamp)?,
            operation_id: self.operation_id,
            duration: self.duration,
            tags,
        })
    }
}

/// A dependency-track record as delivered by the telemetry backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DependencyRecord {
    pub timestamp: String,
    pub name: String,
    pub operation_id: String,
    pub duration: Option<f64>,
}

impl DependencyRecord {
    /// Normalize into an event: names are case-folded and every
    /// `POST ...` call collapses to the literal `POST`.
    pub fn into_event(self, tags: EventTags) -> anyhow::Result<Event> {
        anyhow::ensure!(!self.name.is_empty(), "dependency record without a name");
        let name = self.name.to_lowercase();
        let name = if name.starts_with("post") { "POST".to_string() } else { name };
        Ok(Event {
            kind: EventKind::Dependency,
            name,
            timestamp: parse_timestamp(&self.timestamp)?,
            operation_id: self.operation_id,
            duration: self.duration,
            tags,
        })
    }
}

/// A trace-track record as delivered by the telemetry backend.
///
/// `old_operation_id`/`new_operation_id` are the pass-through of the
/// source system's custom dimensions and are only meaningful when the
/// message carries [`SWITCH_MARKER`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TraceRecord {
    pub timestamp: String,
    pub message: String,
    pub operation_id: String,
    #[serde(default)]
    pub old_operation_id: String,
    #[serde(default)]
    pub new_operation_id: String,
}

/// Result of ingesting one trace record.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceIngest {
    Event(Event),
    Switch(OperationIdSwitch),
}

impl TraceRecord {
    /// Normalize into either an event or an operation-id switch.
    ///
    /// Regular trace messages keep their first two whitespace-delimited
    /// tokens as the event name; a message containing [`SWITCH_MARKER`]
    /// yields the switch directive instead and never becomes an event.
    pub fn into_event(self, tags: EventTags) -> anyhow::Result<TraceIngest> {
        if self.message.contains(SWITCH_MARKER) {
            anyhow::ensure!(
                !self.old_operation_id.is_empty(),
                "operation-id switch without an old operation id"
            );
            return Ok(TraceIngest::Switch(OperationIdSwitch {
                old_operation_id: self.old_operation_id,
                new_operation_id: self.new_operation_id,
            }));
        }
        let name = self
            .message
            .split_whitespace()
            .take(2)
            .collect::<Vec<&str>>()
            .join(" ")
            .to_lowercase();
        anyhow::ensure!(!name.is_empty(), "trace record with an empty message");
        Ok(TraceIngest::Event(Event {
            kind: EventKind::Trace,
            name,
            timestamp: parse_timestamp(&self.timestamp)?,
            operation_id: self.operation_id,
            duration: None,
            tags,
        }))
    }
}
