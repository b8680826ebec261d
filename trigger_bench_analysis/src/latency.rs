// SPDX-License-Identifier: MIT

use crate::correlate::Group;
use trigger_bench_telemetry::event::{EventKind, EventTags};
use trigger_bench_telemetry::trigger::{TriggerType, INFRA_ENDPOINT};

/// Latency reduction of one valid group: the invoking and receiving
/// timestamps and the elapsed whole milliseconds between them.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InvocationTrace {
    pub operation_id: String,
    pub invoking: chrono::NaiveDateTime,
    pub receiving: chrono::NaiveDateTime,
    pub latency_ms: i64,
    pub tags: EventTags,
}

/// End-to-end completion time reported by the system under test itself,
/// kept apart from the trigger latency samples.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CompletionSample {
    pub operation_id: String,
    pub duration_ms: f64,
    pub tags: EventTags,
}

pub(crate) struct GroupScan {
    pub invoking: Option<chrono::NaiveDateTime>,
    pub receiving: Option<chrono::NaiveDateTime>,
    pub completions: Vec<f64>,
}

/// Single pass over a group's events. Last-write-wins per role: when a
/// group holds several candidate events of one role only the last one
/// seen is kept.
pub(crate) fn scan(group: &Group, trigger: TriggerType) -> GroupScan {
    let completion_name = trigger.completion_track_name();
    let mut invoking = None;
    let mut receiving = None;
    let mut completions = vec![];
    for event in &group.events {
        if event.name == completion_name {
            match event.duration {
                Some(duration) => completions.push(duration),
                None => log::warn!("completion-track event without a duration in group {}", group.operation_id),
            }
        } else if event.kind == EventKind::Dependency {
            invoking = Some(event.timestamp);
        } else if event.kind == EventKind::Request && event.name != INFRA_ENDPOINT {
            receiving = Some(event.timestamp);
        }
    }
    GroupScan {
        invoking,
        receiving,
        completions,
    }
}

/// Reduce one valid group to its latency sample and completion samples.
///
/// `latency_ms` is `receiving - invoking`; negative deltas are kept
/// unless `discard_negative` is set.
pub fn extract(group: &Group, trigger: TriggerType, discard_negative: bool) -> (Option<InvocationTrace>, Vec<CompletionSample>) {
    let tags = group.tags();
    let result = scan(group, trigger);

    let completions = result
        .completions
        .into_iter()
        .map(|duration_ms| CompletionSample {
            operation_id: group.operation_id.clone(),
            duration_ms,
            tags: tags.clone(),
        })
        .collect();

    let trace = match (result.invoking, result.receiving) {
        (Some(invoking), Some(receiving)) => {
            let latency_ms = crate::utils::delta_ms(invoking, receiving);
            if discard_negative && latency_ms < 0 {
                log::info!("group with id {} has a negative latency ({} ms), discarded", group.operation_id, latency_ms);
                None
            } else {
                Some(InvocationTrace {
                    operation_id: group.operation_id.clone(),
                    invoking,
                    receiving,
                    latency_ms,
                    tags,
                })
            }
        }
        _ => {
            log::info!("group with id {} has no invoking or receiving event, skipped", group.operation_id);
            None
        }
    };

    (trace, completions)
}
