// SPDX-License-Identifier: MIT

use trigger_bench_telemetry::event::{Event, EventKind, EventTags, OperationIdSwitch};
use trigger_bench_telemetry::trigger::{ProfileTable, TriggerType};

/// All events of one logical invocation, insertion-ordered. Ephemeral:
/// rebuilt from the event snapshot on every analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub operation_id: String,
    pub events: Vec<Event>,
}

impl Group {
    /// Per-kind event counts: (traces, requests, dependencies).
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut traces = 0;
        let mut requests = 0;
        let mut dependencies = 0;
        for event in &self.events {
            match event.kind {
                EventKind::Trace => traces += 1,
                EventKind::Request => requests += 1,
                EventKind::Dependency => dependencies += 1,
            }
        }
        (traces, requests, dependencies)
    }

    /// Descriptive tags of the group: the first tagged event wins, since
    /// the fetcher assigns tags per operation id but some rows of a
    /// group may have been left untagged.
    pub fn tags(&self) -> EventTags {
        self.events
            .iter()
            .find(|event| !event.tags.is_empty())
            .or(self.events.first())
            .map(|event| event.tags.clone())
            .unwrap_or_default()
    }
}

/// Rewrite correlation keys according to the collected switches and drop
/// events left without one.
///
/// The sequence is time-sorted first: switches are applied to the full
/// sorted view, never to a partial one. Switch old-ids are unique per
/// run; a switch with an empty replacement id is a no-op.
pub fn reconcile(mut events: Vec<Event>, switches: &[OperationIdSwitch]) -> Vec<Event> {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    for event in &mut events {
        for switch in switches {
            if switch.is_noop() {
                continue;
            }
            if event.operation_id == switch.old_operation_id {
                event.operation_id = switch.new_operation_id.clone();
            }
        }
    }

    events.retain(|event| !event.operation_id.is_empty());
    events
}

/// Partition a reconciled event sequence into per-invocation groups.
///
/// Events are stably sorted by operation id internally, so the caller
/// only needs to hand over the reconciler's output; within a group the
/// time order established by [`reconcile`] is preserved.
pub fn group_by_operation(mut events: Vec<Event>) -> Vec<Group> {
    events.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));

    let mut groups: Vec<Group> = vec![];
    for event in events {
        match groups.last_mut() {
            Some(group) if group.operation_id == event.operation_id => group.events.push(event),
            _ => groups.push(Group {
                operation_id: event.operation_id.clone(),
                events: vec![event],
            }),
        }
    }
    groups
}

/// Keep the groups whose per-kind counts match the expected shape of
/// their trigger. Discarded groups are reported, not fatal: partial
/// traces must not contaminate the latency statistics.
pub fn filter_valid(groups: Vec<Group>, table: &ProfileTable) -> Vec<Group> {
    let mut valid = vec![];
    for group in groups {
        let tags = group.tags();
        let trigger = match TriggerType::new(&tags.trigger) {
            Ok(trigger) => trigger,
            Err(_) => {
                log::info!("group with id {} has no usable trigger tag, thrown out", group.operation_id);
                continue;
            }
        };
        let (traces, requests, dependencies) = group.counts();
        if table.shape(trigger).matches(traces, requests, dependencies) {
            valid.push(group);
        } else {
            log::info!(
                "group with id {} was thrown out ({} traces, {} requests, {} dependencies)",
                group.operation_id,
                traces,
                requests,
                dependencies
            );
        }
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, name: &str, timestamp: &str, operation_id: &str) -> Event {
        Event {
            kind,
            name: name.to_string(),
            timestamp: trigger_bench_telemetry::event::parse_timestamp(timestamp).unwrap(),
            operation_id: operation_id.to_string(),
            duration: None,
            tags: EventTags {
                runtime: "node".to_string(),
                trigger: "database".to_string(),
                iteration_id: "1".to_string(),
                invoke_mode: "constant".to_string(),
                invoke_input: "500".to_string(),
            },
        }
    }

    fn switch(old: &str, new: &str) -> OperationIdSwitch {
        OperationIdSwitch {
            old_operation_id: old.to_string(),
            new_operation_id: new.to_string(),
        }
    }

    #[test]
    fn test_reconcile_applies_switches() {
        let events = vec![
            event(EventKind::Request, "r", "2022-02-23 15:34:02.000", "tmp1"),
            event(EventKind::Trace, "t", "2022-02-23 15:34:01.000", "op1"),
            event(EventKind::Dependency, "d", "2022-02-23 15:34:00.000", "tmp1"),
        ];
        let reconciled = reconcile(events, &[switch("tmp1", "op1")]);
        assert_eq!(reconciled.len(), 3);
        for e in &reconciled {
            assert_eq!(e.operation_id, "op1");
            assert_ne!(e.operation_id, "tmp1");
        }
        // time-sorted
        assert_eq!(reconciled[0].kind, EventKind::Dependency);
        assert_eq!(reconciled[2].kind, EventKind::Request);
    }

    #[test]
    fn test_reconcile_noop_switch() {
        let events = vec![event(EventKind::Trace, "t", "2022-02-23 15:34:00.000", "op1")];
        let reconciled = reconcile(events, &[switch("op1", "")]);
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].operation_id, "op1");
    }

    #[test]
    fn test_reconcile_drops_unassigned() {
        let events = vec![
            event(EventKind::Trace, "t", "2022-02-23 15:34:00.000", ""),
            event(EventKind::Trace, "t", "2022-02-23 15:34:01.000", "op1"),
        ];
        let reconciled = reconcile(events, &[]);
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].operation_id, "op1");
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let mut events = vec![];
        for (operation_id, at) in [
            ("op2", "2022-02-23 15:34:00.000"),
            ("op1", "2022-02-23 15:34:01.000"),
            ("op2", "2022-02-23 15:34:02.000"),
            ("op3", "2022-02-23 15:34:03.000"),
            ("op1", "2022-02-23 15:34:04.000"),
        ] {
            events.push(event(EventKind::Trace, "t", at, operation_id));
        }
        let total = events.len();

        let groups = group_by_operation(reconcile(events, &[]));
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.iter().map(|g| g.events.len()).sum::<usize>(), total);
        for group in &groups {
            assert!(group.events.iter().all(|e| e.operation_id == group.operation_id));
        }
        // within a group, time order survives the id sort
        let op1 = groups.iter().find(|g| g.operation_id == "op1").unwrap();
        assert!(op1.events[0].timestamp < op1.events[1].timestamp);
    }

    #[test]
    fn test_singleton_group() {
        let groups = group_by_operation(vec![event(EventKind::Trace, "t", "2022-02-23 15:34:00.000", "op1")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].events.len(), 1);
    }

    #[test]
    fn test_filter_valid() {
        let mut events = vec![
            event(EventKind::Request, "r1", "2022-02-23 15:34:00.000", "good"),
            event(EventKind::Request, "r2", "2022-02-23 15:34:01.000", "good"),
            event(EventKind::Dependency, "d", "2022-02-23 15:34:02.000", "good"),
        ];
        for _ in 0..4 {
            events.push(event(EventKind::Trace, "t", "2022-02-23 15:34:03.000", "good"));
        }
        // a partial trace: one lone request
        events.push(event(EventKind::Request, "r1", "2022-02-23 15:34:04.000", "partial"));

        let groups = group_by_operation(reconcile(events, &[]));
        assert_eq!(groups.len(), 2);
        let valid = filter_valid(groups, &ProfileTable::builtin());
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].operation_id, "good");
    }

    #[test]
    fn test_filter_valid_untagged_group() {
        let mut lone = event(EventKind::Request, "r1", "2022-02-23 15:34:00.000", "op1");
        lone.tags = EventTags::default();
        let valid = filter_valid(group_by_operation(vec![lone]), &ProfileTable::builtin());
        assert!(valid.is_empty());
    }
}
