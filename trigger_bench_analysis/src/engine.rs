// SPDX-License-Identifier: MIT

use crate::correlate;
use crate::latency::{self, CompletionSample, InvocationTrace};
use crate::reliability::{self, ReliabilityTally};
use trigger_bench_telemetry::event::{Event, OperationIdSwitch};
use trigger_bench_telemetry::trigger::{ProfileTable, Runtime, TriggerType};

/// Identifies one (runtime, trigger, workload mode, workload input)
/// combination; every output row belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub runtime: Runtime,
    pub trigger: TriggerType,
    pub invoke_mode: String,
    pub invoke_input: String,
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.runtime, self.trigger, self.invoke_mode, self.invoke_input)
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    pub traces: Vec<InvocationTrace>,
    pub completions: Vec<CompletionSample>,
    pub tallies: Vec<(PartitionKey, ReliabilityTally)>,
}

/// Engine driving one analysis run: reconcile, group, validate, then
/// reduce to latency samples and per-partition reliability tallies.
///
/// Runs are independent of each other: each one operates on its own
/// in-memory snapshot and identical input always yields identical
/// output.
pub struct Engine {
    profiles: ProfileTable,
    discard_negative: bool,
}

impl Engine {
    pub fn new(profiles: ProfileTable, discard_negative: bool) -> Self {
        Self {
            profiles,
            discard_negative,
        }
    }

    pub fn run(&self, events: Vec<Event>, switches: &[OperationIdSwitch]) -> anyhow::Result<AnalysisOutput> {
        check_enumerations(&events)?;

        let events = correlate::reconcile(events, switches);
        let groups = correlate::group_by_operation(events);
        log::info!("partitioned {} groups", groups.len());

        // Invoke/execute sequences are gathered from every group, not
        // only the valid ones: missing and duplicate executions show up
        // precisely as groups that fail shape validation.
        let mut sequences: std::collections::BTreeMap<
            PartitionKey,
            (Vec<(chrono::NaiveDateTime, String)>, Vec<(chrono::NaiveDateTime, String)>),
        > = std::collections::BTreeMap::new();
        for group in &groups {
            let tags = group.tags();
            let (runtime, trigger) = match (Runtime::new(&tags.runtime), TriggerType::new(&tags.trigger)) {
                (Ok(runtime), Ok(trigger)) => (runtime, trigger),
                _ => continue,
            };
            if tags.iteration_id.is_empty() {
                continue;
            }
            let key = PartitionKey {
                runtime,
                trigger,
                invoke_mode: tags.invoke_mode.clone(),
                invoke_input: tags.invoke_input.clone(),
            };
            let scanned = latency::scan(group, trigger);
            let entry = sequences.entry(key).or_default();
            if let Some(timestamp) = scanned.invoking {
                entry.0.push((timestamp, tags.iteration_id.clone()));
            }
            if let Some(timestamp) = scanned.receiving {
                entry.1.push((timestamp, tags.iteration_id.clone()));
            }
        }

        let valid = correlate::filter_valid(groups, &self.profiles);
        log::info!("{} valid groups", valid.len());

        let mut traces = vec![];
        let mut completions = vec![];
        for group in &valid {
            let trigger = match TriggerType::new(&group.tags().trigger) {
                Ok(trigger) => trigger,
                Err(_) => continue,
            };
            let (trace, mut samples) = latency::extract(group, trigger, self.discard_negative);
            if let Some(trace) = trace {
                traces.push(trace);
            }
            completions.append(&mut samples);
        }

        let mut tallies = vec![];
        for (key, (mut invokes, mut executes)) in sequences {
            invokes.sort_by(|a, b| a.0.cmp(&b.0));
            executes.sort_by(|a, b| a.0.cmp(&b.0));
            let invoke_ids: Vec<String> = invokes.into_iter().map(|(_, id)| id).collect();
            let execute_ids: Vec<String> = executes.into_iter().map(|(_, id)| id).collect();

            let (tally, _, _) = reliability::aggregate(&invoke_ids, &execute_ids);
            if tally.sequence_defect {
                log::warn!("{}: inconsistent invoke/execute sequences, tally flagged as defective", key);
            }
            log::info!("{}: {}", key, serde_json::to_string(&tally).unwrap_or_default());
            tallies.push((key, tally));
        }

        let mut latencies: std::collections::BTreeMap<PartitionKey, Vec<i64>> = std::collections::BTreeMap::new();
        for trace in &traces {
            if let (Ok(runtime), Ok(trigger)) = (Runtime::new(&trace.tags.runtime), TriggerType::new(&trace.tags.trigger)) {
                let key = PartitionKey {
                    runtime,
                    trigger,
                    invoke_mode: trace.tags.invoke_mode.clone(),
                    invoke_input: trace.tags.invoke_input.clone(),
                };
                latencies.entry(key).or_default().push(trace.latency_ms);
            }
        }
        for (key, values) in &latencies {
            log::info!(
                "{}: {} valid invocations, average latency {:.3} ms",
                key,
                values.len(),
                crate::utils::mean(values)
            );
        }

        Ok(AnalysisOutput {
            traces,
            completions,
            tallies,
        })
    }
}

/// Unknown trigger/runtime values are rejected before any processing:
/// no expected shape or event-name convention exists for them.
fn check_enumerations(events: &[Event]) -> anyhow::Result<()> {
    for event in events {
        if !event.tags.runtime.is_empty() {
            Runtime::new(&event.tags.runtime)?;
        }
        if !event.tags.trigger.is_empty() {
            TriggerType::new(&event.tags.trigger)?;
        }
    }
    Ok(())
}
