// SPDX-License-Identifier: MIT

use std::io::BufRead;

use trigger_bench_telemetry::event::{Event, EventTags, OperationIdSwitch};
use trigger_bench_telemetry::source_records::{DependencyRecord, RequestRecord, TraceIngest, TraceRecord};

/// Column layout of the per-runtime telemetry files written by the
/// fetcher.
pub const TELEMETRY_HEADER: &str = "type,name,timestamp,operation_id,runtime,trigger,duration,iteration_id,invoke_mode,invoke_input";

/// Events and switch directives loaded from one telemetry file.
#[derive(Debug, Clone, Default)]
pub struct LoadedTelemetry {
    pub events: Vec<Event>,
    pub switches: Vec<OperationIdSwitch>,
}

impl LoadedTelemetry {
    pub fn merge(&mut self, other: LoadedTelemetry) {
        self.events.extend(other.events);
        self.switches.extend(other.switches);
    }
}

/// Load a telemetry CSV file. A wrong header fails the whole load; a
/// malformed row drops that row with a diagnostic and the batch
/// continues.
pub fn load_file(path: &str) -> anyhow::Result<LoadedTelemetry> {
    let file = std::fs::File::open(path)?;
    load(std::io::BufReader::new(file), path)
}

pub fn load<R: BufRead>(reader: R, origin: &str) -> anyhow::Result<LoadedTelemetry> {
    let mut loaded = LoadedTelemetry::default();
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => anyhow::bail!("empty telemetry file: {}", origin),
    };
    anyhow::ensure!(
        header.trim() == TELEMETRY_HEADER,
        "unexpected header in telemetry file {}: {}",
        origin,
        header
    );

    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // line 0 is the header, diagnostics are 1-based
        let line_no = line_no + 2;

        let tokens: Vec<&str> = line.split(',').collect();
        if tokens.len() != 10 {
            log::warn!("{}:{}: expected 10 fields, found {}, record dropped", origin, line_no, tokens.len());
            continue;
        }

        let duration = match tokens[6] {
            "" => None,
            value => match value.parse::<f64>() {
                Ok(duration) => Some(duration),
                Err(err) => {
                    log::warn!("{}:{}: invalid duration '{}' ({}), record dropped", origin, line_no, value, err);
                    continue;
                }
            },
        };

        let tags = EventTags {
            runtime: tokens[4].to_string(),
            trigger: tokens[5].to_string(),
            iteration_id: tokens[7].to_string(),
            invoke_mode: tokens[8].to_string(),
            invoke_input: tokens[9].to_string(),
        };

        let ingested = match tokens[0] {
            "REQUEST" => RequestRecord {
                timestamp: tokens[2].to_string(),
                full_name: tokens[1].to_string(),
                operation_id: tokens[3].to_string(),
                duration,
            }
            .into_event(tags)
            .map(TraceIngest::Event),
            "DEPENDENCY" => DependencyRecord {
                timestamp: tokens[2].to_string(),
                name: tokens[1].to_string(),
                operation_id: tokens[3].to_string(),
                duration,
            }
            .into_event(tags)
            .map(TraceIngest::Event),
            "TRACE" => TraceRecord {
                timestamp: tokens[2].to_string(),
                message: tokens[1].to_string(),
                operation_id: tokens[3].to_string(),
                old_operation_id: String::new(),
                new_operation_id: String::new(),
            }
            .into_event(tags),
            // the old id travels in the operation_id column, the new one
            // in the name column
            "SWITCH" => {
                if tokens[3].is_empty() {
                    log::warn!("{}:{}: switch row without an old operation id, record dropped", origin, line_no);
                    continue;
                }
                Ok(TraceIngest::Switch(OperationIdSwitch {
                    old_operation_id: tokens[3].to_string(),
                    new_operation_id: tokens[1].to_string(),
                }))
            }
            other => {
                log::warn!("{}:{}: unknown record type '{}', record dropped", origin, line_no, other);
                continue;
            }
        };

        match ingested {
            Ok(TraceIngest::Event(event)) => loaded.events.push(event),
            Ok(TraceIngest::Switch(switch)) => loaded.switches.push(switch),
            Err(err) => log::warn!("{}:{}: {}, record dropped", origin, line_no, err),
        }
    }

    log::info!("{}: loaded {} events and {} switches", origin, loaded.events.len(), loaded.switches.len());
    Ok(loaded)
}
