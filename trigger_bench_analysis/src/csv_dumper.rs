// SPDX-License-Identifier: MIT

use std::io::Write;

use crate::engine::PartitionKey;
use crate::latency::{CompletionSample, InvocationTrace};
use crate::reliability::ReliabilityTally;

pub const LATENCY_HEADER: &str = "runtime,trigger_type,invoke_type,invoke_input,latency";
pub const COMPLETION_HEADER: &str = "runtime,trigger_type,invoke_type,invoke_input,completion_ms";
pub const RELIABILITY_HEADER: &str = "runtime,trigger_type,invoke_type,invoke_input,original_invokes,original_executes,duplicates_invokes,duplicates_executes,missing_executes,out_of_order";

/// Plain CSV writer with header-once semantics: the header is written
/// when truncating, or when appending to a missing/empty file. An empty
/// filename disables the dumper.
pub struct CsvDumper {
    outfile: Option<std::fs::File>,
}

impl CsvDumper {
    pub fn new(filename: &str, header: &str, append: bool) -> anyhow::Result<Self> {
        let mut outfile = None;
        if !filename.is_empty() {
            let write_header = !append
                || match std::fs::metadata(filename) {
                    Ok(metadata) => metadata.len() == 0,
                    Err(_) => true,
                };

            outfile = Some(
                std::fs::OpenOptions::new()
                    .write(true)
                    .append(append)
                    .create(true)
                    .truncate(!append)
                    .open(filename)?,
            );

            if write_header {
                if let Some(outfile) = &mut outfile {
                    writeln!(outfile, "{}", header)?;
                }
            }
        }

        Ok(Self { outfile })
    }

    pub fn add(&mut self, row: &str) {
        if let Some(outfile) = &mut self.outfile {
            let _ = writeln!(outfile, "{}", row);
        }
    }
}

pub fn latency_row(trace: &InvocationTrace) -> String {
    format!(
        "{},{},{},{},{}",
        trace.tags.runtime, trace.tags.trigger, trace.tags.invoke_mode, trace.tags.invoke_input, trace.latency_ms
    )
}

pub fn completion_row(sample: &CompletionSample) -> String {
    format!(
        "{},{},{},{},{}",
        sample.tags.runtime, sample.tags.trigger, sample.tags.invoke_mode, sample.tags.invoke_input, sample.duration_ms
    )
}

pub fn reliability_row(key: &PartitionKey, tally: &ReliabilityTally) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        key.runtime,
        key.trigger,
        key.invoke_mode,
        key.invoke_input,
        tally.original_invokes,
        tally.original_executes,
        tally.duplicates_invokes,
        tally.duplicates_executes,
        tally.missing_executes,
        tally.out_of_order
    )
}
