// SPDX-License-Identifier: MIT

use clap::Parser;

use trigger_bench_analysis::csv_dumper::{
    completion_row, latency_row, reliability_row, CsvDumper, COMPLETION_HEADER, LATENCY_HEADER, RELIABILITY_HEADER,
};
use trigger_bench_analysis::csv_loader::{self, LoadedTelemetry};
use trigger_bench_analysis::engine::Engine;
use trigger_bench_telemetry::trigger::{ProfileTable, TriggerType};

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    /// Comma-separated list of telemetry CSV files written by the trace fetcher.
    #[arg(short, long, default_value_t = String::from("node.csv,dotnet.csv"))]
    input: String,
    /// Restrict the analysis to one trigger type, or "all".
    #[arg(short, long, default_value_t = String::from("all"))]
    trigger: String,
    /// TOML file overriding the per-trigger expected group shapes.
    #[arg(long, default_value_t = String::from(""))]
    shapes: String,
    /// Name of the CSV output file for the latency table.
    #[arg(long, default_value_t = String::from("latency.csv"))]
    latency_output: String,
    /// Name of the CSV output file for the completion-track table.
    #[arg(long, default_value_t = String::from("completion.csv"))]
    completion_output: String,
    /// Name of the CSV output file for the reliability table.
    #[arg(long, default_value_t = String::from("reliability.csv"))]
    reliability_output: String,
    /// Append to the output files.
    #[arg(long, default_value_t = false)]
    append: bool,
    /// Discard invocations whose latency is negative.
    #[arg(long, default_value_t = false)]
    discard_negative: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let trigger_filter = match args.trigger.to_lowercase().as_str() {
        "all" => None,
        other => Some(TriggerType::new(other)?),
    };

    let profiles = if args.shapes.is_empty() {
        ProfileTable::builtin()
    } else {
        ProfileTable::with_overrides(&std::fs::read_to_string(&args.shapes)?)?
    };

    let mut loaded = LoadedTelemetry::default();
    for path in args.input.split(',').filter(|path| !path.is_empty()) {
        loaded.merge(csv_loader::load_file(path)?);
    }
    anyhow::ensure!(!loaded.events.is_empty(), "no telemetry events loaded");

    // Untagged rows are kept: they belong to groups whose trigger is
    // only known from their tagged siblings.
    if let Some(trigger) = trigger_filter {
        let wanted = trigger.to_string();
        loaded.events.retain(|event| event.tags.trigger.is_empty() || event.tags.trigger == wanted);
    }

    let engine = Engine::new(profiles, args.discard_negative);
    let output = engine.run(loaded.events, &loaded.switches)?;

    let mut latency_dumper = CsvDumper::new(&args.latency_output, LATENCY_HEADER, args.append)?;
    for trace in &output.traces {
        latency_dumper.add(&latency_row(trace));
    }

    let mut completion_dumper = CsvDumper::new(&args.completion_output, COMPLETION_HEADER, args.append)?;
    for sample in &output.completions {
        completion_dumper.add(&completion_row(sample));
    }

    let mut reliability_dumper = CsvDumper::new(&args.reliability_output, RELIABILITY_HEADER, args.append)?;
    for (key, tally) in &output.tallies {
        reliability_dumper.add(&reliability_row(key, tally));
    }

    log::info!("latency samples     = {}", output.traces.len());
    log::info!("completion samples  = {}", output.completions.len());
    log::info!("reliability rows    = {}", output.tallies.len());

    Ok(())
}
