// SPDX-License-Identifier: MIT

pub mod correlate;
pub mod csv_dumper;
pub mod csv_loader;
pub mod engine;
pub mod latency;
pub mod reliability;
pub mod utils;
