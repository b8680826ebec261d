// SPDX-License-Identifier: MIT

static MILLI: i64 = 1000;
static NANOS_PER_MILLI: i64 = 1000000;

/// Elapsed whole milliseconds from `from` to `to`, built from the
/// delta's second and sub-second components. Negative when `to`
/// precedes `from`.
pub fn delta_ms(from: chrono::NaiveDateTime, to: chrono::NaiveDateTime) -> i64 {
    let delta = to - from;
    delta.num_seconds() * MILLI + delta.subsec_nanos() as i64 / NANOS_PER_MILLI
}

/// Arithmetic mean, 0.0 on an empty slice.
pub fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}
