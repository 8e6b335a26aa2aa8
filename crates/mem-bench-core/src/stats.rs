//! Latency statistics.

use crate::error::{BenchError, Result};
use crate::models::SummaryStatistic;

/// Reduce a latency sequence to mean, median, min and max.
///
/// The median is the element at index `n / 2` of the ascending sort, so an
/// even-length sample reports its upper middle element rather than the mean
/// of the two middle elements.
#[allow(clippy::cast_precision_loss)]
pub fn summarize(latencies_ms: &[f64]) -> Result<SummaryStatistic> {
    if latencies_ms.is_empty() {
        return Err(BenchError::EmptyInput);
    }

    let mut sorted = latencies_ms.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean_ms = sorted.iter().sum::<f64>() / n as f64;

    Ok(SummaryStatistic {
        mean_ms,
        median_ms: sorted[n / 2],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    })
}

/// Arithmetic mean, or zero for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
