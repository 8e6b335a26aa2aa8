//! Sequential timed operation runner.
//!
//! Iterations run one after another on the calling thread, never in
//! parallel and never reordered, so each latency is an independent sample of
//! one call against the implementation under test.

use std::time::{Duration, Instant};

use crate::error::{BenchError, Result};
use crate::models::OperationResult;

/// Convert an elapsed duration to fractional milliseconds.
#[must_use]
pub fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Time `operation` exactly `iterations` times.
pub fn run<F>(name: &str, iterations: u32, mut operation: F) -> Result<OperationResult>
where
    F: FnMut() -> Result<()>,
{
    run_with_setup(name, iterations, || Ok(()), |()| operation())
}

/// Time `operation` exactly `iterations` times, calling `setup` before each
/// call. Only `operation` is inside the timed region; the fixture `setup`
/// builds is moved into it.
pub fn run_with_setup<T, S, F>(
    name: &str,
    iterations: u32,
    mut setup: S,
    mut operation: F,
) -> Result<OperationResult>
where
    S: FnMut() -> Result<T>,
    F: FnMut(T) -> Result<()>,
{
    if iterations == 0 {
        return Err(BenchError::InvalidConfig(format!(
            "operation `{name}` needs at least one iteration"
        )));
    }

    let mut latencies_ms = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        let fixture = setup()?;
        let started = Instant::now();
        operation(fixture)?;
        latencies_ms.push(duration_ms(started.elapsed()));
    }

    tracing::debug!(operation = name, iterations, "timed operation finished");
    Ok(OperationResult::new(name, latencies_ms))
}
