//! Data model for benchmark samples and their reductions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::summarize;

/// Per-invocation latencies for one named operation, in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    name: String,
    latencies_ms: Vec<f64>,
}

impl OperationResult {
    #[must_use]
    pub fn new(name: impl Into<String>, latencies_ms: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            latencies_ms,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn latencies_ms(&self) -> &[f64] {
        &self.latencies_ms
    }

    /// Reduce the recorded latencies to summary statistics.
    pub fn summarize(&self) -> Result<SummaryStatistic> {
        summarize(&self.latencies_ms)
    }
}

/// Mean/median/extrema reduction of a latency sample, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStatistic {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl SummaryStatistic {
    /// Placeholder used where one side of a comparison has no data yet.
    pub const ZERO: Self = Self {
        mean_ms: 0.0,
        median_ms: 0.0,
        min_ms: 0.0,
        max_ms: 0.0,
    };
}

/// Operation key → statistics for one suite (e.g. `memory_creation_100`).
pub type BenchmarkSuite = BTreeMap<String, SummaryStatistic>;

/// Suite name → suite. This is the raw-results artifact shape.
pub type SuiteSet = BTreeMap<String, BenchmarkSuite>;
