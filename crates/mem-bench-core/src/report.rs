//! Comparison report assembly.
//!
//! A report always carries `python_results`, `rust_results` and `comparison`,
//! whether or not both sides have been measured. A side with no data is
//! filled with zero statistics mirroring the other side's suites and
//! operation keys, so consumers parse one shape across both phases of the
//! pipeline.
//!
//! `speedup_factor` is `reference / candidate` only when both averages are
//! non-zero. Otherwise it is `0.0`, which means "not yet computable", not
//! "no speedup".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::models::{SuiteSet, SummaryStatistic};
use crate::stats::mean_or_zero;

/// Current JSON schema version for comparison reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;
/// Key of the summary map inside `comparison`; no suite may use it.
pub const SUMMARY_KEY: &str = "summary";
/// Key of the cross-suite entry inside the summary map; no suite may use it.
pub const OVERALL_KEY: &str = "overall";

/// When summary averages are filled in.
///
/// `Immediate` computes them while assembling. `Deferred` writes them as zero
/// (so every summary `speedup_factor` is zero) and leaves it to a later
/// [`ComparisonReport::finalize`] pass, matching a two-phase pipeline where
/// the reference side lands first and the candidate side fills in later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    #[default]
    Immediate,
    Deferred,
}

impl SummaryMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Deferred => "deferred",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "deferred" => Ok(Self::Deferred),
            other => Err(format!(
                "unknown summary mode {other:?} (expected \"immediate\" or \"deferred\")"
            )),
        }
    }
}

/// Side-by-side means for one operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct OperationDiff {
    #[serde(rename = "python_mean_ms")]
    pub reference_mean_ms: f64,
    #[serde(rename = "rust_mean_ms")]
    pub candidate_mean_ms: f64,
    pub speedup_factor: f64,
}

/// Averages for one suite, or for every suite together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SummaryEntry {
    #[serde(rename = "python_avg_ms")]
    pub reference_avg_ms: f64,
    #[serde(rename = "rust_avg_ms")]
    pub candidate_avg_ms: f64,
    pub speedup_factor: f64,
}

impl SummaryEntry {
    #[must_use]
    pub fn from_averages(reference_avg_ms: f64, candidate_avg_ms: f64) -> Self {
        Self {
            reference_avg_ms,
            candidate_avg_ms,
            speedup_factor: speedup_factor(reference_avg_ms, candidate_avg_ms),
        }
    }
}

/// Per-suite diffs plus the summary map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Comparison {
    #[serde(flatten)]
    pub suites: BTreeMap<String, BTreeMap<String, OperationDiff>>,
    pub summary: BTreeMap<String, SummaryEntry>,
}

/// Comparison report envelope written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    pub schema_version: u32,
    pub generated_at: String,
    pub summary_mode: SummaryMode,
    #[serde(rename = "python_results")]
    pub reference_results: SuiteSet,
    #[serde(rename = "rust_results")]
    pub candidate_results: SuiteSet,
    pub comparison: Comparison,
}

impl ComparisonReport {
    /// Recompute every summary entry from the stored results.
    ///
    /// This is the second pass of a deferred pipeline; on an immediate report
    /// it is a no-op apart from the timestamp.
    pub fn finalize(&mut self) {
        self.comparison.summary = computed_summary(&self.reference_results, &self.candidate_results);
        self.summary_mode = SummaryMode::Immediate;
        self.generated_at = Utc::now().to_rfc3339();
    }

    /// Summary entry for one suite, or `overall`.
    #[must_use]
    pub fn summary_for(&self, key: &str) -> Option<&SummaryEntry> {
        self.comparison.summary.get(key)
    }

    /// Human-readable Markdown companion to the JSON report: one row per
    /// operation, then the cross-suite average and a short legend.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Reference (mem0) vs candidate (InMemoryStore) benchmark\n\n");
        md.push_str(&format!(
            "Generated {} ({} summaries).\n\n",
            self.generated_at, self.summary_mode
        ));
        md.push_str("| Operation | Suite | Reference (ms) | Candidate (ms) | Speedup |\n");
        md.push_str("|-----------|-------|----------------|----------------|---------|\n");
        for (suite_name, ops) in &self.comparison.suites {
            for (op, diff) in ops {
                md.push_str(&format!(
                    "| {op} | {suite_name} | {:.4} | {:.4} | {} |\n",
                    diff.reference_mean_ms,
                    diff.candidate_mean_ms,
                    speedup_cell(diff.speedup_factor),
                ));
            }
        }
        let overall = self.summary_for(OVERALL_KEY).copied().unwrap_or_default();
        md.push_str(&format!(
            "| **Average** | all | **{:.4}** | **{:.4}** | **{}** |\n",
            overall.reference_avg_ms,
            overall.candidate_avg_ms,
            speedup_cell(overall.speedup_factor),
        ));

        md.push_str("\nNotes:\n");
        md.push_str("- Speedup is reference / candidate; above 1.00x the candidate is faster.\n");
        md.push_str("- n/a means one side has no measurement yet, or summaries are deferred.\n");
        md.push_str("- Times are mean milliseconds per operation.\n");
        md
    }
}

fn speedup_cell(speedup: f64) -> String {
    if speedup == 0.0 {
        "n/a".to_string()
    } else {
        format!("{speedup:.2}x")
    }
}

/// `reference / candidate` when both are non-zero, otherwise `0.0`.
#[must_use]
pub fn speedup_factor(reference_ms: f64, candidate_ms: f64) -> f64 {
    if reference_ms == 0.0 || candidate_ms == 0.0 {
        0.0
    } else {
        reference_ms / candidate_ms
    }
}

/// Merge both sides into one report. Either side may be absent.
pub fn assemble(
    reference: Option<&SuiteSet>,
    candidate: Option<&SuiteSet>,
    mode: SummaryMode,
) -> Result<ComparisonReport> {
    let empty = SuiteSet::new();
    let reference_results = aligned(reference.unwrap_or(&empty), candidate.unwrap_or(&empty));
    let candidate_results = aligned(candidate.unwrap_or(&empty), reference.unwrap_or(&empty));

    for reserved in [SUMMARY_KEY, OVERALL_KEY] {
        if reference_results.contains_key(reserved) {
            return Err(BenchError::InvalidConfig(format!(
                "suite name {reserved:?} is reserved for the comparison summary"
            )));
        }
    }

    let summary = match mode {
        SummaryMode::Immediate => computed_summary(&reference_results, &candidate_results),
        SummaryMode::Deferred => deferred_summary(&reference_results),
    };

    tracing::debug!(
        reference = reference.is_some(),
        candidate = candidate.is_some(),
        mode = %mode,
        "assembled comparison report"
    );

    Ok(ComparisonReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        summary_mode: mode,
        comparison: Comparison {
            suites: operation_diffs(&reference_results, &candidate_results),
            summary,
        },
        reference_results,
        candidate_results,
    })
}

/// `side` plus zero placeholders for every suite/operation only `other` has.
fn aligned(side: &SuiteSet, other: &SuiteSet) -> SuiteSet {
    let mut out = side.clone();
    for (suite_name, suite) in other {
        let target = out.entry(suite_name.clone()).or_default();
        for op in suite.keys() {
            target.entry(op.clone()).or_insert(SummaryStatistic::ZERO);
        }
    }
    out
}

fn operation_diffs(
    reference: &SuiteSet,
    candidate: &SuiteSet,
) -> BTreeMap<String, BTreeMap<String, OperationDiff>> {
    reference
        .iter()
        .map(|(suite_name, suite)| {
            let diffs = suite
                .iter()
                .map(|(op, stats)| {
                    let candidate_mean_ms = candidate
                        .get(suite_name)
                        .and_then(|s| s.get(op))
                        .map_or(0.0, |s| s.mean_ms);
                    let diff = OperationDiff {
                        reference_mean_ms: stats.mean_ms,
                        candidate_mean_ms,
                        speedup_factor: speedup_factor(stats.mean_ms, candidate_mean_ms),
                    };
                    (op.clone(), diff)
                })
                .collect();
            (suite_name.clone(), diffs)
        })
        .collect()
}

fn suite_means(results: &SuiteSet, suite_name: &str) -> Vec<f64> {
    results
        .get(suite_name)
        .map(|suite| suite.values().map(|s| s.mean_ms).collect())
        .unwrap_or_default()
}

fn all_means(results: &SuiteSet) -> Vec<f64> {
    results
        .values()
        .flat_map(|suite| suite.values().map(|s| s.mean_ms))
        .collect()
}

fn computed_summary(reference: &SuiteSet, candidate: &SuiteSet) -> BTreeMap<String, SummaryEntry> {
    let mut summary: BTreeMap<String, SummaryEntry> = reference
        .keys()
        .chain(candidate.keys())
        .map(|suite_name| {
            let entry = SummaryEntry::from_averages(
                mean_or_zero(&suite_means(reference, suite_name)),
                mean_or_zero(&suite_means(candidate, suite_name)),
            );
            (suite_name.clone(), entry)
        })
        .collect();
    summary.insert(
        OVERALL_KEY.to_string(),
        SummaryEntry::from_averages(
            mean_or_zero(&all_means(reference)),
            mean_or_zero(&all_means(candidate)),
        ),
    );
    summary
}

fn deferred_summary(results: &SuiteSet) -> BTreeMap<String, SummaryEntry> {
    results
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(OVERALL_KEY))
        .map(|key| (key.to_string(), SummaryEntry::default()))
        .collect()
}
