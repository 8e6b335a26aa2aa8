//! End-to-end benchmark pipeline.
//!
//! A full run provisions the reference environment, measures the reference
//! through its driver, measures the candidate in-process, and writes one
//! comparison report. The pipeline can also run one side at a time and merge
//! the artifacts later (`compare`), with `finalize` filling in summaries of a
//! report written in deferred mode.
//!
//! Every report gets a Markdown summary beside it, named after the report.
//! A report is written only after every stage it depends on has succeeded.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use mem_bench_core::{
    BenchConfig, ComparisonReport, InMemoryStore, Result, SuiteSet, Workload, assemble, load_json,
    persist, persist_beside, run_catalog, seeded_rng,
};

use crate::process::ProcessRunner;
use crate::provision::{Environment, InstallPlan, Provisioner, RefreshPolicy};
use crate::reference::run_reference;

/// File name prefix of comparison reports.
pub const REPORT_PREFIX: &str = "comparison";
/// File name prefix of standalone candidate results.
pub const CANDIDATE_PREFIX: &str = "candidate";

/// A written comparison report and its Markdown summary.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub summary_path: PathBuf,
    pub report: ComparisonReport,
}

impl RunOutcome {
    fn persist(report: ComparisonReport, results_dir: &Path) -> Result<Self> {
        let report_path = persist(&report, results_dir, REPORT_PREFIX)?;
        let summary_path = persist_beside(&report_path, "md", &report.to_markdown())?;
        Ok(Self {
            report_path,
            summary_path,
            report,
        })
    }
}

pub struct Pipeline<'a> {
    config: &'a BenchConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a BenchConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self { config, runner }
    }

    fn workload(&self) -> Workload {
        Workload::from_config(self.config)
    }

    /// Ensure the reference environment exists.
    pub fn provision(&self) -> Result<Environment> {
        let plan = InstallPlan::from_config(self.config)?;
        Provisioner::new(self.runner, plan).provision(
            &self.config.reference_source,
            &self.config.environment_dir(),
            RefreshPolicy::from_flag(self.config.force_refresh),
        )
    }

    pub fn reference_suites(&self, env: &Environment) -> Result<SuiteSet> {
        run_reference(
            self.runner,
            env,
            &self.workload(),
            self.config.seed,
            &self.config.raw_results_path(),
        )
    }

    pub fn candidate_suites(&self) -> Result<SuiteSet> {
        let mut store = InMemoryStore::new();
        let mut rng = seeded_rng(self.config.seed);
        run_catalog(&mut store, &self.workload(), &mut rng)
    }

    /// Provision, measure both sides, and write the comparison report.
    pub fn run_full(&self) -> Result<RunOutcome> {
        self.config.validate()?;
        let env = self.provision()?;
        let reference = self.reference_suites(&env)?;
        let candidate = self.candidate_suites()?;
        self.write_report(Some(&reference), Some(&candidate))
    }

    /// Provision and measure the reference only. The report carries zeroed
    /// candidate placeholders.
    pub fn run_reference_phase(&self) -> Result<RunOutcome> {
        self.config.validate()?;
        let env = self.provision()?;
        let reference = self.reference_suites(&env)?;
        self.write_report(Some(&reference), None)
    }

    /// Measure the candidate only and persist its raw suites.
    pub fn run_candidate_phase(&self) -> Result<PathBuf> {
        self.config.validate()?;
        let candidate = self.candidate_suites()?;
        persist(&candidate, &self.config.results_dir, CANDIDATE_PREFIX)
    }

    /// Merge previously written raw suites into a report.
    pub fn compare(&self, reference: Option<&Path>, candidate: Option<&Path>) -> Result<RunOutcome> {
        let reference = reference.map(load_json::<SuiteSet>).transpose()?;
        let candidate = candidate.map(load_json::<SuiteSet>).transpose()?;
        self.write_report(reference.as_ref(), candidate.as_ref())
    }

    /// Recompute the summaries of an existing report and write the result
    /// as a new artifact. The input report is left untouched.
    pub fn finalize(&self, report_path: &Path) -> Result<RunOutcome> {
        let mut report: ComparisonReport = load_json(report_path)?;
        report.finalize();
        RunOutcome::persist(report, &self.config.results_dir)
    }

    fn write_report(
        &self,
        reference: Option<&SuiteSet>,
        candidate: Option<&SuiteSet>,
    ) -> Result<RunOutcome> {
        let report = assemble(reference, candidate, self.config.summary_mode)?;
        RunOutcome::persist(report, &self.config.results_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CapturedOutput;
    use crate::test_support::FakeRunner;
    use mem_bench_core::{BenchError, ProvisionStep, SummaryMode, SummaryStatistic};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn config() -> (TempDir, BenchConfig) {
        let dir = tempdir().expect("tempdir");
        let mut config = BenchConfig::with_project_root(dir.path());
        config.reference_source = "https://example.invalid/mem0.git".to_string();
        config.iterations = 2;
        config.content_sizes = vec![10];
        config.embedding_dims = vec![8];
        config.list_sizes = vec![3];
        config.fixture_content_size = 8;
        config.retrieval_fixture = 3;
        config.seed = Some(11);
        (dir, config)
    }

    /// Reference suites covering every key the test workload produces.
    fn reference_for(config: &BenchConfig) -> SuiteSet {
        let mut suites = SuiteSet::new();
        for (suite, keys) in Workload::from_config(config).operation_keys() {
            let entry = suites.entry(suite.to_string()).or_default();
            for key in keys {
                entry.insert(
                    key,
                    SummaryStatistic {
                        mean_ms: 5.0,
                        median_ms: 5.0,
                        min_ms: 4.0,
                        max_ms: 6.0,
                    },
                );
            }
        }
        suites
    }

    fn files_with_extension(config: &BenchConfig, extension: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(&config.results_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| p.extension().is_some_and(|ext| ext == extension))
                    .collect()
            })
            .unwrap_or_default();
        found.sort();
        found
    }

    fn report_files(config: &BenchConfig) -> Vec<PathBuf> {
        files_with_extension(config, "json")
    }

    #[test]
    fn full_run_writes_one_report_with_both_sides() {
        let (_dir, config) = config();
        let runner = FakeRunner::new().with_driver_output(reference_for(&config));
        let outcome = Pipeline::new(&config, &runner).run_full().expect("run");

        assert_eq!(report_files(&config), vec![outcome.report_path.clone()]);
        let report = outcome.report;
        assert_eq!(report.reference_results, reference_for(&config));
        for (suite, ops) in &report.candidate_results {
            assert_eq!(
                ops.keys().collect::<Vec<_>>(),
                report.reference_results[suite].keys().collect::<Vec<_>>()
            );
        }
        let creation = report.comparison.suites["memory_creation"]["memory_creation_10"];
        assert!((creation.reference_mean_ms - 5.0).abs() < f64::EPSILON);
        assert!(report.summary_for("overall").is_some());
    }

    #[test]
    fn every_report_gets_a_markdown_summary_beside_it() {
        let (_dir, config) = config();
        let runner = FakeRunner::new().with_driver_output(reference_for(&config));
        let outcome = Pipeline::new(&config, &runner).run_full().expect("run");

        assert_eq!(files_with_extension(&config, "md"), vec![outcome.summary_path.clone()]);
        assert_eq!(
            outcome.summary_path.file_stem(),
            outcome.report_path.file_stem(),
            "summary shares the report timestamp"
        );
        let md = fs::read_to_string(&outcome.summary_path).expect("read summary");
        assert_eq!(md, outcome.report.to_markdown());
        assert!(md.contains("| memory_creation_10 | memory_creation | 5.0000 |"));
        assert!(md.contains("| **Average** |"));
    }

    #[test]
    fn second_run_reuses_environment() {
        let (_dir, config) = config();
        let runner = FakeRunner::new().with_driver_output(reference_for(&config));
        let pipeline = Pipeline::new(&config, &runner);
        pipeline.run_full().expect("first");
        pipeline.run_full().expect("second");
        assert_eq!(runner.count_matching("clone"), 1);
        assert_eq!(runner.count_matching(crate::reference::DRIVER_FILE_NAME), 2);
        assert_eq!(report_files(&config).len(), 2);
    }

    #[test]
    fn provisioning_failure_writes_no_report() {
        let (_dir, config) = config();
        let runner = FakeRunner::new().fail_on(
            "clone",
            CapturedOutput::failure(128, "fatal: repository not found"),
        );
        let err = Pipeline::new(&config, &runner).run_full().expect_err("fails");
        assert!(matches!(
            err,
            BenchError::Provisioning {
                step: ProvisionStep::Fetch,
                ..
            }
        ));
        assert!(err.to_string().contains("repository not found"));
        assert!(report_files(&config).is_empty());
    }

    #[test]
    fn driver_without_output_writes_no_report() {
        let (_dir, config) = config();
        let runner = FakeRunner::new();
        let err = Pipeline::new(&config, &runner).run_full().expect_err("fails");
        assert!(matches!(err, BenchError::MissingArtifact(_)));
        assert!(report_files(&config).is_empty());
    }

    #[test]
    fn invalid_config_fails_before_provisioning() {
        let (_dir, mut config) = config();
        config.iterations = 0;
        let runner = FakeRunner::new();
        let err = Pipeline::new(&config, &runner).run_full().expect_err("fails");
        assert!(matches!(err, BenchError::InvalidConfig(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn two_phase_deferred_pipeline() {
        let (_dir, mut config) = config();
        config.summary_mode = SummaryMode::Deferred;
        let runner = FakeRunner::new().with_driver_output(reference_for(&config));
        let pipeline = Pipeline::new(&config, &runner);

        let phase_one = pipeline.run_reference_phase().expect("reference phase");
        assert_eq!(
            phase_one.report.candidate_results["memory_creation"]["memory_creation_10"],
            SummaryStatistic::ZERO
        );
        assert!(
            phase_one
                .report
                .comparison
                .summary
                .values()
                .all(|entry| entry.speedup_factor == 0.0)
        );

        let candidate_path = pipeline.run_candidate_phase().expect("candidate phase");
        let merged = pipeline
            .compare(Some(&config.raw_results_path()), Some(&candidate_path))
            .expect("compare");
        assert_eq!(merged.report.summary_mode, SummaryMode::Deferred);

        let finalized = pipeline.finalize(&merged.report_path).expect("finalize");
        assert_eq!(finalized.report.summary_mode, SummaryMode::Immediate);
        let overall = finalized.report.summary_for("overall").expect("overall");
        assert!(overall.reference_avg_ms > 0.0);
        assert!(overall.candidate_avg_ms > 0.0);
        assert!(overall.speedup_factor > 0.0);
        assert_ne!(finalized.report_path, merged.report_path);
        assert_ne!(finalized.summary_path, merged.summary_path);
        let merged_md = fs::read_to_string(&merged.summary_path).expect("deferred summary");
        assert!(merged_md.contains("| **n/a** |"));
        let finalized_md = fs::read_to_string(&finalized.summary_path).expect("final summary");
        assert!(!finalized_md.contains("**n/a**"));
    }

    #[test]
    fn compare_with_missing_file_writes_nothing() {
        let (dir, config) = config();
        let runner = FakeRunner::new();
        let missing = dir.path().join("absent.json");
        let err = Pipeline::new(&config, &runner)
            .compare(Some(&missing), None)
            .expect_err("missing");
        assert!(matches!(err, BenchError::MissingArtifact(_)));
        assert!(report_files(&config).is_empty());
    }
}
