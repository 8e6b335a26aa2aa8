//! Core types and building blocks for mem-bench
//!
//! This crate provides:
//! - Configuration management (`BenchConfig`, environment parsing)
//! - Synthetic workload generation and the standard operation catalog
//! - The sequential timed runner and latency statistics
//! - Timestamped artifact persistence and the comparison report assembler
//! - Markdown summaries written beside each comparison report
//! - Common error types

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod report;
pub mod runner;
pub mod stats;
pub mod store;
pub mod workload;

// Re-export key types for convenience
pub use catalog::{Workload, run_catalog};
pub use config::BenchConfig;
pub use error::{BenchError, ProvisionStep, Result};
pub use models::{BenchmarkSuite, OperationResult, SuiteSet, SummaryStatistic};
pub use persist::{load_json, persist, persist_at, persist_beside};
pub use report::{ComparisonReport, SummaryEntry, SummaryMode, assemble};
pub use runner::{run, run_with_setup};
pub use stats::summarize;
pub use store::{InMemoryStore, MemoryRecord, MemoryStore, RecordId};
pub use workload::{random_content, random_embedding, seeded_rng};
