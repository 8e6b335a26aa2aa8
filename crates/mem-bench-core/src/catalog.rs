//! The standard operation catalog.
//!
//! Every implementation is measured on the same suites and operation keys so
//! the two sides of a comparison line up key for key:
//!
//! | suite | operation key | timed call |
//! |---|---|---|
//! | `memory_creation` | `memory_creation_<size>` | insert one record |
//! | `memory_with_embedding` | `memory_with_embedding_<dim>` | insert one record with an embedding |
//! | `memory_retrieval` | `memory_retrieval` | fetch one seeded record by id |
//! | `memory_listing` | `memory_list_user_<n>` | list every record of a user holding `n` |

use std::hint::black_box;

use rand::Rng;

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::models::{BenchmarkSuite, SuiteSet};
use crate::runner::{run, run_with_setup};
use crate::store::{MemoryStore, RecordId};
use crate::workload::{random_content, random_embedding};

pub const SUITE_CREATION: &str = "memory_creation";
pub const SUITE_EMBEDDING: &str = "memory_with_embedding";
pub const SUITE_RETRIEVAL: &str = "memory_retrieval";
pub const SUITE_LISTING: &str = "memory_listing";

/// User every benchmark record is filed under.
pub const BENCH_USER: &str = "bench-user";

#[must_use]
pub fn creation_key(size: usize) -> String {
    format!("{SUITE_CREATION}_{size}")
}

#[must_use]
pub fn embedding_key(dim: usize) -> String {
    format!("{SUITE_EMBEDDING}_{dim}")
}

#[must_use]
pub fn retrieval_key() -> String {
    SUITE_RETRIEVAL.to_string()
}

#[must_use]
pub fn listing_key(records: usize) -> String {
    format!("memory_list_user_{records}")
}

/// Shape of one run: iteration count and fixture sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub iterations: u32,
    pub content_sizes: Vec<usize>,
    pub embedding_dims: Vec<usize>,
    pub list_sizes: Vec<usize>,
    pub fixture_content_size: usize,
    pub retrieval_fixture: usize,
}

impl Workload {
    #[must_use]
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            iterations: config.iterations,
            content_sizes: config.content_sizes.clone(),
            embedding_dims: config.embedding_dims.clone(),
            list_sizes: config.list_sizes.clone(),
            fixture_content_size: config.fixture_content_size,
            retrieval_fixture: config.retrieval_fixture,
        }
    }

    /// Every suite name with its operation keys, in report order.
    #[must_use]
    pub fn operation_keys(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            (
                SUITE_CREATION,
                self.content_sizes.iter().copied().map(creation_key).collect(),
            ),
            (
                SUITE_EMBEDDING,
                self.embedding_dims.iter().copied().map(embedding_key).collect(),
            ),
            (SUITE_RETRIEVAL, vec![retrieval_key()]),
            (
                SUITE_LISTING,
                self.list_sizes.iter().copied().map(listing_key).collect(),
            ),
        ]
    }
}

/// Run every catalog suite against `store`, sequentially.
///
/// The store is reset before each suite; fixture seeding and input
/// generation happen outside the timed region.
pub fn run_catalog<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    workload: &Workload,
    rng: &mut R,
) -> Result<SuiteSet> {
    tracing::info!(store = store.name(), iterations = workload.iterations, "running catalog");

    let mut suites = SuiteSet::new();
    suites.insert(SUITE_CREATION.to_string(), creation_suite(store, workload, rng)?);
    suites.insert(SUITE_EMBEDDING.to_string(), embedding_suite(store, workload, rng)?);
    suites.insert(SUITE_RETRIEVAL.to_string(), retrieval_suite(store, workload, rng)?);
    suites.insert(SUITE_LISTING.to_string(), listing_suite(store, workload, rng)?);
    store.reset()?;
    Ok(suites)
}

fn creation_suite<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    workload: &Workload,
    rng: &mut R,
) -> Result<BenchmarkSuite> {
    let mut suite = BenchmarkSuite::new();
    for &size in &workload.content_sizes {
        store.reset()?;
        let key = creation_key(size);
        let result = run_with_setup(
            &key,
            workload.iterations,
            || Ok(random_content(rng, size)),
            |content| store.add(BENCH_USER, content).map(consume),
        )?;
        suite.insert(key, result.summarize()?);
    }
    Ok(suite)
}

fn embedding_suite<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    workload: &Workload,
    rng: &mut R,
) -> Result<BenchmarkSuite> {
    let mut suite = BenchmarkSuite::new();
    for &dim in &workload.embedding_dims {
        store.reset()?;
        let key = embedding_key(dim);
        let content_size = workload.fixture_content_size;
        let result = run_with_setup(
            &key,
            workload.iterations,
            || Ok((random_content(rng, content_size), random_embedding(rng, dim))),
            |(content, embedding)| {
                store
                    .add_with_embedding(BENCH_USER, content, embedding)
                    .map(consume)
            },
        )?;
        suite.insert(key, result.summarize()?);
    }
    Ok(suite)
}

fn retrieval_suite<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    workload: &Workload,
    rng: &mut R,
) -> Result<BenchmarkSuite> {
    store.reset()?;
    let ids = seed_records(store, workload.retrieval_fixture, workload.fixture_content_size, rng)?;

    if ids.is_empty() {
        return Err(BenchError::InvalidConfig(
            "retrieval fixture must hold at least one record".to_string(),
        ));
    }

    let key = retrieval_key();
    let store: &dyn MemoryStore = store;
    let result = run_with_setup(
        &key,
        workload.iterations,
        || Ok(ids[rng.gen_range(0..ids.len())]),
        |id| match store.get(id)? {
            Some(record) => {
                consume(record);
                Ok(())
            }
            None => Err(BenchError::Store(format!("seeded record {id} is missing"))),
        },
    )?;

    let mut suite = BenchmarkSuite::new();
    suite.insert(key, result.summarize()?);
    Ok(suite)
}

fn listing_suite<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    workload: &Workload,
    rng: &mut R,
) -> Result<BenchmarkSuite> {
    let mut suite = BenchmarkSuite::new();
    for &records in &workload.list_sizes {
        store.reset()?;
        seed_records(store, records, workload.fixture_content_size, rng)?;

        let key = listing_key(records);
        let reader: &dyn MemoryStore = store;
        let result = run(&key, workload.iterations, || {
            reader.list_for_user(BENCH_USER).map(consume)
        })?;
        suite.insert(key, result.summarize()?);
    }
    Ok(suite)
}

/// Keep the optimizer from discarding a timed call's output.
fn consume<T>(value: T) {
    black_box(value);
}

fn seed_records<R: Rng + ?Sized>(
    store: &mut dyn MemoryStore,
    count: usize,
    content_size: usize,
    rng: &mut R,
) -> Result<Vec<RecordId>> {
    (0..count)
        .map(|_| store.add(BENCH_USER, random_content(rng, content_size)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::workload::seeded_rng;

    fn tiny_workload() -> Workload {
        Workload {
            iterations: 3,
            content_sizes: vec![1, 16],
            embedding_dims: vec![4],
            list_sizes: vec![0, 5],
            fixture_content_size: 8,
            retrieval_fixture: 4,
        }
    }

    #[test]
    fn catalog_produces_every_suite_and_key() {
        let workload = tiny_workload();
        let mut store = InMemoryStore::new();
        let suites = run_catalog(&mut store, &workload, &mut seeded_rng(Some(3))).expect("catalog");

        for (suite, keys) in workload.operation_keys() {
            let measured = suites.get(suite).expect("suite present");
            let measured_keys: Vec<_> = measured.keys().cloned().collect();
            let mut expected = keys.clone();
            expected.sort();
            assert_eq!(measured_keys, expected, "suite {suite}");
        }
        assert!(suites[SUITE_CREATION].contains_key("memory_creation_16"));
        assert!(suites[SUITE_LISTING].contains_key("memory_list_user_5"));
        assert!(store.is_empty(), "catalog leaves the store reset");
    }

    #[test]
    fn statistics_are_ordered() {
        let mut store = InMemoryStore::new();
        let suites =
            run_catalog(&mut store, &tiny_workload(), &mut seeded_rng(Some(9))).expect("catalog");
        for suite in suites.values() {
            for stats in suite.values() {
                assert!(stats.min_ms <= stats.median_ms);
                assert!(stats.median_ms <= stats.max_ms);
                assert!(stats.min_ms <= stats.mean_ms && stats.mean_ms <= stats.max_ms);
            }
        }
    }

    #[test]
    fn zero_iterations_fail_before_timing() {
        let mut workload = tiny_workload();
        workload.iterations = 0;
        let mut store = InMemoryStore::new();
        let err = run_catalog(&mut store, &workload, &mut seeded_rng(Some(1)))
            .expect_err("zero iterations");
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn store_errors_propagate() {
        let mut workload = tiny_workload();
        workload.embedding_dims = vec![0];
        let mut store = InMemoryStore::new();
        let err = run_catalog(&mut store, &workload, &mut seeded_rng(Some(1)))
            .expect_err("empty embedding rejected by store");
        assert!(matches!(err, BenchError::Store(_)));
    }
}
