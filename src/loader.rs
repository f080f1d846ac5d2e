//! Batch coordinator: drives the record stream in chunk-sized
//! transactions.
//!
//! Each chunk is mapped, applied through the upsert engine, and committed
//! as one transaction. Unmappable records and data-level store rejections
//! are counted and sampled without stopping the run; transaction failures
//! abort it. Because every mutation is a merge on a natural key, chunks
//! commute and the optional parallel mode needs no cross-chunk ordering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use neo4rs::Graph;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{is_client_error, LoadError, Result};
use crate::mapper::map_record;
use crate::model::MappedRecord;
use crate::source::SourceRecord;
use crate::upsert::apply_record;

/// Records per chunk transaction unless overridden.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Per-record failure samples kept in the report unless overridden.
pub const DEFAULT_ERROR_SAMPLES: usize = 20;

/// Upper bound on concurrently open chunk transactions in parallel mode.
const MAX_IN_FLIGHT_CHUNKS: usize = 4;

/// Tuning knobs for a load run.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Records committed per transaction.
    pub chunk_size: usize,
    /// Run chunks on concurrent workers, each with its own transaction.
    /// Safe because per-key merges are atomic on the server.
    pub parallel: bool,
    /// Maximum per-record failure samples retained in the report.
    pub error_samples: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel: false,
            error_samples: DEFAULT_ERROR_SAMPLES,
        }
    }
}

/// One skipped record: its 1-based position in the stream and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// 1-based record number within the source stream.
    pub record: u64,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Aggregated outcome of a load run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Records pulled from the source.
    pub records_seen: u64,
    /// Records fully applied and committed.
    pub records_loaded: u64,
    /// Records skipped before reaching the store.
    pub mapping_errors: u64,
    /// Records the store rejected with a data-level error.
    pub upsert_errors: u64,
    /// Chunks fully applied — committed as one transaction, or replayed
    /// record-per-transaction after a data-level failure.
    pub chunks_committed: u64,
    /// Bounded sample of per-record failures.
    pub samples: Vec<RecordFailure>,
}

impl LoadReport {
    /// Total records skipped for any per-record reason.
    pub fn records_skipped(&self) -> u64 {
        self.mapping_errors + self.upsert_errors
    }

    fn sample(&mut self, cap: usize, record: u64, reason: String) {
        if self.samples.len() < cap {
            self.samples.push(RecordFailure { record, reason });
        }
    }

    fn merge_chunk(&mut self, outcome: ChunkOutcome, cap: usize) {
        self.records_loaded += outcome.loaded;
        self.upsert_errors += outcome.failures.len() as u64;
        self.chunks_committed += 1;
        for failure in outcome.failures {
            if self.samples.len() >= cap {
                break;
            }
            self.samples.push(failure);
        }
    }
}

#[derive(Debug, Default)]
struct ChunkOutcome {
    loaded: u64,
    failures: Vec<RecordFailure>,
}

/// Drives records through mapping and upserts against one graph store.
pub struct Loader {
    graph: Graph,
    opts: LoaderOptions,
    stop: Arc<AtomicBool>,
}

impl Loader {
    /// Coordinator over an owned store handle.
    pub fn new(graph: Graph, opts: LoaderOptions) -> Self {
        Loader {
            graph,
            opts,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run at the next chunk boundary. Committed
    /// chunks stay committed; no chunk is left half-applied.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Consumes the record stream and returns the run report.
    ///
    /// Per-record mapping and data errors are aggregated into the report;
    /// a transaction or connectivity failure aborts with the failing
    /// chunk's index.
    pub async fn run<I>(&self, records: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = std::result::Result<SourceRecord, csv::Error>>,
    {
        if self.opts.chunk_size == 0 {
            return Err(LoadError::InvalidArgument(
                "chunk size must be at least 1".into(),
            ));
        }
        let mut iter = records.into_iter();
        if self.opts.parallel {
            self.run_parallel(&mut iter).await
        } else {
            self.run_sequential(&mut iter).await
        }
    }

    async fn run_sequential<I>(&self, iter: &mut I) -> Result<LoadReport>
    where
        I: Iterator<Item = std::result::Result<SourceRecord, csv::Error>>,
    {
        let cap = self.opts.error_samples;
        let mut report = LoadReport::default();
        let mut next_record = 0u64;
        let mut chunk_index = 0usize;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!(chunk = chunk_index, "load.stopped");
                break;
            }
            let (chunk, exhausted) = collect_chunk(
                iter,
                self.opts.chunk_size,
                &mut next_record,
                &mut report,
                cap,
            );
            if !chunk.is_empty() {
                let outcome = commit_chunk(self.graph.clone(), chunk_index, chunk).await?;
                info!(chunk = chunk_index, loaded = outcome.loaded, "chunk.committed");
                report.merge_chunk(outcome, cap);
                chunk_index += 1;
            }
            if exhausted {
                break;
            }
        }
        Ok(report)
    }

    async fn run_parallel<I>(&self, iter: &mut I) -> Result<LoadReport>
    where
        I: Iterator<Item = std::result::Result<SourceRecord, csv::Error>>,
    {
        let cap = self.opts.error_samples;
        let mut report = LoadReport::default();
        let mut next_record = 0u64;
        let mut chunk_index = 0usize;
        let mut workers: JoinSet<Result<(usize, ChunkOutcome)>> = JoinSet::new();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!(chunk = chunk_index, "load.stopped");
                break;
            }
            let (chunk, exhausted) = collect_chunk(
                iter,
                self.opts.chunk_size,
                &mut next_record,
                &mut report,
                cap,
            );
            if !chunk.is_empty() {
                while workers.len() >= MAX_IN_FLIGHT_CHUNKS {
                    drain_one(&mut workers, &mut report, cap).await?;
                }
                let graph = self.graph.clone();
                let index = chunk_index;
                workers.spawn(async move {
                    commit_chunk(graph, index, chunk)
                        .await
                        .map(|outcome| (index, outcome))
                });
                chunk_index += 1;
            }
            if exhausted {
                break;
            }
        }
        while !workers.is_empty() {
            drain_one(&mut workers, &mut report, cap).await?;
        }
        Ok(report)
    }
}

async fn drain_one(
    workers: &mut JoinSet<Result<(usize, ChunkOutcome)>>,
    report: &mut LoadReport,
    cap: usize,
) -> Result<()> {
    if let Some(joined) = workers.join_next().await {
        let (index, outcome) = joined??;
        info!(chunk = index, loaded = outcome.loaded, "chunk.committed");
        report.merge_chunk(outcome, cap);
    }
    Ok(())
}

/// Pulls up to `chunk_size` mappable records, recording mapping failures
/// along the way. Returns the chunk and whether the stream ended.
fn collect_chunk<I>(
    iter: &mut I,
    chunk_size: usize,
    next_record: &mut u64,
    report: &mut LoadReport,
    cap: usize,
) -> (Vec<(u64, MappedRecord)>, bool)
where
    I: Iterator<Item = std::result::Result<SourceRecord, csv::Error>>,
{
    let mut chunk = Vec::with_capacity(chunk_size);
    while chunk.len() < chunk_size {
        let item = match iter.next() {
            Some(item) => item,
            None => return (chunk, true),
        };
        *next_record += 1;
        let record_no = *next_record;
        report.records_seen += 1;
        match item {
            Ok(record) => match map_record(&record) {
                Ok(mapped) => chunk.push((record_no, mapped)),
                Err(err) => {
                    debug!(record = record_no, error = %err, "record.unmappable");
                    report.mapping_errors += 1;
                    report.sample(cap, record_no, err.to_string());
                }
            },
            Err(err) => {
                debug!(record = record_no, error = %err, "record.unreadable");
                report.mapping_errors += 1;
                report.sample(cap, record_no, format!("unreadable row: {err}"));
            }
        }
    }
    (chunk, false)
}

/// Applies a whole chunk in one transaction. A data-level failure on any
/// record poisons the transaction, so the chunk is rolled back and
/// replayed record-per-transaction; merges make the replay idempotent.
async fn commit_chunk(
    graph: Graph,
    chunk_index: usize,
    chunk: Vec<(u64, MappedRecord)>,
) -> Result<ChunkOutcome> {
    let mut txn = graph
        .start_txn()
        .await
        .map_err(|source| LoadError::ChunkCommit {
            chunk: chunk_index,
            source,
        })?;

    for (record_no, mapped) in &chunk {
        if let Err(err) = apply_record(&mut txn, mapped).await {
            if is_client_error(&err) {
                warn!(
                    chunk = chunk_index,
                    record = *record_no,
                    error = %err,
                    "chunk.replaying_per_record"
                );
                let _ = txn.rollback().await;
                return salvage_chunk(&graph, chunk_index, &chunk).await;
            }
            return Err(LoadError::ChunkCommit {
                chunk: chunk_index,
                source: err,
            });
        }
    }

    txn.commit()
        .await
        .map_err(|source| LoadError::ChunkCommit {
            chunk: chunk_index,
            source,
        })?;
    Ok(ChunkOutcome {
        loaded: chunk.len() as u64,
        failures: Vec::new(),
    })
}

/// Replays a chunk one record per transaction, skipping records the store
/// rejects. Only used after a data-level failure inside the chunk.
async fn salvage_chunk(
    graph: &Graph,
    chunk_index: usize,
    chunk: &[(u64, MappedRecord)],
) -> Result<ChunkOutcome> {
    let mut outcome = ChunkOutcome::default();
    for (record_no, mapped) in chunk {
        let mut txn = graph
            .start_txn()
            .await
            .map_err(|source| LoadError::ChunkCommit {
                chunk: chunk_index,
                source,
            })?;
        match apply_record(&mut txn, mapped).await {
            Ok(()) => {
                txn.commit()
                    .await
                    .map_err(|source| LoadError::ChunkCommit {
                        chunk: chunk_index,
                        source,
                    })?;
                outcome.loaded += 1;
            }
            Err(err) if is_client_error(&err) => {
                debug!(record = *record_no, error = %err, "record.rejected");
                let _ = txn.rollback().await;
                outcome.failures.push(RecordFailure {
                    record: *record_no,
                    reason: err.to_string(),
                });
            }
            Err(source) => {
                return Err(LoadError::ChunkCommit {
                    chunk: chunk_index,
                    source,
                })
            }
        }
    }
    Ok(outcome)
}
