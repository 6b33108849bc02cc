use crate::cache::SnapshotCache;
use crate::classify::{classify, exceeds_altitude_ceiling};
use crate::errors::AggregateError;
use crate::metrics_defs::{MERGE_APPLIED, MERGE_FAILED, MERGE_SKIPPED, REPORTS_DROPPED_ALTITUDE};
use crate::report::{Report, ReportBatch};
use crate::spatial::CellIndexer;
use crate::store::AggregateStore;
use crate::types::{CacheSnapshot, CellAggregate, RadioFlags};
use shared::counter;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What a single merge did to the durable aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The store row was inserted or merged; carries the post-write state.
    Applied(CellAggregate),
    /// The cache proved the merge would change nothing; store untouched.
    Unchanged,
}

/// Totals for one submitted batch, logged once background ingestion finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub failed: usize,
}

/// The merge engine: drives classify → index → merge for each report and owns
/// the cache/store interplay.
pub struct Aggregator {
    indexer: CellIndexer,
    cache: SnapshotCache,
    store: Arc<dyn AggregateStore>,
    ingest_limit: Arc<Semaphore>,
}

impl Aggregator {
    pub fn new(
        indexer: CellIndexer,
        cache: SnapshotCache,
        store: Arc<dyn AggregateStore>,
        ingest_concurrency: usize,
    ) -> Self {
        Aggregator {
            indexer,
            cache,
            store,
            ingest_limit: Arc::new(Semaphore::new(ingest_concurrency.max(1))),
        }
    }

    /// Read-side queries bypass the cache and go straight to the store.
    pub fn store(&self) -> &Arc<dyn AggregateStore> {
        &self.store
    }

    /// Merge one observation's flags and timestamp into the cell's aggregate.
    ///
    /// The cached snapshot is consulted first; when it proves the merge is a
    /// no-op the store is not touched at all. The skip decision is best-effort
    /// and unsynchronized: a racing merge costs at most a redundant store
    /// write, which the OR/MAX upsert absorbs.
    pub async fn merge(
        &self,
        cell_id: &str,
        flags: RadioFlags,
        timestamp: i64,
    ) -> Result<MergeOutcome, AggregateError> {
        if let Some(snapshot) = self.cache.get(cell_id)
            && snapshot.covers(flags, timestamp)
        {
            counter!(MERGE_SKIPPED).increment(1);
            return Ok(MergeOutcome::Unchanged);
        }

        // On failure the cache is left alone so it never reflects an
        // unconfirmed write.
        let merged = self.store.upsert_merge(cell_id, flags, timestamp).await?;

        // Refresh from the authoritative post-write row, not from the inputs;
        // this also heals any drift a racing merge left behind.
        self.cache.insert(cell_id, CacheSnapshot::from(&merged));
        counter!(MERGE_APPLIED).increment(1);
        Ok(MergeOutcome::Applied(merged))
    }

    /// Classify, index, and merge one report. Returns `None` when the report
    /// is excluded by the altitude ceiling.
    pub async fn ingest_report(
        &self,
        report: &Report,
    ) -> Result<Option<MergeOutcome>, AggregateError> {
        if exceeds_altitude_ceiling(report) {
            counter!(REPORTS_DROPPED_ALTITUDE).increment(1);
            return Ok(None);
        }

        let flags = classify(report);
        let cell_id = self
            .indexer
            .cell_for(report.position.latitude, report.position.longitude)?;
        let timestamp = report.timestamp.div_euclid(1000);

        self.merge(&cell_id, flags, timestamp).await.map(Some)
    }

    /// Process every item of a batch on a bounded worker pool.
    ///
    /// Items are independent: failures are isolated to their report, counted,
    /// and logged, while siblings continue. Callers run this as background
    /// work after the submitter has already been acknowledged.
    pub async fn ingest_batch(self: Arc<Self>, batch: ReportBatch) -> BatchSummary {
        let mut join_set = JoinSet::new();

        for report in batch.items {
            let aggregator = Arc::clone(&self);
            join_set.spawn(async move {
                let _permit = aggregator.ingest_limit.clone().acquire_owned().await.ok();
                aggregator.ingest_report(&report).await
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(Some(MergeOutcome::Applied(_)))) => summary.applied += 1,
                Ok(Ok(Some(MergeOutcome::Unchanged))) => summary.skipped += 1,
                Ok(Ok(None)) => summary.dropped += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    counter!(MERGE_FAILED).increment(1);
                    tracing::error!(error = %e, "report aggregation failed");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(error = %e, "aggregation task panicked");
                }
            }
        }

        summary
    }
}
