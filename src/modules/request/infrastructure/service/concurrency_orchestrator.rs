//! Fan-out of sub-requests for one logical operation
//!
//! Two shapes are supported:
//! - enrichment: one primary fetch, then N auxiliary fetches run concurrently
//!   and merged positionally, each failure replaced by the slot's default
//! - batch dispatch: ids split into contiguous chunks, one request per chunk,
//!   all chunks in flight at once and individually allowed to fail
//!
//! Sub-requests are polled inside the caller's future rather than spawned, so
//! dropping the caller cancels every sibling still in flight.

use futures::future::{join_all, BoxFuture};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::modules::request::domain::MAX_BATCH_CEILING;
use crate::modules::request::infrastructure::http_client::ResilientClient;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{LogContext, TimedOperation};

/// One auxiliary fetch. It may read the primary result but must not borrow it.
pub type AuxiliaryFetch<'a, P, A> = Box<dyn FnOnce(&P) -> BoxFuture<'a, AppResult<A>> + Send + 'a>;

/// A primary result that auxiliary slots can be merged into
pub trait EnrichmentTarget {
    /// Value produced by each auxiliary slot; `Default` is used for failed slots
    type Aux: Default + Send;

    /// Number of slots `merge_slot` maps to a field
    const SLOTS: usize;

    /// Write slot `slot`'s value into the field it owns. Must not touch
    /// fields that came from the primary fetch.
    fn merge_slot(&mut self, slot: usize, value: Self::Aux);
}

/// What one auxiliary slot produced before merging
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome<A> {
    Fetched(A),
    Defaulted { value: A, error: AppError },
}

impl<A: Default> SlotOutcome<A> {
    pub fn from_result(result: AppResult<A>) -> Self {
        match result {
            Ok(value) => SlotOutcome::Fetched(value),
            Err(error) => SlotOutcome::Defaulted {
                value: A::default(),
                error,
            },
        }
    }
}

impl<A> SlotOutcome<A> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, SlotOutcome::Fetched(_))
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            SlotOutcome::Fetched(_) => None,
            SlotOutcome::Defaulted { error, .. } => Some(error),
        }
    }

    pub fn into_value(self) -> A {
        match self {
            SlotOutcome::Fetched(value) | SlotOutcome::Defaulted { value, .. } => value,
        }
    }
}

/// Merged value plus the slots that fell back to defaults
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome<P> {
    pub value: P,
    pub failed_slots: Vec<(usize, AppError)>,
}

impl<P> EnrichmentOutcome<P> {
    pub fn is_complete(&self) -> bool {
        self.failed_slots.is_empty()
    }
}

/// Result of one chunk's batch request
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome<R> {
    pub index: usize,
    pub size: usize,
    pub result: AppResult<R>,
}

/// Settled outcome of every chunk of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<R> {
    pub chunks: Vec<ChunkOutcome<R>>,
}

impl<R> BatchReport<R> {
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.iter().map(|chunk| chunk.size).collect()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &R> {
        self.chunks.iter().filter_map(|chunk| chunk.result.as_ref().ok())
    }

    pub fn failed_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.result.is_err()).count()
    }

    /// Successful chunk results, failures dropped
    pub fn into_results(self) -> Vec<R> {
        self.chunks
            .into_iter()
            .filter_map(|chunk| chunk.result.ok())
            .collect()
    }
}

pub struct ConcurrencyOrchestrator {
    client: Arc<ResilientClient>,
    default_chunk_size: usize,
    max_batch_size: usize,
}

impl ConcurrencyOrchestrator {
    /// Chunk size and ceiling come from the client's config, capped at `MAX_BATCH_CEILING`
    pub fn new(client: Arc<ResilientClient>) -> Self {
        let max_batch_size = client.config().max_batch_size.min(MAX_BATCH_CEILING);
        let default_chunk_size = client.config().optimal_batch_size.min(max_batch_size);
        Self {
            client,
            default_chunk_size,
            max_batch_size,
        }
    }

    pub fn client(&self) -> &Arc<ResilientClient> {
        &self.client
    }

    pub fn default_chunk_size(&self) -> usize {
        self.default_chunk_size
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Primary first, auxiliaries concurrently, failures defaulted per slot.
    ///
    /// A failed primary is returned as the error. Auxiliary failures never are.
    /// Fetches past `P::SLOTS` have no field to land in and are never issued.
    pub async fn enrich_detailed<'a, P, PF, PFut>(
        &self,
        primary: PF,
        mut auxiliaries: Vec<AuxiliaryFetch<'a, P, P::Aux>>,
    ) -> AppResult<EnrichmentOutcome<P>>
    where
        P: EnrichmentTarget,
        PF: FnOnce() -> PFut,
        PFut: Future<Output = AppResult<P>>,
    {
        if auxiliaries.len() > P::SLOTS {
            warn!(
                "Enrichment: {} auxiliary fetches for {} slots, dropping the extra ones",
                auxiliaries.len(),
                P::SLOTS
            );
            auxiliaries.truncate(P::SLOTS);
        }

        let mut value = primary().await?;

        let pending: Vec<_> = auxiliaries.into_iter().map(|fetch| fetch(&value)).collect();
        debug!("Enrichment: {} auxiliary fetches in flight", pending.len());
        let results = join_all(pending).await;

        let mut failed_slots = Vec::new();
        for (slot, result) in results.into_iter().enumerate() {
            let outcome = SlotOutcome::from_result(result);
            if let Some(error) = outcome.error() {
                warn!("Enrichment slot {} defaulted after failure: {}", slot, error);
                failed_slots.push((slot, error.clone()));
            }
            value.merge_slot(slot, outcome.into_value());
        }

        Ok(EnrichmentOutcome {
            value,
            failed_slots,
        })
    }

    /// `enrich_detailed` without the per-slot failure detail
    pub async fn enrich<'a, P, PF, PFut>(
        &self,
        primary: PF,
        auxiliaries: Vec<AuxiliaryFetch<'a, P, P::Aux>>,
    ) -> AppResult<P>
    where
        P: EnrichmentTarget,
        PF: FnOnce() -> PFut,
        PFut: Future<Output = AppResult<P>>,
    {
        Ok(self.enrich_detailed(primary, auxiliaries).await?.value)
    }

    /// Split `ids` into ordered, contiguous chunks of at most `chunk_size`
    pub fn partition<I: Clone>(&self, ids: &[I], chunk_size: usize) -> AppResult<Vec<Vec<I>>> {
        if chunk_size == 0 || chunk_size > self.max_batch_size {
            return Err(AppError::InvalidBatchSize {
                requested: chunk_size,
                max: self.max_batch_size,
            });
        }
        Ok(ids.chunks(chunk_size).map(<[I]>::to_vec).collect())
    }

    /// One batch request, rejected before any I/O if it exceeds the ceiling
    pub async fn batch_request<I, R, F, Fut>(&self, ids: &[I], request: F) -> AppResult<R>
    where
        I: Clone,
        F: FnOnce(Vec<I>) -> Fut,
        Fut: Future<Output = AppResult<R>>,
    {
        if ids.len() > self.max_batch_size {
            return Err(AppError::InvalidBatchSize {
                requested: ids.len(),
                max: self.max_batch_size,
            });
        }
        request(ids.to_vec()).await
    }

    /// One request per chunk, all concurrently; waits until every chunk settles.
    ///
    /// `None` uses the configured `optimal_batch_size`.
    pub async fn dispatch_batches<I, R, F, Fut>(
        &self,
        ids: &[I],
        chunk_size: Option<usize>,
        request: F,
    ) -> AppResult<BatchReport<R>>
    where
        I: Clone,
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = AppResult<R>>,
    {
        let chunk_size = chunk_size.unwrap_or(self.default_chunk_size);
        let chunks = self.partition(ids, chunk_size)?;
        let request = &request;

        let pending = chunks.into_iter().enumerate().map(|(index, chunk)| async move {
            let size = chunk.len();
            let result = self.batch_request(&chunk, |ids| request(ids)).await;
            if let Err(error) = &result {
                LogContext::error_with_context(
                    error,
                    &format!("Batch chunk {} ({} ids) failed", index, size),
                );
            }
            ChunkOutcome {
                index,
                size,
                result,
            }
        });

        let report = BatchReport {
            chunks: join_all(pending).await,
        };
        debug!(
            "Batch dispatch settled: {} chunks, {} failed",
            report.chunks.len(),
            report.failed_count()
        );
        Ok(report)
    }

    /// Best-effort prefetch: chunk failures are logged and swallowed.
    ///
    /// Only an invalid `chunk_size` is reported, and it is reported before
    /// anything is sent. `None` uses the configured `optimal_batch_size`.
    pub async fn warm_cache<I, R, F, Fut>(
        &self,
        ids: &[I],
        chunk_size: Option<usize>,
        request: F,
    ) -> AppResult<()>
    where
        I: Clone,
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = AppResult<R>>,
    {
        if ids.is_empty() {
            return Ok(());
        }

        let timer = TimedOperation::new(&format!("warm_cache({} ids)", ids.len()));
        let report = self.dispatch_batches(ids, chunk_size, request).await?;
        timer.finish_with_info(&format!(
            "{}/{} chunks succeeded",
            report.chunks.len() - report.failed_count(),
            report.chunks.len()
        ));
        Ok(())
    }
}
