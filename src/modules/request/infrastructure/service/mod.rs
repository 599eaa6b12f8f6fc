pub mod concurrency_orchestrator;

pub use concurrency_orchestrator::{
    AuxiliaryFetch, BatchReport, ChunkOutcome, ConcurrencyOrchestrator, EnrichmentOutcome,
    EnrichmentTarget, SlotOutcome,
};
