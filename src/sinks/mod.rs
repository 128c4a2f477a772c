use async_trait::async_trait;

use crate::session::{ExtractionRun, Listing};

mod file_export;
mod remote_store;

pub(crate) use file_export::FileExport;
pub(crate) use remote_store::{HttpDocumentStore, RemoteStoreSink, StoreError};
#[cfg(test)]
pub(crate) use remote_store::{DocumentStore, MemoryDocumentStore};


pub(crate) const DEFAULT_SINKS: [&str; 2] = [FileExport::NAME, RemoteStoreSink::NAME];


#[derive(Debug, thiserror::Error)]
pub(crate) enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Store(#[from] StoreError)
}


/// A best effort destination for the results of a run
#[async_trait]
pub(crate) trait PersistenceSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn persist(&self, run: &ExtractionRun, listings: &[Listing]) -> Result<(), SinkError>;
}


#[derive(Debug)]
pub(crate) struct SinkOutcome {
    pub(crate) sink: &'static str,
    pub(crate) result: Result<(), SinkError>
}


impl SinkOutcome {
    pub(crate) fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}


/// Hands the run to every sink in turn.
///
/// A failing sink is logged and recorded, it never stops the sinks after it.
pub(crate) async fn persist_all(run: &ExtractionRun, listings: &[Listing], sinks: &[&dyn PersistenceSink]) -> Vec<SinkOutcome> {
    let mut outcomes = Vec::with_capacity(sinks.len());
    for sink in sinks {
        let result = sink.persist(run, listings).await;
        match &result {
            Ok(()) => tracing::info!(sink = sink.name(), listings = listings.len(), "Persisted run"),
            Err(e) => tracing::error!(sink = sink.name(), "Failed to persist run: {e}")
        }
        outcomes.push(SinkOutcome { sink: sink.name(), result });
    }
    outcomes
}
