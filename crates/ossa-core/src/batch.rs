//! Concurrent batch migration.
//!
//! Each document runs through its own independent pipeline invocation. The
//! only state shared between workers is the read-only rule set and validator
//! borrowed by the pipeline, so no locking is needed. Results are returned in
//! input order regardless of which worker finished first.

use std::thread;

use serde_json::Value;
use tracing::debug;

use ossa_contracts::{error::OssaResult, version::VersionId};

use crate::pipeline::{MigrationPipeline, PipelineReport};

/// Run `pipeline` over every document in `documents` using up to `jobs`
/// scoped worker threads.
///
/// `jobs == 0` is treated as 1. The i-th result always corresponds to the
/// i-th input document.
pub fn run_batch(
    pipeline: &MigrationPipeline<'_>,
    documents: &[Value],
    target: &VersionId,
    jobs: usize,
) -> Vec<OssaResult<PipelineReport>> {
    if documents.is_empty() {
        return Vec::new();
    }

    let workers = jobs.clamp(1, documents.len());
    let chunk_size = documents.len().div_ceil(workers);
    debug!(documents = documents.len(), workers, chunk_size, "starting batch migration");

    thread::scope(|scope| {
        let handles: Vec<_> = documents
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|doc| pipeline.run(doc, target))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
