//! Data-parallel execution: split the batch, run the whole chain per chunk.
//!
//! Each contiguous chunk is processed end to end by its own OS thread,
//! bypassing the scheduler entirely; chunks never share documents, so no
//! cross-thread ordering is needed beyond the final in-order merge.

use parking_lot::Mutex;
use std::thread;

use crate::core::{PipelineError, Result};
use crate::scheduler::StageSpec;

/// Smallest chunk worth its own thread.
pub const MIN_CHUNK_SIZE: usize = 50;
/// Largest chunk a single thread should own.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Runs the full stage chain independently over contiguous chunks of the
/// batch, one worker thread per chunk.
pub struct PartitionedExecutor {
    stages: Vec<StageSpec>,
    num_workers: usize,
}

impl PartitionedExecutor {
    /// Create an executor over an ordered stage chain.
    pub fn new(stages: Vec<StageSpec>, num_workers: usize) -> Self {
        Self {
            stages,
            num_workers: num_workers.max(1),
        }
    }

    /// Chunk size for a batch of `batch_len` documents and `workers` threads.
    ///
    /// Small batches get one document per chunk. Otherwise the per-worker
    /// share is clamped into `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`; when the
    /// share is below the minimum, fewer effective workers are preferred by
    /// sizing against half the workers instead.
    pub fn chunk_size(batch_len: usize, workers: usize) -> usize {
        let workers = workers.max(1);
        if batch_len <= workers {
            return 1;
        }
        let share = batch_len / workers;
        if share < MIN_CHUNK_SIZE {
            (batch_len / (workers / 2).max(1)).min(MAX_CHUNK_SIZE).max(1)
        } else {
            share.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
        }
    }

    /// Number of chunks the plan produces for a batch of `batch_len`.
    pub fn chunk_count(batch_len: usize, workers: usize) -> usize {
        if batch_len == 0 {
            return 0;
        }
        batch_len.div_ceil(Self::chunk_size(batch_len, workers))
    }

    /// Process the batch and return the merged output in original order.
    ///
    /// Every chunk thread is joined even when a sibling fails; the first
    /// error is returned after all threads have finished.
    pub fn run(&self, batch: &[String]) -> Result<Vec<String>> {
        let total_docs = batch.len();
        let size = Self::chunk_size(total_docs, self.num_workers);
        let chunks: Vec<Vec<String>> = batch.chunks(size).map(<[String]>::to_vec).collect();
        let total_chunks = chunks.len();

        tracing::info!(
            documents = total_docs,
            chunks = total_chunks,
            chunk_size = size,
            "partitioned run starting"
        );

        let progress = Mutex::new(0usize);
        let progress_ref = &progress;
        let stages = &self.stages;

        let results: Vec<Result<Vec<String>>> = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .into_iter()
                .enumerate()
                .map(|(chunk_idx, mut chunk)| {
                    scope.spawn(move || -> Result<Vec<String>> {
                        for stage in stages {
                            (stage.body)(&mut chunk).map_err(|err| {
                                PipelineError::StageFailure {
                                    stage: stage.id.clone(),
                                    message: format!("chunk {chunk_idx}: {err}"),
                                }
                            })?;
                        }
                        let mut done = progress_ref.lock();
                        *done += 1;
                        tracing::debug!(
                            chunk = chunk_idx,
                            completed = *done,
                            total = total_chunks,
                            "chunk processed"
                        );
                        Ok(chunk)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(PipelineError::Worker {
                            message: "chunk worker panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        let mut merged = Vec::with_capacity(total_docs);
        let mut first_error = None;
        for result in results {
            match result {
                Ok(mut chunk) => merged.append(&mut chunk),
                Err(err) => {
                    tracing::error!(error = %err, "chunk failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                debug_assert_eq!(merged.len(), total_docs);
                Ok(merged)
            }
        }
    }
}
