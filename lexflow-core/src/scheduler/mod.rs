//! Dynamic DAG executor with a condition-variable-driven worker pool.
//!
//! One mutex guards all scheduling state (dependency counters, completion
//! flags, the ready queue, the shutdown flag); one condition variable wakes
//! idle workers. The document batch lives behind its own mutex and is held
//! only for the duration of a single stage body, never together with the
//! scheduler lock. Completion of a stage therefore happens-before the start
//! of every stage it releases, carried by the scheduler mutex.
//!
//! Stages with no path between them get no ordering guarantee from the
//! graph; because they share one batch they serialize on the batch lock
//! rather than run concurrently. Per-document partitioning is required for
//! genuine parallel branches over shared data; that is the partitioned
//! executor's job, not this scheduler's.

pub mod graph;
pub mod task;

pub use graph::TaskGraph;
pub use task::{StageBody, StageSpec};

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::core::{PipelineError, Result};
use crate::scheduler::task::ReadyQueue;

/// Counters describing one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStats {
    /// Stages in the graph.
    pub total_tasks: usize,
    /// Stages whose bodies have completed.
    pub completed_tasks: usize,
    /// Stages still outstanding.
    pub pending_tasks: usize,
    /// Workers used by the last `run()`.
    pub worker_count: usize,
}

/// Mutable scheduling state. Every field is only touched under the mutex.
struct Shared {
    /// Unsatisfied-predecessor count per stage (arena-indexed).
    remaining: Vec<usize>,
    /// Completion flag per stage.
    completed: Vec<bool>,
    ready: ReadyQueue,
    completed_count: usize,
    shutdown: bool,
    failure: Option<PipelineError>,
    worker_count: usize,
}

struct RunState {
    graph: TaskGraph,
    shared: Mutex<Shared>,
    tasks_ready: Condvar,
    /// The document batch. Held only while a stage body runs.
    batch: Mutex<Vec<String>>,
}

impl RunState {
    fn total(&self) -> usize {
        self.graph.len()
    }
}

/// Executes a stage graph over a shared document batch with a fixed pool of
/// worker threads.
pub struct WorkflowScheduler {
    state: Arc<RunState>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkflowScheduler {
    /// Create a scheduler over a frozen graph.
    pub fn new(graph: TaskGraph) -> Self {
        let size = graph.len();
        Self {
            state: Arc::new(RunState {
                graph,
                shared: Mutex::new(Shared {
                    remaining: vec![0; size],
                    completed: vec![false; size],
                    ready: ReadyQueue::default(),
                    completed_count: 0,
                    shutdown: false,
                    failure: None,
                    worker_count: 0,
                }),
                tasks_ready: Condvar::new(),
                batch: Mutex::new(Vec::new()),
            }),
            workers: Vec::new(),
        }
    }

    /// Run every stage of the graph over `input` with `num_workers` threads.
    ///
    /// Validates the graph first; on an invalid graph no worker is launched.
    /// Returns an error if validation fails, any stage body fails, or a
    /// worker dies; the run only succeeds when every stage completed.
    pub fn run(&mut self, input: Vec<String>, num_workers: usize) -> Result<()> {
        self.state.graph.validate()?;

        let num_workers = num_workers.max(1);
        {
            let mut shared = self.state.shared.lock();
            shared.remaining = self
                .state
                .graph
                .nodes()
                .iter()
                .map(|node| node.predecessors.len())
                .collect();
            shared.completed = vec![false; self.state.total()];
            shared.ready.clear();
            shared.completed_count = 0;
            shared.shutdown = false;
            shared.failure = None;
            shared.worker_count = num_workers;
        }
        *self.state.batch.lock() = input;

        tracing::info!(
            stages = self.state.total(),
            workers = num_workers,
            "scheduler run starting"
        );

        for i in 0..num_workers {
            let state = Arc::clone(&self.state);
            let handle = thread::Builder::new()
                .name(format!("lexflow-worker-{i}"))
                .spawn(move || worker_loop(&state, i))
                .map_err(|e| PipelineError::Worker {
                    message: format!("failed to spawn worker {i}: {e}"),
                })?;
            self.workers.push(handle);
        }

        // Seed the ready queue with every stage that has no predecessors.
        {
            let mut shared = self.state.shared.lock();
            for (idx, node) in self.state.graph.nodes().iter().enumerate() {
                if shared.remaining[idx] == 0 {
                    shared.ready.push(idx, node.priority);
                    tracing::debug!(stage = %node.id, "seeded ready queue");
                }
            }
        }
        self.state.tasks_ready.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                let mut shared = self.state.shared.lock();
                shared.failure.get_or_insert(PipelineError::Worker {
                    message: "worker thread panicked".to_string(),
                });
                shared.shutdown = true;
                self.state.tasks_ready.notify_all();
            }
        }

        let mut shared = self.state.shared.lock();
        if let Some(failure) = shared.failure.take() {
            return Err(failure);
        }
        if shared.completed_count != self.state.total() {
            return Err(PipelineError::Worker {
                message: format!(
                    "run ended with {}/{} stages completed",
                    shared.completed_count,
                    self.state.total()
                ),
            });
        }
        tracing::info!(stages = self.state.total(), "scheduler run complete");
        Ok(())
    }

    /// Request shutdown and wait for any live workers to exit.
    ///
    /// Cooperative: workers finish the stage they already picked up and stop
    /// before taking another.
    pub fn shutdown(&mut self) {
        {
            let mut shared = self.state.shared.lock();
            shared.shutdown = true;
        }
        self.state.tasks_ready.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Snapshot of the processed batch.
    pub fn processed_data(&self) -> Vec<String> {
        self.state.batch.lock().clone()
    }

    /// Counters for the current or last run.
    pub fn stats(&self) -> SchedulerStats {
        let shared = self.state.shared.lock();
        SchedulerStats {
            total_tasks: self.state.total(),
            completed_tasks: shared.completed_count,
            pending_tasks: self.state.total() - shared.completed_count,
            worker_count: shared.worker_count,
        }
    }

    /// Text rendering of the dependency graph.
    pub fn dependency_graph_text(&self) -> String {
        self.state.graph.to_text()
    }
}

impl Drop for WorkflowScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(state: &RunState, worker: usize) {
    loop {
        let task_idx = {
            let mut shared = state.shared.lock();
            loop {
                if shared.shutdown
                    || (shared.completed_count == state.total() && shared.ready.is_empty())
                {
                    tracing::debug!(worker, "worker exiting");
                    return;
                }
                if let Some(idx) = shared.ready.pop() {
                    break idx;
                }
                state.tasks_ready.wait(&mut shared);
            }
        };

        let node = &state.graph.nodes()[task_idx];
        tracing::debug!(worker, stage = %node.id, "worker picked up stage");

        // The body runs without the scheduler lock; the batch lock scopes
        // exclusive ownership of the documents to this one stage.
        let outcome = {
            let mut batch = state.batch.lock();
            (node.body)(&mut batch)
        };

        match outcome {
            Ok(()) => mark_completed(state, task_idx),
            Err(err) => {
                tracing::error!(stage = %node.id, error = %err, "stage failed, shutting down");
                let mut shared = state.shared.lock();
                shared.failure.get_or_insert(PipelineError::StageFailure {
                    stage: node.id.clone(),
                    message: err.to_string(),
                });
                shared.shutdown = true;
                state.tasks_ready.notify_all();
                return;
            }
        }
    }
}

fn mark_completed(state: &RunState, task_idx: usize) {
    let mut shared = state.shared.lock();
    let node = &state.graph.nodes()[task_idx];

    shared.completed[task_idx] = true;
    shared.completed_count += 1;
    tracing::info!(
        stage = %node.id,
        completed = shared.completed_count,
        total = state.total(),
        "stage completed"
    );

    for &succ in &node.successors {
        shared.remaining[succ] -= 1;
        if shared.remaining[succ] == 0 && !shared.completed[succ] {
            let priority = state.graph.nodes()[succ].priority;
            shared.ready.push(succ, priority);
            tracing::debug!(stage = %state.graph.nodes()[succ].id, "stage ready");
        }
    }

    state.tasks_ready.notify_all();
}
