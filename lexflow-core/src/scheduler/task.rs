//! Task definitions and the priority-ordered ready queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::core::{Result, StageKind};

/// A stage body: an in-place transform over the document batch.
///
/// Bodies must be deterministic, must not call back into the scheduler, and
/// report failure through their `Result`.
pub type StageBody = Arc<dyn Fn(&mut Vec<String>) -> Result<()> + Send + Sync>;

/// A stage as declared by the caller: identity, kind tag, dispatch priority
/// and body. Dependencies are added separately on the graph.
#[derive(Clone)]
pub struct StageSpec {
    /// Unique, non-empty stage id.
    pub id: String,
    /// Informational kind tag; never drives dispatch.
    pub kind: StageKind,
    /// Dispatch priority; numerically smaller runs first among ready stages.
    pub priority: i32,
    /// The transform to run.
    pub body: StageBody,
}

impl StageSpec {
    /// Create a stage spec from a closure.
    pub fn new<F>(id: impl Into<String>, kind: StageKind, priority: i32, body: F) -> Self
    where
        F: Fn(&mut Vec<String>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            kind,
            priority,
            body: Arc::new(body),
        }
    }
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// One graph node in the task arena.
pub(crate) struct TaskNode {
    pub id: String,
    pub kind: StageKind,
    pub priority: i32,
    pub body: StageBody,
    /// Arena indices of stages that must complete before this one.
    pub predecessors: Vec<usize>,
    /// Arena indices of stages released by this one's completion.
    pub successors: Vec<usize>,
}

#[derive(Debug, PartialEq, Eq)]
struct ReadyEntry {
    priority: i32,
    seq: u64,
    task: usize,
}

// BinaryHeap is a max-heap; invert the comparison so the numerically
// smallest priority pops first, with insertion order as the tie break.
impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of ready stages, holding stable arena indices.
///
/// Only ever touched while the scheduler mutex is held.
#[derive(Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn push(&mut self, task: usize, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ReadyEntry {
            priority,
            seq,
            task,
        });
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|entry| entry.task)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }
}
