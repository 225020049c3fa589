//! Comparative results for the three execution strategies.

use crate::core::ExecutionRecord;

/// The three ways a batch can be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Strategy {
    /// Dependency-scheduled worker pool over the shared batch.
    Parallel,
    /// Strictly sequential chain on one thread.
    Sequential,
    /// Data-partitioned chunks, full chain per chunk.
    Partitioned,
}

impl Strategy {
    /// All strategies, in reporting order.
    pub const ALL: [Strategy; 3] = [
        Strategy::Parallel,
        Strategy::Sequential,
        Strategy::Partitioned,
    ];
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::Parallel => "parallel",
            Strategy::Sequential => "sequential",
            Strategy::Partitioned => "partitioned",
        };
        f.write_str(name)
    }
}

/// All three execution records for one input batch, plus the context needed
/// to derive comparative metrics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComparisonReport {
    /// Scheduled worker-pool run.
    pub parallel: ExecutionRecord,
    /// Single-thread sequential run (the speedup baseline).
    pub sequential: ExecutionRecord,
    /// Data-partitioned run.
    pub partitioned: ExecutionRecord,
    /// Worker count the parallel modes ran with.
    pub num_workers: usize,
    /// Size of the input batch.
    pub batch_size: usize,
}

impl ComparisonReport {
    /// The record for a strategy.
    pub fn record(&self, strategy: Strategy) -> &ExecutionRecord {
        match strategy {
            Strategy::Parallel => &self.parallel,
            Strategy::Sequential => &self.sequential,
            Strategy::Partitioned => &self.partitioned,
        }
    }

    /// Whether every mode succeeded.
    pub fn all_succeeded(&self) -> bool {
        Strategy::ALL.iter().all(|&s| self.record(s).success)
    }

    /// `sequential_time / mode_time`; `None` unless both runs succeeded with
    /// positive times.
    pub fn speedup(&self, strategy: Strategy) -> Option<f64> {
        let baseline = &self.sequential;
        let mode = self.record(strategy);
        if !baseline.success || !mode.success {
            return None;
        }
        if mode.elapsed_seconds <= 0.0 || baseline.elapsed_seconds <= 0.0 {
            return None;
        }
        Some(baseline.elapsed_seconds / mode.elapsed_seconds)
    }

    /// `speedup / num_workers`.
    pub fn efficiency(&self, strategy: Strategy) -> Option<f64> {
        if self.num_workers == 0 {
            return None;
        }
        self.speedup(strategy)
            .map(|s| s / self.num_workers as f64)
    }

    /// Documents per second for a strategy.
    pub fn throughput(&self, strategy: Strategy) -> Option<f64> {
        let record = self.record(strategy);
        if !record.success || record.elapsed_seconds <= 0.0 {
            return None;
        }
        Some(self.batch_size as f64 / record.elapsed_seconds)
    }

    /// The fastest strategy, defined only when all three succeeded.
    pub fn best_strategy(&self) -> Option<Strategy> {
        if !self.all_succeeded() {
            return None;
        }
        Strategy::ALL
            .iter()
            .copied()
            .min_by(|&a, &b| {
                self.record(a)
                    .elapsed_seconds
                    .total_cmp(&self.record(b).elapsed_seconds)
            })
    }
}
