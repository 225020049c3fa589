//! # lexflow core
//!
//! In-process engine that runs a fixed chain of text-processing stages over
//! an in-memory document batch under three execution strategies (a
//! dependency-scheduled worker pool, a strictly sequential driver, and a
//! data-partitioned executor) and reports comparative timings.
//!
//! The interesting machinery is the workflow scheduler: a dynamic DAG
//! executor with a priority-ordered ready queue, mutex-guarded dependency
//! counters, a condition-variable-driven worker pool, cycle detection and
//! graceful shutdown. The pipeline manager wires the canonical eight-stage
//! chain into it and into the partitioned executor, and the comparison
//! harness runs all three modes on identical inputs.
//!
//! ## Quick start
//!
//! ```rust
//! use lexflow_core::{PipelineConfig, PipelineManager};
//!
//! # fn example() -> lexflow_core::Result<()> {
//! let manager = PipelineManager::new(PipelineConfig::default())?;
//! let batch = vec!["<b>Some</b> document".to_string()];
//! let report = manager.run_full_comparison(&batch);
//! assert!(report.all_succeeded());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration management and loading.
pub mod config;
/// Core types and error handling.
pub mod core;
/// CSV ingestion.
pub mod ingest;
/// Timing utilities.
pub mod monitoring;
/// Pipeline manager, partitioned executor and comparison harness.
pub mod pipeline;
/// Workflow scheduler: dependency graph, ready queue and worker pool.
pub mod scheduler;
/// Text-processing stage bodies.
pub mod text;
/// Token vocabulary.
pub mod vocab;

pub use crate::core::{ExecutionRecord, PipelineError, Result, StageKind};
pub use config::PipelineConfig;
pub use ingest::CsvReader;
pub use monitoring::{ScopedTimer, Timer};
pub use pipeline::{ComparisonReport, PartitionedExecutor, PipelineManager, Strategy};
pub use scheduler::{SchedulerStats, StageSpec, TaskGraph, WorkflowScheduler};
pub use text::{BpeTokenizer, TextProcessor};
pub use vocab::{Vocabulary, VocabularyStats};
