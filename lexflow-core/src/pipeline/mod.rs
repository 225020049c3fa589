//! The pipeline manager: owns the stage template and drives the three
//! execution strategies.
//!
//! The fixed chain is Clean → Normalize → WordTokenize → BpeTokenize →
//! Partition → AddSpecialTokens → IndexLookup → Embed, with priorities
//! 10..80. Every run mode builds fresh execution state from the template;
//! a failed run leaves the template untouched, so the manager can be reused
//! after correcting the input.

pub mod comparison;
pub mod partitioned;

pub use comparison::{ComparisonReport, Strategy};
pub use partitioned::PartitionedExecutor;

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::core::{ExecutionRecord, PipelineError, Result, StageKind};
use crate::monitoring::Timer;
use crate::scheduler::{StageSpec, TaskGraph, WorkflowScheduler};
use crate::text::TextProcessor;
use crate::vocab::Vocabulary;

/// Ids of the chain stages, in execution order.
const STAGE_IDS: [&str; 8] = [
    "CleanText",
    "NormalizeText",
    "WordTokenization",
    "BpeTokenization",
    "PartitionTokens",
    "AddSpecialTokens",
    "TokensToIndices",
    "GenerateEmbeddings",
];

/// Drives the fixed text-processing chain under three execution strategies.
pub struct PipelineManager {
    config: PipelineConfig,
    vocab: Arc<Vocabulary>,
}

impl PipelineManager {
    /// Create a manager, loading the vocabulary from the configured files or
    /// falling back to the built-in one.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let config = config.normalized();
        let vocab = match &config.vocab_file {
            Some(vocab_path) => {
                Vocabulary::from_files(vocab_path, config.merges_file.as_deref())?
            }
            None => {
                tracing::debug!("no vocabulary file configured, using built-in vocabulary");
                Vocabulary::builtin()
            }
        };
        Ok(Self {
            config,
            vocab: Arc::new(vocab),
        })
    }

    /// Create a manager with an explicitly injected vocabulary.
    pub fn with_vocabulary(config: PipelineConfig, vocab: Vocabulary) -> Self {
        Self {
            config: config.normalized(),
            vocab: Arc::new(vocab),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the configuration for subsequent runs.
    pub fn update_config(&mut self, config: PipelineConfig) {
        self.config = config.normalized();
    }

    /// The vocabulary used by the tokenization stages.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The stage chain with priorities 10..80, bodies capturing the
    /// vocabulary and sequence-length configuration.
    fn stage_specs(&self) -> Vec<StageSpec> {
        let processor = TextProcessor::new(Arc::clone(&self.vocab));
        let bpe_processor = processor.clone();
        let index_processor = processor;
        let max_length = self.config.max_sequence_length;

        vec![
            StageSpec::new(
                STAGE_IDS[0],
                StageKind::Cleaning,
                10,
                |batch: &mut Vec<String>| {
                    TextProcessor::clean(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[1],
                StageKind::Normalization,
                20,
                |batch: &mut Vec<String>| {
                    TextProcessor::normalize(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[2],
                StageKind::WordTokenization,
                30,
                |batch: &mut Vec<String>| {
                    TextProcessor::word_tokenize(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[3],
                StageKind::BpeTokenization,
                40,
                move |batch: &mut Vec<String>| {
                    bpe_processor.bpe_tokenize(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[4],
                StageKind::Partition,
                50,
                move |batch: &mut Vec<String>| {
                    TextProcessor::partition(batch, max_length);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[5],
                StageKind::SpecialTokens,
                60,
                |batch: &mut Vec<String>| {
                    TextProcessor::add_special_tokens(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[6],
                StageKind::Indices,
                70,
                move |batch: &mut Vec<String>| {
                    index_processor.tokens_to_indices(batch);
                    Ok(())
                },
            ),
            StageSpec::new(
                STAGE_IDS[7],
                StageKind::Embeddings,
                80,
                |batch: &mut Vec<String>| {
                    TextProcessor::embed(batch);
                    Ok(())
                },
            ),
        ]
    }

    /// Build the chain graph from the template.
    fn build_graph(&self) -> Result<TaskGraph> {
        let mut graph = TaskGraph::new();
        for spec in self.stage_specs() {
            graph.add_stage(spec)?;
        }
        for pair in STAGE_IDS.windows(2) {
            graph.add_edge(pair[0], pair[1])?;
        }
        Ok(graph)
    }

    fn validate_input(batch: &[String]) -> Result<()> {
        if batch.is_empty() {
            return Err(PipelineError::InputInvalid {
                message: "input batch is empty".to_string(),
            });
        }
        if batch.iter().all(String::is_empty) {
            return Err(PipelineError::InputInvalid {
                message: "every document in the batch is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Run the chain through the scheduler with the configured worker count.
    pub fn run_parallel(&self, batch: &[String]) -> ExecutionRecord {
        if let Err(err) = Self::validate_input(batch) {
            tracing::error!(error = %err, "parallel run rejected");
            return ExecutionRecord::failure(err.to_string());
        }

        tracing::info!(workers = self.config.num_workers, "parallel pipeline starting");
        let mut timer = Timer::new();
        timer.start();

        let graph = match self.build_graph() {
            Ok(graph) => graph,
            Err(err) => return ExecutionRecord::failure(err.to_string()),
        };
        let mut scheduler = WorkflowScheduler::new(graph);
        let outcome = scheduler.run(batch.to_vec(), self.config.num_workers);
        timer.stop();

        match outcome {
            Ok(()) => ExecutionRecord {
                processed_documents: scheduler.processed_data(),
                elapsed_seconds: timer.elapsed_seconds(),
                stages_completed: scheduler.stats().completed_tasks,
                success: true,
                error_message: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "parallel pipeline failed");
                ExecutionRecord {
                    processed_documents: Vec::new(),
                    elapsed_seconds: timer.elapsed_seconds(),
                    stages_completed: scheduler.stats().completed_tasks,
                    success: false,
                    error_message: Some(err.to_string()),
                }
            }
        }
    }

    /// Run the chain sequentially.
    ///
    /// With `force_single` the stage bodies run in chain order on the
    /// current thread, bypassing the scheduler entirely; otherwise the
    /// scheduler runs with a single worker.
    pub fn run_sequential(&self, batch: &[String], force_single: bool) -> ExecutionRecord {
        if let Err(err) = Self::validate_input(batch) {
            tracing::error!(error = %err, "sequential run rejected");
            return ExecutionRecord::failure(err.to_string());
        }

        if !force_single {
            tracing::info!("sequential pipeline starting (scheduler, one worker)");
            let mut timer = Timer::new();
            timer.start();
            let graph = match self.build_graph() {
                Ok(graph) => graph,
                Err(err) => return ExecutionRecord::failure(err.to_string()),
            };
            let mut scheduler = WorkflowScheduler::new(graph);
            let outcome = scheduler.run(batch.to_vec(), 1);
            timer.stop();
            return match outcome {
                Ok(()) => ExecutionRecord {
                    processed_documents: scheduler.processed_data(),
                    elapsed_seconds: timer.elapsed_seconds(),
                    stages_completed: scheduler.stats().completed_tasks,
                    success: true,
                    error_message: None,
                },
                Err(err) => ExecutionRecord {
                    processed_documents: Vec::new(),
                    elapsed_seconds: timer.elapsed_seconds(),
                    stages_completed: scheduler.stats().completed_tasks,
                    success: false,
                    error_message: Some(err.to_string()),
                },
            };
        }

        tracing::info!("sequential pipeline starting (single thread)");
        let mut timer = Timer::new();
        timer.start();

        let mut documents = batch.to_vec();
        let mut stages_completed = 0usize;
        for stage in self.stage_specs() {
            if let Err(err) = (stage.body)(&mut documents) {
                timer.stop();
                tracing::error!(stage = %stage.id, error = %err, "sequential stage failed");
                return ExecutionRecord {
                    processed_documents: Vec::new(),
                    elapsed_seconds: timer.elapsed_seconds(),
                    stages_completed,
                    success: false,
                    error_message: Some(
                        PipelineError::StageFailure {
                            stage: stage.id.clone(),
                            message: err.to_string(),
                        }
                        .to_string(),
                    ),
                };
            }
            stages_completed += 1;
            tracing::info!(stage = %stage.id, completed = stages_completed, "stage completed");
        }
        timer.stop();

        ExecutionRecord {
            processed_documents: documents,
            elapsed_seconds: timer.elapsed_seconds(),
            stages_completed,
            success: true,
            error_message: None,
        }
    }

    /// Run the chain over data-partitioned chunks.
    pub fn run_partitioned(&self, batch: &[String]) -> ExecutionRecord {
        if let Err(err) = Self::validate_input(batch) {
            tracing::error!(error = %err, "partitioned run rejected");
            return ExecutionRecord::failure(err.to_string());
        }

        let mut timer = Timer::new();
        timer.start();
        let stages = self.stage_specs();
        let stage_count = stages.len();
        let executor = PartitionedExecutor::new(stages, self.config.num_workers);
        let outcome = executor.run(batch);
        timer.stop();

        match outcome {
            Ok(documents) => ExecutionRecord {
                processed_documents: documents,
                elapsed_seconds: timer.elapsed_seconds(),
                stages_completed: stage_count,
                success: true,
                error_message: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "partitioned pipeline failed");
                ExecutionRecord {
                    processed_documents: Vec::new(),
                    elapsed_seconds: timer.elapsed_seconds(),
                    stages_completed: 0,
                    success: false,
                    error_message: Some(err.to_string()),
                }
            }
        }
    }

    /// Run all three modes on independent copies of the input and derive
    /// comparative metrics. Per-mode failures are recorded independently.
    pub fn run_full_comparison(&self, batch: &[String]) -> ComparisonReport {
        let parallel = self.run_parallel(batch);
        let sequential = self.run_sequential(batch, true);
        let partitioned = self.run_partitioned(batch);

        ComparisonReport {
            parallel,
            sequential,
            partitioned,
            num_workers: self.config.num_workers,
            batch_size: batch.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PipelineManager {
        let config = PipelineConfig {
            num_workers: 4,
            max_sequence_length: 16,
            ..PipelineConfig::default()
        };
        PipelineManager::with_vocabulary(config, Vocabulary::specials_only())
    }

    #[test]
    fn test_empty_batch_rejected() {
        let record = manager().run_parallel(&[]);
        assert!(!record.success);
        assert!(record.error_message.unwrap().contains("empty"));
    }

    #[test]
    fn test_all_empty_batch_rejected() {
        let batch = vec![String::new(), String::new()];
        let record = manager().run_sequential(&batch, true);
        assert!(!record.success);
        assert_eq!(record.stages_completed, 0);
    }

    #[test]
    fn test_one_empty_document_survives() {
        let batch = vec![String::new(), "hello".to_string()];
        let record = manager().run_sequential(&batch, true);
        assert!(record.success);
        assert_eq!(
            record.processed_documents,
            vec!["EMBEDDED_DOCUMENT_1", "EMBEDDED_DOCUMENT_2"]
        );
    }

    #[test]
    fn test_sequential_completes_all_stages() {
        let record = manager().run_sequential(&["hello world".to_string()], true);
        assert!(record.success);
        assert_eq!(record.stages_completed, STAGE_IDS.len());
        assert_eq!(record.processed_documents, vec!["EMBEDDED_DOCUMENT_1"]);
    }

    #[test]
    fn test_sequential_via_scheduler_matches_pure() {
        let batch = vec!["<b>Hello</b> WORLD".to_string(), "second doc".to_string()];
        let m = manager();
        let pure = m.run_sequential(&batch, true);
        let scheduled = m.run_sequential(&batch, false);
        assert!(pure.success && scheduled.success);
        assert_eq!(pure.processed_documents, scheduled.processed_documents);
    }

    #[test]
    fn test_modes_produce_identical_output() {
        let batch: Vec<String> = (0..50)
            .map(|i| format!("<p>Document {i}</p> with SOME text, punctuation!"))
            .collect();
        let m = manager();

        let parallel = m.run_parallel(&batch);
        let sequential = m.run_sequential(&batch, true);
        let partitioned = m.run_partitioned(&batch);

        assert!(parallel.success && sequential.success && partitioned.success);
        assert_eq!(parallel.processed_documents, sequential.processed_documents);
        assert_eq!(sequential.processed_documents, partitioned.processed_documents);
        assert_eq!(parallel.processed_documents.len(), batch.len());
    }

    #[test]
    fn test_full_comparison_reports_all_modes() {
        let batch = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let report = manager().run_full_comparison(&batch);

        assert!(report.all_succeeded());
        assert_eq!(report.batch_size, 3);
        assert_eq!(
            report.sequential.processed_documents,
            vec![
                "EMBEDDED_DOCUMENT_1",
                "EMBEDDED_DOCUMENT_2",
                "EMBEDDED_DOCUMENT_3"
            ]
        );
        assert_eq!(
            report.parallel.processed_documents,
            report.partitioned.processed_documents
        );
    }

    #[test]
    fn test_manager_reusable_after_failed_run() {
        let m = manager();
        assert!(!m.run_parallel(&[]).success);
        let record = m.run_parallel(&["hello".to_string()]);
        assert!(record.success);
    }

    #[test]
    fn test_update_config_changes_truncation() {
        let mut m = manager();
        let mut config = m.config().clone();
        config.max_sequence_length = 3;
        m.update_config(config);

        // 3-token cap: [CLS] plus two pieces survive partitioning, then the
        // marker stages re-append [SEP]/[EOF].
        let record = m.run_sequential(&["one two three four five".to_string()], true);
        assert!(record.success);
        assert_eq!(record.processed_documents, vec!["EMBEDDED_DOCUMENT_1"]);
    }
}
