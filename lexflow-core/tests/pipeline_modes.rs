//! End-to-end behavior of the three execution modes.

use lexflow_core::scheduler::{StageSpec, TaskGraph, WorkflowScheduler};
use lexflow_core::{
    PipelineConfig, PipelineError, PipelineManager, StageKind, TextProcessor, Vocabulary,
};

fn manager_with(max_sequence_length: usize, vocab: Vocabulary) -> PipelineManager {
    let config = PipelineConfig {
        num_workers: 4,
        max_sequence_length,
        ..PipelineConfig::default()
    };
    PipelineManager::with_vocabulary(config, vocab)
}

/// HTML markup and casing collapse to the expected indexed form before the
/// embedding stage replaces the document.
#[test]
fn test_html_and_casing_end_to_end() {
    let manager = manager_with(16, Vocabulary::specials_only());
    let batch = vec!["<b>Hello</b> WORLD".to_string()];

    let record = manager.run_sequential(&batch, true);
    assert!(record.success);
    assert_eq!(record.stages_completed, 8);
    assert_eq!(record.processed_documents, vec!["EMBEDDED_DOCUMENT_1"]);
}

/// A 200-word document is cut to the sequence limit by the partition stage.
#[test]
fn test_truncation_of_long_document() {
    let words: Vec<String> = (1..=200).map(|i| format!("w{i}")).collect();
    let document = words.join(" ");

    // Walk the chain up to the partition stage to observe the cut.
    let processor = TextProcessor::new(std::sync::Arc::new(Vocabulary::specials_only()));
    let mut texts = vec![document.clone()];
    TextProcessor::clean(&mut texts);
    TextProcessor::normalize(&mut texts);
    TextProcessor::word_tokenize(&mut texts);
    processor.bpe_tokenize(&mut texts);
    TextProcessor::partition(&mut texts, 5);
    assert_eq!(texts[0].split_whitespace().count(), 5);

    // The complete run still ends in a single placeholder.
    let manager = manager_with(5, Vocabulary::specials_only());
    let record = manager.run_sequential(&[document], true);
    assert!(record.success);
    assert_eq!(record.processed_documents, vec!["EMBEDDED_DOCUMENT_1"]);
}

/// Order is preserved by every mode.
#[test]
fn test_three_documents_keep_order_in_every_mode() {
    let manager = manager_with(16, Vocabulary::specials_only());
    let batch = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
    let expected = vec![
        "EMBEDDED_DOCUMENT_1",
        "EMBEDDED_DOCUMENT_2",
        "EMBEDDED_DOCUMENT_3",
    ];

    let parallel = manager.run_parallel(&batch);
    let sequential = manager.run_sequential(&batch, true);
    let partitioned = manager.run_partitioned(&batch);

    assert_eq!(parallel.processed_documents, expected);
    assert_eq!(sequential.processed_documents, expected);
    assert_eq!(partitioned.processed_documents, expected);
}

/// A cyclic graph is rejected before any worker runs.
#[test]
fn test_cycle_detection_fails_run() {
    let mut graph = TaskGraph::new();
    for id in ["A", "B", "C"] {
        graph
            .add_stage(StageSpec::new(id, StageKind::Cleaning, 10, |_: &mut Vec<String>| {
                panic!("stage body must not run on a cyclic graph")
            }))
            .unwrap();
    }
    graph.add_edge("A", "B").unwrap();
    graph.add_edge("B", "C").unwrap();
    graph.add_edge("C", "A").unwrap();

    let mut scheduler = WorkflowScheduler::new(graph);
    let result = scheduler.run(vec!["x".to_string()], 4);
    assert!(matches!(result, Err(PipelineError::GraphInvalid { .. })));
    assert_eq!(scheduler.stats().completed_tasks, 0);
}

/// An edge against an undeclared stage poisons the run.
#[test]
fn test_missing_dependency_edge_fails_run() {
    let mut graph = TaskGraph::new();
    graph
        .add_stage(StageSpec::new("A", StageKind::Cleaning, 10, |_: &mut Vec<String>| Ok(())))
        .unwrap();
    assert!(graph.add_edge("A", "Z").is_err());

    let mut scheduler = WorkflowScheduler::new(graph);
    let result = scheduler.run(vec!["x".to_string()], 2);
    assert!(matches!(result, Err(PipelineError::GraphInvalid { .. })));
    assert_eq!(scheduler.stats().completed_tasks, 0);
}

/// Partitioned output equals sequential output element-wise on a batch large
/// enough to produce several chunks.
#[test]
fn test_partitioned_equivalence_on_varied_batch() {
    let batch: Vec<String> = (0..250)
        .map(|i| match i % 4 {
            0 => format!("<h1>Title {i}</h1> Body text number {i}."),
            1 => format!("plain document {i} with MIXED case"),
            2 => format!("punctuation, heavy; doc: {i}!"),
            _ => format!("&amp; entity laden {i} &nbsp;"),
        })
        .collect();

    let manager = manager_with(32, Vocabulary::builtin());
    let sequential = manager.run_sequential(&batch, true);
    let partitioned = manager.run_partitioned(&batch);

    assert!(sequential.success && partitioned.success);
    assert_eq!(sequential.processed_documents.len(), 250);
    assert_eq!(
        sequential.processed_documents,
        partitioned.processed_documents
    );
}

/// All three modes agree byte-for-byte on identical inputs.
#[test]
fn test_modes_agree_byte_for_byte() {
    let batch: Vec<String> = (0..80)
        .map(|i| format!("<p>Case {i}</p> about contract law &amp; appeal rulings"))
        .collect();

    let manager = manager_with(24, Vocabulary::builtin());
    let report = manager.run_full_comparison(&batch);

    assert!(report.all_succeeded());
    assert_eq!(
        report.parallel.processed_documents,
        report.sequential.processed_documents
    );
    assert_eq!(
        report.sequential.processed_documents,
        report.partitioned.processed_documents
    );
    assert!(report.best_strategy().is_some());
}

/// Worker count does not change the result.
#[test]
fn test_worker_count_invariance() {
    let batch: Vec<String> = (0..30).map(|i| format!("document number {i}")).collect();

    let one = manager_with(16, Vocabulary::builtin());
    let mut config = one.config().clone();
    config.num_workers = 32;
    let many = PipelineManager::with_vocabulary(config, Vocabulary::builtin());

    let lhs = one.run_parallel(&batch);
    let rhs = many.run_parallel(&batch);
    assert!(lhs.success && rhs.success);
    assert_eq!(lhs.processed_documents, rhs.processed_documents);
}

/// Success and stage counts line up across modes.
#[test]
fn test_stage_counts_match_success() {
    let manager = manager_with(16, Vocabulary::specials_only());
    let batch = vec!["some document".to_string()];

    let report = manager.run_full_comparison(&batch);
    for strategy in lexflow_core::Strategy::ALL {
        let record = report.record(strategy);
        assert!(record.success);
        assert_eq!(record.stages_completed, 8);
        assert_eq!(record.processed_documents.len(), batch.len());
    }
}
