//! Core data structures shared across the lexflow engine.

pub mod error;

pub use error::{PipelineError, Result};

/// Kind tag for a pipeline stage.
///
/// Purely informational: dispatch is driven by the dependency graph and
/// priorities, never by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StageKind {
    /// HTML/markup cleanup and character filtering.
    Cleaning,
    /// Casefolding.
    Normalization,
    /// Word and punctuation segmentation.
    WordTokenization,
    /// Subword segmentation against the vocabulary.
    BpeTokenization,
    /// Sequence-length truncation.
    Partition,
    /// `[CLS]`/`[SEP]`/`[EOF]` marker insertion.
    SpecialTokens,
    /// Token-to-id lookup.
    Indices,
    /// Embedding placeholder generation.
    Embeddings,
}

impl StageKind {
    /// Stable lowercase name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Cleaning => "cleaning",
            StageKind::Normalization => "normalization",
            StageKind::WordTokenization => "word_tokenization",
            StageKind::BpeTokenization => "bpe_tokenization",
            StageKind::Partition => "partition",
            StageKind::SpecialTokens => "special_tokens",
            StageKind::Indices => "indices",
            StageKind::Embeddings => "embeddings",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one pipeline run, regardless of execution mode.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExecutionRecord {
    /// The processed document batch, in input order.
    pub processed_documents: Vec<String>,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_seconds: f64,
    /// Number of stages that ran to completion.
    pub stages_completed: usize,
    /// Whether every stage completed.
    pub success: bool,
    /// Failure description when `success` is false.
    pub error_message: Option<String>,
}

impl ExecutionRecord {
    /// A failed record carrying only an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::Cleaning.as_str(), "cleaning");
        assert_eq!(StageKind::Embeddings.to_string(), "embeddings");
    }

    #[test]
    fn test_failure_record() {
        let record = ExecutionRecord::failure("bad input");
        assert!(!record.success);
        assert_eq!(record.error_message.as_deref(), Some("bad input"));
        assert_eq!(record.stages_completed, 0);
        assert!(record.processed_documents.is_empty());
    }
}
