//! Greedy subword segmentation against a fixed vocabulary.

use std::sync::Arc;

use crate::vocab::{Vocabulary, CLS_TOKEN, SEP_TOKEN};

/// BPE-style tokenizer using greedy longest-prefix matching.
///
/// Each whitespace-separated word is consumed left to right: the longest
/// vocabulary entry that prefixes the remaining text is taken as the next
/// piece. A remainder with no matching prefix is kept whole as a single
/// unknown piece, preserving its text.
#[derive(Debug, Clone)]
pub struct BpeTokenizer {
    vocab: Arc<Vocabulary>,
}

impl BpeTokenizer {
    /// Create a tokenizer over the given vocabulary.
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        Self { vocab }
    }

    /// Split a single word into vocabulary pieces.
    pub fn segment_word<'a>(&self, word: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        let mut rest = word;

        while !rest.is_empty() {
            // Candidate prefix ends, longest first, on char boundaries.
            let ends: Vec<usize> = rest
                .char_indices()
                .map(|(i, _)| i)
                .skip(1)
                .chain(std::iter::once(rest.len()))
                .collect();

            let matched_end = ends
                .iter()
                .rev()
                .copied()
                .find(|&end| self.vocab.contains(&rest[..end]));

            match matched_end {
                Some(end) => {
                    pieces.push(&rest[..end]);
                    rest = &rest[end..];
                }
                None => {
                    pieces.push(rest);
                    rest = "";
                }
            }
        }

        pieces
    }

    /// Segment a whole document and wrap it in `[CLS]` / `[SEP]`.
    ///
    /// The result is a single string of whitespace-separated pieces.
    pub fn encode_document(&self, text: &str) -> String {
        let mut tokens: Vec<&str> = vec![CLS_TOKEN];
        for word in text.split_whitespace() {
            tokens.extend(self.segment_word(word));
        }
        tokens.push(SEP_TOKEN);
        tokens.join(" ")
    }
}
