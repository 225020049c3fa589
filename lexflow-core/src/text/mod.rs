//! Text-processing stage bodies.
//!
//! Every operation here is a deterministic in-place transform over the
//! document batch: the three execution modes must produce byte-identical
//! output, so nothing in this module may depend on thread identity, timing
//! or iteration order beyond document order. All operations preserve the
//! number of documents and their order.

pub mod bpe;

pub use bpe::BpeTokenizer;

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::vocab::{Vocabulary, CLS_TOKEN, EOF_TOKEN, SEP_TOKEN};

const HTML_ENTITIES: [(&str, &str); 6] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// The per-stage batch transforms.
///
/// Stateless across invocations; the only shared state is the immutable
/// vocabulary captured at construction.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    vocab: Arc<Vocabulary>,
    bpe: BpeTokenizer,
}

impl TextProcessor {
    /// Create a processor over the given vocabulary.
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        let bpe = BpeTokenizer::new(Arc::clone(&vocab));
        Self { vocab, bpe }
    }

    /// The vocabulary this processor resolves tokens against.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Strip HTML-like markup and noise characters.
    ///
    /// Tags become a space, a fixed set of HTML entities is decoded, every
    /// character outside letters/digits/whitespace/Latin-1 accents is
    /// dropped, whitespace runs collapse to one space and the ends are
    /// trimmed.
    pub fn clean(texts: &mut [String]) {
        static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
        static FILTER_REGEX: OnceLock<Regex> = OnceLock::new();
        static SPACE_REGEX: OnceLock<Regex> = OnceLock::new();

        let tag_re = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
        let filter_re =
            FILTER_REGEX.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\sÀ-ÿ]").unwrap());
        let space_re = SPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap());

        for text in texts.iter_mut() {
            let mut cleaned = tag_re.replace_all(text, " ").into_owned();
            // Entities decode after tag removal; the character filter below
            // then strips the decoded punctuation.
            for (entity, replacement) in HTML_ENTITIES {
                cleaned = cleaned.replace(entity, replacement);
            }
            let cleaned = filter_re.replace_all(&cleaned, " ");
            let cleaned = space_re.replace_all(&cleaned, " ");
            *text = cleaned.trim().to_string();
        }
    }

    /// Lowercase each document, byte by byte (ASCII only).
    pub fn normalize(texts: &mut [String]) {
        for text in texts.iter_mut() {
            text.make_ascii_lowercase();
        }
    }

    /// Re-segment each document into words and punctuation marks, joined by
    /// single spaces.
    pub fn word_tokenize(texts: &mut [String]) {
        static WORD_PUNCT_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = WORD_PUNCT_REGEX
            .get_or_init(|| Regex::new(r#"[a-zA-Z0-9À-ÿ]+|[.,!?;:"'()\[\]{}]"#).unwrap());

        for text in texts.iter_mut() {
            let tokens: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
            *text = tokens.join(" ");
        }
    }

    /// Subword-segment each document and wrap it in `[CLS]` / `[SEP]`.
    pub fn bpe_tokenize(&self, texts: &mut [String]) {
        for text in texts.iter_mut() {
            *text = self.bpe.encode_document(text);
        }
    }

    /// Truncate each document to at most `max_length` whitespace-separated
    /// tokens.
    pub fn partition(texts: &mut [String], max_length: usize) {
        for text in texts.iter_mut() {
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.len() > max_length {
                *text = tokens[..max_length].join(" ");
            }
        }
    }

    /// Ensure each document carries `[CLS]` first, `[SEP]` before the
    /// trailing `[EOF]`, and `[EOF]` last, without duplicating markers that
    /// are already present.
    pub fn add_special_tokens(texts: &mut [String]) {
        for text in texts.iter_mut() {
            let mut tokens: Vec<String> =
                text.split_whitespace().map(str::to_string).collect();

            if tokens.first().map(String::as_str) != Some(CLS_TOKEN) {
                tokens.insert(0, CLS_TOKEN.to_string());
            }
            if !tokens.iter().any(|t| t == EOF_TOKEN) {
                tokens.push(EOF_TOKEN.to_string());
            }
            if !tokens.iter().any(|t| t == SEP_TOKEN) {
                let eof_pos = tokens
                    .iter()
                    .position(|t| t == EOF_TOKEN)
                    .unwrap_or(tokens.len());
                tokens.insert(eof_pos, SEP_TOKEN.to_string());
            }

            *text = tokens.join(" ");
        }
    }

    /// Replace each token with its vocabulary id as decimal text; unknown
    /// tokens map to the reserved unknown id.
    pub fn tokens_to_indices(&self, texts: &mut [String]) {
        for text in texts.iter_mut() {
            let ids: Vec<String> = text
                .split_whitespace()
                .map(|token| self.vocab.lookup(token).to_string())
                .collect();
            *text = ids.join(" ");
        }
    }

    /// Replace each document with its embedding placeholder.
    pub fn embed(texts: &mut [String]) {
        for (i, text) in texts.iter_mut().enumerate() {
            *text = format!("EMBEDDED_DOCUMENT_{}", i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor_with_specials_only() -> TextProcessor {
        TextProcessor::new(Arc::new(Vocabulary::specials_only()))
    }

    #[test]
    fn test_clean_removes_html() {
        let mut texts = vec!["<b>Hello</b> WORLD".to_string()];
        TextProcessor::clean(&mut texts);
        assert_eq!(texts, vec!["Hello WORLD"]);
    }

    #[test]
    fn test_clean_decodes_entities_then_filters() {
        let mut texts = vec!["a &amp; b&nbsp;c".to_string()];
        TextProcessor::clean(&mut texts);
        assert_eq!(texts, vec!["a b c"]);
    }

    #[test]
    fn test_clean_keeps_accented_letters() {
        let mut texts = vec!["ação já, São Paulo!".to_string()];
        TextProcessor::clean(&mut texts);
        assert_eq!(texts, vec!["ação já São Paulo"]);
    }

    #[test]
    fn test_clean_empty_document_survives() {
        let mut texts = vec![String::new(), "x".to_string()];
        TextProcessor::clean(&mut texts);
        assert_eq!(texts, vec!["", "x"]);
    }

    #[test]
    fn test_normalize_is_ascii_only_and_idempotent() {
        let mut texts = vec!["Hello WORLD É".to_string()];
        TextProcessor::normalize(&mut texts);
        assert_eq!(texts, vec!["hello world É"]);

        let once = texts.clone();
        TextProcessor::normalize(&mut texts);
        assert_eq!(texts, once);
    }

    #[test]
    fn test_word_tokenize_separates_punctuation() {
        let mut texts = vec!["hello, world!".to_string()];
        TextProcessor::word_tokenize(&mut texts);
        assert_eq!(texts, vec!["hello , world !"]);
    }

    #[test]
    fn test_bpe_tokenize_unknown_words() {
        let processor = processor_with_specials_only();
        let mut texts = vec!["hello world".to_string()];
        processor.bpe_tokenize(&mut texts);
        assert_eq!(texts, vec!["[CLS] hello world [SEP]"]);
    }

    #[test]
    fn test_partition_truncates() {
        let mut texts = vec!["a b c d e f".to_string()];
        TextProcessor::partition(&mut texts, 3);
        assert_eq!(texts, vec!["a b c"]);
    }

    #[test]
    fn test_partition_is_noop_within_limit() {
        let mut texts = vec!["a b c".to_string()];
        TextProcessor::partition(&mut texts, 10);
        assert_eq!(texts, vec!["a b c"]);
    }

    #[test]
    fn test_add_special_tokens_fills_missing_markers() {
        let mut texts = vec![
            "hello".to_string(),
            "[CLS] hello [SEP]".to_string(),
            String::new(),
        ];
        TextProcessor::add_special_tokens(&mut texts);
        assert_eq!(
            texts,
            vec![
                "[CLS] hello [SEP] [EOF]",
                "[CLS] hello [SEP] [EOF]",
                "[CLS] [SEP] [EOF]",
            ]
        );
    }

    #[test]
    fn test_add_special_tokens_is_idempotent() {
        let mut texts = vec!["[CLS] hello [SEP] [EOF]".to_string()];
        TextProcessor::add_special_tokens(&mut texts);
        let once = texts.clone();
        TextProcessor::add_special_tokens(&mut texts);
        assert_eq!(texts, once);
        assert_eq!(texts, vec!["[CLS] hello [SEP] [EOF]"]);
    }

    #[test]
    fn test_tokens_to_indices_uses_reserved_ids() {
        let processor = processor_with_specials_only();
        let mut texts = vec!["[CLS] hello world [SEP] [EOF]".to_string()];
        processor.tokens_to_indices(&mut texts);
        assert_eq!(texts, vec!["101 0 0 102 103"]);
    }

    #[test]
    fn test_embed_generates_one_based_placeholders() {
        let mut texts = vec!["a".to_string(), "b".to_string()];
        TextProcessor::embed(&mut texts);
        assert_eq!(texts, vec!["EMBEDDED_DOCUMENT_1", "EMBEDDED_DOCUMENT_2"]);
    }

    /// Stage-by-stage walk of the HTML + casing scenario.
    #[test]
    fn test_full_chain_on_html_input() {
        let processor = processor_with_specials_only();
        let mut texts = vec!["<b>Hello</b> WORLD".to_string()];

        TextProcessor::clean(&mut texts);
        assert_eq!(texts, vec!["Hello WORLD"]);
        TextProcessor::normalize(&mut texts);
        assert_eq!(texts, vec!["hello world"]);
        TextProcessor::word_tokenize(&mut texts);
        assert_eq!(texts, vec!["hello world"]);
        processor.bpe_tokenize(&mut texts);
        assert_eq!(texts, vec!["[CLS] hello world [SEP]"]);
        TextProcessor::partition(&mut texts, 16);
        assert_eq!(texts, vec!["[CLS] hello world [SEP]"]);
        TextProcessor::add_special_tokens(&mut texts);
        assert_eq!(texts, vec!["[CLS] hello world [SEP] [EOF]"]);
        processor.tokens_to_indices(&mut texts);
        assert_eq!(texts, vec!["101 0 0 102 103"]);
        TextProcessor::embed(&mut texts);
        assert_eq!(texts, vec!["EMBEDDED_DOCUMENT_1"]);
    }
}
