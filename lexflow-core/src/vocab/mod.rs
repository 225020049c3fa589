//! Token vocabulary shared by the tokenization and index-lookup stages.
//!
//! The vocabulary is immutable after construction and is passed explicitly
//! to the stages that need it, so tests can inject alternatives without any
//! global state. Four special tokens carry reserved ids that every
//! vocabulary must preserve.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::core::{PipelineError, Result};

/// Classification start marker.
pub const CLS_TOKEN: &str = "[CLS]";
/// Separator marker.
pub const SEP_TOKEN: &str = "[SEP]";
/// End-of-file marker.
pub const EOF_TOKEN: &str = "[EOF]";
/// Unknown-token marker.
pub const UNK_TOKEN: &str = "[UNK]";

/// Reserved id for `[CLS]`.
pub const CLS_ID: u32 = 101;
/// Reserved id for `[SEP]`.
pub const SEP_ID: u32 = 102;
/// Reserved id for `[EOF]`.
pub const EOF_ID: u32 = 103;
/// Reserved id for `[UNK]`; also the fallback for any unmapped token.
pub const UNK_ID: u32 = 0;

const SPECIAL_TOKENS: [(&str, u32); 4] = [
    (CLS_TOKEN, CLS_ID),
    (SEP_TOKEN, SEP_ID),
    (EOF_TOKEN, EOF_ID),
    (UNK_TOKEN, UNK_ID),
];

/// Built-in legal-domain tokens used when no vocabulary file is configured.
const BUILTIN_DOMAIN_TOKENS: [&str; 26] = [
    "the", "of", "and", "a", "in", "to", "court", "law", "case", "document", "documents", "legal",
    "data", "process", "text", "article", "section", "justice", "code", "civil", "penal",
    "contract", "clause", "party", "appeal", "ruling",
];

/// Summary counts for a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VocabularyStats {
    /// Total number of tokens, special tokens included.
    pub vocabulary_size: usize,
    /// Number of reserved special tokens.
    pub special_tokens: usize,
    /// Number of non-special tokens.
    pub domain_tokens: usize,
}

/// Immutable mapping from token text to non-negative integer id.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: IndexMap<String, u32>,
}

impl Vocabulary {
    /// The built-in vocabulary: special tokens plus a fixed domain set with
    /// small consecutive ids.
    pub fn builtin() -> Self {
        let mut tokens = IndexMap::new();
        for (token, id) in SPECIAL_TOKENS {
            tokens.insert(token.to_string(), id);
        }
        for (i, token) in BUILTIN_DOMAIN_TOKENS.iter().enumerate() {
            tokens.insert((*token).to_string(), (i + 1) as u32);
        }
        Self { tokens }
    }

    /// A minimal vocabulary holding only the four special tokens.
    pub fn specials_only() -> Self {
        let mut tokens = IndexMap::new();
        for (token, id) in SPECIAL_TOKENS {
            tokens.insert(token.to_string(), id);
        }
        Self { tokens }
    }

    /// Build a vocabulary from explicit `(token, id)` pairs.
    ///
    /// Special tokens are enforced: a pair that maps a special token to a
    /// different id is an error, and missing specials are added.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut tokens: IndexMap<String, u32> = IndexMap::new();
        for (token, id) in pairs {
            let token = token.into();
            tokens.insert(token, id);
        }
        for (token, id) in SPECIAL_TOKENS {
            match tokens.get(token) {
                Some(&existing) if existing != id => {
                    return Err(PipelineError::Vocabulary {
                        message: format!(
                            "special token {token} must keep reserved id {id}, found {existing}"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    tokens.insert(token.to_string(), id);
                }
            }
        }
        Ok(Self { tokens })
    }

    /// Load a vocabulary from a `token id`-per-line file, optionally
    /// extended by a merges file.
    ///
    /// Blank lines and lines starting with `#` are ignored. Each line in the
    /// merges file holds a `left right` pair; the concatenated subword is
    /// added with the next free id.
    pub fn from_files(vocab_path: &Path, merges_path: Option<&Path>) -> Result<Self> {
        let content = fs::read_to_string(vocab_path)?;
        let mut pairs: Vec<(String, u32)> = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let token = fields.next();
            let id = fields.next().map(str::parse::<u32>);
            match (token, id) {
                (Some(token), Some(Ok(id))) => pairs.push((token.to_string(), id)),
                _ => {
                    return Err(PipelineError::Vocabulary {
                        message: format!(
                            "{}:{}: expected 'token id', found '{line}'",
                            vocab_path.display(),
                            line_no + 1
                        ),
                    });
                }
            }
        }

        let mut vocab = Self::from_pairs(pairs)?;

        if let Some(merges_path) = merges_path {
            let merges = fs::read_to_string(merges_path)?;
            let mut next_id = vocab.tokens.values().copied().max().unwrap_or(0) + 1;
            for line in merges.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let mut fields = line.split_whitespace();
                if let (Some(left), Some(right)) = (fields.next(), fields.next()) {
                    let merged = format!("{left}{right}");
                    if !vocab.tokens.contains_key(&merged) {
                        vocab.tokens.insert(merged, next_id);
                        next_id += 1;
                    }
                }
            }
        }

        tracing::info!(
            path = %vocab_path.display(),
            size = vocab.len(),
            "vocabulary loaded"
        );
        Ok(vocab)
    }

    /// Id for a token, if present.
    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.tokens.get(token).copied()
    }

    /// Id for a token, falling back to the reserved unknown id.
    pub fn lookup(&self, token: &str) -> u32 {
        self.id_of(token).unwrap_or(UNK_ID)
    }

    /// Whether the token is known.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    /// Number of tokens, special tokens included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the vocabulary holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Summary counts.
    pub fn stats(&self) -> VocabularyStats {
        let special_tokens = SPECIAL_TOKENS
            .iter()
            .filter(|(token, _)| self.tokens.contains_key(*token))
            .count();
        VocabularyStats {
            vocabulary_size: self.tokens.len(),
            special_tokens,
            domain_tokens: self.tokens.len() - special_tokens,
        }
    }
}
