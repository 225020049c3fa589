//! Configuration for pipeline runs.
//!
//! `PipelineConfig` can be built in code, deserialized from TOML, or taken
//! from `Default`. Zero values for worker count and sequence length are not
//! fatal: `normalized()` substitutes documented defaults and logs the
//! substitution.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::Result;

fn default_num_workers() -> usize {
    4
}

fn default_max_sequence_length() -> usize {
    128
}

/// Configuration for the pipeline manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads for the scheduled and partitioned modes.
    /// Zero means "detect hardware concurrency".
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Maximum number of tokens kept per document by the partition stage.
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Emit extra diagnostic output. Does not alter results.
    #[serde(default)]
    pub enable_debug: bool,

    /// Vocabulary file (`token id` per line). Built-in vocabulary when absent.
    #[serde(default)]
    pub vocab_file: Option<PathBuf>,

    /// BPE merges file (`left right` per line). Optional.
    #[serde(default)]
    pub merges_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            max_sequence_length: default_max_sequence_length(),
            enable_debug: false,
            vocab_file: None,
            merges_file: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Replace out-of-range values with documented defaults.
    ///
    /// A zero worker count becomes the detected hardware concurrency and a
    /// zero sequence length becomes 128; both substitutions are logged.
    pub fn normalized(mut self) -> Self {
        if self.num_workers == 0 {
            self.num_workers = num_cpus::get().max(1);
            tracing::warn!(
                num_workers = self.num_workers,
                "worker count was zero, using detected hardware concurrency"
            );
        }
        if self.max_sequence_length == 0 {
            self.max_sequence_length = default_max_sequence_length();
            tracing::warn!(
                max_sequence_length = self.max_sequence_length,
                "max sequence length was zero, using default"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.max_sequence_length, 128);
        assert!(!config.enable_debug);
        assert!(config.vocab_file.is_none());
    }

    #[test]
    fn test_normalized_substitutes_zeros() {
        let config = PipelineConfig {
            num_workers: 0,
            max_sequence_length: 0,
            ..PipelineConfig::default()
        }
        .normalized();

        assert!(config.num_workers >= 1);
        assert_eq!(config.max_sequence_length, 128);
    }

    #[test]
    fn test_normalized_keeps_valid_values() {
        let config = PipelineConfig {
            num_workers: 7,
            max_sequence_length: 32,
            ..PipelineConfig::default()
        }
        .normalized();

        assert_eq!(config.num_workers, 7);
        assert_eq!(config.max_sequence_length, 32);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "num_workers = 2\nmax_sequence_length = 16\nenable_debug = true"
        )
        .unwrap();

        let config = PipelineConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.max_sequence_length, 16);
        assert!(config.enable_debug);
        assert!(config.merges_file.is_none());
    }

    #[test]
    fn test_from_toml_partial_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_workers = 3").unwrap();

        let config = PipelineConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.max_sequence_length, 128);
    }
}
