//! CSV ingestion: turns a delimited file with a header row into the ordered
//! document list the pipeline consumes.

use std::fs;
use std::path::Path;

use crate::core::{PipelineError, Result};

/// Delimiters considered by auto-detection.
const CANDIDATE_DELIMITERS: [u8; 5] = [b',', b';', b'\t', b'|', b':'];

/// Reader for header-row CSV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader;

impl CsvReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }

    /// Pick the candidate delimiter occurring most often in the first line;
    /// a comma when none appears.
    fn detect_delimiter(content: &str) -> u8 {
        let first_line = content.lines().next().unwrap_or_default();
        let mut best = b',';
        let mut max_count = 0;
        for &delimiter in &CANDIDATE_DELIMITERS {
            let count = first_line.bytes().filter(|&b| b == delimiter).count();
            if count > max_count {
                max_count = count;
                best = delimiter;
            }
        }
        best
    }

    fn read_content(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)?;
        // Strip a UTF-8 BOM so the first header name compares cleanly.
        Ok(content
            .strip_prefix('\u{feff}')
            .map(str::to_string)
            .unwrap_or(content))
    }

    /// The trimmed header names of the file.
    pub fn column_names(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let content = Self::read_content(path.as_ref())?;
        let delimiter = Self::detect_delimiter(&content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?;
        Ok(headers.iter().map(|h| h.trim().to_string()).collect())
    }

    /// Read one column by header name, one string per data row, in file
    /// order. Rows shorter than the header contribute an empty string.
    pub fn read_column(
        &self,
        path: impl AsRef<Path>,
        column_name: &str,
    ) -> Result<Vec<String>> {
        let path = path.as_ref();
        let content = Self::read_content(path)?;
        let delimiter = Self::detect_delimiter(&content);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?;
        let column_index = headers
            .iter()
            .position(|h| h.trim() == column_name)
            .ok_or_else(|| PipelineError::InputInvalid {
                message: format!(
                    "column '{column_name}' not found in {}",
                    path.display()
                ),
            })?;

        let mut column = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cell = record.get(column_index).unwrap_or("").trim();
            column.push(cell.to_string());
        }

        tracing::info!(
            path = %path.display(),
            column = column_name,
            rows = column.len(),
            "CSV column loaded"
        );
        Ok(column)
    }
}
