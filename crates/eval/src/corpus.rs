//! Corpus loading. The only fatal step of a run.

use gauge_core::SourceRecord;
use std::path::Path;

use crate::error::HarnessError;

/// Read a JSON array of tickets. Missing, unparsable or empty corpora are
/// errors.
pub fn load_corpus(path: &Path) -> Result<Vec<SourceRecord>, HarnessError> {
    let content = std::fs::read_to_string(path).map_err(|source| HarnessError::CorpusRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<SourceRecord> =
        serde_json::from_str(&content).map_err(|source| HarnessError::CorpusParse {
            path: path.to_path_buf(),
            source,
        })?;
    if records.is_empty() {
        return Err(HarnessError::EmptyCorpus {
            path: path.to_path_buf(),
        });
    }
    tracing::info!(path = %path.display(), records = records.len(), "corpus loaded");
    Ok(records)
}
