//! Write-once output files of a run.

use std::path::{Path, PathBuf};

use gauge_core::LabelValidation;
use gauge_eval::{worst_conversations, ConversationResult};
use serde::Serialize;

pub const LABELER_VALIDATION_FILE: &str = "labeler_validation.json";
pub const REPORT_FILE: &str = "conversation_report.txt";
pub const RESULTS_FILE: &str = "conversation_results.json";
pub const REGRESSION_FILE: &str = "regression_suite.json";

/// Create `dir` if needed and return the path of `name` inside it.
pub fn output_path(dir: &Path, name: &str) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("could not create '{}': {}", dir.display(), e))?;
    Ok(dir.join(name))
}

pub fn write_text(path: &Path, text: &str) -> Result<(), String> {
    std::fs::write(path, text).map_err(|e| format!("could not write '{}': {}", path.display(), e))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), String> {
    let pretty = serde_json::to_string_pretty(value)
        .map_err(|e| format!("could not serialize '{}': {}", path.display(), e))?;
    write_text(path, &pretty)
}

pub fn write_labeler_validation(dir: &Path, validation: &LabelValidation) -> Result<PathBuf, String> {
    let path = output_path(dir, LABELER_VALIDATION_FILE)?;
    write_json(&path, validation)?;
    Ok(path)
}

pub fn write_results(dir: &Path, results: &[ConversationResult]) -> Result<PathBuf, String> {
    let path = output_path(dir, RESULTS_FILE)?;
    write_json(&path, results)?;
    Ok(path)
}

/// The `size` worst conversations, full transcripts included.
pub fn write_regression_suite(
    dir: &Path,
    results: &[ConversationResult],
    size: usize,
) -> Result<PathBuf, String> {
    let path = output_path(dir, REGRESSION_FILE)?;
    write_json(&path, &worst_conversations(results, size))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::{Labeler, SourceRecord};

    fn failed(id: &str) -> ConversationResult {
        let record = SourceRecord {
            id: id.into(),
            description: "Impossible de publier ma boutique aujourd'hui".into(),
            title: String::new(),
            subject: "Autre".into(),
            ticket_type: "Problem".into(),
            company_name: "boutique".into(),
        };
        let gold = Labeler::builtin().label(&record);
        ConversationResult::from_failure(&record, gold, "conversation task failed")
    }

    #[test]
    fn nested_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = write_results(&nested, &[failed("x")]).unwrap();
        assert!(path.ends_with(RESULTS_FILE));
        let parsed: Vec<ConversationResult> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed[0].ticket_id, "x");
        assert!(parsed[0].errored);
    }

    #[test]
    fn regression_suite_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let results: Vec<_> = (0..5).map(|i| failed(&format!("t-{i}"))).collect();
        let path = write_regression_suite(dir.path(), &results, 3).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(3));
    }
}
