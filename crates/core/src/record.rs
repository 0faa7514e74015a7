//! Source records: support tickets exported from the help desk.

use serde::{Deserialize, Deserializer, Serialize};

/// Subject used when a ticket carries none.
pub const DEFAULT_SUBJECT: &str = "Autre";
/// Declared type used when a ticket carries none.
pub const DEFAULT_DECLARED_TYPE: &str = "Question";

/// One ticket from the evaluation corpus. Immutable once loaded.
///
/// The export is loosely typed: ids may be numbers or strings and any text
/// field may be `null`. Every field deserializes to a usable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub title: String,
    #[serde(default = "default_subject", deserialize_with = "subject_or_default")]
    pub subject: String,
    /// Declared type from the help desk (`Critical`, `Blocking`, `Problem`, ...).
    #[serde(
        default = "default_declared_type",
        deserialize_with = "declared_type_or_default"
    )]
    pub ticket_type: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub company_name: String,
}

impl SourceRecord {
    /// Text the oracle labels: description followed by title.
    pub fn labeling_text(&self) -> String {
        format!("{} {}", self.description, self.title)
            .trim()
            .to_string()
    }
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_declared_type() -> String {
    DEFAULT_DECLARED_TYPE.to_string()
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn subject_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_subject))
}

fn declared_type_or_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_declared_type))
}
