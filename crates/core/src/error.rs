/// Errors raised while building oracle rule tables.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// A custom pattern table contained a pattern that does not compile.
    #[error("invalid pattern in {table} table: {pattern:?}: {message}")]
    InvalidPattern {
        table: &'static str,
        pattern: String,
        message: String,
    },

    /// A custom module keyword table declared no modules.
    #[error("module keyword table is empty")]
    EmptyKeywordTable,
}
