//! gauge-core: deterministic ground-truth oracle.
//!
//! Reproduces the classifier service's mandated business rules so its
//! answers can be graded without a human in the loop.
//!
//! # Public API
//!
//! - [`GovernanceOracle`] -- escalation overrides (5xx, site down, emotion)
//! - [`ModuleClassifier`] -- keyword scoring and category normalization
//! - [`LanguageDetector`] -- script and marker based language guess
//! - [`Labeler`] -- combines the above into a [`GoldLabel`] per record
//! - [`validate`] -- labeler self-test against a curated benchmark
//! - [`RoutingTable`] -- canonical dashboard paths

pub mod error;
pub mod governance;
pub mod labeler;
pub mod language;
pub mod record;
pub mod routing;
pub mod taxonomy;
pub mod types;
pub mod validator;

// ── Convenience re-exports ───────────────────────────────────────────

pub use error::OracleError;
pub use governance::{GovernanceOracle, GovernanceTag, GovernanceVerdict};
pub use labeler::{EscalationExpectation, GoldLabel, Labeler};
pub use language::{Language, LanguageDetector};
pub use record::SourceRecord;
pub use routing::{LinkCheck, RoutingTable, DASH_BASE};
pub use taxonomy::{Module, ModuleClassifier, ModuleMatch};
pub use types::{Mode, Severity, TicketType, Verdict};
pub use validator::{
    builtin_benchmark, validate, validate_builtin, BenchmarkCase, LabelValidation,
    MODULE_ACCURACY_THRESHOLD,
};
