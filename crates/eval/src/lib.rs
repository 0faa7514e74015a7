//! gauge-eval: everything that consumes a classifier reply.
//!
//! Drives simulated conversations against the classifier service, grades
//! each reply against the gold label from `gauge-core`, and rolls the
//! batch up into report statistics.
//!
//! # Public API
//!
//! - [`ClassifierClient`] -- async seam to the service; [`HttpClassifierClient`]
//!   behind the `http` feature
//! - [`stratified_sample`] -- reproducible subject-stratified selection
//! - [`Simulator`] -- greeting / problem / follow-up phases for one record
//! - [`GateEvaluator`] -- gates A to I for one reply
//! - [`run_batch`] -- sequential loop with cancellation
//! - [`aggregate()`] -- rollups, calibration and grade for the report

pub mod aggregate;
pub mod calibration;
pub mod client;
pub mod corpus;
pub mod digest;
pub mod error;
pub mod gates;
pub mod harness;
pub mod response;
pub mod sampler;
pub mod scoring;
pub mod simulator;

// ── Convenience re-exports ───────────────────────────────────────────

pub use aggregate::{aggregate, worst_conversations, AggregateReport, Grade};
pub use calibration::{expected_calibration_error, CalibrationSummary};
#[cfg(feature = "http")]
pub use client::HttpClassifierClient;
pub use client::{
    ChatRequest, ClassifierClient, HttpClientConfig, RetryPolicy, ServiceReply, Turn,
    DEFAULT_ENDPOINT, DEFAULT_TENANT,
};
pub use corpus::load_corpus;
pub use error::{ClientError, HarnessError};
pub use gates::{Gate, GateEvaluator, GateOutcome, GateResults, ProblemEvaluation};
pub use harness::{run_batch, BatchOutcome, CancelFlag};
pub use response::{ClassifierReply, ClassifierResponse, DebugSignals};
pub use sampler::{stratified_sample, subject_histogram};
pub use simulator::{ConversationResult, PhaseRecord, Simulator, SimulatorConfig};
