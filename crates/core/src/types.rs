//! Closed vocabularies shared by the oracle and the evaluator.
//!
//! The classifier service speaks in free-form strings; everything the
//! harness reasons about is one of these enums. Each type has a lenient
//! `parse` that accepts the wire spellings (including legacy names) and
//! returns `None` for anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Verdict ──────────────────────────────────────────────────────────────────

/// Root-cause classification of a support message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The platform itself is at fault (the service calls this `tiktak_side`).
    VendorFault,
    /// The merchant misconfigured or misused something (`user_side`).
    UserFault,
    /// Not enough information to decide.
    Unclear,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::VendorFault, Verdict::UserFault, Verdict::Unclear];

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "vendor_fault" | "tiktak_side" | "vendor_side" => Some(Verdict::VendorFault),
            "user_fault" | "user_side" => Some(Verdict::UserFault),
            "unclear" => Some(Verdict::Unclear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::VendorFault => "vendor_fault",
            Verdict::UserFault => "user_fault",
            Verdict::Unclear => "unclear",
        }
    }

    /// The response mode the service derives from this verdict.
    pub fn implied_mode(&self) -> Mode {
        match self {
            Verdict::VendorFault => Mode::Escalate,
            Verdict::UserFault => Mode::Solve,
            Verdict::Unclear => Mode::Clarify,
        }
    }

    /// Decisive verdicts must not carry a follow-up question.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, Verdict::Unclear)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mode ─────────────────────────────────────────────────────────────────────

/// How the assistant chose to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Solve,
    Escalate,
    Clarify,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "solve" => Some(Mode::Solve),
            "escalate" => Some(Mode::Escalate),
            "clarify" => Some(Mode::Clarify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Solve => "solve",
            Mode::Escalate => "escalate",
            Mode::Clarify => "clarify",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Severity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── TicketType ───────────────────────────────────────────────────────────────

/// Ticket type as predicted by the classifier service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Bug,
    Question,
    Demand,
    Incident,
}

impl TicketType {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "bug" => Some(TicketType::Bug),
            "question" => Some(TicketType::Question),
            "demand" => Some(TicketType::Demand),
            "incident" => Some(TicketType::Incident),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Bug => "bug",
            TicketType::Question => "question",
            TicketType::Demand => "demand",
            TicketType::Incident => "incident",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, trim, and fold `-` into `_` so `vendor-fault` and
/// `vendor_fault` compare equal.
fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase().replace('-', "_")
}
