//! Ground-truth labeler.
//!
//! Combines the governance oracle, the module classifier and the language
//! detector with a record's help-desk metadata into a [`GoldLabel`]: the
//! set of answers the classifier service may give and still be right.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::governance::{GovernanceOracle, GovernanceTag, GovernanceVerdict};
use crate::language::{Language, LanguageDetector};
use crate::record::SourceRecord;
use crate::taxonomy::{Module, ModuleClassifier};
use crate::types::{Severity, TicketType, Verdict};

/// Texts shorter than this are too vague to expect a decisive verdict.
pub const VAGUE_TEXT_MIN_CHARS: usize = 30;

const DEGENERATE_TEXTS: &[&str] = &[".", "probleme", "urgent", "aide"];

/// Whether the service must escalate. Only governance makes this knowable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationExpectation {
    MustEscalate,
    MustNotEscalate,
    Unknown,
}

impl EscalationExpectation {
    pub fn from_mandate(mandate: Option<bool>) -> Self {
        match mandate {
            Some(true) => EscalationExpectation::MustEscalate,
            Some(false) => EscalationExpectation::MustNotEscalate,
            None => EscalationExpectation::Unknown,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EscalationExpectation::MustEscalate => Some(true),
            EscalationExpectation::MustNotEscalate => Some(false),
            EscalationExpectation::Unknown => None,
        }
    }
}

/// Expected values for one record. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldLabel {
    pub expected_modules: BTreeSet<Module>,
    pub accept_any_module: bool,
    pub expected_verdicts: BTreeSet<Verdict>,
    pub expected_severities: BTreeSet<Severity>,
    pub expected_ticket_types: BTreeSet<TicketType>,
    pub expected_language: Language,
    pub escalation: EscalationExpectation,
    pub governance: GovernanceVerdict,
    /// The labeled text was short or degenerate.
    pub vague: bool,
    pub text_chars: usize,
}

impl GoldLabel {
    pub fn governance_tag(&self) -> GovernanceTag {
        self.governance.tag
    }

    pub fn is_governed(&self) -> bool {
        self.governance.tag.is_forcing()
    }

    pub fn is_false_positive(&self) -> bool {
        self.governance.tag == GovernanceTag::HttpFalsePositive
    }
}

/// Ticket types the service may reasonably predict for a declared type.
pub fn ticket_types_for(declared: &str) -> BTreeSet<TicketType> {
    use TicketType::*;
    let types: &[TicketType] = match declared {
        "Critical" => &[Incident, Bug],
        "Blocking" => &[Bug, Incident],
        "Problem" => &[Bug],
        "Question" => &[Question],
        "Demande" => &[Demand, Question],
        "Autre" => &[Question, Demand],
        _ => &[Question],
    };
    types.iter().copied().collect()
}

/// Severities the service may reasonably predict for a declared type.
pub fn severities_for(declared: &str) -> BTreeSet<Severity> {
    use Severity::*;
    let severities: &[Severity] = match declared {
        "Critical" => &[Critical, High],
        "Blocking" => &[High, Critical, Medium],
        "Problem" => &[Medium, High, Low],
        _ => &[Low, Medium],
    };
    severities.iter().copied().collect()
}

/// Pure labeling function over injected rule tables.
#[derive(Debug, Clone)]
pub struct Labeler {
    governance: GovernanceOracle,
    classifier: ModuleClassifier,
    detector: LanguageDetector,
}

impl Labeler {
    pub fn new(
        governance: GovernanceOracle,
        classifier: ModuleClassifier,
        detector: LanguageDetector,
    ) -> Self {
        Labeler {
            governance,
            classifier,
            detector,
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            GovernanceOracle::builtin(),
            ModuleClassifier::builtin(),
            LanguageDetector::builtin(),
        )
    }

    pub fn governance(&self) -> &GovernanceOracle {
        &self.governance
    }

    pub fn classifier(&self) -> &ModuleClassifier {
        &self.classifier
    }

    pub fn detector(&self) -> &LanguageDetector {
        &self.detector
    }

    pub fn label(&self, record: &SourceRecord) -> GoldLabel {
        let text = record.labeling_text();
        let keyword = self.classifier.classify(&text);
        let subject_module = self.classifier.module_for_subject(&record.subject);

        let mut expected_modules = BTreeSet::new();
        if keyword.score >= 2 {
            expected_modules.insert(keyword.module);
            if subject_module != keyword.module && subject_module != Module::General {
                expected_modules.insert(subject_module);
            }
        } else if keyword.score >= 1 {
            expected_modules.insert(keyword.module);
            expected_modules.insert(subject_module);
        } else {
            expected_modules.insert(subject_module);
        }
        let mut accept_any_module = subject_module == Module::General && keyword.score == 0;

        let governance = self.governance.evaluate(&text);
        if let Some(category) = governance.must_category {
            expected_modules = BTreeSet::from([category]);
            accept_any_module = false;
        }

        let text_chars = text.chars().count();
        let vague = text_chars < VAGUE_TEXT_MIN_CHARS || DEGENERATE_TEXTS.contains(&text.as_str());
        let expected_verdicts = match governance.must_verdict {
            Some(v) => BTreeSet::from([v]),
            None => BTreeSet::from([Verdict::UserFault, Verdict::Unclear]),
        };

        let expected_ticket_types = match governance.must_ticket_type {
            Some(t) => BTreeSet::from([t]),
            None => ticket_types_for(&record.ticket_type),
        };
        let expected_severities = match governance.must_severity {
            Some(s) => BTreeSet::from([s]),
            None => severities_for(&record.ticket_type),
        };

        GoldLabel {
            expected_modules,
            accept_any_module,
            expected_verdicts,
            expected_severities,
            expected_ticket_types,
            expected_language: self.detector.detect(&text),
            escalation: EscalationExpectation::from_mandate(governance.must_escalate),
            governance,
            vague,
            text_chars,
        }
    }
}

impl Default for Labeler {
    fn default() -> Self {
        Self::builtin()
    }
}
