//! Gate evaluator: nine tri-state checks of one classifier reply against
//! the record's gold label.
//!
//! Gates A-E feed the resolution rule; F-I are diagnostic. Every failing
//! gate leaves a human-readable issue string behind for the report.

use gauge_core::{
    GoldLabel, GovernanceTag, LinkCheck, Mode, Module, ModuleClassifier, RoutingTable, Verdict,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::response::{ClassifierReply, ClassifierResponse};

/// Outcome of one gate. `NotApplicable` means "not testable for this
/// record", never "unknown because something broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Pass,
    Fail,
    NotApplicable,
}

impl GateOutcome {
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            GateOutcome::Pass
        } else {
            GateOutcome::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == GateOutcome::Pass
    }

    pub fn is_fail(self) -> bool {
        self == GateOutcome::Fail
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateOutcome::Pass => "pass",
            GateOutcome::Fail => "fail",
            GateOutcome::NotApplicable => "n/a",
        }
    }
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The nine gates, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gate {
    Verdict,
    Module,
    Hallucination,
    Actionability,
    Governance,
    TicketType,
    NextQuestion,
    EscalateConsistency,
    Language,
}

impl Gate {
    pub const ALL: [Gate; 9] = [
        Gate::Verdict,
        Gate::Module,
        Gate::Hallucination,
        Gate::Actionability,
        Gate::Governance,
        Gate::TicketType,
        Gate::NextQuestion,
        Gate::EscalateConsistency,
        Gate::Language,
    ];

    pub fn letter(self) -> char {
        match self {
            Gate::Verdict => 'A',
            Gate::Module => 'B',
            Gate::Hallucination => 'C',
            Gate::Actionability => 'D',
            Gate::Governance => 'E',
            Gate::TicketType => 'F',
            Gate::NextQuestion => 'G',
            Gate::EscalateConsistency => 'H',
            Gate::Language => 'I',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gate::Verdict => "Verdict",
            Gate::Module => "Module",
            Gate::Hallucination => "No hallucination",
            Gate::Actionability => "Actionable",
            Gate::Governance => "Governance",
            Gate::TicketType => "Ticket type",
            Gate::NextQuestion => "Next question",
            Gate::EscalateConsistency => "Escalate consistent",
            Gate::Language => "Language",
        }
    }

    /// Gates that take part in the resolution rule.
    pub fn is_core(self) -> bool {
        matches!(
            self,
            Gate::Verdict
                | Gate::Module
                | Gate::Hallucination
                | Gate::Actionability
                | Gate::Governance
        )
    }
}

/// All nine outcomes for one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResults {
    pub verdict: GateOutcome,
    pub module: GateOutcome,
    pub hallucination: GateOutcome,
    pub actionability: GateOutcome,
    pub governance: GateOutcome,
    pub ticket_type: GateOutcome,
    pub next_question: GateOutcome,
    pub escalate_consistency: GateOutcome,
    pub language: GateOutcome,
}

impl GateResults {
    /// Outcomes for a reply that never arrived: content gates fail, gates
    /// that need content to be tested are not applicable.
    pub fn errored() -> Self {
        GateResults {
            verdict: GateOutcome::Fail,
            module: GateOutcome::Fail,
            hallucination: GateOutcome::NotApplicable,
            actionability: GateOutcome::Fail,
            governance: GateOutcome::NotApplicable,
            ticket_type: GateOutcome::Fail,
            next_question: GateOutcome::NotApplicable,
            escalate_consistency: GateOutcome::NotApplicable,
            language: GateOutcome::Fail,
        }
    }

    pub fn get(&self, gate: Gate) -> GateOutcome {
        match gate {
            Gate::Verdict => self.verdict,
            Gate::Module => self.module,
            Gate::Hallucination => self.hallucination,
            Gate::Actionability => self.actionability,
            Gate::Governance => self.governance,
            Gate::TicketType => self.ticket_type,
            Gate::NextQuestion => self.next_question,
            Gate::EscalateConsistency => self.escalate_consistency,
            Gate::Language => self.language,
        }
    }

    /// A, B, C and D all passed outright.
    pub fn core_passed(&self) -> usize {
        [self.verdict, self.module, self.hallucination, self.actionability]
            .iter()
            .filter(|g| g.is_pass())
            .count()
    }

    /// The definition of "correct" used for calibration.
    pub fn confidence_correct(&self) -> bool {
        self.verdict.is_pass() && !self.module.is_fail()
    }
}

/// Gate D verdict with the reason string kept for the failure tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actionability {
    pub ok: bool,
    pub reason: String,
}

/// Everything the problem phase learns from one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemEvaluation {
    pub gates: GateResults,
    /// Gate A passed on the mode fallback rather than the verdict itself.
    pub verdict_via_mode: bool,
    pub actionability_reason: String,
    pub hallucinations: Vec<String>,
    pub severity_match: bool,
    /// `None` when the reply carried no route link.
    pub route_link_valid: Option<bool>,
    pub issues: Vec<String>,
}

impl ProblemEvaluation {
    pub fn confidence_correct(&self) -> bool {
        self.gates.confidence_correct()
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

/// Platforms and features the assistant has no business mentioning.
const HALLUCINATION_DENYLIST: &[&str] = &[
    "woocommerce",
    "wordpress",
    "magento",
    "prestashop",
    "etsy",
    "amazon seller",
    "bigcommerce",
    "squarespace",
    "wix",
    "ai assistant settings",
    "machine learning dashboard",
    "neural network",
];

const ACTION_STEMS: &[&str] = &[
    "cliqu",
    "activ",
    "désactiv",
    "configur",
    "vérifi",
    "accéd",
    "sélection",
    "ajouter",
    "créer",
    "sauvegarder",
    "modifi",
    "supprim",
    "navigu",
    "ouv",
    "entrez",
    "rempli",
    "cochez",
    "appuyez",
    "renseign",
    "taper",
    "copier",
];

const URL_PATTERN: &str = r#"https?://[^\s<>"']+"#;
const NUMBERED_PATTERN: &str = r"(?m)(?:^|\n)\s*(?:\d+[\.\)]\s|étape\s+\d+)";
const BULLET_PATTERN: &str = r"(?m)(?:^|\n)\s*[-•]\s*\S.{4,}";
const NAV_PATTERN: &str = r"(?i)(?:rendez(?:\s*-\s*vous\s+(?:dans|sur|à|vers)?)?|allez?\s+(?:dans|sur|à|vers|au|aux)?|aller\s+(?:dans|sur|à|vers|au|aux)?|accédez?\s+(?:à|au|aux|dans|sur)?|accéder\s+(?:à|au|aux|dans|sur)?|cliquez?\s+(?:sur)?|naviguer?\s+(?:vers|dans|sur)?|ouvrez?\s+(?:le|la|les|l')?|sélectionner?\s+(?:le|la|les|l')?)\s*";

const CLARIFY_MIN_CHARS: usize = 15;
const ESCALATE_MIN_CHARS: usize = 30;
const SOLVE_MIN_CHARS: usize = 60;
/// A next-question must be longer than this to count as present.
const NEXT_QUESTION_MIN_CHARS: usize = 5;

// ── Evaluator ────────────────────────────────────────────────────────────────

/// Holds the compiled patterns and the injected lookup tables.
#[derive(Debug, Clone)]
pub struct GateEvaluator {
    classifier: ModuleClassifier,
    routing: RoutingTable,
    url: Regex,
    numbered: Regex,
    bullet: Regex,
    nav: Regex,
}

impl GateEvaluator {
    pub fn new(classifier: ModuleClassifier, routing: RoutingTable) -> Self {
        GateEvaluator {
            classifier,
            routing,
            url: Regex::new(URL_PATTERN).expect("built-in url pattern"),
            numbered: Regex::new(NUMBERED_PATTERN).expect("built-in numbered pattern"),
            bullet: Regex::new(BULLET_PATTERN).expect("built-in bullet pattern"),
            nav: Regex::new(NAV_PATTERN).expect("built-in navigation pattern"),
        }
    }

    pub fn builtin() -> Self {
        Self::new(ModuleClassifier::builtin(), RoutingTable::builtin())
    }

    pub fn classifier(&self) -> &ModuleClassifier {
        &self.classifier
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Score one problem-phase reply.
    pub fn evaluate(&self, reply: &ClassifierReply, gold: &GoldLabel) -> ProblemEvaluation {
        match reply {
            ClassifierReply::Failed { error } => ProblemEvaluation {
                gates: GateResults::errored(),
                verdict_via_mode: false,
                actionability_reason: String::new(),
                hallucinations: Vec::new(),
                severity_match: false,
                route_link_valid: None,
                issues: vec![format!("API error: {error}")],
            },
            ClassifierReply::Answered(response) => self.evaluate_response(response, gold),
        }
    }

    fn evaluate_response(&self, r: &ClassifierResponse, gold: &GoldLabel) -> ProblemEvaluation {
        let mut issues = Vec::new();

        // A
        let mode = r.mode();
        let mut verdict_via_mode = false;
        let verdict_gate = match r.verdict() {
            Some(v) if gold.expected_verdicts.contains(&v) => GateOutcome::Pass,
            _ if mode.is_some_and(|m| gold.expected_verdicts.iter().any(|v| v.implied_mode() == m)) => {
                verdict_via_mode = true;
                issues.push(format!(
                    "Verdict '{}' not in expected but mode '{}' matches",
                    r.verdict, r.mode
                ));
                GateOutcome::Pass
            }
            _ => {
                issues.push(format!(
                    "Verdict '{}' (mode='{}') not in expected {}",
                    r.verdict,
                    r.mode,
                    render_set(&gold.expected_verdicts)
                ));
                GateOutcome::Fail
            }
        };

        // B
        let coarse = self.classifier.normalize(&r.category);
        let module_gate = if gold.accept_any_module {
            if coarse == Module::General {
                GateOutcome::NotApplicable
            } else {
                GateOutcome::Pass
            }
        } else if gold.expected_modules.contains(&coarse) {
            GateOutcome::Pass
        } else {
            issues.push(format!(
                "Category '{}'→'{}' WRONG, expected {}",
                r.category,
                coarse,
                render_set(&gold.expected_modules)
            ));
            GateOutcome::Fail
        };

        // C
        let hallucinations = self.scan_hallucinations(&r.answer);
        let hallucination_gate = GateOutcome::from_bool(hallucinations.is_empty());
        issues.extend(hallucinations.iter().cloned());

        // D
        let actionability = self.actionability(&r.answer, mode);
        if !actionability.ok {
            issues.push(format!("Not actionable: {}", actionability.reason));
        }

        // E
        let governance_gate = governance_gate(r, gold, &mut issues);

        // F
        let ticket_type_gate = match r.ticket_type() {
            Some(t) if gold.expected_ticket_types.contains(&t) => GateOutcome::Pass,
            _ => {
                issues.push(format!(
                    "ticket_type '{}' not in expected {}",
                    r.ticket_type,
                    render_set(&gold.expected_ticket_types)
                ));
                GateOutcome::Fail
            }
        };

        // G
        let question_len = r
            .next_question
            .as_deref()
            .map(|q| q.trim().chars().count())
            .unwrap_or(0);
        let next_question_gate = match r.verdict() {
            Some(Verdict::Unclear) => {
                let ok = question_len > NEXT_QUESTION_MIN_CHARS;
                if !ok {
                    issues.push("verdict=unclear but next_question is missing or empty".into());
                }
                GateOutcome::from_bool(ok)
            }
            Some(_) => {
                let ok = question_len <= NEXT_QUESTION_MIN_CHARS;
                if !ok {
                    issues.push(format!(
                        "verdict='{}' but next_question is set (should be null)",
                        r.verdict
                    ));
                }
                GateOutcome::from_bool(ok)
            }
            None => GateOutcome::NotApplicable,
        };

        // H
        let escalated = r.escalate == Some(true);
        let consistency_gate = match r.verdict() {
            Some(Verdict::VendorFault) if !escalated => {
                issues.push(format!(
                    "verdict={} but escalate={} (should be true)",
                    r.verdict,
                    render_flag(r.escalate)
                ));
                GateOutcome::Fail
            }
            Some(Verdict::UserFault) if escalated => {
                issues.push(format!(
                    "verdict={} but escalate=true (should be false)",
                    r.verdict
                ));
                GateOutcome::Fail
            }
            _ => GateOutcome::Pass,
        };

        // I
        let expected_language = gold.expected_language.as_str();
        let language_gate = GateOutcome::from_bool(r.detected_language == expected_language);
        if language_gate.is_fail() {
            issues.push(format!(
                "Language '{}' != expected '{}'",
                r.detected_language, expected_language
            ));
        }

        let severity_match = r
            .severity()
            .is_some_and(|s| gold.expected_severities.contains(&s));

        let route_link_valid = r.route_link.as_deref().map(|link| {
            let ok = matches!(
                self.routing.check_route_link(link),
                LinkCheck::Valid | LinkCheck::External
            );
            if !ok {
                issues.push(format!("Invalid route_link path: {link}"));
            }
            ok
        });

        ProblemEvaluation {
            gates: GateResults {
                verdict: verdict_gate,
                module: module_gate,
                hallucination: hallucination_gate,
                actionability: GateOutcome::from_bool(actionability.ok),
                governance: governance_gate,
                ticket_type: ticket_type_gate,
                next_question: next_question_gate,
                escalate_consistency: consistency_gate,
                language: language_gate,
            },
            verdict_via_mode,
            actionability_reason: actionability.reason,
            hallucinations,
            severity_match,
            route_link_valid,
            issues,
        }
    }

    /// Denylisted platform names and dashboard links to unknown sections.
    pub fn scan_hallucinations(&self, answer: &str) -> Vec<String> {
        if answer.is_empty() {
            return Vec::new();
        }
        let lower = answer.to_lowercase();
        let mut found: Vec<String> = HALLUCINATION_DENYLIST
            .iter()
            .filter(|name| lower.contains(*name))
            .map(|name| format!("Referenced non-existent platform: '{name}'"))
            .collect();

        for m in self.url.find_iter(answer) {
            let link = m.as_str();
            if !(link.contains("tiktak") || link.contains("dash.")) {
                continue;
            }
            if let LinkCheck::UnknownPath(path) = self.routing.check_dashboard_link(link) {
                found.push(format!("Invalid dashboard URL path: '{path}'"));
            }
        }
        found
    }

    /// Mode-conditioned usefulness check. Unknown modes are held to the
    /// `solve` standard.
    pub fn actionability(&self, answer: &str, mode: Option<Mode>) -> Actionability {
        if answer.is_empty() {
            return Actionability {
                ok: false,
                reason: "Empty answer".into(),
            };
        }
        let text = answer.trim();
        let chars = text.chars().count();

        match mode {
            Some(Mode::Clarify) => {
                let (ok, reason) = if !text.contains('?') {
                    (false, "Clarify mode but no question mark")
                } else if chars < CLARIFY_MIN_CHARS {
                    (false, "Clarify answer too short")
                } else {
                    (true, "Contains question")
                };
                Actionability {
                    ok,
                    reason: reason.into(),
                }
            }
            Some(Mode::Escalate) => {
                let ok = chars >= ESCALATE_MIN_CHARS;
                Actionability {
                    ok,
                    reason: if ok { "OK" } else { "Escalate answer too short" }.into(),
                }
            }
            Some(Mode::Solve) | None => {
                if chars < SOLVE_MIN_CHARS {
                    return Actionability {
                        ok: false,
                        reason: format!("Too short ({chars} chars)"),
                    };
                }
                let lower = text.to_lowercase();
                let numbered = self.numbered.is_match(text);
                let bullets = self.bullet.find_iter(text).count() >= 2;
                let nav = self.nav.is_match(&lower);
                let actions = ACTION_STEMS.iter().filter(|s| lower.contains(*s)).count();
                Actionability {
                    ok: numbered || bullets || (nav && actions >= 2),
                    reason: format!(
                        "numbered={numbered}, bullets={bullets}, nav={nav}, actions={actions}"
                    ),
                }
            }
        }
    }
}

impl Default for GateEvaluator {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Gate E: only governed and false-positive records are testable.
fn governance_gate(r: &ClassifierResponse, gold: &GoldLabel, issues: &mut Vec<String>) -> GateOutcome {
    let tag = gold.governance_tag();
    let escalated = r.escalate == Some(true);
    if tag.is_forcing() {
        let required = gold.governance.must_verdict.unwrap_or(Verdict::VendorFault);
        let ok = escalated && r.verdict() == Some(required);
        if !ok {
            issues.push(format!(
                "Governance [{tag}] requires escalate=true + verdict={required}, got escalate={} verdict='{}'",
                render_flag(r.escalate),
                r.verdict
            ));
        }
        GateOutcome::from_bool(ok)
    } else if tag == GovernanceTag::HttpFalsePositive {
        if escalated {
            issues.push("False-positive '500' was incorrectly escalated".into());
        }
        GateOutcome::from_bool(!escalated)
    } else {
        GateOutcome::NotApplicable
    }
}

fn render_set<T: fmt::Display>(set: &BTreeSet<T>) -> String {
    let items: Vec<String> = set.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn render_flag(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "true",
        Some(false) => "false",
        None => "null",
    }
}
