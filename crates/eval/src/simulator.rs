//! Conversation simulator: greeting, problem and optional follow-up
//! phases for one sampled record.

use gauge_core::{GoldLabel, GovernanceTag, Labeler, SourceRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::{ChatRequest, ClassifierClient, Turn, DEFAULT_TENANT};
use crate::digest::{bucket, in_fraction, stable_hash};
use crate::gates::{GateEvaluator, GateOutcome, GateResults, ProblemEvaluation};
use crate::response::{ClassifierReply, ClassifierResponse, DebugSignals};
use crate::scoring;

pub const GREETINGS: [&str; 9] = [
    "Bonjour",
    "Salut",
    "Salam",
    "Bonsoir",
    "Hello",
    "Salam alaykom",
    "Bonjour, j'ai besoin d'aide",
    "Salut, j'ai un problème",
    "Salem",
];

/// Reply substituted for greetings that are not sent live.
pub const CANONICAL_GREETING_REPLY: &str = "Salut 👋 Je suis ton assistant TikTak PRO. Décris-moi ton problème et je t'aide à le résoudre ! Si tu as un message d'erreur ou une URL, partage-les pour un diagnostic plus rapide.";

const GREETING_TOKENS: &[&str] = &["salut", "bonjour", "bienvenue", "aide", "assistant", "👋", "salam"];
const INVITE_TOKENS: &[&str] = &["problème", "question", "aide", "décris", "help"];
const GENERIC_FALLBACKS: &[&str] = &["je suis ton assistant", "décris-moi ton problème"];

const FOLLOWUP_TEMPLATES: [&str; 4] = [
    "J'ai essayé mais ça ne marche toujours pas, que faire?",
    "D'accord, mais comment je fais exactement la première étape?",
    "Je suis dans le dashboard mais je ne trouve pas cette option",
    "Et si ça persiste après ces étapes, quelle est la suite?",
];

/// Descriptions at most this long are prefixed with the title.
pub const SHORT_DESCRIPTION_CHARS: usize = 15;
const GREETING_MIN_CHARS: usize = 15;
const FOLLOWUP_MIN_CHARS: usize = 20;
/// Repetition is only checked on answers longer than this.
const REPETITION_MIN_CHARS: usize = 50;
const REPETITION_OVERLAP: f64 = 0.88;
/// A question mark this close to the end means the assistant asked something.
const TRAILING_QUESTION_WINDOW: usize = 120;

const STORED_MESSAGE_CHARS: usize = 200;
const STORED_ANSWER_CHARS: usize = 200;
const STORED_PROBLEM_ANSWER_CHARS: usize = 300;

// ── Result types ─────────────────────────────────────────────────────────────

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseRecord {
    Greeting {
        user_message: String,
        live: bool,
        outcome: GateOutcome,
        answer: String,
    },
    Problem {
        user_message: String,
        gates: GateResults,
        actionability_reason: String,
        issues: Vec<String>,
        verdict: String,
        mode: String,
        category: String,
        ticket_type: String,
        escalate: Option<bool>,
        confidence: f64,
        governance_tag: GovernanceTag,
        answer: String,
    },
    FollowUp {
        user_message: String,
        context_kept: bool,
        answer: String,
    },
    /// The conversation task itself failed.
    Error { message: String },
}

/// Raw fields of the problem-phase reply, kept for distributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedFields {
    pub verdict: String,
    pub category: String,
    pub language: String,
    pub ticket_type: String,
    pub sentiment: String,
    pub severity: String,
    pub escalate: Option<bool>,
}

impl DetectedFields {
    fn from_response(r: &ClassifierResponse) -> Self {
        DetectedFields {
            verdict: r.verdict.clone(),
            category: r.category.clone(),
            language: r.detected_language.clone(),
            ticket_type: r.ticket_type.clone(),
            sentiment: r.sentiment.clone(),
            severity: r.severity.clone(),
            escalate: r.escalate,
        }
    }
}

/// Everything learned from one simulated conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub ticket_id: String,
    pub subject: String,
    pub declared_type: String,
    pub company: String,
    pub user_message: String,
    pub gold: GoldLabel,
    pub greeting: GateOutcome,
    pub problem: ProblemEvaluation,
    /// `None` when no follow-up was sent.
    pub followup_context_kept: Option<bool>,
    pub resolved: bool,
    pub problem_score: f64,
    pub weighted_score: f64,
    pub confidence: f64,
    pub detected: DetectedFields,
    pub debug: DebugSignals,
    pub processing_time_ms: Option<f64>,
    pub client_latency_ms: Option<u64>,
    /// The problem phase produced no usable reply.
    pub errored: bool,
    pub phases: Vec<PhaseRecord>,
    pub errors: Vec<String>,
}

impl ConversationResult {
    pub fn gates(&self) -> &GateResults {
        &self.problem.gates
    }

    pub fn hallucinations(&self) -> &[String] {
        &self.problem.hallucinations
    }

    pub fn governance_tag(&self) -> GovernanceTag {
        self.gold.governance_tag()
    }

    /// Result for a conversation whose processing failed outright.
    pub fn from_failure(record: &SourceRecord, gold: GoldLabel, message: impl Into<String>) -> Self {
        let message = message.into();
        let gates = GateResults::errored();
        let problem_score = scoring::problem_score(&gates);
        ConversationResult {
            ticket_id: record.id.clone(),
            subject: record.subject.clone(),
            declared_type: record.ticket_type.clone(),
            company: record.company_name.clone(),
            user_message: truncate(&user_message(record), STORED_MESSAGE_CHARS),
            gold,
            greeting: GateOutcome::NotApplicable,
            problem: ProblemEvaluation {
                gates,
                verdict_via_mode: false,
                actionability_reason: String::new(),
                hallucinations: Vec::new(),
                severity_match: false,
                route_link_valid: None,
                issues: vec![message.clone()],
            },
            followup_context_kept: None,
            resolved: false,
            problem_score,
            weighted_score: scoring::weighted_score(GateOutcome::NotApplicable, problem_score, None),
            confidence: 0.0,
            detected: DetectedFields::default(),
            debug: DebugSignals::default(),
            processing_time_ms: None,
            client_latency_ms: None,
            errored: true,
            phases: vec![PhaseRecord::Error {
                message: message.clone(),
            }],
            errors: vec![message],
        }
    }
}

// ── Deterministic choices ────────────────────────────────────────────────────

pub fn greeting_for(id: &str) -> &'static str {
    GREETINGS[bucket(id, GREETINGS.len() as u64) as usize]
}

/// The problem message: the description, or `"{title}. {description}"`
/// when the description is too short to stand alone.
pub fn user_message(record: &SourceRecord) -> String {
    let description = record.description.trim();
    if description.chars().count() > SHORT_DESCRIPTION_CHARS {
        description.to_string()
    } else {
        format!("{}. {}", record.title.trim(), description)
    }
}

/// Indices of records whose greeting is sent live: the first
/// `max(1, floor(n * rate))` positions ordered by id hash.
pub fn live_greeting_indices(records: &[SourceRecord], rate: f64) -> BTreeSet<usize> {
    if records.is_empty() || rate <= 0.0 {
        return BTreeSet::new();
    }
    let count = ((records.len() as f64 * rate.min(1.0)) as usize).max(1);
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| stable_hash(&records[i].id));
    order.into_iter().take(count).collect()
}

pub fn wants_followup(id: &str, rate: f64) -> bool {
    in_fraction(id, rate)
}

/// Live greeting replies must greet, invite a description, stay in the
/// `general` category and say more than a word or two.
pub fn greeting_ok(reply: &ClassifierReply) -> bool {
    let Some(r) = reply.response() else {
        return false;
    };
    let lower = r.answer.to_lowercase();
    GREETING_TOKENS.iter().any(|t| lower.contains(t))
        && INVITE_TOKENS.iter().any(|t| lower.contains(t))
        && r.category == "general"
        && r.answer.chars().count() > GREETING_MIN_CHARS
}

/// The canned follow-up for a record, given the problem-phase reply.
pub fn followup_message(record: &SourceRecord, reply: &ClassifierResponse) -> String {
    let asked = reply.mode == "clarify" || tail(&reply.answer, TRAILING_QUESTION_WINDOW).contains('?');
    if !asked {
        return FOLLOWUP_TEMPLATES[bucket(&record.id, FOLLOWUP_TEMPLATES.len() as u64) as usize]
            .to_string();
    }

    let description = record.description.trim().to_lowercase();
    if ["domaine", "domain", ".tn", ".com"]
        .iter()
        .any(|w| description.contains(w))
    {
        let company = if record.company_name.trim().is_empty() {
            "example"
        } else {
            record.company_name.trim()
        };
        format!("Mon domaine est {company}.tn")
    } else if description.contains("commande") || description.contains("order") {
        "Le numéro de commande est #98765432".into()
    } else if ["erreur", "error", "bug"].iter().any(|w| description.contains(w)) {
        "L'erreur affichée est: 'Une erreur s'est produite, veuillez réessayer'".into()
    } else {
        "Je suis sur le dashboard TikTak, j'ai les droits admin".into()
    }
}

/// Whether the follow-up reply moved the conversation forward.
pub fn followup_kept_context(reply: &ClassifierReply, previous_answer: &str) -> bool {
    let Some(r) = reply.response() else {
        return false;
    };
    let answer = &r.answer;
    if answer.chars().count() < FOLLOWUP_MIN_CHARS {
        return false;
    }
    let lower = answer.to_lowercase();
    if GENERIC_FALLBACKS.iter().any(|p| lower.contains(p)) {
        return false;
    }
    if !previous_answer.is_empty() && answer.chars().count() > REPETITION_MIN_CHARS {
        let previous = previous_answer.to_lowercase();
        let before: BTreeSet<&str> = previous.split_whitespace().collect();
        let now: BTreeSet<&str> = lower.split_whitespace().collect();
        if !before.is_empty() && !now.is_empty() {
            let shared = before.intersection(&now).count() as f64;
            let overlap = shared / before.len().max(now.len()) as f64;
            if overlap > REPETITION_OVERLAP {
                return false;
            }
        }
    }
    true
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

// ── Simulator ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub tenant_id: String,
    /// Pause before every network call.
    pub think_time: Duration,
    pub followup_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            tenant_id: DEFAULT_TENANT.to_string(),
            think_time: Duration::from_millis(500),
            followup_rate: 0.30,
        }
    }
}

/// Drives conversations through a [`ClassifierClient`]. Cheap to clone.
#[derive(Clone)]
pub struct Simulator {
    client: Arc<dyn ClassifierClient>,
    labeler: Arc<Labeler>,
    evaluator: Arc<GateEvaluator>,
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(
        client: Arc<dyn ClassifierClient>,
        labeler: Arc<Labeler>,
        evaluator: Arc<GateEvaluator>,
        config: SimulatorConfig,
    ) -> Self {
        Simulator {
            client,
            labeler,
            evaluator,
            config,
        }
    }

    pub fn labeler(&self) -> &Labeler {
        &self.labeler
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run every phase for one record. Never fails: transport problems
    /// end up in the result.
    pub async fn run(&self, record: &SourceRecord, live_greeting: bool) -> ConversationResult {
        self.run_labeled(record, self.labeler.label(record), live_greeting)
            .await
    }

    /// [`Simulator::run`] with a gold label computed by the caller.
    pub async fn run_labeled(
        &self,
        record: &SourceRecord,
        gold: GoldLabel,
        live_greeting: bool,
    ) -> ConversationResult {
        let mut history: Vec<Turn> = Vec::new();
        let mut state: Option<Value> = None;
        let mut phases = Vec::new();
        let mut errors = Vec::new();

        // Greeting
        let greeting_text = greeting_for(&record.id);
        let (greeting, greeting_answer) = if live_greeting {
            let reply = self.call(greeting_text, &[], None).await;
            if let Some(e) = reply.error() {
                errors.push(format!("Greeting error: {e}"));
            }
            let answer = match reply.response() {
                Some(r) => r.answer.clone(),
                None => CANONICAL_GREETING_REPLY.to_string(),
            };
            (GateOutcome::from_bool(greeting_ok(&reply)), answer)
        } else {
            (GateOutcome::Pass, CANONICAL_GREETING_REPLY.to_string())
        };
        phases.push(PhaseRecord::Greeting {
            user_message: greeting_text.to_string(),
            live: live_greeting,
            outcome: greeting,
            answer: truncate(&greeting_answer, STORED_ANSWER_CHARS),
        });
        history.push(Turn::user(greeting_text));
        history.push(Turn::assistant(greeting_answer));

        // Problem
        let message = user_message(record);
        let reply = self.call(&message, &history, state.clone()).await;
        let problem = self.evaluator.evaluate(&reply, &gold);
        let response = reply.response();

        phases.push(PhaseRecord::Problem {
            user_message: truncate(&message, STORED_MESSAGE_CHARS),
            gates: problem.gates,
            actionability_reason: problem.actionability_reason.clone(),
            issues: problem.issues.clone(),
            verdict: response.map(|r| r.verdict.clone()).unwrap_or_default(),
            mode: response.map(|r| r.mode.clone()).unwrap_or_default(),
            category: response.map(|r| r.category.clone()).unwrap_or_default(),
            ticket_type: response.map(|r| r.ticket_type.clone()).unwrap_or_default(),
            escalate: response.and_then(|r| r.escalate),
            confidence: response.map(|r| r.confidence).unwrap_or(0.0),
            governance_tag: gold.governance_tag(),
            answer: match &reply {
                ClassifierReply::Answered(r) => truncate(&r.answer, STORED_PROBLEM_ANSWER_CHARS),
                ClassifierReply::Failed { error } => format!("ERROR: {error}"),
            },
        });

        // Follow-up
        let mut followup_context_kept = None;
        if let Some(r) = response {
            history.push(Turn::user(message.clone()));
            history.push(Turn::assistant(r.answer.clone()));
            state = r.state.clone();

            if wants_followup(&record.id, self.config.followup_rate) {
                let followup = followup_message(record, r);
                let followup_reply = self.call(&followup, &history, state.clone()).await;
                let kept = followup_kept_context(&followup_reply, &r.answer);
                phases.push(PhaseRecord::FollowUp {
                    user_message: followup,
                    context_kept: kept,
                    answer: match &followup_reply {
                        ClassifierReply::Answered(f) => truncate(&f.answer, STORED_ANSWER_CHARS),
                        ClassifierReply::Failed { error } => format!("ERROR: {error}"),
                    },
                });
                followup_context_kept = Some(kept);
            }
        }

        let resolved = scoring::is_resolved(&problem.gates);
        let problem_score = scoring::problem_score(&problem.gates);
        let weighted_score = scoring::weighted_score(greeting, problem_score, followup_context_kept);

        ConversationResult {
            ticket_id: record.id.clone(),
            subject: record.subject.clone(),
            declared_type: record.ticket_type.clone(),
            company: record.company_name.clone(),
            user_message: truncate(&message, STORED_MESSAGE_CHARS),
            gold,
            greeting,
            followup_context_kept,
            resolved,
            problem_score,
            weighted_score,
            confidence: response.map(|r| r.confidence).unwrap_or(0.0),
            detected: response.map(DetectedFields::from_response).unwrap_or_default(),
            debug: response.map(|r| r.debug.clone()).unwrap_or_default(),
            processing_time_ms: response.and_then(|r| r.processing_time_ms),
            client_latency_ms: response.map(|r| r.client_latency_ms),
            errored: reply.is_failed(),
            problem,
            phases,
            errors,
        }
    }

    /// One network call after the think-time pause. Client errors become
    /// a failed reply.
    async fn call(&self, message: &str, history: &[Turn], state: Option<Value>) -> ClassifierReply {
        if !self.config.think_time.is_zero() {
            tokio::time::sleep(self.config.think_time).await;
        }
        let request = ChatRequest {
            message: message.to_string(),
            history: history.to_vec(),
            tenant_id: self.config.tenant_id.clone(),
            state,
        };
        match self.client.chat(&request).await {
            Ok(reply) => ClassifierReply::from_body(&reply.body, reply.latency_ms),
            Err(e) => {
                debug!(error = %e, "classifier call failed");
                ClassifierReply::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceReply;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned bodies in order and records every request.
    struct Scripted {
        replies: Mutex<Vec<Result<Value, ClientError>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<Value, ClientError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Scripted {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ClassifierClient for Scripted {
        async fn chat(&self, request: &ChatRequest) -> Result<ServiceReply, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            let next = self.replies.lock().unwrap().pop().unwrap_or(Err(ClientError::Status(500)));
            next.map(|body| ServiceReply { body, latency_ms: 40 })
        }
    }

    fn simulator(client: Arc<Scripted>, followup_rate: f64) -> Simulator {
        Simulator::new(
            client,
            Arc::new(Labeler::builtin()),
            Arc::new(GateEvaluator::builtin()),
            SimulatorConfig {
                think_time: Duration::ZERO,
                followup_rate,
                ..SimulatorConfig::default()
            },
        )
    }

    fn record() -> SourceRecord {
        SourceRecord {
            id: "4512".into(),
            description: "Comment ajouter un nouveau produit avec des variantes ?".into(),
            title: "Produit".into(),
            subject: "Produits".into(),
            ticket_type: "Question".into(),
            company_name: "boutique".into(),
        }
    }

    fn solved() -> Value {
        json!({
            "answer": "Voici comment faire :\n1. Allez dans Produits\n2. Cliquez sur Ajouter\n3. Renseignez les variantes puis sauvegardez.",
            "verdict": "user_side",
            "mode": "solve",
            "category": "products",
            "ticket_type": "question",
            "severity": "low",
            "escalate": false,
            "detected_language": "fr",
            "signals": {"confidence": 0.8},
            "state": {"step": 1}
        })
    }

    #[test]
    fn short_descriptions_borrow_the_title() {
        let mut r = record();
        r.description = "ça bug".into();
        assert_eq!(user_message(&r), "Produit. ça bug");
        assert_eq!(user_message(&record()), record().description);
    }

    #[test]
    fn greeting_choice_is_stable() {
        assert_eq!(greeting_for("4512"), greeting_for("4512"));
        assert!(GREETINGS.contains(&greeting_for("anything")));
    }

    #[test]
    fn live_greeting_subset_size() {
        let records: Vec<SourceRecord> = (0..25)
            .map(|i| SourceRecord {
                id: format!("r{i}"),
                ..record()
            })
            .collect();
        assert_eq!(live_greeting_indices(&records, 0.10).len(), 2);
        assert_eq!(live_greeting_indices(&records[..3], 0.10).len(), 1);
        assert!(live_greeting_indices(&[], 0.10).is_empty());
        assert_eq!(live_greeting_indices(&records, 0.10), live_greeting_indices(&records, 0.10));
    }

    #[test]
    fn canonical_greeting_passes_its_own_check() {
        let reply = ClassifierReply::from_body(
            &json!({"answer": CANONICAL_GREETING_REPLY, "category": "general"}),
            0,
        );
        assert!(greeting_ok(&reply));
        let wrong_category = ClassifierReply::from_body(
            &json!({"answer": CANONICAL_GREETING_REPLY, "category": "orders"}),
            0,
        );
        assert!(!greeting_ok(&wrong_category));
    }

    #[test]
    fn followup_text_rules() {
        let clarify = ClassifierResponse {
            mode: "clarify".into(),
            ..ClassifierResponse::default()
        };
        let mut r = record();
        r.description = "Mon domaine boutique.tn ne pointe plus".into();
        assert_eq!(followup_message(&r, &clarify), "Mon domaine est boutique.tn");
        r.description = "Ma Commande 123 est bloquée".into();
        assert_eq!(followup_message(&r, &clarify), "Le numéro de commande est #98765432");
        r.description = "Un bug au moment du paiement".into();
        assert!(followup_message(&r, &clarify).starts_with("L'erreur affichée"));

        let solve = ClassifierResponse {
            mode: "solve".into(),
            answer: "Allez dans Paramètres.".into(),
            ..ClassifierResponse::default()
        };
        assert!(FOLLOWUP_TEMPLATES.contains(&followup_message(&r, &solve).as_str()));
    }

    #[test]
    fn followup_rejects_repetition_and_fallbacks() {
        let long = "Allez dans Paramètres puis Domaines et vérifiez que les enregistrements DNS sont corrects.";
        let same = ClassifierReply::from_body(&json!({"answer": long}), 0);
        assert!(!followup_kept_context(&same, long));
        let fallback = ClassifierReply::from_body(
            &json!({"answer": "Salut, je suis ton assistant, décris-moi ton problème."}),
            0,
        );
        assert!(!followup_kept_context(&fallback, long));
        let fresh = ClassifierReply::from_body(
            &json!({"answer": "Dans ce cas, videz le cache DNS et attendez une heure avant de réessayer."}),
            0,
        );
        assert!(followup_kept_context(&fresh, long));
        assert!(!followup_kept_context(&ClassifierReply::failed("boom"), long));
    }

    #[tokio::test]
    async fn full_conversation_carries_history_and_state() {
        let client = Scripted::new(vec![
            Ok(json!({"answer": CANONICAL_GREETING_REPLY, "category": "general"})),
            Ok(solved()),
            Ok(json!({"answer": "Ensuite, vérifiez que chaque variante a bien un prix et un stock."})),
        ]);
        let result = simulator(client.clone(), 1.0).run(&record(), true).await;

        assert_eq!(result.greeting, GateOutcome::Pass);
        assert!(result.resolved, "{:?}", result.problem.issues);
        assert_eq!(result.followup_context_kept, Some(true));
        assert_eq!(result.phases.len(), 3);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.client_latency_ms, Some(40));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].history.is_empty());
        assert_eq!(seen[1].history.len(), 2);
        assert_eq!(seen[1].state, None);
        assert_eq!(seen[2].history.len(), 4);
        assert_eq!(seen[2].state, Some(json!({"step": 1})));
    }

    #[tokio::test]
    async fn problem_error_skips_followup() {
        let client = Scripted::new(vec![Err(ClientError::Transport("reset".into()))]);
        let result = simulator(client.clone(), 1.0).run(&record(), false).await;

        assert!(result.errored);
        assert!(!result.resolved);
        assert_eq!(result.followup_context_kept, None);
        assert_eq!(result.gates(), &GateResults::errored());
        assert_eq!(client.seen.lock().unwrap().len(), 1);
        assert!(matches!(
            &result.phases[1],
            PhaseRecord::Problem { answer, .. } if answer.starts_with("ERROR:")
        ));
    }

    #[tokio::test]
    async fn failed_live_greeting_falls_back_to_canonical_text() {
        let client = Scripted::new(vec![Err(ClientError::Status(502)), Ok(solved())]);
        let result = simulator(client.clone(), 0.0).run(&record(), true).await;

        assert_eq!(result.greeting, GateOutcome::Fail);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Greeting error:"));
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[1].history[1].content, CANONICAL_GREETING_REPLY);
    }
}
