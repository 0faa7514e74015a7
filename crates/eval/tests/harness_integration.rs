//! End-to-end batch runs against an in-memory classifier.
//!
//! The fake service answers every greeting with the canonical reply and
//! every problem message with a well-formed, actionable answer, except for
//! messages containing trigger words that make it fail, panic, or skip a
//! required escalation.

use async_trait::async_trait;
use gauge_core::{GovernanceTag, Labeler, SourceRecord};
use gauge_eval::simulator::CANONICAL_GREETING_REPLY;
use gauge_eval::{
    aggregate, run_batch, stratified_sample, CancelFlag, ChatRequest, ClassifierClient,
    ClientError, GateEvaluator, GateOutcome, PhaseRecord, ServiceReply, Simulator,
    SimulatorConfig,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeService {
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancelFlag)>,
}

impl FakeService {
    fn new() -> Self {
        FakeService {
            calls: AtomicUsize::new(0),
            cancel_after: None,
        }
    }
}

#[async_trait]
impl ClassifierClient for FakeService {
    async fn chat(&self, request: &ChatRequest) -> Result<ServiceReply, ClientError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, flag)) = &self.cancel_after {
            if n >= *limit {
                flag.cancel();
            }
        }

        let message = request.message.as_str();
        if message.contains("PANIQUE") {
            panic!("fake service exploded");
        }
        if message.contains("HORS-LIGNE") {
            return Err(ClientError::RetriesExhausted {
                attempts: 3,
                last: Box::new(ClientError::Status(503)),
            });
        }
        if request.history.is_empty() {
            return Ok(ServiceReply {
                body: json!({"answer": CANONICAL_GREETING_REPLY, "category": "general"}),
                latency_ms: 5,
            });
        }
        if message.contains("SANS-ESCALADE") {
            // Right verdict and module, but the escalation flag is never raised.
            return Ok(ServiceReply {
                body: json!({
                    "answer": "Nous avons bien noté l'erreur. Notre équipe technique analyse le problème sur votre boutique.",
                    "verdict": "tiktak_side",
                    "mode": "escalate",
                    "category": "technical",
                    "escalate": false,
                    "detected_language": "fr",
                    "signals": {"confidence": 0.9}
                }),
                latency_ms: 12,
            });
        }
        if message.contains("COTE-MARCHAND") {
            return Ok(ServiceReply {
                body: json!({
                    "answer": "Voici la marche à suivre :\n1. Ouvrez le tableau de bord\n2. Cliquez sur Commandes\n3. Validez à nouveau la commande puis sauvegardez.",
                    "verdict": "user_side",
                    "mode": "solve",
                    "category": "technical",
                    "escalate": false,
                    "detected_language": "fr",
                    "signals": {"confidence": 0.9}
                }),
                latency_ms: 12,
            });
        }
        let governed = message.contains("500");
        Ok(ServiceReply {
            body: json!({
                "answer": "Voici la marche à suivre :\n1. Ouvrez le tableau de bord\n2. Cliquez sur Produits\n3. Ajoutez le produit puis sauvegardez.",
                "verdict": if governed { "tiktak_side" } else { "user_side" },
                "mode": if governed { "escalate" } else { "solve" },
                "category": "products",
                "ticket_type": "question",
                "severity": "low",
                "escalate": governed,
                "detected_language": "fr",
                "signals": {"confidence": 0.9},
                "processing_time_ms": 800,
                "state": {"turn": request.history.len()}
            }),
            latency_ms: 12,
        })
    }
}

fn record(id: &str, description: &str) -> SourceRecord {
    SourceRecord {
        id: id.into(),
        description: description.into(),
        title: "Produits".into(),
        subject: "Produits".into(),
        ticket_type: "Question".into(),
        company_name: "boutique".into(),
    }
}

fn simulator(client: Arc<FakeService>) -> Simulator {
    Simulator::new(
        client,
        Arc::new(Labeler::builtin()),
        Arc::new(GateEvaluator::builtin()),
        SimulatorConfig {
            think_time: Duration::ZERO,
            followup_rate: 0.0,
            ..SimulatorConfig::default()
        },
    )
}

fn corpus() -> Vec<SourceRecord> {
    (0..12)
        .map(|i| record(&format!("p-{i}"), &format!("Comment ajouter un produit avec des variantes, essai {i} ?")))
        .collect()
}

#[tokio::test]
async fn clean_batch_resolves_everything() {
    let records = corpus();
    let outcome = run_batch(&simulator(Arc::new(FakeService::new())), &records, 0.10, &CancelFlag::new()).await;

    assert_eq!(outcome.results.len(), 12);
    assert!(!outcome.cancelled);
    assert!(!outcome.is_partial());
    assert!(outcome.results.iter().all(|r| r.resolved), "{:?}", outcome.results[0].problem.issues);

    let live = outcome
        .results
        .iter()
        .filter(|r| matches!(r.phases[0], PhaseRecord::Greeting { live: true, .. }))
        .count();
    assert_eq!(live, 1);

    let report = aggregate(&outcome.results, &gauge_core::ModuleClassifier::builtin(), 5);
    assert_eq!(report.grade.letter, "A+");
    assert_eq!(report.worst.len(), 5);
    assert_eq!(report.response_time.as_ref().map(|t| t.samples), Some(12));
    assert!(report.calibration.ece.is_some());
}

#[tokio::test]
async fn failures_and_panics_stay_inside_their_conversation() {
    let mut records = corpus();
    records[3] = record("down", "Tout est HORS-LIGNE chez moi depuis ce matin");
    records[7] = record("boom", "Ce message PANIQUE le service de test");

    let outcome = run_batch(&simulator(Arc::new(FakeService::new())), &records, 0.0, &CancelFlag::new()).await;
    assert_eq!(outcome.results.len(), 12);

    let down = &outcome.results[3];
    assert!(down.errored);
    assert!(!down.resolved);
    assert_eq!(down.gates().hallucination, GateOutcome::NotApplicable);
    assert_eq!(down.gates().verdict, GateOutcome::Fail);

    let boom = &outcome.results[7];
    assert!(boom.errored);
    assert!(matches!(boom.phases[0], PhaseRecord::Error { .. }));
    assert!(boom.errors[0].contains("conversation task failed"));
    assert_eq!(boom.gold, Labeler::builtin().label(&records[7]));

    let resolved = outcome.results.iter().filter(|r| r.resolved).count();
    assert_eq!(resolved, 10);
}

#[tokio::test]
async fn cancellation_keeps_partial_results() {
    let cancel = CancelFlag::new();
    let service = FakeService {
        calls: AtomicUsize::new(0),
        cancel_after: Some((3, cancel.clone())),
    };
    let records = corpus();
    let outcome = run_batch(&simulator(Arc::new(service)), &records, 0.0, &cancel).await;

    assert!(outcome.cancelled);
    assert!(outcome.is_partial());
    assert_eq!(outcome.results.len(), 3);
}

#[tokio::test]
async fn governed_records_are_checked_for_escalation() {
    let records = vec![record("gov", "Erreur 500 quand je valide le panier, urgent")];
    let outcome = run_batch(&simulator(Arc::new(FakeService::new())), &records, 0.0, &CancelFlag::new()).await;
    let result = &outcome.results[0];
    assert_eq!(result.governance_tag(), GovernanceTag::Http5xx);
    assert_eq!(result.gates().governance, GateOutcome::Pass);
    assert_eq!(result.gates().escalate_consistency, GateOutcome::Pass);
}

#[tokio::test]
async fn missed_escalation_vetoes_resolution() {
    let records = vec![
        record("silent", "Erreur 500 quand je valide le panier, SANS-ESCALADE"),
        record("merchant", "Erreur 500 quand je valide le panier, COTE-MARCHAND"),
    ];
    let outcome = run_batch(&simulator(Arc::new(FakeService::new())), &records, 0.0, &CancelFlag::new()).await;
    assert_eq!(outcome.results.len(), 2);

    let silent = &outcome.results[0];
    assert_eq!(silent.governance_tag(), GovernanceTag::Http5xx);
    assert!(!silent.errored);
    assert_eq!(silent.gates().verdict, GateOutcome::Pass);
    assert_eq!(silent.gates().module, GateOutcome::Pass);
    assert_eq!(silent.gates().hallucination, GateOutcome::Pass);
    assert_eq!(silent.gates().actionability, GateOutcome::Pass);
    assert_eq!(silent.gates().governance, GateOutcome::Fail);
    assert!(!silent.resolved);
    assert!(silent
        .problem
        .issues
        .iter()
        .any(|i| i.starts_with("Governance [http_5xx]")));

    let merchant = &outcome.results[1];
    assert_eq!(merchant.governance_tag(), GovernanceTag::Http5xx);
    assert_eq!(merchant.gates().actionability, GateOutcome::Pass);
    assert_eq!(merchant.gates().governance, GateOutcome::Fail);
    assert!(!merchant.resolved);
}

#[test]
fn sampling_then_labeling_is_reproducible() {
    let records = corpus();
    let labeler = Labeler::builtin();
    let first: Vec<_> = stratified_sample(&records, 6, 2026)
        .iter()
        .map(|r| (r.id.clone(), labeler.label(r)))
        .collect();
    let second: Vec<_> = stratified_sample(&records, 6, 2026)
        .iter()
        .map(|r| (r.id.clone(), labeler.label(r)))
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 6);
}
