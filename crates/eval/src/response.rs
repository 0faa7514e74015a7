//! Explicit schema for classifier service replies.
//!
//! The service returns loosely typed JSON. Every field here has a neutral
//! default that applies when the field is absent or has the wrong type;
//! parsing never fails.

use gauge_core::{Mode, Severity, TicketType, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal signals the service exposes only when called with `debug=1`.
/// A field is `Some` only when present with the expected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugSignals {
    pub playbook_top_score: Option<f64>,
    pub verdict_pattern_matched: Option<bool>,
    pub facts_count: Option<i64>,
}

impl DebugSignals {
    pub fn from_body(body: &Value) -> Self {
        let playbook_top_score = match body.get("_phase1_playbook_top_score") {
            Some(Value::Number(n)) => n.as_f64(),
            // Numeric strings are accepted; anything unparsable counts as 0.
            Some(Value::String(s)) => Some(s.trim().parse::<f64>().unwrap_or(0.0)),
            _ => None,
        };
        DebugSignals {
            playbook_top_score,
            verdict_pattern_matched: body
                .get("_phase2_verdict_pattern_matched")
                .and_then(Value::as_bool),
            facts_count: body.get("_phase3_facts_count").and_then(Value::as_i64),
        }
    }

    pub fn any_present(&self) -> bool {
        self.playbook_top_score.is_some()
            || self.verdict_pattern_matched.is_some()
            || self.facts_count.is_some()
    }
}

/// A successfully decoded reply. Enumerated fields keep the raw
/// lowercase string; use the typed accessors for comparisons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResponse {
    pub answer: String,
    pub verdict: String,
    pub mode: String,
    pub category: String,
    pub severity: String,
    pub sentiment: String,
    pub ticket_type: String,
    /// `Some` only when the service sent a JSON boolean.
    pub escalate: Option<bool>,
    /// Read from `signals.confidence`, clamped to `[0, 1]`; 0 when missing.
    pub confidence: f64,
    pub detected_language: String,
    pub next_question: Option<String>,
    pub route_link: Option<String>,
    pub state: Option<Value>,
    pub processing_time_ms: Option<f64>,
    pub debug: DebugSignals,
    pub client_latency_ms: u64,
}

impl ClassifierResponse {
    pub fn from_body(body: &Value, client_latency_ms: u64) -> Self {
        ClassifierResponse {
            answer: text(body, "answer"),
            verdict: lower(body, "verdict"),
            mode: lower(body, "mode"),
            category: lower(body, "category"),
            severity: lower(body, "severity"),
            sentiment: lower(body, "sentiment"),
            ticket_type: lower(body, "ticket_type"),
            escalate: body.get("escalate").and_then(Value::as_bool),
            confidence: confidence(body),
            detected_language: lower(body, "detected_language"),
            next_question: optional_text(body, "next_question"),
            route_link: optional_text(body, "route_link").filter(|s| !s.is_empty()),
            state: body.get("state").filter(|v| !v.is_null()).cloned(),
            processing_time_ms: body.get("processing_time_ms").and_then(Value::as_f64),
            debug: DebugSignals::from_body(body),
            client_latency_ms,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        Verdict::parse(&self.verdict)
    }

    pub fn mode(&self) -> Option<Mode> {
        Mode::parse(&self.mode)
    }

    pub fn severity(&self) -> Option<Severity> {
        Severity::parse(&self.severity)
    }

    pub fn ticket_type(&self) -> Option<TicketType> {
        TicketType::parse(&self.ticket_type)
    }
}

/// What one phase got back: a decoded reply, or the structured error
/// object that replaces it once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifierReply {
    Answered(ClassifierResponse),
    Failed { error: String },
}

impl ClassifierReply {
    /// Decode a JSON body. A body carrying a non-null `error` field is a
    /// service-side failure.
    pub fn from_body(body: &Value, client_latency_ms: u64) -> Self {
        match body.get("error") {
            Some(err) if !err.is_null() => ClassifierReply::Failed {
                error: match err {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            },
            _ => ClassifierReply::Answered(ClassifierResponse::from_body(body, client_latency_ms)),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ClassifierReply::Failed {
            error: error.into(),
        }
    }

    pub fn response(&self) -> Option<&ClassifierResponse> {
        match self {
            ClassifierReply::Answered(r) => Some(r),
            ClassifierReply::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ClassifierReply::Answered(_) => None,
            ClassifierReply::Failed { error } => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ClassifierReply::Failed { .. })
    }

    /// Answer text, or empty on failure.
    pub fn answer(&self) -> &str {
        self.response().map(|r| r.answer.as_str()).unwrap_or("")
    }
}

fn text(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn lower(body: &Value, key: &str) -> String {
    text(body, key).trim().to_lowercase()
}

fn optional_text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Confidence lives at `signals.confidence`, never at the top level.
fn confidence(body: &Value) -> f64 {
    body.get("signals")
        .and_then(|s| s.get("confidence"))
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_body_decodes() {
        let body = json!({
            "answer": "Rendez-vous dans Paramètres",
            "verdict": "user_side",
            "mode": "Solve",
            "category": "Settings",
            "severity": "low",
            "sentiment": "neutral",
            "ticket_type": "question",
            "escalate": false,
            "signals": {"confidence": 0.82},
            "detected_language": "fr",
            "next_question": null,
            "route_link": "https://dash.tiktak.space/settings",
            "state": {"turn": 2},
            "processing_time_ms": 1234,
            "_phase1_playbook_top_score": "0.75",
            "_phase2_verdict_pattern_matched": true,
            "_phase3_facts_count": 2
        });
        let r = ClassifierResponse::from_body(&body, 950);
        assert_eq!(r.verdict(), Some(Verdict::UserFault));
        assert_eq!(r.mode(), Some(Mode::Solve));
        assert_eq!(r.category, "settings");
        assert_eq!(r.escalate, Some(false));
        assert_eq!(r.confidence, 0.82);
        assert_eq!(r.next_question, None);
        assert_eq!(r.state, Some(json!({"turn": 2})));
        assert_eq!(r.processing_time_ms, Some(1234.0));
        assert_eq!(r.debug.playbook_top_score, Some(0.75));
        assert_eq!(r.debug.verdict_pattern_matched, Some(true));
        assert_eq!(r.debug.facts_count, Some(2));
        assert_eq!(r.client_latency_ms, 950);
    }

    #[test]
    fn top_level_confidence_is_ignored() {
        let body = json!({"answer": "ok", "confidence": 0.9});
        assert_eq!(ClassifierResponse::from_body(&body, 0).confidence, 0.0);
    }

    #[test]
    fn boolean_confidence_is_ignored_and_values_are_clamped() {
        let r = ClassifierResponse::from_body(&json!({"signals": {"confidence": true}}), 0);
        assert_eq!(r.confidence, 0.0);
        let r = ClassifierResponse::from_body(&json!({"signals": {"confidence": 1.7}}), 0);
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn wrong_types_fall_back_to_neutral_values() {
        let body = json!({
            "answer": 42,
            "escalate": "yes",
            "verdict": null,
            "_phase2_verdict_pattern_matched": "true",
            "_phase3_facts_count": 1.5
        });
        let r = ClassifierResponse::from_body(&body, 0);
        assert_eq!(r.answer, "");
        assert_eq!(r.escalate, None);
        assert_eq!(r.verdict(), None);
        assert!(!r.debug.any_present());
    }

    #[test]
    fn error_field_marks_failure() {
        let reply = ClassifierReply::from_body(&json!({"error": "quota"}), 10);
        assert_eq!(reply.error(), Some("quota"));
        assert_eq!(reply.answer(), "");
        let reply = ClassifierReply::from_body(&json!({"error": null, "answer": "hi"}), 10);
        assert_eq!(reply.answer(), "hi");
    }
}
