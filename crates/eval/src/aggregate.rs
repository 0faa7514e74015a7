//! Read-only rollups over a finished batch.

use gauge_core::{GovernanceTag, Language, ModuleClassifier, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::calibration::{self, CalibrationSummary};
use crate::gates::{Gate, GateOutcome, GateResults};
use crate::simulator::{ConversationResult, PhaseRecord};

const TOP_MISMATCHES: usize = 15;
const TOP_ACTIONABILITY_REASONS: usize = 15;
const TOP_HALLUCINATIONS: usize = 10;
const TOP_ISSUES: usize = 25;
const TOP_WRONG_LANGUAGES: usize = 3;

const DECLARED_TYPE_ORDER: [&str; 6] = ["Critical", "Blocking", "Problem", "Question", "Demande", "Autre"];
const SEVERITY_ORDER: [&str; 5] = ["critical", "high", "medium", "low", "?"];

/// `100 * part / whole`, 0 for an empty whole.
pub fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Counts sorted by frequency, ties broken alphabetically.
fn most_common<I>(items: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
}

fn top(mut counts: Vec<(String, usize)>, n: usize) -> Vec<(String, usize)> {
    counts.truncate(n);
    counts
}

/// Canonical verdict name; empty or unrecognised verdicts collapse to `?`.
fn verdict_key(raw: &str) -> String {
    Verdict::parse(raw)
        .map(|v| v.as_str().to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn or_unknown(raw: &str) -> String {
    if raw.is_empty() {
        "?".to_string()
    } else {
        raw.to_string()
    }
}

// ── Report structures ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictRow {
    pub verdict: String,
    pub count: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateTally {
    pub gate: char,
    pub label: &'static str,
    pub pass: usize,
    pub fail: usize,
    pub not_applicable: usize,
}

impl GateTally {
    /// Pass rate over decided outcomes only.
    pub fn pass_rate(&self) -> f64 {
        pct(self.pass, self.pass + self.fail)
    }

    pub fn decided(&self) -> usize {
        self.pass + self.fail
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernanceRow {
    pub tag: GovernanceTag,
    pub count: usize,
    pub must_escalate: usize,
    pub ai_escalated: usize,
    pub compliant: usize,
    pub testable: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStats {
    pub correct: usize,
    pub wrong: usize,
    pub neutral: usize,
}

impl ModuleStats {
    pub fn accuracy(&self) -> f64 {
        pct(self.correct, self.correct + self.wrong)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageRow {
    pub language: Language,
    pub count: usize,
    pub correct: usize,
    pub resolved: usize,
    pub avg_score: f64,
    pub wrong_detections: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRow {
    pub subject: String,
    pub count: usize,
    pub resolved: usize,
    pub verdict_pass: usize,
    pub module_pass: usize,
    pub actionable: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclaredTypeRow {
    pub declared_type: String,
    pub count: usize,
    pub resolved: usize,
    pub escalate_consistent: usize,
    pub governance_ok: usize,
    pub governance_testable: usize,
    pub avg_score: f64,
}

/// Generic key → resolution rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub key: String,
    pub count: usize,
    pub resolved: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HallucinationStats {
    pub affected: usize,
    pub instances: usize,
    pub top: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub avg: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
}

impl LatencyStats {
    /// Server-side processing times; non-positive values are ignored.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut t: Vec<f64> = times.into_iter().filter(|v| *v > 0.0).collect();
        if t.is_empty() {
            return None;
        }
        t.sort_by(f64::total_cmp);
        let n = t.len();
        Some(LatencyStats {
            samples: n,
            avg: t.iter().sum::<f64>() / n as f64,
            median: t[n / 2],
            p95: t[((0.95 * n as f64) as usize).min(n - 1)],
            p99: t[((0.99 * n as f64) as usize).min(n - 1)],
            min: t[0],
            max: t[n - 1],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub average: f64,
    pub median: f64,
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybookStats {
    pub count: usize,
    pub average: f64,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub count: usize,
    pub matched: usize,
    pub matched_resolved: usize,
    pub unmatched_resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactStats {
    pub count: usize,
    pub average: f64,
    pub max: i64,
    pub zero: usize,
}

/// Summary of the optional debug instrumentation signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSummary {
    pub playbook: Option<PlaybookStats>,
    pub pattern: Option<PatternStats>,
    pub facts: Option<FactStats>,
    pub active: usize,
    pub active_resolved: usize,
}

/// One line of the worst-conversations list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorstEntry {
    pub ticket_id: String,
    pub subject: String,
    pub declared_type: String,
    pub governance_tag: GovernanceTag,
    pub governed: bool,
    pub weighted_score: f64,
    pub resolved: bool,
    pub gates: GateResults,
    pub verdict: String,
    pub category: String,
    pub escalate: Option<bool>,
    pub confidence: f64,
    pub user_message: String,
    pub answer: String,
    pub actionability_reason: String,
    pub issues: Vec<String>,
    pub hallucinations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub letter: &'static str,
    pub verdict: &'static str,
}

impl Grade {
    pub fn from_resolution_rate(rate: f64) -> Self {
        let (letter, verdict) = if rate >= 80.0 {
            ("A+", "Exceptional: resolves 80%+ tickets autonomously")
        } else if rate >= 70.0 {
            ("A", "Excellent: strong autonomous resolution")
        } else if rate >= 60.0 {
            ("B+", "Good: solid but room for improvement")
        } else if rate >= 50.0 {
            ("B", "Decent: handles majority of cases")
        } else if rate >= 40.0 {
            ("C+", "Average: needs significant improvement")
        } else if rate >= 30.0 {
            ("C", "Below average: too many failures")
        } else {
            ("D", "Poor: fundamental issues")
        };
        Grade { letter, verdict }
    }
}

/// Every statistic the text report prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total: usize,
    pub resolved: usize,
    pub by_verdict: Vec<VerdictRow>,
    pub gates: Vec<GateTally>,
    pub all_core_pass: usize,
    pub governance: Vec<GovernanceRow>,
    pub false_positive_escalated: usize,
    pub false_positive_total: usize,
    pub calibration: CalibrationSummary,
    pub verdict_distribution: Vec<(String, usize)>,
    pub module: ModuleStats,
    pub category_distribution: Vec<(String, usize)>,
    pub module_mismatches: Vec<(String, usize)>,
    pub language_correct: usize,
    pub languages: Vec<LanguageRow>,
    pub ticket_type_correct: usize,
    pub ticket_type_distribution: Vec<(String, usize)>,
    pub by_subject: Vec<SubjectRow>,
    pub by_declared_type: Vec<DeclaredTypeRow>,
    pub by_category: Vec<RollupRow>,
    pub actionability_failures: Vec<(String, usize)>,
    pub hallucinations: HallucinationStats,
    pub severity_match: usize,
    pub severity_distribution: Vec<(String, usize)>,
    pub response_time: Option<LatencyStats>,
    pub followup_tested: usize,
    pub followup_kept: usize,
    pub top_issues: Vec<(String, usize)>,
    pub scores: ScoreDistribution,
    pub worst: Vec<WorstEntry>,
    pub debug: DebugSummary,
    pub grade: Grade,
}

impl AggregateReport {
    pub fn resolution_rate(&self) -> f64 {
        pct(self.resolved, self.total)
    }

    pub fn tally(&self, gate: Gate) -> Option<&GateTally> {
        self.gates.iter().find(|t| t.gate == gate.letter())
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Results ordered worst first: unresolved before resolved, then by score.
pub fn worst_conversations(results: &[ConversationResult], n: usize) -> Vec<&ConversationResult> {
    let mut sorted: Vec<&ConversationResult> = results.iter().collect();
    sorted.sort_by(|a, b| {
        a.resolved
            .cmp(&b.resolved)
            .then(a.weighted_score.total_cmp(&b.weighted_score))
    });
    sorted.truncate(n);
    sorted
}

fn avg_score(rs: &[&ConversationResult]) -> f64 {
    if rs.is_empty() {
        return 0.0;
    }
    rs.iter().map(|r| r.weighted_score).sum::<f64>() / rs.len() as f64
}

fn group_by<'a, F>(results: &'a [ConversationResult], key: F) -> BTreeMap<String, Vec<&'a ConversationResult>>
where
    F: Fn(&ConversationResult) -> String,
{
    let mut groups: BTreeMap<String, Vec<&ConversationResult>> = BTreeMap::new();
    for r in results {
        groups.entry(key(r)).or_default().push(r);
    }
    groups
}

fn problem_answer(r: &ConversationResult) -> String {
    r.phases
        .iter()
        .find_map(|p| match p {
            PhaseRecord::Problem { answer, .. } => Some(answer.clone()),
            PhaseRecord::Error { message } => Some(format!("ERROR: {message}")),
            _ => None,
        })
        .unwrap_or_default()
}

/// Build every rollup. `classifier` normalizes detected categories;
/// `worst_n` bounds the worst-conversations list.
pub fn aggregate(
    results: &[ConversationResult],
    classifier: &ModuleClassifier,
    worst_n: usize,
) -> AggregateReport {
    let total = results.len();
    let resolved = results.iter().filter(|r| r.resolved).count();

    let by_verdict_groups = group_by(results, |r| verdict_key(&r.detected.verdict));
    let by_verdict = Verdict::ALL
        .iter()
        .map(|v| v.as_str())
        .chain(["?"])
        .filter_map(|v| {
            by_verdict_groups.get(v).map(|rs| VerdictRow {
                verdict: v.to_string(),
                count: rs.len(),
                resolved: rs.iter().filter(|r| r.resolved).count(),
            })
        })
        .collect();

    let gates = Gate::ALL
        .iter()
        .map(|&gate| {
            let outcomes: Vec<GateOutcome> = results.iter().map(|r| r.gates().get(gate)).collect();
            GateTally {
                gate: gate.letter(),
                label: gate.label(),
                pass: outcomes.iter().filter(|o| **o == GateOutcome::Pass).count(),
                fail: outcomes.iter().filter(|o| **o == GateOutcome::Fail).count(),
                not_applicable: outcomes
                    .iter()
                    .filter(|o| **o == GateOutcome::NotApplicable)
                    .count(),
            }
        })
        .collect();
    let all_core_pass = results.iter().filter(|r| r.gates().core_passed() == 4).count();

    let by_tag = group_by(results, |r| r.governance_tag().as_str().to_string());
    let governance = GovernanceTag::ALL
        .iter()
        .filter_map(|tag| {
            by_tag.get(tag.as_str()).map(|rs| GovernanceRow {
                tag: *tag,
                count: rs.len(),
                must_escalate: rs
                    .iter()
                    .filter(|r| r.gold.governance.must_escalate == Some(true))
                    .count(),
                ai_escalated: rs.iter().filter(|r| r.detected.escalate == Some(true)).count(),
                compliant: rs.iter().filter(|r| r.gates().governance.is_pass()).count(),
                testable: rs
                    .iter()
                    .filter(|r| r.gates().governance != GateOutcome::NotApplicable)
                    .count(),
                resolved: rs.iter().filter(|r| r.resolved).count(),
            })
        })
        .collect();
    let false_positives: Vec<&ConversationResult> = results
        .iter()
        .filter(|r| r.governance_tag() == GovernanceTag::HttpFalsePositive)
        .collect();

    let module = ModuleStats {
        correct: results.iter().filter(|r| r.gates().module.is_pass()).count(),
        wrong: results.iter().filter(|r| r.gates().module.is_fail()).count(),
        neutral: results
            .iter()
            .filter(|r| r.gates().module == GateOutcome::NotApplicable)
            .count(),
    };
    let category_distribution = most_common(
        results
            .iter()
            .filter(|r| !r.detected.category.is_empty())
            .map(|r| classifier.normalize(&r.detected.category).as_str().to_string()),
    );
    let module_mismatches = top(
        most_common(results.iter().filter(|r| r.gates().module.is_fail()).map(|r| {
            let expected = r
                .gold
                .expected_modules
                .iter()
                .next()
                .map(|m| m.as_str())
                .unwrap_or("?");
            let got = classifier.normalize(&r.detected.category);
            format!("{} → exp:{} got:{}", r.subject, expected, got)
        })),
        TOP_MISMATCHES,
    );

    let by_language = group_by(results, |r| r.gold.expected_language.as_str().to_string());
    let languages = [Language::Fr, Language::Ar, Language::Darija, Language::En]
        .iter()
        .filter_map(|lang| {
            by_language.get(lang.as_str()).map(|rs| LanguageRow {
                language: *lang,
                count: rs.len(),
                correct: rs.iter().filter(|r| r.gates().language.is_pass()).count(),
                resolved: rs.iter().filter(|r| r.resolved).count(),
                avg_score: avg_score(rs),
                wrong_detections: top(
                    most_common(
                        rs.iter()
                            .filter(|r| !r.gates().language.is_pass() && !r.detected.language.is_empty())
                            .map(|r| r.detected.language.clone()),
                    ),
                    TOP_WRONG_LANGUAGES,
                ),
            })
        })
        .collect();

    let by_subject_groups = group_by(results, |r| r.subject.clone());
    let mut by_subject: Vec<SubjectRow> = by_subject_groups
        .iter()
        .map(|(subject, rs)| SubjectRow {
            subject: subject.clone(),
            count: rs.len(),
            resolved: rs.iter().filter(|r| r.resolved).count(),
            verdict_pass: rs.iter().filter(|r| r.gates().verdict.is_pass()).count(),
            module_pass: rs.iter().filter(|r| r.gates().module.is_pass()).count(),
            actionable: rs.iter().filter(|r| r.gates().actionability.is_pass()).count(),
            avg_score: avg_score(rs),
        })
        .collect();
    by_subject.sort_by(|a, b| b.count.cmp(&a.count));

    let by_type_groups = group_by(results, |r| r.declared_type.clone());
    // Known types in their usual order, anything else alphabetically after.
    let mut type_keys: Vec<&String> = by_type_groups.keys().collect();
    type_keys.sort_by_key(|t| {
        DECLARED_TYPE_ORDER
            .iter()
            .position(|known| known == t)
            .unwrap_or(DECLARED_TYPE_ORDER.len())
    });
    let by_declared_type = type_keys
        .into_iter()
        .filter_map(|t| {
            by_type_groups.get(t).map(|rs| DeclaredTypeRow {
                declared_type: t.clone(),
                count: rs.len(),
                resolved: rs.iter().filter(|r| r.resolved).count(),
                escalate_consistent: rs
                    .iter()
                    .filter(|r| r.gates().escalate_consistency.is_pass())
                    .count(),
                governance_ok: rs.iter().filter(|r| r.gates().governance.is_pass()).count(),
                governance_testable: rs
                    .iter()
                    .filter(|r| r.gates().governance != GateOutcome::NotApplicable)
                    .count(),
                avg_score: avg_score(rs),
            })
        })
        .collect();

    let by_category_groups = group_by(results, |r| {
        if r.detected.category.is_empty() {
            "?".to_string()
        } else {
            classifier.normalize(&r.detected.category).as_str().to_string()
        }
    });
    let mut by_category: Vec<RollupRow> = by_category_groups
        .iter()
        .map(|(key, rs)| RollupRow {
            key: key.clone(),
            count: rs.len(),
            resolved: rs.iter().filter(|r| r.resolved).count(),
            avg_score: avg_score(rs),
        })
        .collect();
    by_category.sort_by(|a, b| b.count.cmp(&a.count));

    let actionability_failures = top(
        most_common(
            results
                .iter()
                .filter(|r| !r.gates().actionability.is_pass() && !r.problem.actionability_reason.is_empty())
                .map(|r| r.problem.actionability_reason.clone()),
        ),
        TOP_ACTIONABILITY_REASONS,
    );

    let all_hallucinations: Vec<String> = results
        .iter()
        .flat_map(|r| r.hallucinations().iter().cloned())
        .collect();
    let hallucinations = HallucinationStats {
        affected: results.iter().filter(|r| !r.hallucinations().is_empty()).count(),
        instances: all_hallucinations.len(),
        top: top(most_common(all_hallucinations), TOP_HALLUCINATIONS),
    };

    let severity_counts = most_common(results.iter().map(|r| or_unknown(&r.detected.severity)));
    let severity_distribution = SEVERITY_ORDER
        .iter()
        .filter_map(|s| {
            severity_counts
                .iter()
                .find(|(k, _)| k.as_str() == *s)
                .map(|(k, c)| (k.clone(), *c))
        })
        .collect();

    let followups: Vec<bool> = results.iter().filter_map(|r| r.followup_context_kept).collect();

    let top_issues = top(
        most_common(results.iter().flat_map(|r| r.problem.issues.iter().cloned())),
        TOP_ISSUES,
    );

    let mut scores: Vec<f64> = results.iter().map(|r| r.weighted_score).collect();
    scores.sort_by(f64::total_cmp);
    let score_distribution = ScoreDistribution {
        average: if total == 0 {
            0.0
        } else {
            scores.iter().sum::<f64>() / total as f64
        },
        median: scores.get(total / 2).copied().unwrap_or(0.0),
        excellent: scores.iter().filter(|s| **s >= 80.0).count(),
        good: scores.iter().filter(|s| (60.0..80.0).contains(*s)).count(),
        fair: scores.iter().filter(|s| (40.0..60.0).contains(*s)).count(),
        poor: scores.iter().filter(|s| **s < 40.0).count(),
    };

    let worst = worst_conversations(results, worst_n)
        .into_iter()
        .map(|r| WorstEntry {
            ticket_id: r.ticket_id.clone(),
            subject: r.subject.clone(),
            declared_type: r.declared_type.clone(),
            governance_tag: r.governance_tag(),
            governed: r.gold.is_governed(),
            weighted_score: r.weighted_score,
            resolved: r.resolved,
            gates: *r.gates(),
            verdict: r.detected.verdict.clone(),
            category: r.detected.category.clone(),
            escalate: r.detected.escalate,
            confidence: r.confidence,
            user_message: r.user_message.clone(),
            answer: problem_answer(r),
            actionability_reason: r.problem.actionability_reason.clone(),
            issues: r.problem.issues.iter().take(3).cloned().collect(),
            hallucinations: r.hallucinations().iter().take(2).cloned().collect(),
        })
        .collect();

    AggregateReport {
        total,
        resolved,
        by_verdict,
        gates,
        all_core_pass,
        governance,
        false_positive_escalated: false_positives
            .iter()
            .filter(|r| r.detected.escalate == Some(true))
            .count(),
        false_positive_total: false_positives.len(),
        calibration: calibration::summarize(results),
        verdict_distribution: most_common(results.iter().map(|r| or_unknown(&r.detected.verdict))),
        module,
        category_distribution,
        module_mismatches,
        language_correct: results.iter().filter(|r| r.gates().language.is_pass()).count(),
        languages,
        ticket_type_correct: results.iter().filter(|r| r.gates().ticket_type.is_pass()).count(),
        ticket_type_distribution: most_common(
            results
                .iter()
                .filter(|r| !r.detected.ticket_type.is_empty())
                .map(|r| r.detected.ticket_type.clone()),
        ),
        by_subject,
        by_declared_type,
        by_category,
        actionability_failures,
        hallucinations,
        severity_match: results.iter().filter(|r| r.problem.severity_match).count(),
        severity_distribution,
        response_time: LatencyStats::from_times(results.iter().filter_map(|r| r.processing_time_ms)),
        followup_tested: followups.len(),
        followup_kept: followups.iter().filter(|k| **k).count(),
        top_issues,
        scores: score_distribution,
        worst,
        debug: debug_summary(results),
        grade: Grade::from_resolution_rate(pct(resolved, total)),
    }
}

fn debug_summary(results: &[ConversationResult]) -> DebugSummary {
    let playbook_scores: Vec<f64> = results.iter().filter_map(|r| r.debug.playbook_top_score).collect();
    let playbook = (!playbook_scores.is_empty()).then(|| PlaybookStats {
        count: playbook_scores.len(),
        average: playbook_scores.iter().sum::<f64>() / playbook_scores.len() as f64,
        high: playbook_scores.iter().filter(|s| **s >= 0.7).count(),
        medium: playbook_scores.iter().filter(|s| (0.4..0.7).contains(*s)).count(),
        low: playbook_scores.iter().filter(|s| **s < 0.4).count(),
    });

    let patterns: Vec<(bool, bool)> = results
        .iter()
        .filter_map(|r| r.debug.verdict_pattern_matched.map(|m| (m, r.resolved)))
        .collect();
    let pattern = (!patterns.is_empty()).then(|| PatternStats {
        count: patterns.len(),
        matched: patterns.iter().filter(|(m, _)| *m).count(),
        matched_resolved: patterns.iter().filter(|(m, res)| *m && *res).count(),
        unmatched_resolved: patterns.iter().filter(|(m, res)| !*m && *res).count(),
    });

    let facts: Vec<i64> = results.iter().filter_map(|r| r.debug.facts_count).collect();
    let fact_stats = (!facts.is_empty()).then(|| FactStats {
        count: facts.len(),
        average: facts.iter().sum::<i64>() as f64 / facts.len() as f64,
        max: facts.iter().copied().max().unwrap_or(0),
        zero: facts.iter().filter(|f| **f == 0).count(),
    });

    let active: Vec<&ConversationResult> = results.iter().filter(|r| r.debug.any_present()).collect();
    DebugSummary {
        playbook,
        pattern,
        facts: fact_stats,
        active: active.len(),
        active_resolved: active.iter().filter(|r| r.resolved).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::DebugSignals;
    use gauge_core::{Labeler, SourceRecord};

    fn result(id: &str, subject: &str, resolved: bool, score: f64) -> ConversationResult {
        let record = SourceRecord {
            id: id.into(),
            description: "Comment ajouter un nouveau produit avec des variantes ?".into(),
            title: String::new(),
            subject: subject.into(),
            ticket_type: "Question".into(),
            company_name: "shop".into(),
        };
        let gold = Labeler::builtin().label(&record);
        let mut r = ConversationResult::from_failure(&record, gold, "boom");
        r.resolved = resolved;
        r.weighted_score = score;
        r
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_resolution_rate(85.0).letter, "A+");
        assert_eq!(Grade::from_resolution_rate(70.0).letter, "A");
        assert_eq!(Grade::from_resolution_rate(59.9).letter, "B");
        assert_eq!(Grade::from_resolution_rate(30.0).letter, "C");
        assert_eq!(Grade::from_resolution_rate(0.0).letter, "D");
    }

    #[test]
    fn worst_orders_unresolved_first() {
        let results = vec![
            result("a", "Produits", true, 10.0),
            result("b", "Produits", false, 90.0),
            result("c", "Produits", false, 20.0),
        ];
        let ids: Vec<&str> = worst_conversations(&results, 2)
            .iter()
            .map(|r| r.ticket_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn latency_percentiles() {
        let stats = LatencyStats::from_times((1..=100).map(f64::from).chain([0.0, -3.0])).unwrap();
        assert_eq!(stats.samples, 100);
        assert_eq!(stats.median, 51.0);
        assert_eq!(stats.p95, 96.0);
        assert_eq!(stats.p99, 100.0);
        assert_eq!(stats.min, 1.0);
        assert!(LatencyStats::from_times(vec![0.0]).is_none());
    }

    #[test]
    fn aggregate_counts_errored_batch() {
        let mut results = vec![
            result("a", "Produits", false, 14.0),
            result("b", "Produits", false, 14.0),
            result("c", "Domaine", false, 14.0),
        ];
        results[0].debug = DebugSignals {
            playbook_top_score: Some(0.8),
            verdict_pattern_matched: Some(true),
            facts_count: Some(0),
        };
        let report = aggregate(&results, &ModuleClassifier::builtin(), 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.grade.letter, "D");
        assert_eq!(report.by_subject[0].subject, "Produits");
        assert_eq!(report.by_subject[0].count, 2);
        let verdict = report.tally(Gate::Verdict).unwrap();
        assert_eq!((verdict.pass, verdict.fail), (0, 3));
        let hallucination = report.tally(Gate::Hallucination).unwrap();
        assert_eq!(hallucination.not_applicable, 3);
        assert_eq!(report.by_verdict[0].verdict, "?");
        assert_eq!(report.top_issues, vec![("boom".to_string(), 3)]);
        assert_eq!(report.worst.len(), 2);
        assert_eq!(report.calibration.ece, None);
        let debug = report.debug;
        assert_eq!(debug.active, 1);
        assert_eq!(debug.playbook.unwrap().high, 1);
        assert_eq!(debug.facts.unwrap().zero, 1);
    }

    #[test]
    fn unrecognised_declared_type_keeps_its_row() {
        let mut results = vec![
            result("a", "Produits", true, 90.0),
            result("b", "Produits", false, 30.0),
            result("c", "Produits", false, 30.0),
        ];
        results[1].declared_type = "Réclamation".into();
        results[2].declared_type = "Autre".into();
        let report = aggregate(&results, &ModuleClassifier::builtin(), 0);
        let types: Vec<(&str, usize)> = report
            .by_declared_type
            .iter()
            .map(|row| (row.declared_type.as_str(), row.count))
            .collect();
        assert_eq!(types, vec![("Question", 1), ("Autre", 1), ("Réclamation", 1)]);
        let counted: usize = report.by_declared_type.iter().map(|row| row.count).sum();
        assert_eq!(counted, report.total);
    }

    #[test]
    fn verdict_spellings_share_one_row() {
        let mut results = vec![
            result("a", "Produits", true, 90.0),
            result("b", "Produits", false, 30.0),
            result("c", "Produits", true, 80.0),
            result("d", "Produits", false, 10.0),
        ];
        results[0].detected.verdict = "user_side".into();
        results[1].detected.verdict = "user_fault".into();
        results[2].detected.verdict = "vendor_fault".into();
        results[3].detected.verdict = "whatever".into();
        let report = aggregate(&results, &ModuleClassifier::builtin(), 0);
        let rows: Vec<(&str, usize, usize)> = report
            .by_verdict
            .iter()
            .map(|row| (row.verdict.as_str(), row.count, row.resolved))
            .collect();
        assert_eq!(
            rows,
            vec![("vendor_fault", 1, 1), ("user_fault", 2, 1), ("?", 1, 0)]
        );
    }

    #[test]
    fn language_rows_carry_resolution() {
        let results = vec![
            result("a", "Produits", true, 90.0),
            result("b", "Produits", false, 30.0),
        ];
        let report = aggregate(&results, &ModuleClassifier::builtin(), 0);
        let fr = report
            .languages
            .iter()
            .find(|row| row.language == Language::Fr)
            .unwrap();
        assert_eq!((fr.count, fr.resolved), (2, 1));
        assert!((fr.avg_score - 60.0).abs() < 1e-9);
    }
}
