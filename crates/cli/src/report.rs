//! Plain-text rendering of a finished run.
//!
//! Section order follows the report readers are used to: run metadata,
//! labeler quality, the primary KPI, gate tallies, then the diagnostic
//! rollups, the worst conversations and the grade.

use std::time::Duration;

use gauge_core::LabelValidation;
use gauge_eval::aggregate::{pct, AggregateReport};
use gauge_eval::calibration::CalibrationQuality;
use gauge_eval::Gate;
use time::OffsetDateTime;

const WIDTH: usize = 100;

/// Facts about the run that the statistics do not carry.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub endpoint: String,
    pub seed: u64,
    pub planned: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub finished_at: OffsetDateTime,
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(&format).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn rule(out: &mut String, ch: char) {
    out.push_str(&ch.to_string().repeat(WIDTH));
    out.push('\n');
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    rule(out, '-');
    out.push_str(&format!("  {}\n", title));
    rule(out, '-');
}

fn rate(part: usize, whole: usize) -> String {
    format!("{}/{} ({:.1}%)", part, whole, pct(part, whole))
}

/// One-line labeler summary, shared by the report and `validate-labeler`.
pub fn labeler_summary(v: &LabelValidation) -> String {
    format!(
        "Module: {:.0}%  |  Verdict: {:.0}%  |  Gov-Escalate: {:.0}% ({} deterministic cases)",
        v.module_accuracy * 100.0,
        v.verdict_accuracy * 100.0,
        v.governance_escalation_accuracy * 100.0,
        v.governed_cases
    )
}

/// Per-case listing for `validate-labeler`.
pub fn render_labeler_validation(v: &LabelValidation) -> String {
    let mut out = String::new();
    out.push_str(&format!("Labeler self-validation ({} cases)\n", v.n));
    out.push_str(&format!("  {}\n", labeler_summary(v)));
    if v.has_measurement_warning() {
        out.push_str(&format!(
            "  WARNING: Gate B has ~{:.0}% measurement error\n",
            (1.0 - v.module_accuracy) * 100.0
        ));
    }
    for d in &v.details {
        let marks: String = [d.module_ok, d.verdict_ok, d.escalate_ok]
            .iter()
            .map(|ok| if *ok { '+' } else { 'x' })
            .collect();
        out.push_str(&format!(
            "  {} [{:<12}] [{:<19}] {}\n",
            marks,
            d.expected_module.as_str(),
            d.governance_tag,
            d.description
        ));
        if !d.module_ok {
            let got: Vec<String> = d.predicted_modules.iter().map(|m| m.to_string()).collect();
            out.push_str(&format!(
                "      module: expected={} got=[{}]\n",
                d.expected_module,
                got.join(", ")
            ));
        }
        if !d.verdict_ok {
            let got: Vec<String> = d.predicted_verdicts.iter().map(|v| v.to_string()).collect();
            out.push_str(&format!(
                "      verdict: expected={} got=[{}]\n",
                d.expected_verdict,
                got.join(", ")
            ));
        }
    }
    out
}

pub fn render(report: &AggregateReport, run: &RunInfo, labeler: Option<&LabelValidation>) -> String {
    let mut out = String::new();
    let total = report.total;
    if total == 0 {
        out.push_str("No results.\n");
        return out;
    }

    // Header
    rule(&mut out, '=');
    out.push_str("  CLASSIFIER CONVERSATION ACCURACY REPORT\n");
    rule(&mut out, '=');
    let secs = run.elapsed.as_secs_f64();
    out.push_str(&format!("  Conversations: {} of {} planned\n", total, run.planned));
    if run.cancelled {
        out.push_str("  PARTIAL RUN: cancelled before completion\n");
    }
    out.push_str(&format!(
        "  Duration:      {:.0}s ({:.1} min)  |  Avg: {:.1}s/conv\n",
        secs,
        secs / 60.0,
        secs / total as f64
    ));
    out.push_str(&format!("  Endpoint:      {}\n", run.endpoint));
    out.push_str(&format!("  Seed:          {}\n", run.seed));
    out.push_str(&format!("  Date:          {}\n", format_timestamp(run.finished_at)));

    if let Some(v) = labeler {
        section(&mut out, "AUTO-LABELER VALIDATION (Gate A/B measurement error)");
        out.push_str(&format!("  {}\n", labeler_summary(v)));
        if v.has_measurement_warning() {
            out.push_str(&format!(
                "  WARNING: Gate B has ~{:.0}% error rate, adjust numbers accordingly\n",
                (1.0 - v.module_accuracy) * 100.0
            ));
        } else {
            out.push_str("  Labeler quality acceptable\n");
        }
    }

    // Primary KPI
    out.push('\n');
    rule(&mut out, '*');
    out.push_str("  PRIMARY KPI: RESOLVED WITHOUT HUMAN INTERVENTION\n");
    rule(&mut out, '*');
    out.push_str(&format!("  Resolved:    {}\n", rate(report.resolved, total)));
    out.push_str(&format!("  Needs Human: {}\n", rate(total - report.resolved, total)));
    out.push_str("\n  Resolution by verdict:\n");
    for row in &report.by_verdict {
        out.push_str(&format!(
            "    {:<15} {:>4} tickets | {}\n",
            row.verdict,
            row.count,
            rate(row.resolved, row.count)
        ));
    }

    // Gates
    section(&mut out, "PASS/FAIL GATES");
    for t in &report.gates {
        let kind = if Gate::ALL
            .iter()
            .any(|g| g.letter() == t.gate && g.is_core())
        {
            "core"
        } else {
            "diagnostic"
        };
        out.push_str(&format!(
            "  {} {:<28} pass {:>4}  fail {:>4}  n/a {:>4}  ({:.1}% of decided, {})\n",
            t.gate,
            t.label,
            t.pass,
            t.fail,
            t.not_applicable,
            t.pass_rate(),
            kind
        ));
    }
    out.push_str(&format!(
        "\n  All core gates (A-D) passed: {}\n",
        rate(report.all_core_pass, total)
    ));

    // Governance
    section(&mut out, "GOVERNANCE (deterministic overrides)");
    out.push_str(&format!(
        "  {:<20} {:>5} {:>13} {:>12} {:>11} {:>10}\n",
        "tag", "N", "must-escalate", "AI-escalate", "compliant", "resolved"
    ));
    for g in &report.governance {
        out.push_str(&format!(
            "  {:<20} {:>5} {:>13} {:>11.1}% {:>10.1}% {:>9.1}%\n",
            g.tag.as_str(),
            g.count,
            g.must_escalate,
            pct(g.ai_escalated, g.count),
            pct(g.compliant, g.testable),
            pct(g.resolved, g.count)
        ));
    }
    out.push_str(&format!(
        "\n  False-positive '500' escalated: {}\n",
        rate(report.false_positive_escalated, report.false_positive_total)
    ));

    // Calibration
    section(&mut out, "CONFIDENCE CALIBRATION");
    let cal = &report.calibration;
    out.push_str(&format!(
        "  With confidence: {}\n",
        rate(cal.with_confidence, cal.total)
    ));
    if let (Some(avg), Some(min), Some(max)) = (cal.average, cal.min, cal.max) {
        out.push_str(&format!("  Average {:.3}  min {:.3}  max {:.3}\n", avg, min, max));
    }
    match (cal.ece, cal.quality) {
        (Some(ece), Some(quality)) => {
            let mark = match quality {
                CalibrationQuality::Well => "",
                CalibrationQuality::Acceptable => " (watch)",
                CalibrationQuality::Poor => " (action needed)",
            };
            out.push_str(&format!("  ECE: {:.4}  {}{}\n", ece, quality.label(), mark));
        }
        _ => out.push_str("  ECE: n/a (no confidence values)\n"),
    }
    for bin in &cal.display {
        out.push_str(&format!(
            "    {:<8} n={:>4}  accuracy {:>5.1}%  avg conf {:.3}  {:?}\n",
            bin.label,
            bin.count,
            bin.accuracy * 100.0,
            bin.avg_confidence,
            bin.fit
        ));
    }

    // Distributions
    section(&mut out, "VERDICT DISTRIBUTION");
    for (verdict, n) in &report.verdict_distribution {
        out.push_str(&format!("  {:<15} {}\n", verdict, rate(*n, total)));
    }

    section(&mut out, "MODULE ACCURACY (Gate B)");
    let m = &report.module;
    out.push_str(&format!(
        "  Correct {}  Wrong {}  Neutral {}  Accuracy {:.1}%\n",
        m.correct,
        m.wrong,
        m.neutral,
        m.accuracy()
    ));
    out.push_str("\n  Detected categories:\n");
    for (category, n) in &report.category_distribution {
        out.push_str(&format!("    {:<20} {}\n", category, rate(*n, total)));
    }
    if !report.module_mismatches.is_empty() {
        out.push_str("\n  Top mismatches (detected -> expected):\n");
        for (pair, n) in &report.module_mismatches {
            out.push_str(&format!("    {:>4}x  {}\n", n, pair));
        }
    }

    section(&mut out, "LANGUAGE (Gate I)");
    out.push_str(&format!("  Correct: {}\n", rate(report.language_correct, total)));
    for row in &report.languages {
        let wrong: Vec<String> = row
            .wrong_detections
            .iter()
            .map(|(lang, n)| format!("{lang}:{n}"))
            .collect();
        out.push_str(&format!(
            "    {:<7} {:>4} tickets | {} | resolved {:>5.1}% | score {:.1}{}\n",
            row.language.as_str(),
            row.count,
            rate(row.correct, row.count),
            pct(row.resolved, row.count),
            row.avg_score,
            if wrong.is_empty() {
                String::new()
            } else {
                format!("  wrong: {}", wrong.join(", "))
            }
        ));
    }

    section(&mut out, "TICKET TYPE (Gate F)");
    out.push_str(&format!("  Correct: {}\n", rate(report.ticket_type_correct, total)));
    for (ticket_type, n) in &report.ticket_type_distribution {
        out.push_str(&format!("    {:<12} {}\n", ticket_type, rate(*n, total)));
    }

    // Rollups
    section(&mut out, "BY SUBJECT");
    for row in &report.by_subject {
        out.push_str(&format!(
            "  {:<32} {:>4} | resolved {:>5.1}% | A {:>5.1}% | B {:>5.1}% | D {:>5.1}% | score {:.1}\n",
            row.subject,
            row.count,
            pct(row.resolved, row.count),
            pct(row.verdict_pass, row.count),
            pct(row.module_pass, row.count),
            pct(row.actionable, row.count),
            row.avg_score
        ));
    }

    section(&mut out, "BY DECLARED TICKET TYPE");
    for row in &report.by_declared_type {
        out.push_str(&format!(
            "  {:<12} {:>4} | resolved {:>5.1}% | escalate-consistent {:>5.1}% | governance {} | score {:.1}\n",
            row.declared_type,
            row.count,
            pct(row.resolved, row.count),
            pct(row.escalate_consistent, row.count),
            rate(row.governance_ok, row.governance_testable),
            row.avg_score
        ));
    }

    section(&mut out, "BY DETECTED CATEGORY");
    for row in &report.by_category {
        out.push_str(&format!(
            "  {:<20} {:>4} | resolved {:>5.1}% | score {:.1}\n",
            row.key,
            row.count,
            pct(row.resolved, row.count),
            row.avg_score
        ));
    }

    // Failure analysis
    if let Some(d) = report.tally(Gate::Actionability) {
        section(&mut out, "ACTIONABILITY FAILURES (Gate D)");
        out.push_str(&format!("  Failed: {}\n", rate(d.fail, d.decided())));
        for (reason, n) in &report.actionability_failures {
            out.push_str(&format!("    {:>4}x  {}\n", n, reason));
        }
    }

    section(&mut out, "HALLUCINATION REPORT (Gate C)");
    let h = &report.hallucinations;
    out.push_str(&format!(
        "  Affected conversations: {}  |  Instances: {}\n",
        rate(h.affected, total),
        h.instances
    ));
    for (what, n) in &h.top {
        out.push_str(&format!("    {:>4}x  {}\n", n, what));
    }

    section(&mut out, "SEVERITY");
    out.push_str(&format!("  Matches expected: {}\n", rate(report.severity_match, total)));
    for (severity, n) in &report.severity_distribution {
        out.push_str(&format!("    {:<10} {}\n", severity, rate(*n, total)));
    }

    section(&mut out, "RESPONSE TIME (server processing)");
    match &report.response_time {
        Some(t) => out.push_str(&format!(
            "  n={}  avg {:.0}ms  median {:.0}ms  p95 {:.0}ms  p99 {:.0}ms  min {:.0}ms  max {:.0}ms\n",
            t.samples, t.avg, t.median, t.p95, t.p99, t.min, t.max
        )),
        None => out.push_str("  no processing_time_ms reported\n"),
    }

    section(&mut out, "FOLLOW-UP CONTEXT RETENTION");
    out.push_str(&format!(
        "  Context kept: {}\n",
        rate(report.followup_kept, report.followup_tested)
    ));

    section(&mut out, "MOST COMMON ISSUES");
    for (issue, n) in &report.top_issues {
        out.push_str(&format!("  {:>4}x  {}\n", n, issue));
    }

    section(&mut out, "WEIGHTED SCORE DISTRIBUTION");
    let s = &report.scores;
    out.push_str(&format!("  Average {:.1}  Median {:.1}\n", s.average, s.median));
    out.push_str(&format!("    >=80   {}\n", rate(s.excellent, total)));
    out.push_str(&format!("    60-79  {}\n", rate(s.good, total)));
    out.push_str(&format!("    40-59  {}\n", rate(s.fair, total)));
    out.push_str(&format!("    <40    {}\n", rate(s.poor, total)));

    section(&mut out, &format!("WORST {} CONVERSATIONS", report.worst.len()));
    for (i, w) in report.worst.iter().enumerate() {
        let letters: String = Gate::ALL
            .iter()
            .map(|g| match w.gates.get(*g) {
                o if o.is_pass() => g.letter(),
                o if o.is_fail() => 'x',
                _ => '-',
            })
            .collect();
        out.push_str(&format!(
            "\n  #{} [{}] {} | {} | {} | score {:.1} | gates {}\n",
            i + 1,
            w.ticket_id,
            w.subject,
            w.declared_type,
            if w.governed { w.governance_tag.as_str() } else { "ungoverned" },
            w.weighted_score,
            letters
        ));
        out.push_str(&format!(
            "     verdict={} category={} escalate={} confidence={:.2}\n",
            w.verdict,
            w.category,
            w.escalate.map_or("null".to_string(), |e| e.to_string()),
            w.confidence
        ));
        out.push_str(&format!("     USER: {}\n", w.user_message));
        out.push_str(&format!("     AI:   {}\n", w.answer));
        if !w.actionability_reason.is_empty() {
            out.push_str(&format!("     D:    {}\n", w.actionability_reason));
        }
        for issue in w.issues.iter().take(5) {
            out.push_str(&format!("     ! {}\n", issue));
        }
    }

    let dbg = &report.debug;
    if dbg.active > 0 {
        section(&mut out, "DEBUG SIGNALS");
        out.push_str(&format!(
            "  Conversations with debug fields: {}  |  resolved {}\n",
            dbg.active,
            rate(dbg.active_resolved, dbg.active)
        ));
        if let Some(p) = &dbg.playbook {
            out.push_str(&format!(
                "  Playbook top score: n={} avg {:.3}  high {} medium {} low {}\n",
                p.count, p.average, p.high, p.medium, p.low
            ));
        }
        if let Some(p) = &dbg.pattern {
            out.push_str(&format!(
                "  Verdict pattern matched: {}  |  resolved when matched {}  unmatched {}\n",
                rate(p.matched, p.count),
                rate(p.matched_resolved, p.matched),
                rate(p.unmatched_resolved, p.count - p.matched)
            ));
        }
        if let Some(f) = &dbg.facts {
            out.push_str(&format!(
                "  Facts count: n={} avg {:.1} max {} zero {}\n",
                f.count, f.average, f.max, f.zero
            ));
        }
    }

    out.push('\n');
    rule(&mut out, '=');
    out.push_str(&format!(
        "  FINAL GRADE: {}  ({:.1}% resolved)  {}\n",
        report.grade.letter,
        report.resolution_rate(),
        report.grade.verdict
    ));
    rule(&mut out, '=');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::{Labeler, ModuleClassifier, SourceRecord};
    use gauge_eval::{aggregate, ConversationResult};
    use time::macros::datetime;

    fn run_info() -> RunInfo {
        RunInfo {
            endpoint: "http://localhost/chat".into(),
            seed: 7,
            planned: 2,
            cancelled: true,
            elapsed: Duration::from_secs(12),
            finished_at: datetime!(2026-03-01 09:30:00 UTC),
        }
    }

    fn failed(id: &str) -> ConversationResult {
        let record = SourceRecord {
            id: id.into(),
            description: "Mon domaine ne fonctionne plus depuis hier".into(),
            title: "Domaine".into(),
            subject: "Domaine".into(),
            ticket_type: "Problem".into(),
            company_name: "boutique".into(),
        };
        let gold = Labeler::builtin().label(&record);
        ConversationResult::from_failure(&record, gold, "API error: HTTP 503")
    }

    #[test]
    fn empty_batch_has_a_placeholder() {
        let report = aggregate(&[], &ModuleClassifier::builtin(), 5);
        assert_eq!(render(&report, &run_info(), None), "No results.\n");
    }

    #[test]
    fn report_carries_metadata_and_grade() {
        let results = vec![failed("t-1")];
        let report = aggregate(&results, &ModuleClassifier::builtin(), 5);
        let text = render(&report, &run_info(), None);
        assert!(text.contains("Conversations: 1 of 2 planned"));
        assert!(text.contains("PARTIAL RUN"));
        assert!(text.contains("Date:          2026-03-01 09:30:00"));
        assert!(text.contains("Seed:          7"));
        assert!(text.contains("FINAL GRADE: D"));
        assert!(text.contains("[t-1]"));
        assert!(text.contains("ECE: n/a"));
    }

    #[test]
    fn language_rows_show_resolution() {
        let results = vec![failed("t-1"), failed("t-2")];
        let report = aggregate(&results, &ModuleClassifier::builtin(), 5);
        let text = render(&report, &run_info(), None);
        let line = text
            .lines()
            .find(|l| l.starts_with("    fr "))
            .unwrap();
        assert!(line.contains("2 tickets"));
        assert!(line.contains("resolved   0.0%"));
        assert!(line.contains("score"));
    }

    #[test]
    fn labeler_listing_marks_failures() {
        let v = gauge_core::validate_builtin(&Labeler::builtin());
        let text = render_labeler_validation(&v);
        assert!(text.starts_with(&format!("Labeler self-validation ({} cases)", v.n)));
        let case_lines = text
            .lines()
            .filter(|l| l.contains("] ["))
            .count();
        assert_eq!(case_lines, v.n);
    }
}
