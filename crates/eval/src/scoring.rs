//! Resolution rule and weighted score.

use crate::gates::{GateOutcome, GateResults};

const GREETING_WEIGHT: f64 = 0.05;
const PROBLEM_WEIGHT: f64 = 0.95;
const PROBLEM_WEIGHT_WITH_FOLLOWUP: f64 = 0.80;
const FOLLOWUP_WEIGHT: f64 = 0.15;

/// A, D pass outright; B, C and E merely must not fail.
pub fn is_resolved(gates: &GateResults) -> bool {
    gates.verdict.is_pass()
        && !gates.module.is_fail()
        && !gates.hallucination.is_fail()
        && gates.actionability.is_pass()
        && !gates.governance.is_fail()
}

/// Problem-phase points out of 100.
pub fn problem_score(gates: &GateResults) -> f64 {
    fn points(outcome: GateOutcome, pass: u32, neutral: u32) -> u32 {
        match outcome {
            GateOutcome::Pass => pass,
            GateOutcome::NotApplicable => neutral,
            GateOutcome::Fail => 0,
        }
    }
    let total = points(gates.verdict, 25, 0)
        + points(gates.module, 20, 12)
        + points(gates.hallucination, 20, 10)
        + points(gates.actionability, 20, 0)
        + points(gates.governance, 10, 5)
        + points(gates.ticket_type, 5, 0);
    f64::from(total)
}

/// Greeting component: untested greetings score half.
pub fn greeting_score(greeting: GateOutcome) -> f64 {
    match greeting {
        GateOutcome::Pass => 100.0,
        GateOutcome::NotApplicable => 50.0,
        GateOutcome::Fail => 0.0,
    }
}

/// Blend the phase scores. `followup` is `None` when that phase did not run.
pub fn weighted_score(greeting: GateOutcome, problem: f64, followup: Option<bool>) -> f64 {
    let g = greeting_score(greeting) * GREETING_WEIGHT;
    match followup {
        Some(kept) => {
            let f = if kept { 100.0 } else { 0.0 };
            g + problem * PROBLEM_WEIGHT_WITH_FOLLOWUP + f * FOLLOWUP_WEIGHT
        }
        None => g + problem * PROBLEM_WEIGHT,
    }
}
