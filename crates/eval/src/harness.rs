//! Sequential batch loop with per-record fault isolation and cooperative
//! cancellation.

use gauge_core::SourceRecord;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::simulator::{live_greeting_indices, ConversationResult, Simulator};

/// Shared stop flag. Checked before each record; the in-flight
/// conversation always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a batch produced, complete or not.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<ConversationResult>,
    pub planned: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn is_partial(&self) -> bool {
        self.results.len() < self.planned
    }
}

/// Progress is reported every 5% of the batch, but at most every 50 records.
pub fn progress_interval(total: usize) -> usize {
    (total / 20).max(50)
}

/// Run every record in order, one conversation at a time.
pub async fn run_batch(
    simulator: &Simulator,
    records: &[SourceRecord],
    greeting_live_rate: f64,
    cancel: &CancelFlag,
) -> BatchOutcome {
    let started = Instant::now();
    let total = records.len();
    let live = live_greeting_indices(records, greeting_live_rate);
    let interval = progress_interval(total);
    let mut results = Vec::with_capacity(total);
    let mut cancelled = false;

    info!(total, live_greetings = live.len(), "starting batch");

    for (i, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(completed = i, total, "batch cancelled");
            cancelled = true;
            break;
        }

        // Labeled outside the task so a failed task still has its gold label.
        let gold = simulator.labeler().label(record);
        let sim = simulator.clone();
        let owned = record.clone();
        let task_gold = gold.clone();
        let live_greeting = live.contains(&i);
        let handle =
            tokio::spawn(async move { sim.run_labeled(&owned, task_gold, live_greeting).await });

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                ConversationResult::from_failure(record, gold, format!("conversation task failed: {e}"))
            }
        };

        if result.errored {
            warn!(
                ticket = %result.ticket_id,
                errors = ?result.problem.issues.first(),
                "conversation errored"
            );
        }
        results.push(result);

        let done = i + 1;
        if done % interval == 0 || done == total {
            let resolved = results.iter().filter(|r| r.resolved).count();
            info!(
                done,
                total,
                percent = %format!("{:.1}", 100.0 * done as f64 / total as f64),
                resolved,
                ticket = %record.id,
                "progress"
            );
        }
    }

    BatchOutcome {
        planned: total,
        cancelled,
        elapsed: started.elapsed(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_interval_floor() {
        assert_eq!(progress_interval(10), 50);
        assert_eq!(progress_interval(1000), 50);
        assert_eq!(progress_interval(4000), 200);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!flag.is_cancelled());
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
