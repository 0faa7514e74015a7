mod config;
mod logging;
mod output;
mod report;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gauge_core::{validate_builtin, GovernanceTag, Labeler, SourceRecord};
use gauge_eval::simulator::{live_greeting_indices, wants_followup};
use gauge_eval::{
    aggregate, load_corpus, run_batch, stratified_sample, subject_histogram, CancelFlag,
    GateEvaluator, HttpClassifierClient, Simulator,
};
use time::OffsetDateTime;
use tracing::{info, warn};

use config::{HarnessConfig, Overrides};
use report::RunInfo;

/// Rough wall-clock cost of one classifier call, think time included.
const SECONDS_PER_CALL: f64 = 3.5;

/// Conversation accuracy harness for the support classifier service.
#[derive(Parser)]
#[command(name = "gauge", version, about = "Conversation accuracy harness for the support classifier")]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the labeler, sample the corpus and simulate conversations
    Run {
        /// TOML harness configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ticket corpus (JSON array)
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Number of tickets to sample
        #[arg(long)]
        count: Option<usize>,
        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
        /// Classifier chat endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Directory for the report and JSON dumps
        #[arg(long = "out")]
        out: Option<PathBuf>,
    },

    /// Run only the labeler self-validation
    ValidateLabeler {
        /// Directory for labeler_validation.json
        #[arg(long = "out", default_value = ".")]
        out: PathBuf,
    },

    /// Show the stratified selection without calling the service
    Sample {
        /// Ticket corpus (JSON array)
        #[arg(long)]
        corpus: PathBuf,
        /// Number of tickets to sample
        #[arg(long, default_value = "1000")]
        count: usize,
        /// Sampling seed
        #[arg(long, default_value = "2026")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(logging::LoggingConfig {
        verbose: cli.verbose,
        json: cli.log_json,
    });

    let result = match cli.command {
        Commands::Run {
            config: config_path,
            corpus,
            count,
            seed,
            endpoint,
            out,
        } => config::resolve(
            config_path.as_deref(),
            Overrides {
                corpus,
                count,
                seed,
                endpoint,
                output_dir: out,
            },
        )
        .and_then(|c| cmd_run(&c)),
        Commands::ValidateLabeler { out } => cmd_validate_labeler(&out),
        Commands::Sample {
            corpus,
            count,
            seed,
        } => cmd_sample(&corpus, count, seed),
    };

    if let Err(msg) = result {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}

fn cmd_validate_labeler(out: &Path) -> Result<(), String> {
    let validation = validate_builtin(&Labeler::builtin());
    print!("{}", report::render_labeler_validation(&validation));
    let path = output::write_labeler_validation(out, &validation)?;
    println!("Saved {}", path.display());
    Ok(())
}

/// Sampled records plus the deterministic per-record decisions.
struct Plan {
    records: Vec<SourceRecord>,
    governed: usize,
    live_greetings: usize,
    followups: usize,
}

impl Plan {
    fn new(corpus: &[SourceRecord], count: usize, seed: u64, live_rate: f64, followup_rate: f64) -> Self {
        let labeler = Labeler::builtin();
        let records = stratified_sample(corpus, count, seed);
        let governed = records
            .iter()
            .filter(|r| labeler.governance().evaluate(&r.labeling_text()).tag != GovernanceTag::None)
            .count();
        let live_greetings = live_greeting_indices(&records, live_rate).len();
        let followups = records
            .iter()
            .filter(|r| wants_followup(&r.id, followup_rate))
            .count();
        Plan {
            records,
            governed,
            live_greetings,
            followups,
        }
    }

    fn estimated_calls(&self) -> usize {
        self.records.len() + self.live_greetings + self.followups
    }

    fn describe(&self) -> String {
        let n = self.records.len();
        let share = |k: usize| gauge_eval::aggregate::pct(k, n);
        let mut out = String::new();
        out.push_str(&format!(
            "Selected {} tickets across {} subjects\n",
            n,
            subject_histogram(&self.records).len()
        ));
        let mut subjects: Vec<(String, usize)> = subject_histogram(&self.records).into_iter().collect();
        subjects.sort_by(|a, b| b.1.cmp(&a.1));
        for (subject, count) in subjects {
            out.push_str(&format!("  {:.<40} {:>4} tickets\n", subject, count));
        }
        out.push_str(&format!(
            "Governance-triggered:  {:>4} ({:.1}%)\n",
            self.governed,
            share(self.governed)
        ));
        out.push_str(&format!(
            "Live greeting tests:   {:>4} ({:.1}%)\n",
            self.live_greetings,
            share(self.live_greetings)
        ));
        out.push_str(&format!(
            "Follow-up turns:       {:>4} ({:.1}%)\n",
            self.followups,
            share(self.followups)
        ));
        let calls = self.estimated_calls();
        out.push_str(&format!("Estimated API calls:   {:>4}\n", calls));
        out.push_str(&format!(
            "Estimated time:        ~{:.0} minutes\n",
            calls as f64 * SECONDS_PER_CALL / 60.0
        ));
        out
    }
}

fn cmd_sample(corpus: &Path, count: usize, seed: u64) -> Result<(), String> {
    let records = load_corpus(corpus).map_err(|e| e.to_string())?;
    let defaults = HarnessConfig::default();
    let plan = Plan::new(
        &records,
        count,
        seed,
        defaults.greeting_live_rate,
        defaults.followup_rate,
    );
    println!("Loaded {} tickets", records.len());
    print!("{}", plan.describe());
    Ok(())
}

fn cmd_run(config: &HarnessConfig) -> Result<(), String> {
    // Labeler quality first: its result frames every Gate A/B number.
    let labeler = Labeler::builtin();
    let validation = validate_builtin(&labeler);
    let path = output::write_labeler_validation(&config.output_dir, &validation)?;
    println!("Labeler: {}", report::labeler_summary(&validation));
    println!("Saved {}", path.display());

    let corpus = load_corpus(&config.corpus).map_err(|e| e.to_string())?;
    let plan = Plan::new(
        &corpus,
        config.count,
        config.seed,
        config.greeting_live_rate,
        config.followup_rate,
    );
    print!("{}", plan.describe());

    let client = HttpClassifierClient::new(config.http_client());
    info!(url = client.url(), "classifier endpoint");
    let evaluator = GateEvaluator::builtin();
    let classifier = evaluator.classifier().clone();
    let simulator = Simulator::new(
        Arc::new(client),
        Arc::new(labeler),
        Arc::new(evaluator),
        config.simulator(),
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to create tokio runtime: {}", e))?;
    let cancel = CancelFlag::new();
    let outcome = runtime.block_on(async {
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing the current conversation");
                on_signal.cancel();
            }
        });
        run_batch(&simulator, &plan.records, config.greeting_live_rate, &cancel).await
    });

    println!(
        "Completed {} of {} conversations in {:.0}s",
        outcome.results.len(),
        outcome.planned,
        outcome.elapsed.as_secs_f64()
    );

    let aggregated = aggregate(&outcome.results, &classifier, config.report_worst);
    let run = RunInfo {
        endpoint: config.endpoint.clone(),
        seed: config.seed,
        planned: outcome.planned,
        cancelled: outcome.cancelled,
        elapsed: outcome.elapsed,
        finished_at: OffsetDateTime::now_utc(),
    };
    let text = report::render(&aggregated, &run, Some(&validation));

    let report_path = output::output_path(&config.output_dir, output::REPORT_FILE)?;
    output::write_text(&report_path, &text)?;
    println!("Report saved:     {}", report_path.display());
    let results_path = output::write_results(&config.output_dir, &outcome.results)?;
    println!("Raw JSON saved:   {}", results_path.display());
    let regression_path =
        output::write_regression_suite(&config.output_dir, &outcome.results, config.regression_size)?;
    println!("Regression suite: {}", regression_path.display());

    println!(
        "Resolved {}/{} ({:.1}%)  grade {}",
        aggregated.resolved,
        aggregated.total,
        aggregated.resolution_rate(),
        aggregated.grade.letter
    );
    Ok(())
}
