//! Harness configuration file for `gauge run`.
//!
//! Every key is optional; missing keys take the defaults below and command
//! line flags override whatever the file says.
//!
//! # Example
//!
//! ```toml
//! endpoint = "https://classifier.example.com/chat"
//! corpus = "data/tickets.json"
//! output_dir = "reports"
//! count = 200
//! seed = 7
//! think_time_ms = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use gauge_eval::{HttpClientConfig, RetryPolicy, SimulatorConfig, DEFAULT_ENDPOINT, DEFAULT_TENANT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub endpoint: String,
    pub tenant_id: String,
    /// Ask the service for its debug instrumentation fields.
    pub debug: bool,
    pub corpus: PathBuf,
    pub output_dir: PathBuf,
    pub count: usize,
    pub seed: u64,
    pub think_time_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Multiplied by the attempt number on HTTP 429.
    pub rate_limit_delay_ms: u64,
    pub timeout_secs: u64,
    pub greeting_live_rate: f64,
    pub followup_rate: f64,
    pub report_worst: usize,
    pub regression_size: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tenant_id: DEFAULT_TENANT.to_string(),
            debug: true,
            corpus: PathBuf::from("tickets.json"),
            output_dir: PathBuf::from("."),
            count: 1000,
            seed: 2026,
            think_time_ms: 500,
            max_retries: 3,
            retry_delay_ms: 3000,
            rate_limit_delay_ms: 8000,
            timeout_secs: 30,
            greeting_live_rate: 0.10,
            followup_rate: 0.30,
            report_worst: 30,
            regression_size: 50,
        }
    }
}

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub corpus: Option<PathBuf>,
    pub count: Option<usize>,
    pub seed: Option<u64>,
    pub endpoint: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl HarnessConfig {
    pub fn apply(&mut self, o: Overrides) {
        if let Some(corpus) = o.corpus {
            self.corpus = corpus;
        }
        if let Some(count) = o.count {
            self.count = count;
        }
        if let Some(seed) = o.seed {
            self.seed = seed;
        }
        if let Some(endpoint) = o.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(dir) = o.output_dir {
            self.output_dir = dir;
        }
    }

    /// Reject values that would make the run meaningless.
    pub fn check(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("count must be at least 1".into());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".into());
        }
        for (name, rate) in [
            ("greeting_live_rate", self.greeting_live_rate),
            ("followup_rate", self.followup_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("{name} must be between 0 and 1, got {rate}"));
            }
        }
        Ok(())
    }

    pub fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig {
            endpoint: self.endpoint.clone(),
            debug: self.debug,
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.max_retries,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
                rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            },
        }
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            tenant_id: self.tenant_id.clone(),
            think_time: Duration::from_millis(self.think_time_ms),
            followup_rate: self.followup_rate,
        }
    }
}

/// Read and parse a harness config TOML file from `path`.
pub fn read_config(path: &Path) -> Result<HarnessConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// Defaults, then the optional file, then flags.
pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<HarnessConfig, String> {
    let mut config = match path {
        Some(p) => read_config(p)?,
        None => HarnessConfig::default(),
    };
    config.apply(overrides);
    config.check()?;
    Ok(config)
}
