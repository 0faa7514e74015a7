//! Subscriber setup. Logs go to stderr so stdout stays free for summaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
}

impl LoggingConfig {
    /// Directive used when `RUST_LOG` is unset.
    fn default_directive(&self) -> &'static str {
        if self.verbose {
            "gauge_core=debug,gauge_eval=debug,gauge=debug"
        } else {
            "gauge_core=info,gauge_eval=info,gauge=info"
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialised: {e}");
    }
}
