//! Pipeline orchestration: configuration, tracing bootstrap, and the
//! harvest → aggregate → correlate run.

pub mod config;

pub use config::{Config, ConfigError, LogLevel};

use crate::aggregate::TrafficAggregator;
use crate::domain::CorrelatorError;
use crate::harvest::{HarvestSettings, StreamHarvester, ThrottledWorkQueue};
use crate::provider::HttpProviders;
use crate::registry::IpRegistryBuilder;
use crate::report::CorrelationReporter;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Argument errors (including the missing required group) exit non-zero
    // with a diagnostic before any remote call is attempted.
    let config = Config::from_args(std::env::args())?;
    init_tracing(config.log_level)?;

    let report = App::new(config).run().await?;
    print!("{report}");
    Ok(())
}

fn init_tracing(level: LogLevel) -> Result<(), CorrelatorError> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::from(level).into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact());
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        CorrelatorError::Config(format!("failed to install tracing subscriber: {e}"))
    })
}

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the full correlation pass and returns the rendered report.
    ///
    /// Registry building and stream harvesting are independent and run
    /// concurrently; their outputs meet only at the correlation join.
    pub async fn run(self) -> Result<String, CorrelatorError> {
        info!("starting traffic-correlator v{}", crate::VERSION);
        info!(
            group = %self.config.group_name,
            prefix = ?self.config.stream_prefix,
            endpoint = %self.config.endpoint,
            "run configuration"
        );

        let providers = Arc::new(HttpProviders::new(
            &self.config.endpoint,
            self.config.fetch_timeout(),
        )?);

        let queue = ThrottledWorkQueue::new(
            self.config.drain_interval(),
            self.config.drain_batch_size,
        );
        let harvester = StreamHarvester::new(
            Arc::clone(&providers),
            queue,
            self.config.group_name.clone(),
            self.config.stream_prefix.clone(),
            HarvestSettings {
                line_cap: self.config.line_cap,
                fetch_timeout: self.config.fetch_timeout(),
            },
        )?;
        let builder = IpRegistryBuilder::new(
            Arc::clone(&providers),
            Arc::clone(&providers),
            Arc::clone(&providers),
        );

        let (harvest, registry) = tokio::join!(harvester.harvest_all(), builder.build());
        let harvest = harvest?;

        let aggregator = TrafficAggregator::new()?;
        let traffic = aggregator.aggregate(&harvest.lines);
        info!(
            lines = harvest.lines.len(),
            ips = traffic.ip_count(),
            "aggregation complete"
        );

        let reporter = CorrelationReporter::new(self.config.top_paths);
        let results = reporter.correlate(&traffic, &registry);
        info!(matches = results.len(), "correlation complete");

        Ok(reporter.render(&results, &harvest.oldest_seen))
    }
}
