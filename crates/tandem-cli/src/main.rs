//! tandem CLI - run simulated workloads through the bounded executor.

mod colors;
mod reporter;
mod run;
mod scenarios;
mod workload;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tandem_core::{ExecutorConfig, FailurePolicy};

use crate::reporter::Format;
use crate::scenarios::Scenario;
use crate::workload::{Plan, SimulatedWork};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Bounded-concurrency task executor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print events and results as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in demo scenario
    Demo {
        /// Scenario to run
        #[arg(value_enum)]
        scenario: Scenario,
    },

    /// Run a custom simulated workload
    Run(RunArgs),
}

/// Flags for `tandem run`. Unset flags fall back to `TANDEM_*` variables,
/// then to defaults.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Number of items (1..=N)
    #[arg(short = 'n', long, default_value = "10")]
    count: u64,

    /// Maximum operations in flight
    #[arg(short, long)]
    parallel: Option<usize>,

    /// Minimum duration of each task in milliseconds
    #[arg(long)]
    min_duration_ms: Option<u64>,

    /// Latency of each item in milliseconds
    #[arg(long, default_value = "200")]
    latency_ms: u64,

    /// Randomize latency between 0 and --latency-ms
    #[arg(long)]
    jitter: bool,

    /// Multiply each item by this value
    #[arg(long, default_value = "2")]
    multiplier: u64,

    /// Fail every k-th item
    #[arg(long)]
    fail_every: Option<usize>,

    /// Abort the whole run on the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Press the stop button after this many milliseconds
    #[arg(long)]
    abort_after_ms: Option<u64>,

    /// Abort the run once this many milliseconds have passed
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Process items in chunks of this size
    #[arg(long)]
    chunk_size: Option<usize>,
}

impl RunArgs {
    /// Layer flags over an environment-derived base configuration.
    fn into_plan(self, base: ExecutorConfig) -> Plan {
        let mut config = base;
        if let Some(limit) = self.parallel {
            config.parallel_limit = limit;
        }
        if let Some(ms) = self.min_duration_ms {
            config.min_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = Some(size);
        }
        if self.fail_fast {
            config.failure_policy = FailurePolicy::Abort;
        }

        Plan {
            title: "Run".to_string(),
            items: (1..=self.count).collect(),
            work: SimulatedWork {
                latency: Duration::from_millis(self.latency_ms),
                jitter: self.jitter,
                fail_every: self.fail_every,
                multiplier: self.multiplier,
            },
            config,
            abort_after: self.abort_after_ms.map(Duration::from_millis),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format tandem-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<tandem_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    let format = if cli.json { Format::Json } else { Format::Text };

    let plan = match cli.command {
        Commands::Demo { scenario } => scenario.plan(),
        Commands::Run(args) => {
            let base = ExecutorConfig::from_env().map_err(|e| format_error(e.into()))?;
            args.into_plan(base)
        }
    };

    run::execute(plan, format).await.map_err(format_error)?;

    Ok(())
}
