use std::future::Future;
use std::io;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wom_leaders_client::{HiscoreWebClient, WomClient};
use wom_leaders_core::Config;
use wom_leaders_core::last_rank::{LastRankFinder, LastRankState};
use wom_leaders_core::metric::{self, Metric};
use wom_leaders_core::models::LeaderSnapshot;
use wom_leaders_core::reconciler::Reconciler;
use wom_leaders_core::scheduler::{Scheduler, TracingSchedulerReporter};
use wom_leaders_core::throttle::ThrottledHiscoreClient;
use wom_leaders_core::traits::LeaderboardClient;

#[derive(Parser)]
#[command(
    name = "wom-leaders",
    version,
    about = "Keeps Wise Old Man up to date with the hiscore leaders"
)]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the last ranked player of each metric and submit them
    LastRanked {
        /// Metric name, e.g. "Zulrah" (repeatable)
        #[arg(long = "metric", required = true)]
        metrics: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    // RUST_LOG wins over LOG_LEVEL
    let level = config.log_level.as_str().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wom_leaders={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(?config, "wom-leaders starting");

    let hiscores = ThrottledHiscoreClient::new(
        HiscoreWebClient::from_config(&config)?,
        config.throttle_config(),
    );
    let wom = WomClient::from_config(&config)?;

    match cli.command {
        Some(Commands::LastRanked { metrics }) => {
            let metrics = resolve_metrics(&metrics, config.enable_seasonal)?;
            cmd_last_ranked(&config, hiscores, wom, &metrics).await
        }
        None => cmd_run(&config, hiscores, wom, cli.once).await,
    }
}

/// Poll the hiscores and submit changed leaders until interrupted.
async fn cmd_run(
    config: &Config,
    hiscores: ThrottledHiscoreClient<HiscoreWebClient>,
    wom: WomClient,
    once: bool,
) -> Result<()> {
    let reconciler = Reconciler::new(hiscores, wom, config.reconciler_config());
    let mut scheduler_config = config.scheduler_config();
    if once {
        scheduler_config = scheduler_config.with_max_cycles(1);
    }
    let scheduler = Scheduler::new(reconciler, scheduler_config);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let snapshot = scheduler
        .run(LeaderSnapshot::new(), cancel_token, &TracingSchedulerReporter)
        .await;

    if once {
        print_snapshot(&snapshot);
    }
    Ok(())
}

/// Find and submit the last ranked player of each metric.
async fn cmd_last_ranked(
    config: &Config,
    hiscores: ThrottledHiscoreClient<HiscoreWebClient>,
    wom: WomClient,
    metrics: &[Metric],
) -> Result<()> {
    let finder = LastRankFinder::new(hiscores);
    let mut state = LastRankState::new();
    let mut failures = 0;

    for &metric in metrics {
        let player = match finder.find(metric, &mut state).await {
            Ok(Some(player)) => player,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(%metric, error = %e, "Last rank search failed");
                failures += 1;
                continue;
            }
        };

        println!("{metric}: {player}");
        if let Err(e) = wom
            .submit_leaders(&config.leader_group_name, metric, std::slice::from_ref(&player))
            .await
        {
            tracing::error!(%metric, error = %e, "Failed to submit last ranked player");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} metrics failed", metrics.len());
    }
    Ok(())
}

fn resolve_metrics(names: &[String], seasonal: bool) -> Result<Vec<Metric>> {
    names
        .iter()
        .map(|name| {
            metric::find(name, seasonal).with_context(|| format!("Unknown metric '{name}'"))
        })
        .collect()
}

fn print_snapshot(snapshot: &LeaderSnapshot) {
    for (metric, entries) in snapshot.iter() {
        println!("{metric}");
        for entry in entries {
            println!("  {entry}");
        }
    }
}

/// First CTRL+C lets the running cycle finish, a second one exits at once.
async fn shutdown_signal(cancel_token: CancellationToken) {
    if handle_signals(tokio::signal::ctrl_c, cancel_token).await {
        std::process::exit(130);
    }
}

/// Cancels `cancel_token` on the first signal. Returns `true` once a second
/// signal arrives.
async fn handle_signals<F, Fut>(mut next_signal: F, cancel_token: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        return false;
    }
    tracing::info!("Shutdown signal received, finishing current cycle (CTRL+C again to force)");
    cancel_token.cancel();

    if let Err(e) = next_signal().await {
        tracing::error!(error = %e, "Failed to listen for a second CTRL+C");
        return false;
    }
    tracing::warn!("Second shutdown signal received, exiting without finishing the cycle");
    true
}
