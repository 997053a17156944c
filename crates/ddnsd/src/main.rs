// # ddnsd - DDNS Daemon
//
// This is a thin integration layer. All change detection, retry and DNS
// logic lives in ddns-core; the daemon only:
//
// 1. Reads configuration from environment variables (see `config`)
// 2. Opens a sealed API key if one is supplied
// 3. Initializes tracing
// 4. Wires the HTTP address source, dyndns provider and file stores into
//    an `Orchestrator`
// 5. Runs one cycle, or one cycle per day at the configured local time
// 6. Serves `/health` until shutdown
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_API_KEY=your_key
// export DDNS_HOSTS=home.example.com,vpn.example.com
// export DDNS_LOG_PATH=/var/lib/ddns/ip_log.log
// export DDNS_SCHEDULE_TIME=23:59
// export DDNS_TIMEZONE=Europe/London
//
// ddnsd
// ```

mod config;
mod health;
mod schedule;
mod secret;

use anyhow::Result;
use ddns_core::config::DdnsConfig;
use ddns_core::traits::EventSink;
use ddns_core::{
    AddressSource, CancellationToken, DnsUpdater, FilePendingHostStore, FileStateStore,
    Orchestrator, RetryPolicy, TracingEventSink,
};
use ddns_ip_http::HttpIpSource;
use ddns_provider_dyndns::DyndnsProvider;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{Config, LogFormat};
use crate::schedule::DailySchedule;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown, or a successful run-once cycle
/// - 1: Configuration or startup error
/// - 2: Runtime error (a failed run-once cycle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (cycle failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    if let Err(e) = init_tracing(&config.log_level, config.log_format) {
        eprintln!("Failed to set tracing subscriber: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    info!(
        hosts = config.ddns.hosts.len(),
        log_path = %config.ddns.log_path.display(),
        dry_run = config.ddns.provider.dry_run,
        run_once = config.ddns.schedule.run_once,
        "Configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Install the global subscriber
fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level.to_lowercase())?;
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

/// Run the daemon until shutdown or, in run-once mode, one cycle
async fn run_daemon(config: Config) -> DdnsExitCode {
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let orchestrator = match build_orchestrator(&config.ddns).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to initialize");
            return DdnsExitCode::ConfigError;
        }
    };

    let daily = if config.ddns.schedule.run_once {
        None
    } else {
        match DailySchedule::from_config(&config.ddns.schedule) {
            Ok(daily) => Some(daily),
            Err(e) => {
                error!(error = %format!("{:#}", e), "Invalid schedule");
                return DdnsExitCode::ConfigError;
            }
        }
    };

    let health = if config.ddns.health.enabled {
        match tokio::net::TcpListener::bind(config.ddns.health.bind).await {
            Ok(listener) => Some(tokio::spawn(health::serve(listener, cancel.clone()))),
            Err(e) => {
                error!(
                    addr = %config.ddns.health.bind,
                    error = %e,
                    "Failed to bind health server"
                );
                return DdnsExitCode::ConfigError;
            }
        }
    } else {
        None
    };

    let code = match daily {
        None => run_once(&orchestrator, &cancel).await,
        Some(daily) => {
            schedule::run_daily(&orchestrator, &daily, &cancel).await;
            DdnsExitCode::CleanShutdown
        }
    };

    // Stop the health server whichever way we got here
    cancel.cancel();
    if let Some(handle) = health {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Health server error"),
            Err(e) => error!(error = %e, "Health server task failed"),
        }
    }

    info!("Shutting down daemon");
    code
}

/// Assemble the production pipeline from configuration
async fn build_orchestrator(config: &DdnsConfig) -> Result<Orchestrator> {
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    let retry = RetryPolicy::new(config.retry.clone());

    let source = HttpIpSource::from_config(&config.address_source)?;
    let provider = DyndnsProvider::from_config(&config.provider)?;

    // Creates the log's parent directory
    let store = FileStateStore::new(&config.log_path).await?;
    let pending = FilePendingHostStore::beside_log(&config.log_path);

    info!(
        source = %source.url(),
        provider = "dyndns",
        ledger = %pending.path().display(),
        "Pipeline initialized"
    );

    Ok(Orchestrator::new(
        AddressSource::new(Box::new(source), retry.clone(), Arc::clone(&events)),
        Box::new(store),
        DnsUpdater::new(Box::new(provider), retry, Arc::clone(&events)),
        config.hosts.clone(),
        events,
    )
    .with_pending_store(Box::new(pending)))
}

/// Run a single cycle and map its result to an exit code
async fn run_once(orchestrator: &Orchestrator, cancel: &CancellationToken) -> DdnsExitCode {
    info!("Running a single cycle");

    match orchestrator.run_cycle(cancel).await {
        Ok(outcome) => {
            info!(%outcome, address = %outcome.address(), "Cycle completed");
            DdnsExitCode::CleanShutdown
        }
        Err(e) if e.is_cancelled() => {
            warn!("Cycle interrupted by shutdown");
            DdnsExitCode::CleanShutdown
        }
        Err(e) => {
            error!(error = %e, "Cycle failed");
            DdnsExitCode::RuntimeError
        }
    }
}

/// Cancel `cancel` on the first shutdown signal
async fn cancel_on_signal(cancel: CancellationToken) {
    match wait_for_shutdown().await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            cancel.cancel();
        }
        Err(e) => error!("Shutdown signal handling unavailable: {}", e),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
