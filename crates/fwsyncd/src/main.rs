// # fwsyncd - Firewall Sync Daemon
//
// This daemon is a THIN integration layer:
// - DO NOT add reconciliation, naming, or retry logic here
// - All reconciliation logic lives in fwsync-core
// - Process settings come from environment variables; the target inventory
//   comes from a JSON file named by FWSYNC_CONFIG
//
// The fwsyncd daemon is responsible for:
// 1. Reading configuration from environment variables and the config file
// 2. Initializing tracing and the runtime
// 3. Wiring the IP source, token source, and firewall provider
// 4. Running one reconciliation pass at startup
// 5. Serving the administrative HTTP surface until SIGTERM/SIGINT
//
// ## Configuration
//
// - `FWSYNC_CONFIG`: Path to the JSON config file (required)
// - `FWSYNC_LISTEN_ADDR`: Admin listen address (default 0.0.0.0:8080)
// - `FWSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `FWSYNC_IP_SOURCE_URL`: Overrides `ip_source.url` from the file
// - `FWSYNC_RECONCILE_ON_STARTUP`: Run a pass at startup (default true)
//
// ## Example
//
// ```bash
// export FWSYNC_CONFIG=/etc/fwsync/config.json
// export FWSYNC_LISTEN_ADDR=127.0.0.1:8080
//
// fwsyncd
// ```

mod api;

use anyhow::{Context, Result};
use fwsync_core::{FwSyncConfig, JobResult, ReconcileJob, Reconciler};
use fwsync_ip_http::HttpIpSource;
use fwsync_provider_azure::{AzureFirewallProvider, AzureTokenSource};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum FwSyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FwSyncExitCode> for ExitCode {
    fn from(code: FwSyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process-level settings
struct DaemonConfig {
    config_path: PathBuf,
    listen_addr: String,
    log_level: String,
    ip_source_url: Option<String>,
    reconcile_on_startup: bool,
}

impl DaemonConfig {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            config_path: env::var("FWSYNC_CONFIG")
                .map(PathBuf::from)
                .context("FWSYNC_CONFIG is required. Set it via: export FWSYNC_CONFIG=/etc/fwsync/config.json")?,
            listen_addr: env::var("FWSYNC_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_level: env::var("FWSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            ip_source_url: env::var("FWSYNC_IP_SOURCE_URL").ok().filter(|s| !s.is_empty()),
            reconcile_on_startup: env::var("FWSYNC_RECONCILE_ON_STARTUP")
                .map(|s| parse_flag(&s))
                .unwrap_or(Ok(true))?,
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("FWSYNC_CONFIG cannot be empty");
        }

        self.listen_addr.parse::<SocketAddr>().with_context(|| {
            format!(
                "FWSYNC_LISTEN_ADDR must be an address like 0.0.0.0:8080. Got: {}",
                self.listen_addr
            )
        })?;

        if let Some(ref url) = self.ip_source_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!(
                "FWSYNC_IP_SOURCE_URL must use HTTP or HTTPS scheme. Got: {}",
                url
            );
        }

        log_level(&self.log_level)?;

        Ok(())
    }

    /// Read and validate the target inventory, applying overrides
    fn load_file(&self) -> Result<FwSyncConfig> {
        let text = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;

        let mut config = FwSyncConfig::from_json(&text)
            .with_context(|| format!("Failed to parse {}", self.config_path.display()))?;

        if let Some(ref url) = self.ip_source_url {
            config.ip_source.url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Expected a boolean flag, got '{}'", other),
    }
}

fn log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "FWSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    let daemon = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FwSyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = daemon.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return FwSyncExitCode::ConfigError.into();
    }

    let level = log_level(&daemon.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FwSyncExitCode::ConfigError.into();
    }

    info!("Starting fwsyncd daemon");

    let config = match daemon.load_file() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration file error: {:#}", e);
            return FwSyncExitCode::ConfigError.into();
        }
    };

    info!("Configuration loaded: {} target(s)", config.targets.len());
    for target in config.targets.iter().filter(|t| !t.is_usable()) {
        warn!(
            "Target {} is missing its client secret or subscription and will be skipped",
            target.name
        );
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FwSyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(daemon, config).await {
            Ok(()) => FwSyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                FwSyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the reconciler from configuration
fn build_reconciler(config: &FwSyncConfig) -> Result<Reconciler> {
    let ip_source = HttpIpSource::from_config(&config.ip_source)?;
    let tokens = AzureTokenSource::new(&config.provider)?;
    let provider = AzureFirewallProvider::new(&config.provider)?;

    info!(
        "IP source: {} (cache {}s), provider: azure ({})",
        config.ip_source.url, config.ip_source.cache_ttl_secs, config.provider.resource_type
    );

    Ok(Reconciler::new(
        Box::new(ip_source),
        Box::new(tokens),
        Box::new(provider),
        &config.engine,
    )?)
}

/// Run the daemon
async fn run_daemon(daemon: DaemonConfig, config: FwSyncConfig) -> Result<()> {
    let reconciler = Arc::new(build_reconciler(&config)?);
    let config = Arc::new(config);

    let startup = if daemon.reconcile_on_startup {
        info!("Running startup reconciliation");
        let job = ReconcileJob::spawn(Arc::clone(&reconciler), config.targets.clone());
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        Some((cancel_tx, tokio::spawn(watch_startup_job(job, cancel_rx))))
    } else {
        info!("Startup reconciliation disabled");
        None
    };

    let listener = tokio::net::TcpListener::bind(&daemon.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", daemon.listen_addr))?;
    info!("Admin API listening on {}", daemon.listen_addr);

    let app = api::router(api::AppState::new(reconciler, config));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    if let Some((cancel_tx, watcher)) = startup {
        let _ = cancel_tx.send(());
        if let Err(e) = watcher.await {
            error!("Startup reconciliation watcher failed: {}", e);
        }
    }

    let _ = stop_tx.send(());
    server
        .await
        .context("Admin API task failed")?
        .context("Admin API server error")?;

    info!("Shutting down daemon");
    Ok(())
}

/// Report the startup pass as soon as it ends
///
/// A message on `cancel_rx` (or its sender being dropped) cancels a pass
/// that is still running.
async fn watch_startup_job(mut job: ReconcileJob, cancel_rx: oneshot::Receiver<()>) -> JobResult {
    let finished = tokio::select! {
        result = job.wait() => Some(result),
        _ = cancel_rx => None,
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Cancelling startup reconciliation");
            job.cancel();
            job.wait().await
        }
    };

    log_job_result(&result);
    result
}

fn log_job_result(result: &JobResult) {
    match result {
        JobResult::Completed(report) => info!(
            "Startup reconciliation completed: {} created, {} present, {} skipped, {} failed",
            report.created(),
            report.already_present(),
            report.skipped(),
            report.failed()
        ),
        JobResult::Cancelled => warn!("Startup reconciliation cancelled before completing"),
        JobResult::Aborted => error!("Startup reconciliation aborted"),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
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
