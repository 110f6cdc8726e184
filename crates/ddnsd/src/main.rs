// # ddnsd - DDNS client
//
// Thin integration layer: parses the command line, loads configuration,
// wires the HTTP IP detector, the AliDNS provider and the file cache into a
// `DdnsEngine`, and maps the outcome to an exit code. All reconciliation
// logic lives in ddns-core.
//
// ## Modes
//
// - One-shot (default): reconcile once and exit; meant for cron
// - Loop: `--interval <secs>` reconciles immediately and then periodically
//   until SIGTERM/SIGINT
//
// ## Configuration
//
// Defaults, then the optional JSON file given as the first argument, then
// environment variables (`ALIYUN_ACCESS_KEY_ID`, `ALIYUN_ACCESS_KEY_SECRET`,
// `DDNS_DOMAIN_NAME`, `DDNS_RR`, `DDNS_RECORD_TYPE`, `DDNS_TTL`,
// `DDNS_IP_FILE`, `DDNS_LOG_LEVEL`, `ALIYUN_DNS_ENDPOINT`, `DDNS_MODE`).
//
// ## Example
//
// ```bash
// export ALIYUN_ACCESS_KEY_ID=LTAI...
// export ALIYUN_ACCESS_KEY_SECRET=...
// export DDNS_DOMAIN_NAME=example.com
// export DDNS_RR=home
//
// ddnsd                        # once, e.g. from cron
// ddnsd --interval 300         # keep running
// ddnsd /etc/ddns/config.json --dry-run
// ```

use anyhow::{Context, Result};
use clap::Parser;
use ddns_core::traits::{DnsProvider, IpVersion};
use ddns_core::{DdnsConfig, DdnsEngine, FileStateStore};
use ddns_ip_http::HttpIpSource;
use ddns_provider_aliyun::AliyunProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Success (or clean shutdown in loop mode)
/// - 1: Needs operator action: bad configuration, rejected credentials,
///   missing record
/// - 2: Runtime failure that may clear up on the next run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DdnsExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ddns_core::Error>() {
            Some(e) if e.is_fatal() => DdnsExitCode::ConfigError,
            _ => DdnsExitCode::RuntimeError,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ddnsd")]
#[command(version, about = "Keep an Alibaba Cloud DNS record pointed at this host's public IP")]
struct Cli {
    /// JSON config file; ignored if it does not exist
    config: Option<PathBuf>,

    /// Reconcile every N seconds instead of once
    #[arg(long, env = "DDNS_INTERVAL_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Look up the record but never update it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match DdnsConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };
    if cli.dry_run {
        config.dry_run = true;
    }

    let log_level = match config.tracing_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd");
    info!("Configuration loaded: {:?}", config);

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

    let interval = cli.interval.map(Duration::from_secs);

    let code = rt.block_on(async {
        match run(config, interval).await {
            Ok(()) => DdnsExitCode::Success,
            Err(e) => {
                let code = DdnsExitCode::for_error(&e);
                error!("DDNS run failed: {:#}", e);
                if code == DdnsExitCode::ConfigError {
                    eprintln!("Error: {:#}", e);
                }
                code
            }
        }
    });

    code.into()
}

/// Build the engine from configuration and run it once or in a loop
async fn run(config: DdnsConfig, interval: Option<Duration>) -> Result<()> {
    let engine = build_engine(&config)?;

    match interval {
        None => {
            let decision = engine.reconcile().await?;
            info!("DDNS run completed: {}", decision);
        }
        Some(interval) => {
            let signals = ShutdownSignals::install()?;
            let (shutdown_tx, shutdown_rx) = oneshot::channel();

            tokio::spawn(async move {
                let name = signals.recv().await;
                info!("Received shutdown signal: {}", name);
                let _ = shutdown_tx.send(());
            });

            engine.run_with_shutdown(interval, shutdown_rx).await?;
        }
    }

    Ok(())
}

fn build_engine(config: &DdnsConfig) -> Result<DdnsEngine> {
    let ip_source = HttpIpSource::new(IpVersion::for_record_type(&config.record_type));

    let provider = AliyunProvider::new(
        config.access_key_id.clone(),
        config.access_key_secret.clone(),
        &config.endpoint,
        config.dry_run,
    )?;
    if provider.is_dry_run() {
        info!("Dry-run mode: the DNS record will not be modified");
    }

    let state_store = FileStateStore::new(&config.ip_file);

    Ok(DdnsEngine::new(
        Box::new(ip_source),
        Box::new(provider),
        Box::new(state_store),
        config.target(),
    ))
}

/// SIGTERM/SIGINT listeners, installed before the loop starts
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Fallback for non-Unix platforms: ctrl-c only
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    }
}
