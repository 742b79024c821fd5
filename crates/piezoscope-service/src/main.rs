//! piezoscoped - piezo/temperature/humidity ingestion daemon

#![deny(static_mut_refs)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use piezoscope_config::PiezoscopeConfig;
use piezoscope_core::SystemClock;
use piezoscope_service::{JsonLinesPresenter, PiezoscopeService, ShutdownHandle, TracingPresenter, UdpBridgeSource};
use piezoscope_view::Presenter;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "piezoscoped")]
#[command(about = "Ingest piezo and climate telemetry into sliding windows")]
#[command(version)]
struct Cli {
    /// YAML configuration file (shipped defaults when omitted)
    #[arg(short, long, env = "PIEZOSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// UDP bridge bind address, overrides `source.bind`
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Retention window in milliseconds, overrides `window_ms`
    #[arg(long)]
    window_ms: Option<i64>,

    /// Render tick in milliseconds, overrides `render_interval_ms`
    #[arg(long)]
    render_interval_ms: Option<u64>,

    /// Write every frame to stdout as a JSON line
    #[arg(long)]
    json: bool,

    /// Seconds between ingestion stats log lines
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    stats_interval_secs: u64,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<PiezoscopeConfig> {
        let mut config = PiezoscopeConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Some(bind) = self.bind {
            config.source.bind = bind;
        }
        if let Some(window_ms) = self.window_ms {
            config.window_ms = window_ms;
        }
        if let Some(render_interval_ms) = self.render_interval_ms {
            config.render_interval_ms = render_interval_ms;
        }
        config.validate().context("Invalid configuration overrides")?;
        Ok(config)
    }

    fn log_directive(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("piezoscope_service={level},piezoscope_core={level},piezoscope_config={level},warn")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting piezoscoped v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.load_config()?;
    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }
    info!(
        window_ms = config.window_ms,
        offset_samples = config.offset_samples,
        offset_scope = ?config.offset_scope,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let source = UdpBridgeSource::bind(config.source.bind)
        .await
        .with_context(|| format!("Failed to bind UDP bridge on {}", config.source.bind))?;

    let service = PiezoscopeService::from_config(&config, SystemClock)?
        .with_stats_interval(Duration::from_secs(cli.stats_interval_secs));
    tokio::spawn(wait_for_signal(service.shutdown_handle()));

    let presenter: Box<dyn Presenter> = if cli.json {
        Box::new(JsonLinesPresenter::new(std::io::stdout()))
    } else {
        Box::new(TracingPresenter)
    };

    let stats = service.run(source, presenter).await?;
    info!(
        messages = stats.messages,
        malformed = stats.malformed,
        "piezoscoped stopped"
    );
    Ok(())
}

async fn wait_for_signal(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    result = tokio::signal::ctrl_c() => log_ctrl_c(result),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                log_ctrl_c(tokio::signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    {
        log_ctrl_c(tokio::signal::ctrl_c().await);
    }

    shutdown.shutdown();
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => warn!(error = %e, "Error waiting for Ctrl+C"),
    }
}
