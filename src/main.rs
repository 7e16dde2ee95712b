//! Expiry demo.
//!
//! Drives a synthetic workload through an in-process echo service wrapped in
//! an [`Expiring`] decorator and reports which timer closed it.
//!
//! ```text
//!   workload ──call──▶ Expiring ──call──▶ EchoService
//!                        │  ▲                  ▲
//!                        │  └─ outstanding ────┘
//!                        ▼
//!              idle / max-lifetime timer ──close──▶ EchoService
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use expiring_service::config::validation::validate_config;
use expiring_service::config::{load_config, ConfigError, DemoConfig};
use expiring_service::observability::{logging, metrics};
use expiring_service::{BoxFuture, Closeable, Expiring, Service};

#[derive(Parser)]
#[command(name = "expiry-demo")]
#[command(about = "Drive an echo service through idle and max-lifetime expiry", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Idle timeout in milliseconds (0 disables).
    #[arg(long)]
    idle_ms: Option<u64>,

    /// Max lifetime in milliseconds (0 disables).
    #[arg(long)]
    max_ms: Option<u64>,

    #[arg(long)]
    requests: Option<u32>,

    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    latency_ms: Option<u64>,

    /// Stop waiting for expiry after this many milliseconds.
    #[arg(long, default_value_t = 10_000)]
    wait_ms: u64,
}

impl Cli {
    fn apply(&self, config: &mut DemoConfig) {
        if let Some(v) = self.idle_ms {
            config.expiry.idle_timeout_ms = v;
        }
        if let Some(v) = self.max_ms {
            config.expiry.max_lifetime_ms = v;
        }
        if let Some(v) = self.requests {
            config.workload.requests = v;
        }
        if let Some(v) = self.interval_ms {
            config.workload.interval_ms = v;
        }
        if let Some(v) = self.latency_ms {
            config.workload.latency_ms = v;
        }
    }
}

#[derive(Debug, Error)]
enum EchoError {
    #[error("echo service is closed")]
    Closed,
}

/// Echoes requests after a fixed latency; rejects everything once closed.
struct EchoService {
    latency: Duration,
    closed: AtomicBool,
    close_signal: Notify,
}

impl EchoService {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }
}

impl Closeable for EchoService {
    fn close(&self) -> BoxFuture<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Echo service closed");
            self.close_signal.notify_one();
        }
        Box::pin(async {})
    }

    fn is_available(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

impl Service<String> for EchoService {
    type Response = String;
    type Error = EchoError;

    fn call(&self, req: String) -> BoxFuture<Result<String, EchoError>> {
        if self.closed.load(Ordering::SeqCst) {
            return Box::pin(async { Err(EchoError::Closed) });
        }
        let latency = self.latency;
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            Ok(req)
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DemoConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    tracing::info!(
        service = %config.expiry.name,
        idle_timeout_ms = config.expiry.idle_timeout_ms,
        max_lifetime_ms = config.expiry.max_lifetime_ms,
        requests = config.workload.requests,
        "Configuration loaded"
    );

    let echo = Arc::new(EchoService::new(Duration::from_millis(config.workload.latency_ms)));
    let service = Expiring::new(echo.clone(), config.expiry.clone())?;
    let started = Instant::now();
    let interval = Duration::from_millis(config.workload.interval_ms);

    let mut served = 0u32;
    let mut rejected = 0u32;
    for i in 0..config.workload.requests {
        match service.call(format!("request-{}", i)).await {
            Ok(body) => {
                served += 1;
                tracing::debug!(%body, outstanding = service.outstanding(), "Echoed");
            }
            Err(e) => {
                rejected += 1;
                tracing::warn!(error = %e, "Request rejected");
            }
        }
        tokio::time::sleep(interval).await;
    }

    if config.expiry.idle_timeout().is_zero() && config.expiry.max_lifetime().is_zero() {
        tracing::info!(served, rejected, "Expiry disabled; nothing to wait for");
        return Ok(());
    }

    if echo.is_available() {
        let wait = Duration::from_millis(cli.wait_ms);
        if tokio::time::timeout(wait, echo.close_signal.notified()).await.is_err() {
            tracing::warn!(
                wait_ms = cli.wait_ms,
                served,
                rejected,
                "Service did not expire in time"
            );
            return Ok(());
        }
    }

    tracing::info!(
        timer = ?service.expired_by(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        served,
        rejected,
        "Service expired"
    );
    Ok(())
}
