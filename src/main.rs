// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use metrics_gateway::{
    config::GatewayConfig,
    constants::{TOKIO_WORKER_THREADS, VERSION},
    context::Context,
    server,
};
use tracing::{debug, info};

/// Cross-cluster metrics query gateway
#[derive(Debug, Parser)]
#[command(name = "metrics-gateway", version = VERSION, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listen_address` from the configuration
    #[arg(long)]
    listen: Option<String>,

    /// Log output format, overrides `RUST_LOG_FORMAT`
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("metrics-gateway")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    init_logging(args.log_format);

    info!("Starting metrics gateway");
    debug!("Logging initialized with file and line number tracking");

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen_address = listen;
    }
    info!(
        listen_address = %config.listen_address,
        clusters = config.clusters.len(),
        request_timeout_secs = config.request_timeout_secs,
        "Configuration loaded"
    );

    let ctx = Context::from_config(&config);
    server::serve(ctx, &config.listen_address).await
}

/// Initialize tracing.
///
/// Format: timestamp file:line LEVEL message
///
/// Respects `RUST_LOG` for filtering (default `info`) and `RUST_LOG_FORMAT`
/// (`text` or `json`) unless `--log-format` is given.
fn init_logging(format: Option<LogFormat>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let format = format.unwrap_or_else(|| {
        match std::env::var("RUST_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    });

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}
