//! HTTP server binary for the vectorizing service.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `ServiceConfig`, builds the object store, and serves.
//! With `SENTRY_DSN` set, `ERROR` events are also reported to Sentry.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use vectorizing::{server, S3MarkupStore, ServiceConfig, StorageConfig};

const AFTER_HELP: &str = r#"ENVIRONMENT VARIABLES:
  PORT                    Listening port (required)
  S3_BUCKET               Bucket for generated markup (required)
  S3_TEST_BUCKET          Bucket used instead when APP_ENV=test
  WASABI_ACCESS_KEY       Storage access key
  WASABI_SECRET_KEY       Storage secret key
  WASABI_REGION           Storage region (default: us-east-1)
  S3_ENDPOINT             Endpoint override (default: https://s3.{region}.wasabisys.com)
  APP_ENV                 Environment name (default: development)
  SENTRY_DSN              Sentry DSN; error events are reported when set
  RUST_LOG                Log filter, e.g. "vectorizing=debug"

EXAMPLE:
  PORT=8080 S3_BUCKET=markup vectorizing-server
  curl -X POST localhost:8080/ -H 'content-type: application/json' \
       -d '{"url": "https://example.com/logo.png", "solver": 1, "color_count": 4}'
"#;

/// Serve raster-to-vector conversions over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "vectorizing-server",
    version,
    about = "Serve raster-to-vector conversions over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: u16,

    /// Bucket for generated markup.
    #[arg(long, env = "S3_BUCKET")]
    bucket: String,

    /// Bucket used instead of --bucket when the environment is "test".
    #[arg(long, env = "S3_TEST_BUCKET")]
    test_bucket: Option<String>,

    #[arg(long, env = "WASABI_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    #[arg(long, env = "WASABI_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    #[arg(long, env = "WASABI_REGION")]
    region: Option<String>,

    /// Object store endpoint, e.g. http://127.0.0.1:9000 for a local store.
    #[arg(long, env = "S3_ENDPOINT")]
    endpoint: Option<String>,

    /// Deployment environment name.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    environment: String,

    /// Error-reporting DSN.
    #[arg(long, env = "SENTRY_DSN", hide_env_values = true)]
    sentry_dsn: Option<String>,

    /// Remote image download timeout in seconds (0 disables).
    #[arg(long, env = "DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Per-request strategy timeout in seconds (0 disables).
    #[arg(long, env = "SOLVE_TIMEOUT", default_value_t = 120)]
    solve_timeout: u64,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "MAX_PAYLOAD_BYTES", default_value_t = 32 * 1024 * 1024)]
    max_payload_bytes: usize,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Sentry client options for `dsn`, or `None` when reporting is disabled.
fn sentry_options(dsn: Option<&str>, environment: &str) -> Result<Option<sentry::ClientOptions>> {
    let Some(dsn) = dsn.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    Ok(Some(sentry::ClientOptions {
        dsn: Some(dsn.parse().context("Invalid SENTRY_DSN")?),
        release: sentry::release_name!(),
        environment: Some(environment.to_string().into()),
        traces_sample_rate: 1.0,
        ..Default::default()
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Error reporting ──────────────────────────────────────────────────
    // Held until main returns so pending events are flushed.
    let sentry_guard = sentry_options(cli.sentry_dsn.as_deref(), &cli.environment)?
        .map(sentry::init);
    let reporting = sentry_guard.as_ref().is_some_and(|g| g.is_enabled());

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(reporting.then(sentry_tracing::layer))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let mut storage = StorageConfig::new(cli.bucket);
    storage.test_bucket = cli.test_bucket;
    storage.access_key = cli.access_key;
    storage.secret_key = cli.secret_key;
    storage.region = cli.region;
    storage.endpoint = cli.endpoint;

    let config = ServiceConfig::builder()
        .storage(storage)
        .environment(cli.environment)
        .download_timeout_secs(cli.download_timeout)
        .solve_timeout_secs(cli.solve_timeout)
        .max_payload_bytes(cli.max_payload_bytes)
        .build()
        .context("Invalid configuration")?;

    info!("Environment: {}", config.environment);
    info!("Writing markup to bucket '{}'", config.target_bucket());
    if reporting {
        info!("Reporting errors to Sentry");
    } else {
        info!("Error reporting disabled (SENTRY_DSN not set)");
    }

    // ── Shared clients ───────────────────────────────────────────────────
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let store = Arc::new(S3MarkupStore::new(client.clone(), &config.storage));
    info!("Object store: {:?}", store);

    server::serve(&config, client, store, cli.port)
        .await
        .context("Server terminated with an error")?;
    info!("Server stopped");
    Ok(())
}
