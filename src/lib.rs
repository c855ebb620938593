//! # vectorizing
//!
//! Raster-to-vector conversion service: take a reference to an image, trace
//! it into SVG, store the markup, and report where it went.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JSON payload
//!  │
//!  ├─ 1. Validate  typed request, or "Invalid arguments."
//!  ├─ 2. Acquire   data URI / base64 / URL / path → RGB8 or RGBA8
//!  ├─ 3. Crop      optional [left, top, right, bottom]
//!  ├─ 4. Solve     binary or colour strategy (CPU-bound, spawn_blocking)
//!  ├─ 5. Markup    SVG document
//!  ├─ 6. Persist   PUT to S3-compatible storage (skipped for raw requests)
//!  └─ 7. Bounds    extent of the traced paths
//! ```
//!
//! The first failing stage ends the request with a classified
//! [`VectorizeError`]; callers only ever see its public message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vectorizing::{S3MarkupStore, ServiceConfig, StorageConfig, Vectorizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .storage(StorageConfig::new("markup").with_credentials("AKID", "secret"))
//!         .build()?;
//!     let client = reqwest::Client::new();
//!     let store = Arc::new(S3MarkupStore::new(client.clone(), &config.storage));
//!     let vectorizer = Vectorizer::new(&config, client, store);
//!
//!     let payload = serde_json::json!({"url": "https://example.com/logo.png", "solver": 1});
//!     match vectorizer.run(&payload).await {
//!         Ok(result) => println!("{:?}", result),
//!         Err(e) => eprintln!("{}", e.public_message()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vectorizing-server` binary (clap + anyhow + tracing-subscriber + sentry) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod server;
pub mod storage;
pub mod timer;
pub mod vectorize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder, StorageConfig};
pub use error::{ConfigError, ErrorKind, VectorizeError};
pub use geometry::{compound_path_list_bounds, Bounds, CompoundPath, Point};
pub use output::{ImageInfo, PipelineOutcome, RunReport, Vectorized};
pub use pipeline::input::ImageAcquirer;
pub use pipeline::normalize::NormalizedImage;
pub use pipeline::solve::{ColorCount, Solver, SolverMode, StrategyOutput};
pub use request::{validate, VectorizeRequest};
pub use storage::{MarkupStore, S3MarkupStore, StoreError};
pub use timer::{StageTimer, TimingRecord};
pub use vectorize::Vectorizer;
