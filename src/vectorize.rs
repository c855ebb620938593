//! Request orchestration: one payload in, one [`PipelineOutcome`] out.
//!
//! ```text
//! validate ──▶ acquire ──▶ crop? ──▶ solve ──▶ markup ──▶ persist ──▶ bounds
//!                                                 │
//!                                                 └── raw: return markup
//! ```
//!
//! Stages run strictly in sequence and the first failure ends the request;
//! nothing is retried. Every stage is timed inside an outer
//! `Vectorize - Total` stage and the timings are logged once per request.

use crate::config::ServiceConfig;
use crate::error::VectorizeError;
use crate::geometry::compound_path_list_bounds;
use crate::output::{ImageInfo, PipelineOutcome, RunReport, Vectorized};
use crate::pipeline::crop::crop;
use crate::pipeline::input::ImageAcquirer;
use crate::pipeline::markup::create_markup;
use crate::pipeline::normalize::NormalizedImage;
use crate::pipeline::solve::{Solver, SolverMode, StrategyOutput};
use crate::request::validate;
use crate::storage::MarkupStore;
use crate::timer::{format_records, StageTimer, TimingRecord};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const TOTAL_STAGE: &str = "Vectorize - Total";
pub const READ_STAGE: &str = "Image Reading";
pub const CROP_STAGE: &str = "Crop";
pub const MARKUP_STAGE: &str = "Markup Creation";
pub const UPLOAD_STAGE: &str = "Markup Upload";
pub const BOUNDS_STAGE: &str = "Bounds Creation";

/// Runs conversion requests against shared, read-only collaborators.
pub struct Vectorizer {
    acquirer: ImageAcquirer,
    store: Arc<dyn MarkupStore>,
    bucket: String,
    solve_timeout: Duration,
    solver_for: fn(SolverMode) -> Box<dyn Solver>,
}

impl Vectorizer {
    pub fn new(config: &ServiceConfig, client: reqwest::Client, store: Arc<dyn MarkupStore>) -> Self {
        Self {
            acquirer: ImageAcquirer::new(client, config),
            store,
            bucket: config.target_bucket().to_string(),
            solve_timeout: Duration::from_secs(config.solve_timeout_secs),
            solver_for: SolverMode::solver,
        }
    }

    /// Bucket persisted markup is written to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Process one request payload.
    pub async fn run(&self, payload: &Value) -> PipelineOutcome {
        self.run_with_report(payload).await.outcome
    }

    /// Process one request payload and return its stage timings alongside
    /// the outcome.
    pub async fn run_with_report(&self, payload: &Value) -> RunReport {
        let mut timer = StageTimer::new();
        timer.start_stage(TOTAL_STAGE);
        let outcome = self.execute(payload, &mut timer).await;
        timer.end_stage();
        let timings = timer.finish();

        match &outcome {
            Ok(_) => info!("{}", format_records(&timings)),
            Err(e) => error!("{}", failure_summary(e, &timings)),
        }
        RunReport { outcome, timings }
    }

    async fn execute(&self, payload: &Value, timer: &mut StageTimer) -> PipelineOutcome {
        let request = validate(payload).ok_or(VectorizeError::InvalidRequest)?;
        debug!(
            "Validated request: mode={:?}, raw={}, crop={:?}",
            request.mode(),
            request.raw(),
            request.crop_box()
        );

        // ── Acquire ──────────────────────────────────────────────────────
        timer.start_stage(READ_STAGE);
        let acquired = self.acquirer.acquire(request.url()).await;
        timer.end_stage();
        let mut image = acquired?;
        info!(
            "Acquired {}x{} {} image",
            image.width(),
            image.height(),
            image.mode()
        );

        // ── Crop ─────────────────────────────────────────────────────────
        if let Some(crop_box) = request.crop_box() {
            timer.start_stage(CROP_STAGE);
            let cropped = crop(&image, crop_box);
            timer.end_stage();
            image = cropped.map_err(|e| VectorizeError::processing(CROP_STAGE, e))?;
        }

        // ── Solve ────────────────────────────────────────────────────────
        let mode = request.mode();
        timer.start_stage(mode.stage_label());
        let solved = self.solve(mode, image).await;
        timer.end_stage();
        let output = solved?;

        // ── Markup ───────────────────────────────────────────────────────
        timer.start_stage(MARKUP_STAGE);
        let markup = create_markup(&output);
        timer.end_stage();

        if request.raw() {
            return Ok(Vectorized::Markup(markup));
        }

        // ── Persist ──────────────────────────────────────────────────────
        timer.start_stage(UPLOAD_STAGE);
        let persisted = self.store.persist(&markup, &self.bucket).await;
        timer.end_stage();
        let object_id = persisted.map_err(|e| VectorizeError::processing(UPLOAD_STAGE, e))?;

        // ── Bounds ───────────────────────────────────────────────────────
        timer.start_stage(BOUNDS_STAGE);
        let bounds = compound_path_list_bounds(&output.paths);
        timer.end_stage();

        Ok(Vectorized::Stored {
            object_id,
            info: ImageInfo {
                bounds,
                image_width: output.width,
                image_height: output.height,
            },
        })
    }

    /// Run the strategy for `mode` on the blocking pool.
    async fn solve(
        &self,
        mode: SolverMode,
        image: NormalizedImage,
    ) -> Result<StrategyOutput, VectorizeError> {
        let stage = mode.stage_label();
        let solver = (self.solver_for)(mode);
        debug!("Dispatching to {} solver", solver.name());
        let task = tokio::task::spawn_blocking(move || solver.solve(&image));

        let joined = if self.solve_timeout > Duration::ZERO {
            match tokio::time::timeout(self.solve_timeout, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        "{} exceeded {}s; abandoning result",
                        stage,
                        self.solve_timeout.as_secs()
                    );
                    return Err(VectorizeError::processing(
                        stage,
                        format!("timed out after {}s", self.solve_timeout.as_secs()),
                    ));
                }
            }
        } else {
            task.await
        };

        joined
            .map_err(|e| VectorizeError::processing(stage, e))?
            .map_err(|e| VectorizeError::processing(stage, e))
    }
}

fn failure_summary(err: &VectorizeError, timings: &[TimingRecord]) -> String {
    format!(
        "Vectorization failed [{:?}]: {} ({})",
        err.kind(),
        err,
        format_records(timings)
    )
}
