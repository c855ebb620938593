//! Two-tone strategy: everything dark and opaque becomes one black shape.

use super::trace::trace_runs;
use super::{ensure_non_empty, SolveError, Solver, StrategyOutput, OPAQUE_ALPHA};
use crate::geometry::CompoundPath;
use crate::pipeline::normalize::NormalizedImage;
use image::Rgba;
use tracing::debug;

/// Traces pixels darker than `threshold` (Rec. 601 luma) into a single
/// black compound path.
#[derive(Debug, Clone, Copy)]
pub struct BinarySolver {
    threshold: u8,
}

impl Default for BinarySolver {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl BinarySolver {
    pub fn with_threshold(threshold: u8) -> Self {
        Self { threshold }
    }

    fn is_ink(&self, px: Rgba<u8>) -> bool {
        px[3] >= OPAQUE_ALPHA && luma(px) < self.threshold
    }
}

impl Solver for BinarySolver {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn solve(&self, image: &NormalizedImage) -> Result<StrategyOutput, SolveError> {
        ensure_non_empty(image)?;
        let (width, height) = (image.width(), image.height());

        let outlines = trace_runs(width, height, |x, y| self.is_ink(image.rgba_at(x, y)));
        debug!("Binary solver traced {} outlines", outlines.len());

        let paths = if outlines.is_empty() {
            Vec::new()
        } else {
            vec![CompoundPath::new(0, outlines)]
        };

        Ok(StrategyOutput {
            paths,
            palette: vec![[0, 0, 0]],
            width,
            height,
        })
    }
}

fn luma(px: Rgba<u8>) -> u8 {
    let [r, g, b, _] = px.0.map(u32::from);
    ((299 * r + 587 * g + 114 * b) / 1000) as u8
}
