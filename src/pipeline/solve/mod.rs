//! Strategy dispatch: turn a normalized image into vector paths.
//!
//! A [`SolverMode`] is a closed set of strategies. Each maps to exactly one
//! [`Solver`] implementation, and every implementation returns the same
//! [`StrategyOutput`] shape so the rest of the pipeline never needs to know
//! which one ran. Adding a strategy means one new variant and one new
//! implementation.
//!
//! | id | mode | solver |
//! |----|------|--------|
//! | 0  | [`SolverMode::Binary`] | [`BinarySolver`], two-tone trace |
//! | 1  | [`SolverMode::Color`]  | [`ColorSolver`], palette quantize + trace |

mod binary;
mod color;
mod trace;

pub use binary::BinarySolver;
pub use color::ColorSolver;

use super::normalize::NormalizedImage;
use crate::geometry::CompoundPath;
use thiserror::Error;

/// Pixels with alpha below this are treated as background by every strategy.
pub const OPAQUE_ALPHA: u8 = 128;

/// What every strategy returns: paths, the palette they index, and the
/// dimensions of the image they were traced from.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub paths: Vec<CompoundPath>,
    pub palette: Vec<[u8; 3]>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// A vectorization strategy.
pub trait Solver: Send + Sync {
    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;

    fn solve(&self, image: &NormalizedImage) -> Result<StrategyOutput, SolveError>;
}

/// Palette size for the colour strategy, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorCount(u8);

impl ColorCount {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 32;
    pub const DEFAULT: ColorCount = ColorCount(8);

    /// `None` when `n` is outside `[MIN, MAX]`.
    pub fn new(n: i64) -> Option<Self> {
        (i64::from(Self::MIN)..=i64::from(Self::MAX))
            .contains(&n)
            .then_some(ColorCount(n as u8))
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for ColorCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Strategy selector carried by a validated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverMode {
    #[default]
    Binary,
    Color(ColorCount),
}

impl SolverMode {
    /// Numeric id used on the wire (`solver` field).
    pub fn wire_id(self) -> u8 {
        match self {
            SolverMode::Binary => 0,
            SolverMode::Color(_) => 1,
        }
    }

    /// Timer label for the strategy stage.
    pub fn stage_label(self) -> &'static str {
        match self {
            SolverMode::Binary => "Binary Solver - Total",
            SolverMode::Color(_) => "Color Solver - Total",
        }
    }

    /// The strategy implementing this mode.
    pub fn solver(self) -> Box<dyn Solver> {
        match self {
            SolverMode::Binary => Box::new(BinarySolver::default()),
            SolverMode::Color(count) => Box::new(ColorSolver::new(count)),
        }
    }
}

fn ensure_non_empty(image: &NormalizedImage) -> Result<(), SolveError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(SolveError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}
