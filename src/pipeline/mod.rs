//! Pipeline stages for raster-to-vector conversion.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own. The orchestrator in [`crate::vectorize`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ crop ──▶ solve ──▶ markup
//! (b64/URL/path) (RGB|RGBA) (opt.) (paths)   (SVG)
//! ```
//!
//! 1. [`input`]: resolve the raw input string to image bytes and decode
//!    them on the blocking pool
//! 2. [`normalize`]: collapse the decoded colour mode to RGB8 or RGBA8
//! 3. [`crop`]: optional rectangle applied before tracing
//! 4. [`solve`]: the selected strategy traces the image into paths
//! 5. [`markup`]: serialize paths and palette as SVG

pub mod crop;
pub mod input;
pub mod markup;
pub mod normalize;
pub mod solve;
