//! Validation of inbound conversion payloads.
//!
//! [`validate`] is the only constructor of [`VectorizeRequest`], so every
//! request value in the crate already satisfies the field constraints below.
//!
//! | field | type | default | constraint |
//! |-------|------|---------|------------|
//! | `url` | string | required | non-empty |
//! | `solver` | integer | `0` | `0` (binary) or `1` (colour) |
//! | `color_count` | integer | `8` | `[2, 32]`, checked only when `solver == 1` |
//! | `raw` | bool | `false` | |
//! | `crop_box` | `[l, t, r, b]`, `[]` or `null` | `null` | four finite numbers |
//!
//! Integer fields also accept integral floats such as `8.0`; an empty
//! `crop_box` means no crop.

use crate::pipeline::crop::CropBox;
use crate::pipeline::solve::{ColorCount, SolverMode};
use serde_json::{Map, Value};
use tracing::debug;

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizeRequest {
    url: String,
    mode: SolverMode,
    raw: bool,
    crop_box: Option<CropBox>,
}

impl VectorizeRequest {
    /// Raw input string: data URI, base64 payload, URL or local path.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    /// When set, the markup is returned directly instead of being persisted.
    pub fn raw(&self) -> bool {
        self.raw
    }

    pub fn crop_box(&self) -> Option<&CropBox> {
        self.crop_box.as_ref()
    }
}

/// Validate `payload` into a [`VectorizeRequest`].
///
/// Returns `None` for anything that is not a non-empty JSON object meeting
/// the field constraints. Pure; performs no I/O.
pub fn validate(payload: &Value) -> Option<VectorizeRequest> {
    let args = payload.as_object().filter(|m| !m.is_empty())?;
    let request = validate_fields(args);
    if request.is_none() {
        debug!("Rejected request payload with keys {:?}", args.keys().collect::<Vec<_>>());
    }
    request
}

fn validate_fields(args: &Map<String, Value>) -> Option<VectorizeRequest> {
    let url = args.get("url")?.as_str().filter(|s| !s.is_empty())?;

    let solver = match args.get("solver") {
        None => 0,
        Some(v) => integral(v)?,
    };
    let mode = match solver {
        0 => SolverMode::Binary,
        1 => {
            let count = match args.get("color_count") {
                None => ColorCount::DEFAULT,
                Some(v) => ColorCount::new(integral(v)?)?,
            };
            SolverMode::Color(count)
        }
        _ => return None,
    };

    let raw = match args.get("raw") {
        None => false,
        Some(v) => v.as_bool()?,
    };

    let crop_box = match args.get("crop_box") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(v) => Some(parse_crop_box(v)?),
    };

    Some(VectorizeRequest {
        url: url.to_string(),
        mode,
        raw,
        crop_box,
    })
}

/// A JSON number with no fractional part.
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15)
        .map(|f| f as i64)
}

fn parse_crop_box(value: &Value) -> Option<CropBox> {
    let items = value.as_array()?;
    let coords: Vec<f64> = items
        .iter()
        .map(|v| v.as_f64().filter(|c| c.is_finite()))
        .collect::<Option<_>>()?;
    let [left, top, right, bottom] = <[f64; 4]>::try_from(coords).ok()?;
    Some(CropBox::new(left, top, right, bottom))
}
