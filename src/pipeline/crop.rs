//! Optional crop applied to the acquired image before a strategy runs.

use super::normalize::NormalizedImage;
use image::imageops;
use serde::Serialize;
use thiserror::Error;

/// Caller-supplied rectangle `[left, top, right, bottom]` in pixels.
///
/// Right and bottom are exclusive. Coordinates are rounded to the nearest
/// integer before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CropError {
    #[error("crop box has non-finite coordinates")]
    NonFinite,

    #[error("crop box ({left}, {top}, {right}, {bottom}) is empty or inverted")]
    Empty {
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
    },

    #[error("crop box ({left}, {top}, {right}, {bottom}) exceeds image bounds {width}x{height}")]
    OutOfBounds {
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
        width: u32,
        height: u32,
    },
}

/// Restrict `image` to `crop_box`, keeping its colour mode.
pub fn crop(image: &NormalizedImage, crop_box: &CropBox) -> Result<NormalizedImage, CropError> {
    let coords = [crop_box.left, crop_box.top, crop_box.right, crop_box.bottom];
    if coords.iter().any(|c| !c.is_finite()) {
        return Err(CropError::NonFinite);
    }
    let [left, top, right, bottom] = coords.map(|c| c.round() as i64);

    if right <= left || bottom <= top {
        return Err(CropError::Empty {
            left,
            top,
            right,
            bottom,
        });
    }

    let (width, height) = (image.width(), image.height());
    if left < 0 || top < 0 || right > i64::from(width) || bottom > i64::from(height) {
        return Err(CropError::OutOfBounds {
            left,
            top,
            right,
            bottom,
            width,
            height,
        });
    }

    let (x, y) = (left as u32, top as u32);
    let (w, h) = ((right - left) as u32, (bottom - top) as u32);
    let cropped = match image {
        NormalizedImage::Rgb(buf) => {
            NormalizedImage::Rgb(imageops::crop_imm(buf, x, y, w, h).to_image())
        }
        NormalizedImage::Rgba(buf) => {
            NormalizedImage::Rgba(imageops::crop_imm(buf, x, y, w, h).to_image())
        }
    };
    Ok(cropped)
}
