//! Colour-mode detection and normalization to the two canonical modes.
//!
//! Every image leaving acquisition is a [`NormalizedImage`]: 8-bit RGB or
//! 8-bit RGBA, nothing else. Other source modes are converted through a
//! fixed table (bilevel and grayscale → RGB, palette and palette-with-alpha
//! → RGBA); anything absent from the table is rejected.
//!
//! The `image` crate expands palettes and sub-byte bit depths while
//! decoding, so the decoded buffer alone cannot tell a palette PNG from a
//! true-colour one. [`detect_mode`] therefore looks at the container header
//! first (PNG `IHDR`, GIF signature) and only falls back to the decoded
//! buffer's layout. The header also decides for PNGs the decoder widens:
//! 16-bit true colour is reduced to 8 bits, and a grayscale `tRNS` entry
//! does not make an image grayscale-with-alpha.

use crate::error::VectorizeError;
use image::{DynamicImage, ImageFormat, Rgba, RgbImage, RgbaImage};
use std::fmt;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_COLOR_GRAYSCALE: u8 = 0;
const PNG_COLOR_RGB: u8 = 2;
const PNG_COLOR_INDEXED: u8 = 3;
const PNG_COLOR_RGBA: u8 = 6;

/// Colour mode of a decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// One bit per pixel, black and white.
    Bilevel,
    /// 8-bit grayscale.
    Luma,
    /// 8-bit grayscale with alpha.
    LumaAlpha,
    /// Indexed colour.
    Palette,
    /// Indexed colour with transparency.
    PaletteAlpha,
    /// 8-bit RGB. Canonical.
    Rgb,
    /// 8-bit RGBA. Canonical.
    Rgba,
    Luma16,
    LumaAlpha16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
    /// A layout this crate does not recognise.
    Other,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Bilevel => "bilevel",
            ColorMode::Luma => "luma",
            ColorMode::LumaAlpha => "luma-alpha",
            ColorMode::Palette => "palette",
            ColorMode::PaletteAlpha => "palette-alpha",
            ColorMode::Rgb => "rgb",
            ColorMode::Rgba => "rgba",
            ColorMode::Luma16 => "luma16",
            ColorMode::LumaAlpha16 => "luma-alpha16",
            ColorMode::Rgb16 => "rgb16",
            ColorMode::Rgba16 => "rgba16",
            ColorMode::Rgb32F => "rgb32f",
            ColorMode::Rgba32F => "rgba32f",
            ColorMode::Other => "other",
        }
    }

    /// The canonical mode this mode normalizes to, or `None` if unsupported.
    pub fn normalization_target(self) -> Option<ColorMode> {
        match self {
            ColorMode::Rgb | ColorMode::Bilevel | ColorMode::Luma => Some(ColorMode::Rgb),
            ColorMode::Rgba | ColorMode::Palette | ColorMode::PaletteAlpha => Some(ColorMode::Rgba),
            _ => None,
        }
    }

    fn of_buffer(image: &DynamicImage) -> ColorMode {
        match image {
            DynamicImage::ImageLuma8(_) => ColorMode::Luma,
            DynamicImage::ImageLumaA8(_) => ColorMode::LumaAlpha,
            DynamicImage::ImageRgb8(_) => ColorMode::Rgb,
            DynamicImage::ImageRgba8(_) => ColorMode::Rgba,
            DynamicImage::ImageLuma16(_) => ColorMode::Luma16,
            DynamicImage::ImageLumaA16(_) => ColorMode::LumaAlpha16,
            DynamicImage::ImageRgb16(_) => ColorMode::Rgb16,
            DynamicImage::ImageRgba16(_) => ColorMode::Rgba16,
            DynamicImage::ImageRgb32F(_) => ColorMode::Rgb32F,
            DynamicImage::ImageRgba32F(_) => ColorMode::Rgba32F,
            _ => ColorMode::Other,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded image in one of the two canonical modes.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedImage {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        match self {
            NormalizedImage::Rgb(buf) => buf.width(),
            NormalizedImage::Rgba(buf) => buf.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            NormalizedImage::Rgb(buf) => buf.height(),
            NormalizedImage::Rgba(buf) => buf.height(),
        }
    }

    pub fn mode(&self) -> ColorMode {
        match self {
            NormalizedImage::Rgb(_) => ColorMode::Rgb,
            NormalizedImage::Rgba(_) => ColorMode::Rgba,
        }
    }

    /// Pixel at `(x, y)` as RGBA; RGB pixels are fully opaque.
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn rgba_at(&self, x: u32, y: u32) -> Rgba<u8> {
        match self {
            NormalizedImage::Rgb(buf) => {
                let [r, g, b] = buf.get_pixel(x, y).0;
                Rgba([r, g, b, 255])
            }
            NormalizedImage::Rgba(buf) => *buf.get_pixel(x, y),
        }
    }
}

/// Determine the source colour mode from the encoded bytes and the decoded buffer.
pub fn detect_mode(bytes: &[u8], decoded: &DynamicImage) -> ColorMode {
    let has_alpha = decoded.color().has_alpha();

    if let Some((bit_depth, color_type)) = png_header(bytes) {
        match color_type {
            PNG_COLOR_INDEXED if has_alpha => return ColorMode::PaletteAlpha,
            PNG_COLOR_INDEXED => return ColorMode::Palette,
            PNG_COLOR_GRAYSCALE if bit_depth == 1 => return ColorMode::Bilevel,
            PNG_COLOR_GRAYSCALE if bit_depth <= 8 => return ColorMode::Luma,
            PNG_COLOR_RGB => return ColorMode::Rgb,
            PNG_COLOR_RGBA => return ColorMode::Rgba,
            _ => {}
        }
    } else if matches!(image::guess_format(bytes), Ok(ImageFormat::Gif)) {
        return if has_alpha {
            ColorMode::PaletteAlpha
        } else {
            ColorMode::Palette
        };
    }

    ColorMode::of_buffer(decoded)
}

/// Convert a decoded image to its canonical mode.
///
/// Canonical inputs are moved through untouched.
pub fn normalize(decoded: DynamicImage, mode: ColorMode) -> Result<NormalizedImage, VectorizeError> {
    let target = mode
        .normalization_target()
        .ok_or_else(|| VectorizeError::ImageFormat {
            mode: mode.to_string(),
        })?;

    let normalized = match (target, decoded) {
        (ColorMode::Rgb, DynamicImage::ImageRgb8(buf)) => NormalizedImage::Rgb(buf),
        (ColorMode::Rgba, DynamicImage::ImageRgba8(buf)) => NormalizedImage::Rgba(buf),
        (ColorMode::Rgb, other) => NormalizedImage::Rgb(other.to_rgb8()),
        (_, other) => NormalizedImage::Rgba(other.to_rgba8()),
    };
    Ok(normalized)
}

/// `(bit_depth, color_type)` from a PNG `IHDR` chunk, if `bytes` is a PNG.
fn png_header(bytes: &[u8]) -> Option<(u8, u8)> {
    if bytes.len() < 26 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    Some((bytes[24], bytes[25]))
}
