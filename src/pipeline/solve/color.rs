//! Palette strategy: median-cut quantization, then one traced compound path
//! per palette entry.

use super::trace::trace_runs;
use super::{ensure_non_empty, ColorCount, SolveError, Solver, StrategyOutput, OPAQUE_ALPHA};
use crate::geometry::CompoundPath;
use crate::pipeline::normalize::NormalizedImage;
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on pixels fed to median cut; larger images are sampled.
const MAX_SAMPLES: usize = 1 << 16;

#[derive(Debug, Clone, Copy)]
pub struct ColorSolver {
    color_count: ColorCount,
}

impl ColorSolver {
    pub fn new(color_count: ColorCount) -> Self {
        Self { color_count }
    }
}

impl Solver for ColorSolver {
    fn name(&self) -> &'static str {
        "color"
    }

    fn solve(&self, image: &NormalizedImage) -> Result<StrategyOutput, SolveError> {
        ensure_non_empty(image)?;
        let (width, height) = (image.width(), image.height());

        let opaque: Vec<[u8; 3]> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| image.rgba_at(x, y))
            .filter(|px| px[3] >= OPAQUE_ALPHA)
            .map(|px| [px[0], px[1], px[2]])
            .collect();

        let step = opaque.len().div_ceil(MAX_SAMPLES).max(1);
        let samples: Vec<[u8; 3]> = opaque.iter().step_by(step).copied().collect();
        let palette = median_cut(samples, self.color_count.get());
        debug!(
            "Color solver: {} opaque pixels, {} palette entries",
            opaque.len(),
            palette.len()
        );

        // Label every pixel once; `None` marks background.
        let mut cache: HashMap<[u8; 3], usize> = HashMap::new();
        let labels: Vec<Option<usize>> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let px = image.rgba_at(x, y);
                (px[3] >= OPAQUE_ALPHA).then(|| {
                    let rgb = [px[0], px[1], px[2]];
                    *cache
                        .entry(rgb)
                        .or_insert_with(|| nearest(&palette, rgb))
                })
            })
            .collect();

        let paths = (0..palette.len())
            .filter_map(|color| {
                let outlines = trace_runs(width, height, |x, y| {
                    labels[(y * width + x) as usize] == Some(color)
                });
                (!outlines.is_empty()).then(|| CompoundPath::new(color, outlines))
            })
            .collect();

        Ok(StrategyOutput {
            paths,
            palette,
            width,
            height,
        })
    }
}

/// Reduce `samples` to at most `k` representative colours.
fn median_cut(samples: Vec<[u8; 3]>, k: usize) -> Vec<[u8; 3]> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut boxes = vec![samples];
    while boxes.len() < k {
        let widest = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let (channel, range) = widest_channel(b);
                (i, channel, range)
            })
            .filter(|&(_, _, range)| range > 0)
            .max_by_key(|&(_, _, range)| range);
        let Some((index, channel, _)) = widest else {
            break;
        };

        let mut colors = boxes.swap_remove(index);
        colors.sort_unstable_by_key(|c| c[channel]);
        // Split at the median value, never between equal values.
        let median = colors[colors.len() / 2][channel];
        let split = match colors.partition_point(|c| c[channel] < median) {
            0 => colors.partition_point(|c| c[channel] <= median),
            i => i,
        };
        let upper = colors.split_off(split);
        boxes.push(colors);
        boxes.push(upper);
    }

    boxes.iter().map(|b| average(b)).collect()
}

fn widest_channel(colors: &[[u8; 3]]) -> (usize, u8) {
    (0..3)
        .map(|ch| {
            let (lo, hi) = colors
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), c| (lo.min(c[ch]), hi.max(c[ch])));
            (ch, hi.saturating_sub(lo))
        })
        .max_by_key(|&(_, range)| range)
        .unwrap_or((0, 0))
}

fn average(colors: &[[u8; 3]]) -> [u8; 3] {
    let n = colors.len().max(1) as u64;
    let mut sum = [0u64; 3];
    for c in colors {
        for ch in 0..3 {
            sum[ch] += u64::from(c[ch]);
        }
    }
    sum.map(|s| ((s + n / 2) / n) as u8)
}

fn nearest(palette: &[[u8; 3]], rgb: [u8; 3]) -> usize {
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| {
            (0..3)
                .map(|ch| {
                    let d = i32::from(p[ch]) - i32::from(rgb[ch]);
                    (d * d) as u32
                })
                .sum::<u32>()
        })
        .map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn count(n: i64) -> ColorCount {
        ColorCount::new(n).unwrap()
    }

    fn quadrants() -> NormalizedImage {
        NormalizedImage::Rgb(RgbImage::from_fn(8, 8, |x, y| match (x < 4, y < 4) {
            (true, true) => Rgb([255, 0, 0]),
            (false, true) => Rgb([0, 255, 0]),
            (true, false) => Rgb([0, 0, 255]),
            (false, false) => Rgb([255, 255, 0]),
        }))
    }

    #[test]
    fn recovers_exact_palette() {
        let out = ColorSolver::new(count(4)).solve(&quadrants()).unwrap();
        assert_eq!(out.palette.len(), 4);
        for c in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]] {
            assert!(out.palette.contains(&c), "missing {c:?}");
        }
        assert_eq!(out.paths.len(), 4);
        for path in &out.paths {
            assert_eq!(path.outlines.len(), 1, "each quadrant is one rectangle");
        }
    }

    #[test]
    fn palette_never_exceeds_color_count() {
        let out = ColorSolver::new(count(2)).solve(&quadrants()).unwrap();
        assert!(out.palette.len() <= 2);
        assert!(out.paths.iter().all(|p| p.color < out.palette.len()));
    }

    #[test]
    fn fewer_colors_than_requested() {
        let img = NormalizedImage::Rgb(RgbImage::from_pixel(3, 3, Rgb([7, 8, 9])));
        let out = ColorSolver::new(count(16)).solve(&img).unwrap();
        assert_eq!(out.palette, vec![[7, 8, 9]]);
        assert_eq!(out.paths.len(), 1);
    }

    #[test]
    fn fully_transparent_image_is_empty() {
        let img = NormalizedImage::Rgba(RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 0])));
        let out = ColorSolver::new(count(8)).solve(&img).unwrap();
        assert!(out.palette.is_empty());
        assert!(out.paths.is_empty());
        assert_eq!((out.width, out.height), (3, 3));
    }

    #[test]
    fn median_cut_splits_on_widest_channel() {
        let samples = vec![[0, 0, 0], [10, 0, 0], [200, 0, 0], [250, 0, 0]];
        let mut palette = median_cut(samples, 2);
        palette.sort_unstable();
        assert_eq!(palette, vec![[5, 0, 0], [225, 0, 0]]);
    }

    #[test]
    fn nearest_picks_closest() {
        let palette = [[0, 0, 0], [255, 255, 255]];
        assert_eq!(nearest(&palette, [20, 30, 10]), 0);
        assert_eq!(nearest(&palette, [200, 220, 250]), 1);
    }
}
