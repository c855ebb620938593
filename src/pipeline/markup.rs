//! SVG serialization of a strategy's output.
//!
//! One `<path>` element per compound path, filled with its palette colour.
//! Outlines of a compound path share a single `d` attribute and use the
//! even-odd rule, so nested outlines render as holes.

use super::solve::StrategyOutput;
use crate::geometry::Point;
use std::fmt::Write;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Render `output` as a standalone SVG document sized to the traced image.
pub fn create_markup(output: &StrategyOutput) -> String {
    let mut svg = String::with_capacity(256 + output.paths.len() * 128);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = output.width,
        h = output.height,
    );

    for path in output.paths.iter().filter(|p| !p.is_empty()) {
        let fill = output
            .palette
            .get(path.color)
            .map_or_else(|| "000000".to_string(), |rgb| hex::encode(rgb));
        let _ = write!(svg, r##"<path fill="#{fill}" fill-rule="evenodd" d=""##);
        let mut first = true;
        for outline in path.outlines.iter().filter(|o| !o.is_empty()) {
            if !first {
                svg.push(' ');
            }
            first = false;
            push_outline(&mut svg, outline);
        }
        svg.push_str(r#""/>"#);
    }

    svg.push_str("</svg>");
    svg
}

fn push_outline(svg: &mut String, outline: &[Point]) {
    for (i, p) in outline.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(svg, "{cmd}{} {} ", fmt_coord(p.x), fmt_coord(p.y));
    }
    svg.push('Z');
}

// Integral coordinates print without a trailing ".0".
fn fmt_coord(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
