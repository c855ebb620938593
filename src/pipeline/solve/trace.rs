//! Run-length tracing of a pixel mask into rectangular outlines.
//!
//! Each row is split into runs of set pixels; a run that covers exactly the
//! same columns as a run on the row above extends that rectangle downwards
//! instead of starting a new one.

use crate::geometry::Point;
use std::collections::BTreeMap;

/// Trace the pixels for which `is_set` holds into closed rectangles.
///
/// Outlines are clockwise, in image coordinates, ordered by top edge then
/// left edge.
pub(crate) fn trace_runs<F>(width: u32, height: u32, mut is_set: F) -> Vec<Vec<Point>>
where
    F: FnMut(u32, u32) -> bool,
{
    // (x0, x1) -> first row of the rectangle currently growing under that span.
    let mut open: BTreeMap<(u32, u32), u32> = BTreeMap::new();
    let mut rects: Vec<(u32, u32, u32, u32)> = Vec::new();

    for y in 0..height {
        let mut next = BTreeMap::new();
        let mut x = 0;
        while x < width {
            if !is_set(x, y) {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && is_set(x, y) {
                x += 1;
            }
            let top = open.remove(&(start, x)).unwrap_or(y);
            next.insert((start, x), top);
        }
        for ((x0, x1), top) in std::mem::replace(&mut open, next) {
            rects.push((x0, top, x1, y));
        }
    }
    for ((x0, x1), top) in open {
        rects.push((x0, top, x1, height));
    }

    rects.sort_unstable_by_key(|&(x0, y0, _, _)| (y0, x0));
    rects
        .into_iter()
        .map(|(x0, y0, x1, y1)| rectangle(x0, y0, x1, y1))
        .collect()
}

fn rectangle(x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<Point> {
    let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ]
}
