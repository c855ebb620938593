//! Vector geometry shared by strategies, markup and bounds.

use serde::Serialize;

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A set of closed outlines sharing one fill colour.
///
/// `color` indexes into the palette returned alongside the paths.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundPath {
    pub color: usize,
    pub outlines: Vec<Vec<Point>>,
}

impl CompoundPath {
    pub fn new(color: usize, outlines: Vec<Vec<Point>>) -> Self {
        Self { color, outlines }
    }

    pub fn is_empty(&self) -> bool {
        self.outlines.iter().all(|o| o.is_empty())
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.outlines.iter().flatten()
    }
}

/// Axis-aligned extent of a set of paths.
///
/// Serializes as `{"x", "y", "width", "height"}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Bounds of every point in `paths`; all zeros when there are no points.
pub fn compound_path_list_bounds(paths: &[CompoundPath]) -> Bounds {
    let mut points = paths.iter().flat_map(CompoundPath::points);
    let Some(first) = points.next() else {
        return Bounds::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn bounds_span_all_paths() {
        let paths = vec![
            CompoundPath::new(0, vec![square(2.0, 3.0, 1.0)]),
            CompoundPath::new(1, vec![square(10.0, 1.0, 2.0), square(0.5, 8.0, 1.0)]),
        ];
        let b = compound_path_list_bounds(&paths);
        assert_eq!(b.x, 0.5);
        assert_eq!(b.y, 1.0);
        assert_eq!(b.right(), 12.0);
        assert_eq!(b.bottom(), 9.0);
    }

    #[test]
    fn empty_paths_have_zero_bounds() {
        assert_eq!(compound_path_list_bounds(&[]), Bounds::default());
        let hollow = vec![CompoundPath::new(0, vec![vec![]])];
        assert!(hollow[0].is_empty());
        assert_eq!(compound_path_list_bounds(&hollow), Bounds::default());
    }

    #[test]
    fn bounds_serialize_as_dict() {
        let b = Bounds {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        };
        let v = serde_json::to_value(b).unwrap();
        assert_eq!(v, serde_json::json!({"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}));
    }
}
