//! Normalized page geometry.
//!
//! Provides the rectangle types and the area math used by the spatial index:
//! - `Rect` tuples in min/max form and the `HasBBox` trait
//! - `QueryRect`, the caller-facing `{x, y, width, height}` rectangle
//! - Intersection area and entry-relative overlap ratio
//! - Containment and centre-distance helpers

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Small epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1e-9;

/// A 2D point (x, y) in normalized page space.
pub type Point = (f64, f64);

/// A rectangle defined by (min_x, min_y, max_x, max_y).
///
/// Document-analysis coordinates put the origin at the top-left corner of the
/// page, so `min_y` is the top edge.
pub type Rect = (f64, f64, f64, f64);

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Trait for objects that have a bounding box.
pub trait HasBBox {
    fn x0(&self) -> f64;
    fn y0(&self) -> f64;
    fn x1(&self) -> f64;
    fn y1(&self) -> f64;

    fn bbox(&self) -> Rect {
        (self.x0(), self.y0(), self.x1(), self.y1())
    }

    fn width(&self) -> f64 {
        self.x1() - self.x0()
    }

    fn height(&self) -> f64 {
        self.y1() - self.y0()
    }
}

impl HasBBox for Rect {
    fn x0(&self) -> f64 {
        self.0
    }
    fn y0(&self) -> f64 {
        self.1
    }
    fn x1(&self) -> f64 {
        self.2
    }
    fn y1(&self) -> f64 {
        self.3
    }
}

/// A query rectangle in normalized (0..1) page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl QueryRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole page.
    pub fn full_page() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Rejects non-finite fields and negative extents.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(IndexError::InvalidRect(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(IndexError::InvalidRect(format!(
                "width and height must be non-negative, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Converts to min/max form.
    pub fn to_bbox(&self) -> Rect {
        (
            self.x,
            self.y,
            self.x + self.width,
            self.y + self.height,
        )
    }
}

impl FromStr for QueryRect {
    type Err = IndexError;

    /// Parses `"x,y,width,height"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(IndexError::InvalidRect(format!(
                "expected x,y,width,height but got {s:?}"
            )));
        }
        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse::<f64>().map_err(|_| {
                IndexError::InvalidRect(format!("{part:?} is not a number"))
            })?;
        }
        let rect = Self::new(values[0], values[1], values[2], values[3]);
        rect.validate()?;
        Ok(rect)
    }
}

/// Area of a rectangle; zero for inverted rectangles.
#[inline]
pub fn area(r: Rect) -> f64 {
    (r.2 - r.0).max(0.0) * (r.3 - r.1).max(0.0)
}

/// Area of the intersection of two rectangles.
pub fn intersection_area(a: Rect, b: Rect) -> f64 {
    let x_overlap = (a.2.min(b.2) - a.0.max(b.0)).max(0.0);
    let y_overlap = (a.3.min(b.3) - a.1.max(b.1)).max(0.0);
    x_overlap * y_overlap
}

/// Returns true if `inner` lies inside `outer`, edges included.
pub fn contains(outer: Rect, inner: Rect) -> bool {
    inner.0 >= outer.0 && inner.1 >= outer.1 && inner.2 <= outer.2 && inner.3 <= outer.3
}

/// Fraction of `entry`'s own area covered by `query`.
///
/// This is relative to the entry, not the query and not intersection-over-union:
/// a large query fully containing a small entry gives 1.0.
///
/// Zero-area entries (a line or a point) have no area to divide by; they score
/// 1.0 when they sit entirely inside the query and 0.0 otherwise. The result is
/// always in [0, 1].
pub fn overlap_ratio(query: Rect, entry: Rect) -> f64 {
    let entry_area = area(entry);
    if entry_area <= 0.0 {
        return if contains(query, entry) { 1.0 } else { 0.0 };
    }
    (intersection_area(query, entry) / entry_area).clamp(0.0, 1.0)
}

/// Squared distance from a point to the centre of a rectangle.
pub fn center_distance_2(point: Point, r: Rect) -> f64 {
    let cx = (r.0 + r.2) / 2.0;
    let cy = (r.1 + r.3) / 2.0;
    (point.0 - cx).powi(2) + (point.1 - cy).powi(2)
}
