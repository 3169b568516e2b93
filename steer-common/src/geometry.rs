//! Resolution-independent geometry.
//!
//! The planner describes page regions as [`NormalizedBox`]es: rectangles in
//! units of 1/1000 of the viewport height (y) and width (x). Everything that
//! touches the page converts them into [`PixelRect`]s against the *current*
//! [`Viewport`], never the one the screenshot was taken with.
use serde::{Deserialize, Serialize};

/// Scale of the normalized coordinate space.
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// Rectangle normalized to `0..=1000` on both axes.
///
/// `ymin <= ymax` and `xmin <= xmax` are expected but not enforced; derived
/// pixel widths and heights are clamped at zero instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub ymin: f64,
    pub xmin: f64,
    pub ymax: f64,
    pub xmax: f64,
}

/// Inner dimensions of the browser window in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle in viewport pixels, shaped like `DOMRect`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Unclamped edges of a [`NormalizedBox`] projected onto a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelEdges {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl NormalizedBox {
    pub fn new(ymin: f64, xmin: f64, ymax: f64, xmax: f64) -> Self {
        Self {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }

    /// All four coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.ymin, self.xmin, self.ymax, self.xmax]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn edges(&self, viewport: Viewport) -> PixelEdges {
        PixelEdges {
            top: self.ymin / NORMALIZED_SCALE * viewport.height,
            left: self.xmin / NORMALIZED_SCALE * viewport.width,
            bottom: self.ymax / NORMALIZED_SCALE * viewport.height,
            right: self.xmax / NORMALIZED_SCALE * viewport.width,
        }
    }

    /// Pixel rectangle covered by this box. Inverted boxes collapse to zero
    /// width/height anchored at their min corner.
    pub fn to_pixels(&self, viewport: Viewport) -> PixelRect {
        let e = self.edges(viewport);
        PixelRect {
            top: e.top,
            left: e.left,
            width: (e.right - e.left).max(0.0),
            height: (e.bottom - e.top).max(0.0),
        }
    }

    /// Center of the box in viewport pixels.
    pub fn center(&self, viewport: Viewport) -> Point {
        Point {
            x: (self.xmin + self.xmax) / 2.0 / NORMALIZED_SCALE * viewport.width,
            y: (self.ymin + self.ymax) / 2.0 / NORMALIZED_SCALE * viewport.height,
        }
    }
}

impl PixelEdges {
    /// Tolerant containment test: `rect` may start up to `tolerance` times
    /// closer to the origin and end up to `tolerance` times further away than
    /// these edges.
    pub fn loosely_contains(&self, rect: &PixelRect, tolerance: f64) -> bool {
        rect.top >= self.top / tolerance
            && rect.left >= self.left / tolerance
            && rect.bottom() <= self.bottom * tolerance
            && rect.right() <= self.right * tolerance
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A viewport without positive dimensions cannot anchor any box.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

impl Point {
    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl PixelRect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.left + self.width / 2.0,
            y: self.top + self.height / 2.0,
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Express this rectangle in the normalized space of `viewport`.
    pub fn normalize(&self, viewport: Viewport) -> NormalizedBox {
        NormalizedBox {
            ymin: self.top / viewport.height * NORMALIZED_SCALE,
            xmin: self.left / viewport.width * NORMALIZED_SCALE,
            ymax: self.bottom() / viewport.height * NORMALIZED_SCALE,
            xmax: self.right() / viewport.width * NORMALIZED_SCALE,
        }
    }
}
