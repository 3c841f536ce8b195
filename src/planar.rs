//! Planar primitive conversion
//!
//! Projects geometry model objects into a non-georeferenced, single-precision
//! coordinate representation used purely for index/query construction. The
//! primitives are transient: created per conversion call and discarded once
//! the indexable fields or query object is produced.
//!
//! # Numeric semantics
//!
//! Every coordinate is narrowed from `f64` to `f32` with `as`, which rounds
//! to the nearest representable value (not truncation). Callers must expect
//! sub-unit precision loss. A circle's radius is narrowed the same way and
//! stays in the planar coordinate unit, never meters.

use crate::geometry::{Circle, Coordinate, Line, LinearRing, Polygon, Rectangle};

/// A single-precision point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    /// Narrowed x
    pub x: f32,
    /// Narrowed y
    pub y: f32,
}

/// A single-precision coordinate sequence as parallel x/y arrays
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarLine {
    /// Narrowed x values
    pub xs: Vec<f32>,
    /// Narrowed y values
    pub ys: Vec<f32>,
}

impl PlanarLine {
    /// Number of vertices
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// True when the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// A single-precision closed ring
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarRing {
    /// Narrowed x values, first == last
    pub xs: Vec<f32>,
    /// Narrowed y values, first == last
    pub ys: Vec<f32>,
}

/// A single-precision polygon: an exterior ring plus holes in source order
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarPolygon {
    /// Outer boundary
    pub exterior: PlanarRing,
    /// Hole rings, order preserved from the source polygon
    pub holes: Vec<PlanarRing>,
}

/// A single-precision circle; radius is in planar units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarCircle {
    /// Narrowed center x
    pub x: f32,
    /// Narrowed center y
    pub y: f32,
    /// Narrowed radius, planar units
    pub radius: f32,
}

/// Narrow a point to single precision
pub fn point(coordinate: &Coordinate) -> PlanarPoint {
    PlanarPoint {
        x: coordinate.x as f32,
        y: coordinate.y as f32,
    }
}

/// Project a line's coordinate arrays, narrowing each value
pub fn line(line: &Line) -> PlanarLine {
    let (xs, ys) = narrow(line.coordinates());
    PlanarLine { xs, ys }
}

/// Convert a rectangle to a 5-vertex counter-clockwise polygon.
///
/// The ring starts and ends at (min_x, min_y) and walks
/// (min_x,min_y) -> (max_x,min_y) -> (max_x,max_y) -> (min_x,max_y) ->
/// (min_x,min_y). Downstream consumers assume CCW winding, so this order
/// is fixed.
pub fn rectangle(rect: &Rectangle) -> PlanarPolygon {
    let min_x = rect.min_x as f32;
    let min_y = rect.min_y as f32;
    let max_x = rect.max_x as f32;
    let max_y = rect.max_y as f32;
    PlanarPolygon {
        exterior: PlanarRing {
            xs: vec![min_x, max_x, max_x, min_x, min_x],
            ys: vec![min_y, min_y, max_y, max_y, min_y],
        },
        holes: Vec::new(),
    }
}

/// Convert a polygon, narrowing the exterior ring and each hole
/// independently and preserving hole order
pub fn polygon(poly: &Polygon) -> PlanarPolygon {
    PlanarPolygon {
        exterior: ring(poly.exterior()),
        holes: poly.holes().iter().map(ring).collect(),
    }
}

/// Narrow a circle's center and radius independently
pub fn circle(circ: &Circle) -> PlanarCircle {
    PlanarCircle {
        x: circ.center.x as f32,
        y: circ.center.y as f32,
        radius: circ.radius as f32,
    }
}

fn ring(ring: &LinearRing) -> PlanarRing {
    let (xs, ys) = narrow(ring.coordinates());
    PlanarRing { xs, ys }
}

fn narrow(coordinates: &[Coordinate]) -> (Vec<f32>, Vec<f32>) {
    let xs = coordinates.iter().map(|c| c.x as f32).collect();
    let ys = coordinates.iter().map(|c| c.y as f32).collect();
    (xs, ys)
}
