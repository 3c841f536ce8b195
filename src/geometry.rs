//! Geometry model
//!
//! A closed set of geometry variants over double-precision coordinates.
//! Geometries are immutable once constructed; the rest of the crate only
//! reads and projects them. The variant set is deliberately expressed as a
//! single enum so that every dispatcher in the crate is forced, by
//! exhaustive `match`, to handle a newly added variant.

use crate::error::{GeoError, Result};

/// A single x/y coordinate with an optional elevation.
///
/// The z value is carried through untouched but ignored by planar
/// conversion, which only projects x and y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// X (or longitude-like) value
    pub x: f64,
    /// Y (or latitude-like) value
    pub y: f64,
    /// Optional elevation
    pub z: Option<f64>,
}

impl Coordinate {
    /// Create a 2D coordinate
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Create a 3D coordinate
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// An ordered sequence of at least two coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    coordinates: Vec<Coordinate>,
}

impl Line {
    /// Create a line from an ordered coordinate sequence
    pub fn new(coordinates: Vec<Coordinate>) -> Result<Self> {
        if coordinates.len() < 2 {
            return Err(GeoError::InvalidArgument(format!(
                "line requires at least 2 coordinates, got {}",
                coordinates.len()
            )));
        }
        Ok(Self { coordinates })
    }

    /// Coordinates in order
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }
}

/// A closed ring: the first and last coordinate are equal.
///
/// Rings are only meaningful as polygon boundaries; they are never
/// indexable on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRing {
    coordinates: Vec<Coordinate>,
}

impl LinearRing {
    /// Create a ring, validating closure
    pub fn new(coordinates: Vec<Coordinate>) -> Result<Self> {
        if coordinates.len() < 4 {
            return Err(GeoError::InvalidArgument(format!(
                "linear ring requires at least 4 coordinates, got {}",
                coordinates.len()
            )));
        }
        let first = coordinates[0];
        let last = coordinates[coordinates.len() - 1];
        if first.x != last.x || first.y != last.y {
            return Err(GeoError::InvalidArgument(format!(
                "linear ring is not closed: first ({}, {}) != last ({}, {})",
                first.x, first.y, last.x, last.y
            )));
        }
        Ok(Self { coordinates })
    }

    /// Coordinates in order, first == last
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }
}

/// An outer ring plus zero or more hole rings, same winding convention
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: LinearRing,
    holes: Vec<LinearRing>,
}

impl Polygon {
    /// Create a polygon with no holes
    pub fn new(exterior: LinearRing) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Create a polygon with hole rings, hole order preserved
    pub fn with_holes(exterior: LinearRing, holes: Vec<LinearRing>) -> Self {
        Self { exterior, holes }
    }

    /// The outer boundary ring
    pub fn exterior(&self) -> &LinearRing {
        &self.exterior
    }

    /// Hole rings in insertion order
    pub fn holes(&self) -> &[LinearRing] {
        &self.holes
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Minimum x
    pub min_x: f64,
    /// Minimum y
    pub min_y: f64,
    /// Maximum x
    pub max_x: f64,
    /// Maximum y
    pub max_y: f64,
}

impl Rectangle {
    /// Create a rectangle, validating min <= max on both axes
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if min_x > max_x || min_y > max_y {
            return Err(GeoError::InvalidArgument(format!(
                "rectangle min must not exceed max: x [{}, {}], y [{}, {}]",
                min_x, max_x, min_y, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

/// A center point plus a radius in the same planar unit as the coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center coordinate
    pub center: Coordinate,
    /// Radius in planar units (not meters)
    pub radius: f64,
}

impl Circle {
    /// Create a circle, validating a non-negative radius
    pub fn new(center: Coordinate, radius: f64) -> Result<Self> {
        if radius < 0.0 {
            return Err(GeoError::InvalidArgument(format!(
                "circle radius must be non-negative, got {}",
                radius
            )));
        }
        Ok(Self { center, radius })
    }
}

/// The closed geometry variant set
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single coordinate
    Point(Coordinate),
    /// An open coordinate sequence
    Line(Line),
    /// A closed ring (polygon boundary, never indexable standalone)
    LinearRing(LinearRing),
    /// Multiple points
    MultiPoint(Vec<Coordinate>),
    /// Multiple lines
    MultiLine(Vec<Line>),
    /// An outer ring with optional holes
    Polygon(Polygon),
    /// Multiple polygons
    MultiPolygon(Vec<Polygon>),
    /// An axis-aligned rectangle
    Rectangle(Rectangle),
    /// A center plus radius
    Circle(Circle),
    /// A heterogeneous collection of geometries
    Collection(Vec<Geometry>),
}

impl Geometry {
    /// Human-readable variant name, used in rejection messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "POINT",
            Geometry::Line(_) => "LINESTRING",
            Geometry::LinearRing(_) => "LINEARRING",
            Geometry::MultiPoint(_) => "MULTIPOINT",
            Geometry::MultiLine(_) => "MULTILINESTRING",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPolygon(_) => "MULTIPOLYGON",
            Geometry::Rectangle(_) => "ENVELOPE",
            Geometry::Circle(_) => "CIRCLE",
            Geometry::Collection(_) => "GEOMETRYCOLLECTION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_must_be_closed() {
        let open = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(0.5, 0.5),
        ];
        let err = LinearRing::new(open).unwrap_err();
        assert!(matches!(err, GeoError::InvalidArgument(_)));
    }

    #[test]
    fn test_closed_ring_accepted() {
        let ring = LinearRing::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(ring.coordinates().len(), 4);
    }

    #[test]
    fn test_line_requires_two_points() {
        let err = Line::new(vec![Coordinate::new(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, GeoError::InvalidArgument(_)));
    }

    #[test]
    fn test_rectangle_rejects_inverted_bounds() {
        assert!(Rectangle::new(2.0, 0.0, 1.0, 1.0).is_err());
        assert!(Rectangle::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(Rectangle::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_negative_radius_rejected() {
        let err = Circle::new(Coordinate::new(0.0, 0.0), -1.0).unwrap_err();
        assert!(matches!(err, GeoError::InvalidArgument(_)));
    }
}
