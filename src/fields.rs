//! Shape admissibility and indexable-field emission
//!
//! Two single-pass dispatchers over the closed geometry variant set:
//! [`supported`] answers whether a geometry can be stored in the planar
//! scheme at all, and [`index_fields`] converts an admissible geometry into
//! one or more indexable primitives, recursing into collections. Both are
//! pure and stateless; failures are caller input errors, never transient.
//!
//! Circle and LinearRing are rejected at both layers. The planar storage
//! scheme only supports the cartesian triangle-mesh encoding, which cannot
//! represent a true circle, and rings are only meaningful as polygon
//! boundaries, never as standalone documents.

use crate::error::{GeoError, Result};
use crate::geometry::Geometry;
use crate::planar::{self, PlanarLine, PlanarPoint, PlanarPolygon};

/// An opaque indexable primitive handed to the downstream indexer.
///
/// Polygons are passed whole; tessellation into the triangle mesh is the
/// downstream indexer's job.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexableField {
    /// A single narrowed point
    Point(PlanarPoint),
    /// A narrowed line
    Line(PlanarLine),
    /// A narrowed polygon with holes
    Polygon(PlanarPolygon),
}

/// Check that a geometry is representable in the planar storage scheme.
///
/// Returns the input unchanged for every admissible variant. Circle and
/// LinearRing fail with [`GeoError::UnsupportedShape`] naming the offending
/// type.
pub fn supported(geometry: &Geometry) -> Result<&Geometry> {
    match geometry {
        Geometry::Circle(_) => Err(GeoError::UnsupportedShape(format!(
            "{} geometry is not supported",
            geometry.type_name()
        ))),
        Geometry::LinearRing(_) => Err(GeoError::UnsupportedShape(
            "cannot index LINEARRING [coordinates] directly".to_string(),
        )),
        Geometry::Point(_)
        | Geometry::Line(_)
        | Geometry::MultiPoint(_)
        | Geometry::MultiLine(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rectangle(_)
        | Geometry::Collection(_) => Ok(geometry),
    }
}

/// Convert a geometry into its indexable primitives.
///
/// Leaf variants emit exactly one field; Multi* and collections recurse
/// into each member and concatenate the resulting fields in member order.
/// Circle and LinearRing are rejected here as well as in [`supported`].
pub fn index_fields(geometry: &Geometry) -> Result<Vec<IndexableField>> {
    match geometry {
        Geometry::Point(c) => Ok(vec![IndexableField::Point(planar::point(c))]),
        Geometry::Line(l) => Ok(vec![IndexableField::Line(planar::line(l))]),
        Geometry::Polygon(p) => Ok(vec![IndexableField::Polygon(planar::polygon(p))]),
        Geometry::Rectangle(r) => Ok(vec![IndexableField::Polygon(planar::rectangle(r))]),
        Geometry::MultiPoint(points) => Ok(points
            .iter()
            .map(|c| IndexableField::Point(planar::point(c)))
            .collect()),
        Geometry::MultiLine(lines) => Ok(lines
            .iter()
            .map(|l| IndexableField::Line(planar::line(l)))
            .collect()),
        Geometry::MultiPolygon(polygons) => Ok(polygons
            .iter()
            .map(|p| IndexableField::Polygon(planar::polygon(p)))
            .collect()),
        Geometry::Collection(members) => {
            let mut fields = Vec::new();
            for member in members {
                fields.extend(index_fields(member)?);
            }
            Ok(fields)
        }
        Geometry::Circle(_) => Err(GeoError::UnsupportedShape(format!(
            "{} geometry is not supported",
            geometry.type_name()
        ))),
        Geometry::LinearRing(_) => Err(GeoError::UnsupportedShape(
            "cannot index LINEARRING [coordinates] directly".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Coordinate, Line, LinearRing, Polygon, Rectangle};

    fn sample_ring() -> LinearRing {
        LinearRing::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(4.0, 0.0),
            Coordinate::new(4.0, 4.0),
            Coordinate::new(0.0, 0.0),
        ])
        .unwrap()
    }

    fn sample_line() -> Line {
        Line::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]).unwrap()
    }

    #[test]
    fn test_circle_rejected_by_both_layers() {
        let circle = Geometry::Circle(Circle::new(Coordinate::new(0.0, 0.0), 1.0).unwrap());
        assert!(matches!(
            supported(&circle),
            Err(GeoError::UnsupportedShape(_))
        ));
        assert!(matches!(
            index_fields(&circle),
            Err(GeoError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_linear_ring_rejected_by_both_layers() {
        let ring = Geometry::LinearRing(sample_ring());
        assert!(matches!(
            supported(&ring),
            Err(GeoError::UnsupportedShape(_))
        ));
        assert!(matches!(
            index_fields(&ring),
            Err(GeoError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_supported_is_identity_for_admissible_variants() {
        let admissible = vec![
            Geometry::Point(Coordinate::new(1.0, 2.0)),
            Geometry::Line(sample_line()),
            Geometry::MultiPoint(vec![Coordinate::new(0.0, 0.0)]),
            Geometry::MultiLine(vec![sample_line()]),
            Geometry::Polygon(Polygon::new(sample_ring())),
            Geometry::MultiPolygon(vec![Polygon::new(sample_ring())]),
            Geometry::Rectangle(Rectangle::new(0.0, 0.0, 1.0, 1.0).unwrap()),
            Geometry::Collection(vec![Geometry::Point(Coordinate::new(0.0, 0.0))]),
        ];
        for geometry in &admissible {
            let passed = supported(geometry).unwrap();
            assert_eq!(passed, geometry);
        }
    }

    #[test]
    fn test_rejection_names_the_shape() {
        let circle = Geometry::Circle(Circle::new(Coordinate::new(0.0, 0.0), 1.0).unwrap());
        match supported(&circle) {
            Err(GeoError::UnsupportedShape(msg)) => assert!(msg.contains("CIRCLE")),
            other => panic!("expected UnsupportedShape, got {:?}", other),
        }
    }

    #[test]
    fn test_leaf_variants_emit_one_field() {
        let point = Geometry::Point(Coordinate::new(1.0, 2.0));
        assert_eq!(index_fields(&point).unwrap().len(), 1);

        let rect = Geometry::Rectangle(Rectangle::new(0.0, 0.0, 2.0, 2.0).unwrap());
        let fields = index_fields(&rect).unwrap();
        assert_eq!(fields.len(), 1);
        assert!(matches!(fields[0], IndexableField::Polygon(_)));
    }

    #[test]
    fn test_collection_recursion_preserves_count_and_order() {
        let collection = Geometry::Collection(vec![
            Geometry::MultiPoint(vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 1.0),
                Coordinate::new(2.0, 2.0),
            ]),
            Geometry::Line(sample_line()),
            Geometry::Collection(vec![
                Geometry::Point(Coordinate::new(9.0, 9.0)),
                Geometry::Polygon(Polygon::new(sample_ring())),
            ]),
        ]);
        let fields = index_fields(&collection).unwrap();
        // 3 points + 1 line + 1 point + 1 polygon, in member order
        assert_eq!(fields.len(), 6);
        assert!(matches!(fields[0], IndexableField::Point(_)));
        assert!(matches!(fields[3], IndexableField::Line(_)));
        assert!(matches!(fields[4], IndexableField::Point(_)));
        assert!(matches!(fields[5], IndexableField::Polygon(_)));
    }

    #[test]
    fn test_collection_containing_circle_fails() {
        let collection = Geometry::Collection(vec![
            Geometry::Point(Coordinate::new(0.0, 0.0)),
            Geometry::Circle(Circle::new(Coordinate::new(0.0, 0.0), 1.0).unwrap()),
        ]);
        assert!(matches!(
            index_fields(&collection),
            Err(GeoError::UnsupportedShape(_))
        ));
    }
}
