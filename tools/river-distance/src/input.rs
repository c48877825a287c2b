use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use geojson::{Feature, GeoJson, JsonValue};
use river_distance_core::prelude::*;
use std::path::Path;

/// Read a point layer from a GeoJSON file
pub fn read_point_set(path: &Path, id_field: &str, crs: Crs) -> Result<PointSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read point layer: {}", path.display()))?;

    parse_point_set(&content, &layer_name(path), id_field, crs)
        .with_context(|| format!("Invalid point layer: {}", path.display()))
}

/// Read the river layer from a GeoJSON file
pub fn read_reference(path: &Path, crs: Crs) -> Result<ReferenceLayer> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read river layer: {}", path.display()))?;

    parse_reference(&content, &layer_name(path), crs)
        .with_context(|| format!("Invalid river layer: {}", path.display()))
}

fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse GeoJSON point features
///
/// A feature without geometry is kept with a NaN coordinate, so the
/// pipeline reports it as skipped.
pub fn parse_point_set(content: &str, name: &str, id_field: &str, crs: Crs) -> Result<PointSet> {
    let features = parse_features(content)?;

    let mut points = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let id = feature
            .property(id_field)
            .and_then(property_to_id)
            .with_context(|| format!("Feature {} has no '{}' value", index, id_field))?;

        let coord = match &feature.geometry {
            None => Coord {
                x: f64::NAN,
                y: f64::NAN,
            },
            Some(geometry) => match &geometry.value {
                geojson::Value::Point(position) => position_to_coord(position),
                geojson::Value::MultiPoint(positions) if positions.len() == 1 => {
                    position_to_coord(&positions[0])
                }
                _ => bail!("Feature {} is not a single point", index),
            },
        };

        points.push(PointFeature { id, coord });
    }

    log::debug!("Read {} points from '{}'", points.len(), name);
    Ok(PointSet::new(name, id_field, crs, points))
}

/// Parse the river geometry, inferring its kind from the features
pub fn parse_reference(content: &str, name: &str, crs: Crs) -> Result<ReferenceLayer> {
    let features = parse_features(content)?;

    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut polygons = Vec::new();

    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        match &geometry.value {
            geojson::Value::Point(p) => points.push(Point::from(position_to_coord(p))),
            geojson::Value::MultiPoint(ps) => {
                points.extend(ps.iter().map(|p| Point::from(position_to_coord(p))))
            }
            geojson::Value::LineString(coords) => lines.push(coords_to_linestring(coords)),
            geojson::Value::MultiLineString(parts) => {
                lines.extend(parts.iter().map(|c| coords_to_linestring(c)))
            }
            geojson::Value::Polygon(rings) => polygons.push(rings_to_polygon(rings)?),
            geojson::Value::MultiPolygon(polys) => {
                for rings in polys {
                    polygons.push(rings_to_polygon(rings)?);
                }
            }
            geojson::Value::GeometryCollection(_) => {
                bail!("Feature {} is a GeometryCollection", index)
            }
        }
    }

    let kinds = [!points.is_empty(), !lines.is_empty(), !polygons.is_empty()]
        .iter()
        .filter(|&&present| present)
        .count();

    let geometry = match kinds {
        0 => bail!("River layer has no geometry"),
        1 if !polygons.is_empty() => ReferenceGeometry::Polygon(MultiPolygon::new(polygons)),
        1 if !lines.is_empty() => ReferenceGeometry::Line(lines),
        1 => ReferenceGeometry::Point(MultiPoint::new(points)),
        _ => bail!("River layer mixes points, lines and polygons"),
    };

    log::debug!("Read {} river layer '{}'", geometry.kind(), name);
    Ok(ReferenceLayer::new(name, geometry, crs))
}

fn parse_features(content: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = content.parse().context("Failed to parse GeoJSON")?;

    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

/// Map a GeoJSON property value to a feature id
///
/// Integral numbers become integer ids, strings and other numbers become
/// text ids. Null has no id.
pub fn property_to_id(value: &JsonValue) -> Option<FeatureId> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(FeatureId::text(s)),
        JsonValue::Number(n) => Some(match n.as_i64() {
            Some(i) => FeatureId::Integer(i),
            None => FeatureId::text(n.to_string()),
        }),
        other => Some(FeatureId::text(other.to_string())),
    }
}

fn position_to_coord(position: &[f64]) -> Coord<f64> {
    Coord {
        x: position.first().copied().unwrap_or(f64::NAN),
        y: position.get(1).copied().unwrap_or(f64::NAN),
    }
}

/// Convert GeoJSON coordinate array to LineString
fn coords_to_linestring(coords: &[Vec<f64>]) -> LineString<f64> {
    LineString::new(coords.iter().map(|c| position_to_coord(c)).collect())
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let Some(exterior) = rings.first() else {
        bail!("Polygon has no rings");
    };
    let interiors = rings.iter().skip(1).map(|r| coords_to_linestring(r)).collect();
    Ok(Polygon::new(coords_to_linestring(exterior), interiors))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"site": 7}, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
            {"type": "Feature", "properties": {"site": "p2"}, "geometry": {"type": "MultiPoint", "coordinates": [[3.0, 4.0]]}},
            {"type": "Feature", "properties": {"site": 1.5}, "geometry": null}
        ]
    }"#;

    #[test]
    fn test_parse_point_set() {
        let set = parse_point_set(POINTS, "a", "site", Crs::engineering()).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.id_field.as_ref(), "site");
        assert_eq!(set.features[0].id, FeatureId::Integer(7));
        assert_eq!(set.features[0].coord, Coord { x: 1.0, y: 2.0 });
        assert_eq!(set.features[1].id, FeatureId::text("p2"));
        assert_eq!(set.features[1].coord, Coord { x: 3.0, y: 4.0 });
        assert_eq!(set.features[2].id, FeatureId::text("1.5"));
        assert!(set.features[2].is_degenerate());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let err = parse_point_set(POINTS, "a", "name", Crs::engineering()).unwrap_err();
        assert!(err.to_string().contains("Feature 0"));
    }

    #[test]
    fn test_line_in_point_layer_is_rejected() {
        let content = r#"{"type": "Feature", "properties": {"id": 1},
            "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}"#;
        assert!(parse_point_set(content, "a", "id", Crs::engineering()).is_err());
    }

    #[test]
    fn test_property_to_id() {
        assert!(matches!(
            property_to_id(&serde_json::json!(3)),
            Some(FeatureId::Integer(3))
        ));
        // Text ids stay text, joining integers through their canonical form
        assert!(matches!(
            property_to_id(&serde_json::json!("3")),
            Some(FeatureId::Text(ref s)) if s.as_ref() == "3"
        ));
        assert!(matches!(
            property_to_id(&serde_json::json!(2.5)),
            Some(FeatureId::Text(ref s)) if s.as_ref() == "2.5"
        ));
        assert_eq!(property_to_id(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_reference_kinds() {
        let line = r#"{"type": "MultiLineString", "coordinates": [[[0, 0], [1, 0]], [[1, 0], [2, 0]]]}"#;
        let layer = parse_reference(line, "river", Crs::engineering()).unwrap();
        assert_eq!(layer.kind(), GeometryKind::Line);
        match layer.geometry {
            ReferenceGeometry::Line(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        let polygon = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let layer = parse_reference(polygon, "river", Crs::engineering()).unwrap();
        assert_eq!(layer.kind(), GeometryKind::Polygon);

        let point = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        let layer = parse_reference(point, "river", Crs::engineering()).unwrap();
        assert_eq!(layer.kind(), GeometryKind::Point);
    }

    #[test]
    fn test_mixed_reference_is_rejected() {
        let mixed = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": null, "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": null, "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 0]]}}
        ]}"#;
        assert!(parse_reference(mixed, "river", Crs::engineering()).is_err());
    }

    #[test]
    fn test_read_point_set_from_file() {
        let path = std::env::temp_dir()
            .join(format!("river-distance-points-{}.geojson", std::process::id()));
        std::fs::write(&path, POINTS).unwrap();

        let set = read_point_set(&path, "site", Crs::wgs84()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(set.len(), 3);
        assert!(set.name.starts_with("river-distance-points-"));
        assert!(set.crs.is_geographic());
    }
}
