use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use river_distance_core::prelude::*;
use std::path::Path;

/// Convert the axis to a single GeoJSON MultiLineString feature
fn axis_to_feature(axis: &LinearAxis) -> Feature {
    let lines: Vec<Vec<Vec<f64>>> = axis
        .geometry
        .0
        .iter()
        .map(|line| line.0.iter().map(|c| vec![c.x, c.y]).collect())
        .collect();

    let mut properties = serde_json::Map::new();
    properties.insert("origin".to_string(), serde_json::json!(axis.origin.to_string()));
    properties.insert("length".to_string(), serde_json::json!(axis.planar_length()));
    properties.insert("crs".to_string(), serde_json::json!(axis.crs.to_string()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::MultiLineString(lines))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn id_to_json(id: &FeatureId) -> serde_json::Value {
    match id {
        FeatureId::Integer(i) => serde_json::json!(i),
        FeatureId::Text(s) => serde_json::json!(s.as_ref()),
    }
}

/// Convert projected points to GeoJSON, keeping the source id field name
pub fn projected_to_geojson(set: &ProjectedPointSet, offset_field: &str) -> GeoJson {
    let features = set
        .points
        .iter()
        .map(|p| {
            let mut properties = serde_json::Map::new();
            properties.insert(set.id_field.to_string(), id_to_json(&p.id));
            properties.insert(offset_field.to_string(), serde_json::json!(p.offset));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![p.coord.x, p.coord.y]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::from(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn write_geojson(geojson: &GeoJson, output_path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(geojson)
        .context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

/// Write the river centre line (as single feature)
pub fn write_centerline_geojson(axis: &LinearAxis, output_path: &Path) -> Result<()> {
    log::info!(
        "Writing centre line ({} line strings) to {}",
        axis.geometry.0.len(),
        output_path.display()
    );

    let geojson = GeoJson::from(FeatureCollection {
        bbox: None,
        features: vec![axis_to_feature(axis)],
        foreign_members: None,
    });
    write_geojson(&geojson, output_path)
}

/// Write a finished result table as delimited text
pub fn write_table(
    table: &InMemoryTable,
    delimiter: u8,
    decimals: u32,
    output_path: &Path,
) -> Result<()> {
    let columns = table
        .columns
        .as_ref()
        .context("Result table has no header")?;
    log::info!("Writing {} rows to {}", table.rows.len(), output_path.display());

    let mut sink = DelimitedFile::create(output_path, delimiter, decimals)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    sink.write_header(columns)?;
    for row in &table.rows {
        sink.write_row(row)?;
    }
    sink.finish()?;
    Ok(())
}

/// Write projected points (each point as separate feature)
pub fn write_projected_geojson(
    set: &ProjectedPointSet,
    offset_field: &str,
    output_path: &Path,
) -> Result<()> {
    log::info!(
        "Writing {} projected points to {}",
        set.points.len(),
        output_path.display()
    );
    write_geojson(&projected_to_geojson(set, offset_field), output_path)
}
