// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GeoJSON FeatureCollection reader
//!
//! Only the structure is checked here. Geometric validity is the
//! normalizer's job, so a feature with a broken polygon still produces a
//! footprint (and a null or non-areal geometry becomes `Empty`).

use super::{Footprint, FootprintAttributes, FootprintGeometry};
use crate::error::{PipelineError, PipelineResult};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use tracing::debug;

/// Parse a FeatureCollection document
pub fn parse_feature_collection(text: &str) -> PipelineResult<Vec<Footprint>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PipelineError::Input(format!("invalid GeoJSON: {}", e)))?;
    from_value(&value)
}

/// Convert an already-parsed FeatureCollection
pub fn from_value(value: &Value) -> PipelineResult<Vec<Footprint>> {
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(PipelineError::Input(
            "expected a GeoJSON FeatureCollection".to_string(),
        ));
    }

    let features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Input("FeatureCollection has no features array".to_string()))?;
    if features.is_empty() {
        return Err(PipelineError::Input("FeatureCollection is empty".to_string()));
    }

    features
        .iter()
        .enumerate()
        .map(|(index, feature)| parse_feature(index, feature))
        .collect()
}

fn parse_feature(index: usize, feature: &Value) -> PipelineResult<Footprint> {
    if !feature.is_object() {
        return Err(PipelineError::Input(format!("feature {} is not an object", index)));
    }

    let properties = feature.get("properties").filter(|p| p.is_object());
    let id = feature
        .get("id")
        .and_then(scalar_to_string)
        .or_else(|| properties.and_then(|p| p.get("@id")).and_then(scalar_to_string))
        .or_else(|| properties.and_then(|p| p.get("osm_id")).and_then(scalar_to_string))
        .unwrap_or_else(|| index.to_string());

    let attributes = properties
        .map(|p| FootprintAttributes {
            height: p.get("height").and_then(scalar_to_string),
            levels: p.get("building:levels").and_then(scalar_to_string),
            building: p.get("building").and_then(scalar_to_string),
        })
        .unwrap_or_default();

    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => FootprintGeometry::Empty,
        Some(geometry) => parse_geometry(geometry)
            .map_err(|msg| PipelineError::Input(format!("feature {}: {}", id, msg)))?,
    };

    Ok(Footprint {
        id,
        geometry,
        attributes,
    })
}

fn parse_geometry(geometry: &Value) -> Result<FootprintGeometry, String> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry has no type")?;
    let coordinates = geometry.get("coordinates");

    match kind {
        "Polygon" => {
            let rings = coordinates.ok_or("Polygon has no coordinates")?;
            Ok(parse_polygon(rings)?
                .map(FootprintGeometry::Polygon)
                .unwrap_or(FootprintGeometry::Empty))
        }
        "MultiPolygon" => {
            let parts = coordinates
                .and_then(Value::as_array)
                .ok_or("MultiPolygon coordinates must be an array")?;
            let mut polygons = Vec::with_capacity(parts.len());
            for part in parts {
                if let Some(polygon) = parse_polygon(part)? {
                    polygons.push(polygon);
                }
            }
            if polygons.is_empty() {
                Ok(FootprintGeometry::Empty)
            } else {
                Ok(FootprintGeometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
        }
        other => {
            debug!(kind = other, "ignoring non-polygonal geometry");
            Ok(FootprintGeometry::Empty)
        }
    }
}

/// `None` for a polygon with no rings at all
fn parse_polygon(value: &Value) -> Result<Option<Polygon<f64>>, String> {
    let rings = value.as_array().ok_or("polygon rings must be an array")?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => return Ok(None),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Polygon::new(exterior, interiors)))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>, String> {
    let positions = value.as_array().ok_or("ring must be an array of positions")?;
    positions
        .iter()
        .map(|position| {
            let xy = position
                .as_array()
                .filter(|p| p.len() >= 2)
                .ok_or("position must have at least two numbers")?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err("position must have at least two numbers".to_string()),
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
