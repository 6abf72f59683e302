// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Building footprints - input records, height heuristics and normalization

pub mod geojson;
mod height;
mod normalize;
mod validity;

pub use height::HeightEstimator;
pub use normalize::FootprintNormalizer;
pub use validity::{is_polygon_valid, is_ring_simple, open_ring};

use geo::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// Tag values that drive the height heuristic, exactly as they arrived
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintAttributes {
    /// Raw `height` tag, e.g. `"12.5 m"`
    pub height: Option<String>,
    /// Raw `building:levels` tag
    pub levels: Option<String>,
    /// `building` type tag, e.g. `"apartments"`
    pub building: Option<String>,
}

impl FootprintAttributes {
    pub fn with_height(mut self, height: impl Into<String>) -> Self {
        self.height = Some(height.into());
        self
    }

    pub fn with_levels(mut self, levels: impl Into<String>) -> Self {
        self.levels = Some(levels.into());
        self
    }

    pub fn with_building(mut self, building: impl Into<String>) -> Self {
        self.building = Some(building.into());
        self
    }
}

/// Footprint geometry as delivered by the data source
#[derive(Debug, Clone, PartialEq)]
pub enum FootprintGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    /// Null or non-areal geometry
    Empty,
}

impl FootprintGeometry {
    /// Independent polygon parts
    pub fn parts(&self) -> Vec<&Polygon<f64>> {
        match self {
            FootprintGeometry::Polygon(p) => vec![p],
            FootprintGeometry::MultiPolygon(mp) => mp.0.iter().collect(),
            FootprintGeometry::Empty => Vec::new(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, FootprintGeometry::MultiPolygon(_))
    }
}

/// A raw building footprint
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub id: String,
    pub geometry: FootprintGeometry,
    pub attributes: FootprintAttributes,
}

impl Footprint {
    pub fn new(id: impl Into<String>, geometry: FootprintGeometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            attributes: FootprintAttributes::default(),
        }
    }

    pub fn polygon(id: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::new(id, FootprintGeometry::Polygon(polygon))
    }

    pub fn with_attributes(mut self, attributes: FootprintAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Apply `f` to every coordinate, producing a new footprint
    pub fn map_coords(&self, f: impl Fn(geo::Coord<f64>) -> geo::Coord<f64> + Copy) -> Self {
        use geo::MapCoords;

        let geometry = match &self.geometry {
            FootprintGeometry::Polygon(p) => FootprintGeometry::Polygon(p.map_coords(f)),
            FootprintGeometry::MultiPolygon(mp) => {
                FootprintGeometry::MultiPolygon(mp.map_coords(f))
            }
            FootprintGeometry::Empty => FootprintGeometry::Empty,
        };

        Self {
            id: self.id.clone(),
            geometry,
            attributes: self.attributes.clone(),
        }
    }
}

/// A single valid polygon ready for extrusion
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFootprint {
    /// Parent id, or `"{parent}/{part}"` for parts of a multi-polygon
    pub id: String,
    /// Counter-clockwise exterior, clockwise holes, rings closed
    pub polygon: Polygon<f64>,
    pub attributes: FootprintAttributes,
    /// Planar area in square coordinate units
    pub area: f64,
}
