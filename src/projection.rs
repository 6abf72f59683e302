// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Projection of geographic coordinates onto a local metric plane
//!
//! The pipeline works in meters. Footprints delivered in lon/lat degrees can
//! be projected onto a tangent plane around the batch centroid, which keeps
//! distortion negligible at city scale.

use crate::footprint::Footprint;
use geo::Coord;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG)
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// How a batch is brought into planar meters before normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Coordinates are already planar meters
    #[default]
    Planar,
    /// Coordinates are lon/lat degrees; always project
    LocalTangent,
    /// Project only when the batch looks like lon/lat degrees
    Auto,
}

/// Maps a coordinate into planar meters
pub trait Projector {
    fn project(&self, coord: Coord<f64>) -> Coord<f64>;

    /// Project every coordinate of a footprint
    fn project_footprint(&self, footprint: &Footprint) -> Footprint {
        footprint.map_coords(|c| self.project(c))
    }
}

/// Equirectangular projection around a reference lon/lat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTangentPlane {
    origin: Coord<f64>,
    cos_lat: f64,
}

impl LocalTangentPlane {
    /// Plane touching the globe at `origin` (x = longitude, y = latitude)
    pub fn new(origin: Coord<f64>) -> Self {
        Self {
            origin,
            cos_lat: origin.y.to_radians().cos(),
        }
    }

    /// Plane centred on the mean coordinate of the batch, or `None` when the
    /// batch has no coordinates
    pub fn centered_on(footprints: &[Footprint]) -> Option<Self> {
        let (sum, count) = coords(footprints).fold((Coord { x: 0.0, y: 0.0 }, 0usize), |(sum, n), c| {
            (sum + c, n + 1)
        });
        if count == 0 {
            return None;
        }
        Some(Self::new(sum / count as f64))
    }

    pub fn origin(&self) -> Coord<f64> {
        self.origin
    }
}

impl Projector for LocalTangentPlane {
    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.origin.x).to_radians() * EARTH_RADIUS * self.cos_lat,
            y: (coord.y - self.origin.y).to_radians() * EARTH_RADIUS,
        }
    }
}

fn coords(footprints: &[Footprint]) -> impl Iterator<Item = Coord<f64>> + '_ {
    footprints.iter().flat_map(|f| {
        f.geometry
            .parts()
            .into_iter()
            .flat_map(|p| {
                std::iter::once(p.exterior())
                    .chain(p.interiors())
                    .flat_map(|ring| ring.0.iter().copied())
            })
            .collect::<Vec<_>>()
    })
}

/// True when every coordinate is a plausible lon/lat pair and the whole
/// batch spans less than one unit in each direction. Metric city-scale data
/// almost never fits both conditions.
pub fn looks_geographic(footprints: &[Footprint]) -> bool {
    let mut min = Coord { x: f64::INFINITY, y: f64::INFINITY };
    let mut max = Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
    let mut any = false;

    for c in coords(footprints) {
        if !(c.x.abs() <= 180.0 && c.y.abs() <= 90.0) {
            return false;
        }
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
        any = true;
    }

    any && max.x - min.x < 1.0 && max.y - min.y < 1.0
}
