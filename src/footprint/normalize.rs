// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Footprint validation, repair, simplification and area filtering

use super::validity::{
    cross, hole_fits, is_polygon_valid, is_ring_simple, open_ring, rings_intersect,
};
use super::{Footprint, FootprintGeometry, NormalizedFootprint};
use crate::config::NormalizeOptions;
use crate::diagnostics::Diagnostics;
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Contains, Coord, LineString, Point, Polygon, Simplify};
use tracing::{debug, warn};

/// Turns raw footprints into valid, simplified, area-filtered polygons
#[derive(Debug, Clone)]
pub struct FootprintNormalizer {
    options: NormalizeOptions,
}

impl FootprintNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalize every part of `footprint`. Parts that cannot be used are
    /// counted in `diagnostics` and left out; this never fails.
    pub fn normalize(
        &self,
        footprint: &Footprint,
        diagnostics: &mut Diagnostics,
    ) -> Vec<NormalizedFootprint> {
        let parts = footprint.geometry.parts();
        if parts.is_empty() {
            diagnostics.empty += 1;
            debug!(id = %footprint.id, "footprint has no geometry");
            return Vec::new();
        }

        let multi = footprint.geometry.is_multi();
        let mut normalized = Vec::with_capacity(parts.len());

        for (index, part) in parts.into_iter().enumerate() {
            diagnostics.parts += 1;
            let id = if multi {
                format!("{}/{}", footprint.id, index)
            } else {
                footprint.id.clone()
            };

            if let Some((polygon, area)) = self.normalize_part(&id, part, diagnostics) {
                diagnostics.normalized += 1;
                normalized.push(NormalizedFootprint {
                    id,
                    polygon,
                    attributes: footprint.attributes.clone(),
                    area,
                });
            }
        }

        normalized
    }

    fn normalize_part(
        &self,
        id: &str,
        part: &Polygon<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Option<(Polygon<f64>, f64)> {
        if part.exterior().0.is_empty() {
            diagnostics.empty += 1;
            debug!(id, "empty polygon part");
            return None;
        }

        let all_finite = std::iter::once(part.exterior())
            .chain(part.interiors())
            .flat_map(|ring| ring.0.iter())
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !all_finite || open_ring(part.exterior()).len() < 3 {
            diagnostics.malformed += 1;
            debug!(id, "malformed polygon part");
            return None;
        }

        let polygon = if is_polygon_valid(part) {
            part.clone()
        } else {
            match repair_polygon(part).filter(is_polygon_valid) {
                Some(repaired) => {
                    diagnostics.repaired += 1;
                    debug!(id, "repaired invalid footprint");
                    repaired
                }
                None => {
                    diagnostics.unrepairable += 1;
                    warn!(id, "discarding footprint that remains invalid after repair");
                    return None;
                }
            }
        };

        let polygon = self.simplify(id, polygon, diagnostics)?;
        let polygon = polygon.orient(Direction::Default);

        let area = polygon.unsigned_area();
        if area < self.options.min_area {
            diagnostics.below_min_area += 1;
            debug!(id, area, min_area = self.options.min_area, "footprint below minimum area");
            return None;
        }

        Some((polygon, area))
    }

    /// Simplify rings above the vertex threshold. A simplified ring that is
    /// no longer valid is dropped on its own; dropping the exterior drops the
    /// part.
    fn simplify(
        &self,
        id: &str,
        polygon: Polygon<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Option<Polygon<f64>> {
        let threshold = self.options.simplify_vertex_threshold;
        let tolerance = self.options.simplify_tolerance;
        let needs_simplify = |ring: &LineString<f64>| open_ring(ring).len() > threshold;

        if !needs_simplify(polygon.exterior()) && !polygon.interiors().iter().any(needs_simplify) {
            return Some(polygon);
        }

        let (exterior, interiors) = polygon.into_inner();

        let exterior = if needs_simplify(&exterior) {
            diagnostics.simplified_rings += 1;
            let simplified = exterior.simplify(&tolerance);
            if !is_ring_simple(&open_ring(&simplified)) {
                diagnostics.simplification_rejected += 1;
                warn!(id, "simplification broke the exterior ring");
                return None;
            }
            simplified
        } else {
            exterior
        };
        let shell = open_ring(&exterior);

        // Untouched holes were valid together, so they go first and only
        // have to fit the (possibly simplified) exterior.
        let (untouched, to_simplify): (Vec<_>, Vec<_>) =
            interiors.into_iter().partition(|hole| !needs_simplify(hole));

        let mut kept: Vec<Vec<Coord<f64>>> = Vec::with_capacity(untouched.len() + to_simplify.len());
        for hole in &untouched {
            let coords = open_ring(hole);
            if !hole_fits(&shell, &kept, &coords) {
                diagnostics.simplification_rejected += 1;
                warn!(id, "simplified exterior no longer contains its holes");
                return None;
            }
            kept.push(coords);
        }

        for hole in to_simplify {
            diagnostics.simplified_rings += 1;
            let coords = open_ring(&hole.simplify(&tolerance));
            if is_ring_simple(&coords) && hole_fits(&shell, &kept, &coords) {
                kept.push(coords);
            } else {
                diagnostics.simplification_rejected += 1;
                debug!(id, "dropping hole broken by simplification");
            }
        }

        let simplified = Polygon::new(exterior, kept.into_iter().map(LineString::from).collect());
        if is_polygon_valid(&simplified) {
            Some(simplified)
        } else {
            diagnostics.simplification_rejected += 1;
            warn!(id, "simplified footprint is no longer valid");
            None
        }
    }
}

impl Default for FootprintNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

/// Single repair pass: drop repeated, collinear and spike vertices from every
/// ring, then drop holes that collapsed or escaped the exterior.
fn repair_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clean_ring(&open_ring(polygon.exterior()))?;
    if !is_ring_simple(&exterior) {
        return None;
    }

    let shell = Polygon::new(LineString::from(exterior.clone()), Vec::new());
    let holes = polygon
        .interiors()
        .iter()
        .filter_map(|ring| clean_ring(&open_ring(ring)))
        .filter(|hole| {
            is_ring_simple(hole)
                && !rings_intersect(&exterior, hole)
                && shell.contains(&Point::from(hole[0]))
        })
        .map(LineString::from)
        .collect();

    Some(Polygon::new(LineString::from(exterior), holes))
}

fn clean_ring(coords: &[Coord<f64>]) -> Option<Vec<Coord<f64>>> {
    let mut ring = coords.to_vec();
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    loop {
        let n = ring.len();
        if n < 3 {
            return None;
        }
        let collinear = (0..n).find(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let scale = (cur.x - prev.x).hypot(cur.y - prev.y) * (next.x - cur.x).hypot(next.y - cur.y);
            cross(prev, cur, next).abs() <= 1e-10 * scale
        });
        match collinear {
            Some(i) => {
                ring.remove(i);
            }
            None => break,
        }
    }

    Some(ring)
}
