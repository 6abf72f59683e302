// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar validity checks for footprint rings

use geo::algorithm::line_intersection::line_intersection;
use geo::{Contains, Coord, Line, LineString, Point, Polygon};

const EPS: f64 = 1e-12;

/// Ring coordinates without the closing duplicate
pub fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords = ring.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// Twice the signed area of an open ring (positive = counter-clockwise)
pub(crate) fn signed_area2(coords: &[Coord<f64>]) -> f64 {
    let n = coords.len();
    (0..n)
        .map(|i| {
            let a = coords[i];
            let b = coords[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

pub(crate) fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segments(coords: &[Coord<f64>]) -> Vec<Line<f64>> {
    let n = coords.len();
    (0..n)
        .map(|i| Line::new(coords[i], coords[(i + 1) % n]))
        .collect()
}

fn boxes_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    a.start.x.min(a.end.x) <= b.start.x.max(b.end.x)
        && b.start.x.min(b.end.x) <= a.start.x.max(a.end.x)
        && a.start.y.min(a.end.y) <= b.start.y.max(b.end.y)
        && b.start.y.min(b.end.y) <= a.start.y.max(a.end.y)
}

/// A ring is simple when it has at least three vertices, encloses area,
/// never folds back on itself and no two non-adjacent edges meet.
pub fn is_ring_simple(coords: &[Coord<f64>]) -> bool {
    let n = coords.len();
    if n < 3 {
        return false;
    }
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return false;
    }
    if signed_area2(coords).abs() <= EPS {
        return false;
    }

    // Zero-length edges and spikes
    for i in 0..n {
        let prev = coords[(i + n - 1) % n];
        let cur = coords[i];
        let next = coords[(i + 1) % n];
        if cur == next {
            return false;
        }
        let d1 = cur - prev;
        let d2 = next - cur;
        let dot = d1.x * d2.x + d1.y * d2.y;
        if cross(prev, cur, next).abs() <= EPS && dot < 0.0 {
            return false;
        }
    }

    let edges = segments(coords);
    for i in 0..n {
        for j in (i + 2)..n {
            // First and last edges share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if boxes_overlap(&edges[i], &edges[j])
                && line_intersection(edges[i], edges[j]).is_some()
            {
                return false;
            }
        }
    }

    true
}

pub(crate) fn rings_intersect(a: &[Coord<f64>], b: &[Coord<f64>]) -> bool {
    let edges_a = segments(a);
    let edges_b = segments(b);
    edges_a.iter().any(|ea| {
        edges_b
            .iter()
            .any(|eb| boxes_overlap(ea, eb) && line_intersection(*ea, *eb).is_some())
    })
}

/// Whether `hole` sits strictly inside `exterior` without touching it or
/// any ring in `others`, and without nesting with one of them.
pub(crate) fn hole_fits(exterior: &[Coord<f64>], others: &[Vec<Coord<f64>>], hole: &[Coord<f64>]) -> bool {
    if hole.is_empty() || rings_intersect(exterior, hole) {
        return false;
    }
    let shell = Polygon::new(LineString::from(exterior.to_vec()), Vec::new());
    if !shell.contains(&Point::from(hole[0])) {
        return false;
    }

    let hole_poly = Polygon::new(LineString::from(hole.to_vec()), Vec::new());
    others.iter().all(|other| {
        if other.is_empty() || rings_intersect(hole, other) {
            return false;
        }
        let other_poly = Polygon::new(LineString::from(other.clone()), Vec::new());
        !hole_poly.contains(&Point::from(other[0])) && !other_poly.contains(&Point::from(hole[0]))
    })
}

/// Full polygon validity: simple rings, holes strictly inside the exterior,
/// no two rings touching, no hole inside another hole.
pub fn is_polygon_valid(polygon: &Polygon<f64>) -> bool {
    let exterior = open_ring(polygon.exterior());
    if !is_ring_simple(&exterior) {
        return false;
    }

    let holes: Vec<Vec<Coord<f64>>> = polygon.interiors().iter().map(open_ring).collect();
    if holes.iter().any(|h| !is_ring_simple(h)) {
        return false;
    }

    holes
        .iter()
        .enumerate()
        .all(|(i, hole)| hole_fits(&exterior, &holes[i + 1..], hole))
}
