// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Prism extrusion of footprint polygons
//!
//! Vertex layout of an extruded solid: the ring vertices (exterior first,
//! then each hole) at z = 0 occupy `0..n`, and the same vertices at
//! z = height occupy `n..2n`. Caps are triangulated once and reused for both
//! levels, so every wall edge has exactly one cap partner.

use super::analytics::count_boundary_edges;
use super::{Mesh, Triangle, Vertex};
use crate::error::ExtrusionError;
use crate::footprint::open_ring;
use ahash::{AHashMap, AHashSet};
use geo::{Coord, Polygon};
use nalgebra::Point3;
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::VecDeque;

/// A closed prism built from one normalized footprint
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub footprint_id: String,
    pub height: f64,
    pub mesh: Mesh,
}

/// Extrudes planar polygons into closed solids
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidExtruder;

impl SolidExtruder {
    pub fn new() -> Self {
        Self
    }

    /// Build a watertight, outward-facing prism of `height` over `polygon`.
    ///
    /// The polygon must be valid with a counter-clockwise exterior and
    /// clockwise holes.
    pub fn extrude(
        &self,
        footprint_id: &str,
        polygon: &Polygon<f64>,
        height: f64,
    ) -> Result<Solid, ExtrusionError> {
        if !(height.is_finite() && height > 0.0) {
            return Err(ExtrusionError::InvalidHeight(height));
        }

        let rings: Vec<Vec<Coord<f64>>> = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(open_ring)
            .collect();
        for (ring, coords) in rings.iter().enumerate() {
            if coords.len() < 3 {
                return Err(ExtrusionError::TooFewVertices {
                    ring,
                    count: coords.len(),
                });
            }
        }

        let outline: Vec<Coord<f64>> = rings.iter().flatten().copied().collect();
        let n = outline.len();
        let cap = triangulate_cap(&rings)?;
        if cap.is_empty() {
            return Err(ExtrusionError::NoTriangles);
        }

        let wall_count: usize = rings.iter().map(Vec::len).sum::<usize>() * 2;
        let mut mesh = Mesh::with_capacity(2 * n, cap.len() * 2 + wall_count);
        for z in [0.0, height] {
            for c in &outline {
                mesh.add_vertex(Vertex::new(Point3::new(c.x, c.y, z)));
            }
        }

        for &[a, b, c] in &cap {
            mesh.add_triangle(Triangle::new([n + a, n + b, n + c]));
            mesh.add_triangle(Triangle::new([a, c, b]));
        }

        let mut start = 0;
        for ring in &rings {
            let len = ring.len();
            for i in 0..len {
                let a = start + i;
                let b = start + (i + 1) % len;
                mesh.add_triangle(Triangle::new([a, b, n + b]));
                mesh.add_triangle(Triangle::new([a, n + b, n + a]));
            }
            start += len;
        }

        mesh.recompute_face_normals();

        let boundary_edges = count_boundary_edges(&mesh);
        if boundary_edges > 0 {
            return Err(ExtrusionError::NotWatertight { boundary_edges });
        }
        let volume = mesh.signed_volume();
        if !(volume > 0.0) {
            return Err(ExtrusionError::NonPositiveVolume(volume));
        }

        Ok(Solid {
            footprint_id: footprint_id.to_string(),
            height,
            mesh,
        })
    }
}

/// Constrained Delaunay triangulation of the polygon interior. Returned
/// indices refer to the concatenated ring vertices; triangles are
/// counter-clockwise.
fn triangulate_cap(rings: &[Vec<Coord<f64>>]) -> Result<Vec<[usize; 3]>, ExtrusionError> {
    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    // spade vertex index -> outline index
    let mut outline_index: AHashMap<usize, usize> = AHashMap::new();

    let mut next = 0;
    for ring in rings {
        let mut handles = Vec::with_capacity(ring.len());
        for c in ring {
            let handle = cdt
                .insert(Point2::new(c.x, c.y))
                .map_err(|e| ExtrusionError::Triangulation(format!("CDT insert: {e:?}")))?;
            if outline_index.insert(handle.index(), next).is_some() {
                return Err(ExtrusionError::DuplicateVertex { x: c.x, y: c.y });
            }
            handles.push(handle);
            next += 1;
        }

        for i in 0..handles.len() {
            let from = handles[i];
            let to = handles[(i + 1) % handles.len()];
            if !cdt.can_add_constraint(from, to) {
                return Err(ExtrusionError::Triangulation(
                    "ring edges cross each other".to_string(),
                ));
            }
            cdt.add_constraint(from, to);
        }
    }

    let interior = classify_interior_faces(&cdt);
    let mut triangles = Vec::with_capacity(interior.len());

    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let mut tri = [0usize; 3];
        for (slot, vertex) in tri.iter_mut().zip(face.vertices()) {
            *slot = *outline_index.get(&vertex.fix().index()).ok_or_else(|| {
                ExtrusionError::Triangulation("triangulation introduced a new vertex".to_string())
            })?;
        }
        triangles.push(tri);
    }

    Ok(triangles)
}

/// Flood fill from the outer face; crossing a constraint edge toggles
/// inside/outside, odd depth is interior.
fn classify_interior_faces(cdt: &ConstrainedDelaunayTriangulation<Point2<f64>>) -> AHashSet<usize> {
    let mut interior = AHashSet::new();
    let mut depth_map: AHashMap<usize, u32> = AHashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let idx = neighbor.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((neighbor.fix(), depth));
            }
        }
    }

    interior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::analytics::analyze;
    use approx::assert_relative_eq;
    use geo::algorithm::orient::{Direction, Orient};
    use geo::polygon;

    fn square(size: f64) -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: size, y: 0.0), (x: size, y: size), (x: 0.0, y: size)]
    }

    #[test]
    fn test_box_extrusion() {
        let solid = SolidExtruder::new().extrude("a", &square(10.0), 15.0).unwrap();
        let stats = analyze(&solid.mesh);

        assert_eq!(solid.footprint_id, "a");
        assert_eq!(stats.vertex_count, 8);
        // 2 per cap, 2 per wall
        assert_eq!(stats.triangle_count, 12);
        assert!(stats.is_watertight);
        assert_relative_eq!(stats.volume, 1500.0, epsilon = 1e-6);
        assert_relative_eq!(stats.bbox[5], 15.0);
    }

    #[test]
    fn test_extrusion_with_hole() {
        let courtyard = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 20.0), (x: 0.0, y: 20.0)],
            interiors: [[(x: 5.0, y: 5.0), (x: 15.0, y: 5.0), (x: 15.0, y: 15.0), (x: 5.0, y: 15.0)]]
        )
        .orient(Direction::Default);

        let solid = SolidExtruder::new().extrude("c", &courtyard, 10.0).unwrap();
        let stats = analyze(&solid.mesh);

        assert!(stats.is_watertight);
        assert_relative_eq!(stats.volume, 300.0 * 10.0, epsilon = 1e-6);
        // 8 cap triangles per level, 2 per wall segment
        assert_eq!(stats.triangle_count, 8 * 2 + 8 * 2);
    }

    #[test]
    fn test_l_shape_caps_stay_inside() {
        let l_shape = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 4.0),
            (x: 4.0, y: 4.0),
            (x: 4.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        let solid = SolidExtruder::new().extrude("l", &l_shape, 3.0).unwrap();
        let stats = analyze(&solid.mesh);
        assert!(stats.is_watertight);
        assert_relative_eq!(stats.volume, 64.0 * 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normals_face_outward() {
        let solid = SolidExtruder::new().extrude("n", &square(4.0), 2.0).unwrap();
        let mesh = &solid.mesh;
        for t in &mesh.triangles {
            let centroid = t
                .indices
                .iter()
                .fold(nalgebra::Vector3::zeros(), |acc, &i| acc + mesh.vertices[i].position.coords)
                / 3.0;
            let from_center = centroid - nalgebra::Vector3::new(2.0, 2.0, 1.0);
            assert!(t.normal.dot(&from_center) > 0.0);
        }
    }

    #[test]
    fn test_invalid_height() {
        let extruder = SolidExtruder::new();
        assert_eq!(
            extruder.extrude("h", &square(4.0), 0.0),
            Err(ExtrusionError::InvalidHeight(0.0))
        );
        assert!(matches!(
            extruder.extrude("h", &square(4.0), f64::NAN),
            Err(ExtrusionError::InvalidHeight(_))
        ));
    }

    #[test]
    fn test_too_few_vertices() {
        let sliver = Polygon::new(vec![(0.0, 0.0), (1.0, 0.0)].into(), Vec::new());
        assert!(matches!(
            SolidExtruder::new().extrude("s", &sliver, 5.0),
            Err(ExtrusionError::TooFewVertices { ring: 0, .. })
        ));
    }

    #[test]
    fn test_clockwise_input_is_rejected() {
        let cw = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 4.0), (x: 4.0, y: 4.0), (x: 4.0, y: 0.0)];
        assert!(matches!(
            SolidExtruder::new().extrude("cw", &cw, 5.0),
            Err(ExtrusionError::NotWatertight { .. })
        ));
    }
}
