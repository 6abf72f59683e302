// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::Mesh;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Signed volume in cubic units (positive for outward-facing meshes)
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Mean vertex position [x, y, z]
    pub centroid: [f64; 3],
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Directed edges without a reversed partner (or repeated)
    pub boundary_edges: usize,
    pub is_watertight: bool,
}

impl GeometryStats {
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            triangle_count: 0,
            boundary_edges: 0,
            is_watertight: false,
        }
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.bbox[3] - self.bbox[0],
            self.bbox[4] - self.bbox[1],
            self.bbox[5] - self.bbox[2],
        ]
    }
}

impl std::fmt::Display for GeometryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [sx, sy, sz] = self.size();
        write!(
            f,
            "{} vertices, {} triangles, volume {:.2} m³, area {:.2} m², size {:.2} × {:.2} × {:.2} m, watertight: {}",
            self.vertex_count,
            self.triangle_count,
            self.volume,
            self.surface_area,
            sx,
            sy,
            sz,
            if self.is_watertight { "yes" } else { "no" }
        )
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    let vertex_count = mesh.vertices.len();
    let triangle_count = mesh.triangles.len();

    if vertex_count == 0 || triangle_count == 0 {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    let boundary_edges = count_boundary_edges(mesh);

    GeometryStats {
        volume: mesh.signed_volume(),
        surface_area: calculate_surface_area(mesh),
        bbox: [
            bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z,
        ],
        centroid: calculate_centroid(mesh),
        vertex_count,
        triangle_count,
        boundary_edges,
        is_watertight: boundary_edges == 0,
    }
}

fn calculate_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles.iter().map(|t| mesh.triangle_area(t)).sum()
}

fn calculate_centroid(mesh: &Mesh) -> [f64; 3] {
    let sum = mesh
        .vertices
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, v| acc + v.position.coords);
    let mean = sum / mesh.vertices.len() as f64;
    [mean.x, mean.y, mean.z]
}

/// Count directed edges that break the closed-manifold rule: every directed
/// edge must appear exactly once and its reverse must appear exactly once.
pub fn count_boundary_edges(mesh: &Mesh) -> usize {
    let mut edge_count: AHashMap<(usize, usize), usize> =
        AHashMap::with_capacity(mesh.triangles.len() * 3);

    for triangle in &mesh.triangles {
        let indices = &triangle.indices;
        for i in 0..3 {
            *edge_count
                .entry((indices[i], indices[(i + 1) % 3]))
                .or_insert(0) += 1;
        }
    }

    edge_count
        .iter()
        .filter(|&(&(a, b), &count)| count != 1 || edge_count.get(&(b, a)) != Some(&1))
        .count()
}

/// A mesh is watertight when it has no boundary edges
pub fn is_watertight(mesh: &Mesh) -> bool {
    !mesh.triangles.is_empty() && count_boundary_edges(mesh) == 0
}
