// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and repair utilities

use super::BoundingBox;
use ahash::AHashSet;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Mesh vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }
}

/// Triangle defined by three vertex indices, wound counter-clockwise when
/// seen from outside, with its unit face normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
    pub normal: Vector3<f64>,
}

impl Triangle {
    /// New triangle with a zero normal; call [`Mesh::recompute_face_normals`]
    pub fn new(indices: [usize; 3]) -> Self {
        Self {
            indices,
            normal: Vector3::zeros(),
        }
    }

    fn flip(&mut self) {
        self.indices.swap(1, 2);
        self.normal = -self.normal;
    }

    /// Key that is equal for the same triangle regardless of which vertex the
    /// winding starts at
    fn rotation_key(&self) -> [usize; 3] {
        let [a, b, c] = self.indices;
        if a <= b && a <= c {
            [a, b, c]
        } else if b <= a && b <= c {
            [b, c, a]
        } else {
            [c, a, b]
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append another mesh, offsetting its indices past our vertices
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle {
                indices: [
                    triangle.indices[0] + offset,
                    triangle.indices[1] + offset,
                    triangle.indices[2] + offset,
                ],
                normal: triangle.normal,
            });
        }
    }

    /// Move every vertex by `offset`
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    fn corners(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        [
            self.vertices[triangle.indices[0]].position,
            self.vertices[triangle.indices[1]].position,
            self.vertices[triangle.indices[2]].position,
        ]
    }

    /// Area of a triangle whose indices are in bounds
    pub fn triangle_area(&self, triangle: &Triangle) -> f64 {
        let [v0, v1, v2] = self.corners(triangle);
        (v1 - v0).cross(&(v2 - v0)).norm() / 2.0
    }

    /// Signed volume enclosed by the mesh (positive when normals face out)
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [v0, v1, v2] = self.corners(t);
                v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0
            })
            .sum()
    }

    /// Remove triangles with repeated indices or area at or below `epsilon`.
    /// Returns the number of triangles removed
    pub fn remove_degenerate_triangles(&mut self, epsilon: f64) -> usize {
        let original_count = self.triangles.len();
        let vertex_count = self.vertices.len();

        let kept: Vec<Triangle> = self
            .triangles
            .iter()
            .filter(|t| {
                let [i0, i1, i2] = t.indices;
                i0 != i1
                    && i1 != i2
                    && i0 != i2
                    && t.indices.iter().all(|&i| i < vertex_count)
                    && self.triangle_area(t) > epsilon
            })
            .copied()
            .collect();

        self.triangles = kept;
        original_count - self.triangles.len()
    }

    /// Remove triangles that repeat an earlier triangle with the same winding.
    /// Returns the number of triangles removed
    pub fn remove_duplicate_triangles(&mut self) -> usize {
        let original_count = self.triangles.len();
        let mut seen: AHashSet<[usize; 3]> = AHashSet::with_capacity(original_count);
        self.triangles.retain(|t| seen.insert(t.rotation_key()));
        original_count - self.triangles.len()
    }

    /// Flip every connected component whose signed volume is negative so all
    /// of them face outward. Returns the number of components flipped
    pub fn orient_outward(&mut self) -> usize {
        let components = self.connected_components();
        let mut flipped = 0;

        for component in components {
            let volume: f64 = component
                .iter()
                .map(|&t| {
                    let [v0, v1, v2] = self.corners(&self.triangles[t]);
                    v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0
                })
                .sum();

            if volume < 0.0 {
                for &t in &component {
                    self.triangles[t].flip();
                }
                flipped += 1;
            }
        }

        flipped
    }

    /// Triangle indices grouped by shared vertices
    fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.vertices.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for triangle in &self.triangles {
            let root = find(&mut parent, triangle.indices[0]);
            for &i in &triangle.indices[1..] {
                let other = find(&mut parent, i);
                if other != root {
                    parent[other] = root;
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_root: ahash::AHashMap<usize, usize> = ahash::AHashMap::new();
        for (t, triangle) in self.triangles.iter().enumerate() {
            let root = find(&mut parent, triangle.indices[0]);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(t);
        }
        groups
    }

    /// Remove orphaned vertices (vertices not referenced by any triangle)
    /// Returns the number of vertices removed
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        if self.triangles.is_empty() {
            let removed = self.vertices.len();
            self.vertices.clear();
            return removed;
        }

        let mut used_vertices = vec![false; self.vertices.len()];
        for triangle in &self.triangles {
            for &i in &triangle.indices {
                used_vertices[i] = true;
            }
        }

        // old_index -> new_index
        let mut new_indices = vec![0; self.vertices.len()];
        let mut new_vertices = Vec::new();

        for (old_idx, &used) in used_vertices.iter().enumerate() {
            if used {
                new_indices[old_idx] = new_vertices.len();
                new_vertices.push(self.vertices[old_idx]);
            }
        }

        for triangle in &mut self.triangles {
            for i in &mut triangle.indices {
                *i = new_indices[*i];
            }
        }

        let removed = self.vertices.len() - new_vertices.len();
        self.vertices = new_vertices;
        removed
    }

    /// Recompute unit face normals from the winding
    pub fn recompute_face_normals(&mut self) {
        for t in 0..self.triangles.len() {
            let [v0, v1, v2] = self.corners(&self.triangles[t]);
            let normal = (v1 - v0).cross(&(v2 - v0));
            let length = normal.norm();
            self.triangles[t].normal = if length > 1e-12 {
                normal / length
            } else {
                Vector3::zeros()
            };
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit tetrahedron with outward winding
    fn tetrahedron() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ] {
            mesh.add_vertex(Vertex::new(p));
        }
        for indices in [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]] {
            mesh.add_triangle(Triangle::new(indices));
        }
        mesh.recompute_face_normals();
        mesh
    }

    #[test]
    fn test_signed_volume() {
        assert_relative_eq!(tetrahedron().signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_orient_outward_flips_inverted_component() {
        let mut mesh = tetrahedron();
        let mut inverted = tetrahedron();
        inverted.translate(&Vector3::new(5.0, 0.0, 0.0));
        for t in &mut inverted.triangles {
            t.flip();
        }
        mesh.merge(&inverted);

        assert_eq!(mesh.orient_outward(), 1);
        assert_relative_eq!(mesh.signed_volume(), 2.0 / 6.0, epsilon = 1e-12);
        assert_eq!(mesh.orient_outward(), 0);
    }

    #[test]
    fn test_remove_duplicate_triangles_ignores_rotation() {
        let mut mesh = tetrahedron();
        // Same winding as [0, 2, 1], then the reversed face
        mesh.add_triangle(Triangle::new([2, 1, 0]));
        mesh.add_triangle(Triangle::new([0, 1, 2]));
        assert_eq!(mesh.remove_duplicate_triangles(), 1);
        assert_eq!(mesh.triangle_count(), 5);
    }

    #[test]
    fn test_remove_degenerate_and_orphans() {
        let mut mesh = tetrahedron();
        mesh.add_vertex(Vertex::new(Point3::new(2.0, 0.0, 0.0)));
        mesh.add_triangle(Triangle::new([0, 1, 4]));
        mesh.add_triangle(Triangle::new([1, 1, 2]));

        assert_eq!(mesh.remove_degenerate_triangles(1e-9), 2);
        assert_eq!(mesh.remove_orphaned_vertices(), 1);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_face_normals_are_unit() {
        let mesh = tetrahedron();
        for t in &mesh.triangles {
            assert_relative_eq!(t.normal.norm(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(mesh.triangles[0].normal.z, -1.0, epsilon = 1e-12);
    }
}
