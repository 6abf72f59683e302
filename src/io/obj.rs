// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ writer

use super::{ExportError, ExportFormat};
use crate::geometry::Mesh;
use std::io::Write;

pub(crate) fn write(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let err = |e: std::io::Error| ExportError::write(ExportFormat::Obj, e);
    let mut out = Vec::with_capacity(mesh.vertices.len() * 32 + mesh.triangles.len() * 24);

    writeln!(out, "# footprint3d").map_err(err)?;
    writeln!(out, "o buildings").map_err(err)?;
    for vertex in &mesh.vertices {
        let p = &vertex.position;
        writeln!(out, "v {} {} {}", p.x, p.y, p.z).map_err(err)?;
    }
    // OBJ indices are 1-based
    for tri in &mesh.triangles {
        let [a, b, c] = tri.indices;
        writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1).map_err(err)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Triangle, Vertex};
    use nalgebra::Point3;

    #[test]
    fn test_one_based_faces() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::new(Point3::new(1.5, 0.0, 0.0)));
        mesh.add_vertex(Vertex::new(Point3::new(0.0, 1.0, -2.0)));
        mesh.add_triangle(Triangle::new([0, 1, 2]));

        let text = String::from_utf8(write(&mesh).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"v 1.5 0 0"));
        assert!(lines.contains(&"v 0 1 -2"));
        assert_eq!(lines.last(), Some(&"f 1 2 3"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("v ")).count(), 3);
    }
}
