// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Binary STL writer

use super::{ExportError, ExportFormat};
use crate::geometry::Mesh;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

pub(crate) fn write(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    if u32::try_from(mesh.triangles.len()).is_err() {
        return Err(ExportError::CountOverflow {
            format: ExportFormat::Stl,
            what: "triangle",
            count: mesh.triangles.len(),
        });
    }

    let point = |i: usize| {
        let p = &mesh.vertices[i].position;
        StlVertex::new([p.x as f32, p.y as f32, p.z as f32])
    };

    let triangles: Vec<StlTriangle> = mesh
        .triangles
        .iter()
        .map(|tri| StlTriangle {
            normal: Normal::new([tri.normal.x as f32, tri.normal.y as f32, tri.normal.z as f32]),
            vertices: [point(tri.indices[0]), point(tri.indices[1]), point(tri.indices[2])],
        })
        .collect();

    let mut bytes = Vec::with_capacity(84 + 50 * triangles.len());
    stl_io::write_stl(&mut bytes, triangles.iter())
        .map_err(|e| ExportError::write(ExportFormat::Stl, e))?;
    Ok(bytes)
}
