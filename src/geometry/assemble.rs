// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Combines extruded solids into one repaired, recentered mesh

use super::{Mesh, Solid};
use crate::config::RepairOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, PipelineResult};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct MeshAssembler {
    options: RepairOptions,
}

impl MeshAssembler {
    pub fn new(options: RepairOptions) -> Self {
        Self { options }
    }

    /// Concatenate `solids` in order, repair the result and center its
    /// bounding box on the origin.
    pub fn assemble(
        &self,
        solids: &[Solid],
        diagnostics: &mut Diagnostics,
    ) -> PipelineResult<Mesh> {
        if solids.is_empty() {
            return Err(PipelineError::EmptyMesh(
                "no footprint produced a solid".to_string(),
            ));
        }

        let vertex_count = solids.iter().map(|s| s.mesh.vertex_count()).sum();
        let triangle_count = solids.iter().map(|s| s.mesh.triangle_count()).sum();
        let mut mesh = Mesh::with_capacity(vertex_count, triangle_count);
        for solid in solids {
            mesh.merge(&solid.mesh);
        }

        self.repair(&mut mesh, diagnostics);

        if mesh.is_empty() {
            return Err(PipelineError::EmptyMesh(
                "mesh repair removed every triangle".to_string(),
            ));
        }

        let center = mesh.bounding_box().center();
        mesh.translate(&-center.coords);

        info!(
            solids = solids.len(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "assembled mesh"
        );
        Ok(mesh)
    }

    fn repair(&self, mesh: &mut Mesh, diagnostics: &mut Diagnostics) {
        let degenerate = mesh.remove_degenerate_triangles(self.options.degenerate_area_epsilon);
        let duplicates = mesh.remove_duplicate_triangles();
        let flipped = mesh.orient_outward();
        mesh.recompute_face_normals();
        let orphans = mesh.remove_orphaned_vertices();

        diagnostics.degenerate_triangles += degenerate;
        diagnostics.duplicate_triangles += duplicates;
        diagnostics.flipped_components += flipped;
        diagnostics.orphaned_vertices += orphans;

        debug!(degenerate, duplicates, flipped, orphans, "mesh repair");
    }
}
