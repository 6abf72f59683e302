// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Footprint batch to exported mesh
//!
//! A run validates its options, optionally projects the batch, then
//! normalizes, estimates heights and extrudes every footprint (in parallel
//! on the rayon pool when enabled). Solids are collected in input order and
//! handed to the assembler and the exporters.

use crate::config::PipelineOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, PipelineResult};
use crate::footprint::{Footprint, FootprintNormalizer, HeightEstimator};
use crate::geometry::{analyze, GeometryStats, MeshAssembler, Solid, SolidExtruder};
use crate::io::{export_all, ExportArtifact};
use crate::projection::{looks_geographic, LocalTangentPlane, ProjectionMode, Projector};
use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One artifact per requested format, in request order
    pub artifacts: Vec<ExportArtifact>,
    pub diagnostics: Diagnostics,
    pub stats: GeometryStats,
}

impl PipelineOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            formats: self
                .artifacts
                .iter()
                .map(|a| a.format().to_string())
                .collect(),
            bytes: self.artifacts.iter().map(ExportArtifact::len).sum(),
            diagnostics: self.diagnostics.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Serializable report of a run, without the artifact bytes
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub formats: Vec<String>,
    pub bytes: usize,
    pub diagnostics: Diagnostics,
    pub stats: GeometryStats,
}

/// Configured footprint-to-mesh pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    normalizer: FootprintNormalizer,
    estimator: HeightEstimator,
    extruder: SolidExtruder,
    assembler: MeshAssembler,
}

impl Pipeline {
    /// Build a pipeline, rejecting inconsistent options
    pub fn new(options: PipelineOptions) -> PipelineResult<Self> {
        options.validate()?;
        Ok(Self {
            normalizer: FootprintNormalizer::new(options.normalize.clone()),
            estimator: HeightEstimator::new(options.height.clone()),
            extruder: SolidExtruder::new(),
            assembler: MeshAssembler::new(options.repair.clone()),
            options,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the whole batch
    pub fn run(&self, footprints: &[Footprint]) -> PipelineResult<PipelineOutput> {
        let started = Instant::now();

        if footprints.is_empty() {
            return Err(PipelineError::Input("footprint batch is empty".to_string()));
        }
        if self.options.formats.is_empty() {
            return Err(PipelineError::Input("no export format requested".to_string()));
        }

        let mut diagnostics = Diagnostics::new();
        diagnostics.footprints = footprints.len();
        info!(footprints = footprints.len(), "pipeline run started");

        let footprints = self.project(footprints, &mut diagnostics);

        let per_footprint: Vec<(Vec<Solid>, Diagnostics)> = if self.options.parallel {
            footprints
                .par_iter()
                .map(|footprint| self.build_solids(footprint))
                .collect()
        } else {
            footprints
                .iter()
                .map(|footprint| self.build_solids(footprint))
                .collect()
        };

        let mut solids = Vec::with_capacity(per_footprint.len());
        for (built, worker) in per_footprint {
            diagnostics.merge(&worker);
            solids.extend(built);
        }
        diagnostics.solids = solids.len();
        debug!(
            normalized = diagnostics.normalized,
            discarded = diagnostics.discarded(),
            extrusion_failures = diagnostics.extrusion_failures,
            "footprints processed"
        );

        let mesh = match self.assembler.assemble(&solids, &mut diagnostics) {
            Ok(mesh) => mesh,
            Err(err) => {
                warn!(%diagnostics, "no valid buildings");
                return Err(err);
            }
        };
        let stats = analyze(&mesh);

        let artifacts = export_all(&mesh, &self.options.formats)?;

        info!(
            %diagnostics,
            triangles = stats.triangle_count,
            artifacts = artifacts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run finished"
        );

        Ok(PipelineOutput {
            artifacts,
            diagnostics,
            stats,
        })
    }

    fn project<'a>(
        &self,
        footprints: &'a [Footprint],
        diagnostics: &mut Diagnostics,
    ) -> Cow<'a, [Footprint]> {
        let geographic = looks_geographic(footprints);
        diagnostics.geographic_input = geographic;

        let project = match self.options.projection {
            ProjectionMode::Planar => {
                if geographic {
                    warn!("input looks like lon/lat degrees but projection is planar");
                }
                false
            }
            ProjectionMode::LocalTangent => true,
            ProjectionMode::Auto => geographic,
        };

        if !project {
            return Cow::Borrowed(footprints);
        }

        match LocalTangentPlane::centered_on(footprints) {
            Some(plane) => {
                debug!(origin = ?plane.origin(), "projecting onto local tangent plane");
                Cow::Owned(
                    footprints
                        .iter()
                        .map(|f| plane.project_footprint(f))
                        .collect(),
                )
            }
            None => Cow::Borrowed(footprints),
        }
    }

    /// Normalize, estimate and extrude one footprint. Failures are counted
    /// and logged, never returned.
    fn build_solids(&self, footprint: &Footprint) -> (Vec<Solid>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let normalized = self.normalizer.normalize(footprint, &mut diagnostics);
        let height = self.estimator.estimate(&footprint.attributes);

        let mut solids = Vec::with_capacity(normalized.len());
        for part in &normalized {
            match self.extruder.extrude(&part.id, &part.polygon, height) {
                Ok(solid) => solids.push(solid),
                Err(err) => {
                    diagnostics.extrusion_failures += 1;
                    warn!(id = %part.id, error = %err, "skipping footprint that failed to extrude");
                }
            }
        }

        (solids, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::FootprintAttributes;
    use crate::io::ExportFormat;
    use geo::polygon;

    fn rect(id: &str, x: f64, w: f64, h: f64) -> Footprint {
        Footprint::polygon(
            id,
            polygon![(x: x, y: 0.0), (x: x + w, y: 0.0), (x: x + w, y: h), (x: x, y: h)],
        )
    }

    #[test]
    fn test_empty_batch_and_formats() {
        let pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        assert!(matches!(pipeline.run(&[]), Err(PipelineError::Input(_))));

        let options = PipelineOptions {
            formats: Vec::new(),
            ..Default::default()
        };
        let pipeline = Pipeline::new(options).unwrap();
        assert!(matches!(
            pipeline.run(&[rect("a", 0.0, 10.0, 10.0)]),
            Err(PipelineError::Input(_))
        ));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut options = PipelineOptions::default();
        options.height.meters_per_level = 0.0;
        assert!(matches!(Pipeline::new(options), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let batch: Vec<Footprint> = (0..8)
            .map(|i| {
                rect(&i.to_string(), i as f64 * 20.0, 10.0, 5.0 + i as f64)
                    .with_attributes(FootprintAttributes::default().with_levels(format!("{}", i + 1)))
            })
            .collect();

        let run = |parallel: bool| {
            let options = PipelineOptions {
                parallel,
                formats: vec![ExportFormat::Obj],
                ..Default::default()
            };
            Pipeline::new(options).unwrap().run(&batch).unwrap()
        };

        let sequential = run(false);
        let parallel = run(true);
        assert_eq!(sequential.artifacts, parallel.artifacts);
        assert_eq!(sequential.diagnostics, parallel.diagnostics);
        assert_eq!(sequential.diagnostics.solids, 8);
    }

    #[test]
    fn test_auto_projection_of_degrees() {
        // Roughly 22 m × 22 m near the equator
        let degrees = Footprint::polygon(
            "geo",
            polygon![(x: 0.0, y: 0.0), (x: 0.0002, y: 0.0), (x: 0.0002, y: 0.0002), (x: 0.0, y: 0.0002)],
        );

        let planar = Pipeline::new(PipelineOptions::default()).unwrap();
        let err = planar.run(std::slice::from_ref(&degrees)).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyMesh(_)));

        let options = PipelineOptions {
            projection: ProjectionMode::Auto,
            ..Default::default()
        };
        let output = Pipeline::new(options).unwrap().run(&[degrees]).unwrap();
        assert!(output.diagnostics.geographic_input);
        let [sx, sy, sz] = output.stats.size();
        assert!((sx - 22.24).abs() < 0.05);
        assert!((sy - 22.24).abs() < 0.05);
        assert!((sz - 15.0).abs() < 1e-9);
    }
}
