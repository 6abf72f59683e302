// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! footprint3d
//!
//! Turns 2-D building footprints into a single watertight 3-D mesh.
//! Each footprint gets a height from its tags, is validated and simplified,
//! extruded into a closed prism, merged with the rest of the batch and
//! exported as STL, OBJ or 3MF.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod io;
pub mod jobs;
pub mod pipeline;
pub mod projection;

pub use config::PipelineOptions;
pub use diagnostics::Diagnostics;
pub use error::{ErrorKind, ExtrusionError, PipelineError, PipelineResult};
pub use footprint::{
    Footprint, FootprintAttributes, FootprintGeometry, FootprintNormalizer, HeightEstimator,
    NormalizedFootprint,
};
pub use geometry::{GeometryStats, Mesh, MeshAssembler, Solid, SolidExtruder};
pub use io::{export, ExportArtifact, ExportError, ExportFormat};
pub use jobs::{JobId, JobQueue, JobStatus};
pub use pipeline::{Pipeline, PipelineOutput};
pub use projection::{LocalTangentPlane, ProjectionMode, Projector};

/// Main entry point: run `footprints` through the pipeline configured by
/// `options`
pub fn generate(
    footprints: &[Footprint],
    options: &PipelineOptions,
) -> PipelineResult<PipelineOutput> {
    Pipeline::new(options.clone())?.run(footprints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_single_building() {
        let footprint = Footprint::polygon(
            "way/1",
            polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
        );
        let output = generate(&[footprint], &PipelineOptions::default()).unwrap();

        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(output.artifacts[0].format(), ExportFormat::Stl);
        assert_eq!(output.artifacts[0].len(), 84 + 50 * 12);
        assert!(output.stats.is_watertight);
    }
}
