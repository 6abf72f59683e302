// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-run diagnostic counters
//!
//! Every stage receives a `&mut Diagnostics` and records what it dropped or
//! fixed. Parallel workers each fill their own instance, which are merged in
//! footprint order afterwards.

use serde::{Deserialize, Serialize};

/// Counters collected while running the pipeline on one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Footprint records received
    pub footprints: usize,
    /// Polygon parts examined by the normalizer
    pub parts: usize,
    /// Null or empty geometry
    pub empty: usize,
    /// Non-finite coordinates or too few vertices to form a ring
    pub malformed: usize,
    /// Invalid parts made valid by the repair pass
    pub repaired: usize,
    /// Invalid parts the repair pass could not fix
    pub unrepairable: usize,
    /// Rings run through simplification
    pub simplified_rings: usize,
    /// Rings (or whole parts) rejected because simplification broke them
    pub simplification_rejected: usize,
    /// Parts below the minimum area
    pub below_min_area: usize,
    /// Parts that passed normalization
    pub normalized: usize,
    /// Footprints whose extrusion failed
    pub extrusion_failures: usize,
    /// Solids handed to the assembler
    pub solids: usize,
    /// Triangles dropped as degenerate during repair
    pub degenerate_triangles: usize,
    /// Triangles dropped as exact duplicates during repair
    pub duplicate_triangles: usize,
    /// Connected components flipped to face outward
    pub flipped_components: usize,
    /// Vertices no longer referenced after repair
    pub orphaned_vertices: usize,
    /// Input coordinates looked like degrees rather than meters
    pub geographic_input: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another worker's counters into this one
    pub fn merge(&mut self, other: &Diagnostics) {
        self.footprints += other.footprints;
        self.parts += other.parts;
        self.empty += other.empty;
        self.malformed += other.malformed;
        self.repaired += other.repaired;
        self.unrepairable += other.unrepairable;
        self.simplified_rings += other.simplified_rings;
        self.simplification_rejected += other.simplification_rejected;
        self.below_min_area += other.below_min_area;
        self.normalized += other.normalized;
        self.extrusion_failures += other.extrusion_failures;
        self.solids += other.solids;
        self.degenerate_triangles += other.degenerate_triangles;
        self.duplicate_triangles += other.duplicate_triangles;
        self.flipped_components += other.flipped_components;
        self.orphaned_vertices += other.orphaned_vertices;
        self.geographic_input |= other.geographic_input;
    }

    /// Parts dropped by the normalizer for any reason
    pub fn discarded(&self) -> usize {
        self.empty
            + self.malformed
            + self.unrepairable
            + self.simplification_rejected
            + self.below_min_area
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} footprints, {} parts ({} normalized, {} discarded, {} repaired), {} solids ({} extrusion failures)",
            self.footprints,
            self.parts,
            self.normalized,
            self.discarded(),
            self.repaired,
            self.solids,
            self.extrusion_failures
        )
    }
}
