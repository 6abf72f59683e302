// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline configuration

use crate::error::{PipelineError, PipelineResult};
use crate::io::ExportFormat;
use crate::projection::ProjectionMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Footprint normalization thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Minimum planar area in square coordinate units (m² for planar input)
    pub min_area: f64,
    /// Rings with more vertices than this are simplified
    pub simplify_vertex_threshold: usize,
    /// Douglas-Peucker tolerance in coordinate units
    pub simplify_tolerance: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_area: 10.0,
            simplify_vertex_threshold: 100,
            simplify_tolerance: 1.0,
        }
    }
}

/// Height heuristic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightOptions {
    pub default_height: f64,
    /// Lower clamp for explicit height tags
    pub min_height: f64,
    /// Upper clamp for explicit height tags
    pub max_height: f64,
    pub meters_per_level: f64,
    /// Building type (lowercase) to height in meters
    #[serde(deserialize_with = "lowercase_keys")]
    pub type_heights: BTreeMap<String, f64>,
}

/// Building tags are matched case-insensitively, so keys are stored trimmed
/// and lowercased.
fn lowercase_keys<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let table = BTreeMap::<String, f64>::deserialize(deserializer)?;
    Ok(table
        .into_iter()
        .map(|(ty, height)| (ty.trim().to_lowercase(), height))
        .collect())
}

impl Default for HeightOptions {
    fn default() -> Self {
        let mut type_heights = BTreeMap::new();
        for ty in ["house", "detached", "residential"] {
            type_heights.insert(ty.to_string(), 8.0);
        }
        for ty in ["apartments", "commercial", "retail"] {
            type_heights.insert(ty.to_string(), 25.0);
        }
        for ty in ["office", "tower"] {
            type_heights.insert(ty.to_string(), 45.0);
        }
        type_heights.insert("skyscraper".to_string(), 120.0);

        Self {
            default_height: 15.0,
            min_height: 3.0,
            max_height: 300.0,
            meters_per_level: 3.5,
            type_heights,
        }
    }
}

/// Mesh repair thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairOptions {
    /// Triangles with area at or below this are removed
    pub degenerate_area_epsilon: f64,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            degenerate_area_epsilon: 1e-9,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Formats produced by a run, in order
    pub formats: Vec<ExportFormat>,
    pub projection: ProjectionMode,
    /// Process footprints on the rayon pool
    pub parallel: bool,
    pub normalize: NormalizeOptions,
    pub height: HeightOptions,
    pub repair: RepairOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            formats: vec![ExportFormat::Stl],
            projection: ProjectionMode::Planar,
            parallel: true,
            normalize: NormalizeOptions::default(),
            height: HeightOptions::default(),
            repair: RepairOptions::default(),
        }
    }
}

impl PipelineOptions {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let options: PipelineOptions = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(options)
    }

    /// Load `footprint3d.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut options = if PathBuf::from("footprint3d.toml").exists() {
            Self::from_file("footprint3d.toml")?
        } else {
            Self::default()
        };
        options.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(options)
    }

    /// Apply `FOOTPRINT3D_*` overrides, reading each variable through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(min_area) = lookup("FOOTPRINT3D_MIN_AREA") {
            self.normalize.min_area = min_area
                .parse()
                .with_context(|| format!("Invalid FOOTPRINT3D_MIN_AREA: {min_area}"))?;
        }

        if let Some(height) = lookup("FOOTPRINT3D_DEFAULT_HEIGHT") {
            self.height.default_height = height
                .parse()
                .with_context(|| format!("Invalid FOOTPRINT3D_DEFAULT_HEIGHT: {height}"))?;
        }

        if let Some(formats) = lookup("FOOTPRINT3D_FORMATS") {
            self.formats = formats
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    ExportFormat::from_name(s)
                        .with_context(|| format!("Unknown export format in FOOTPRINT3D_FORMATS: {s}"))
                })
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(parallel) = lookup("FOOTPRINT3D_PARALLEL") {
            self.parallel = parallel
                .trim()
                .parse()
                .with_context(|| format!("Invalid FOOTPRINT3D_PARALLEL: {parallel}"))?;
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize options")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Reject option combinations the pipeline cannot honor
    pub fn validate(&self) -> PipelineResult<()> {
        let n = &self.normalize;
        if !(n.min_area.is_finite() && n.min_area >= 0.0) {
            return Err(PipelineError::Config(format!(
                "min_area must be a non-negative number, got {}",
                n.min_area
            )));
        }
        if !(n.simplify_tolerance.is_finite() && n.simplify_tolerance >= 0.0) {
            return Err(PipelineError::Config(format!(
                "simplify_tolerance must be a non-negative number, got {}",
                n.simplify_tolerance
            )));
        }

        let h = &self.height;
        for (name, value) in [
            ("default_height", h.default_height),
            ("min_height", h.min_height),
            ("max_height", h.max_height),
            ("meters_per_level", h.meters_per_level),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if h.min_height > h.max_height {
            return Err(PipelineError::Config(format!(
                "min_height {} exceeds max_height {}",
                h.min_height, h.max_height
            )));
        }
        if let Some((ty, value)) = h
            .type_heights
            .iter()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(PipelineError::Config(format!(
                "height for building type '{ty}' must be positive, got {value}"
            )));
        }
        if let Some(ty) = h
            .type_heights
            .keys()
            .find(|ty| ty.trim().to_lowercase() != **ty)
        {
            return Err(PipelineError::Config(format!(
                "building type '{ty}' must be trimmed and lowercase"
            )));
        }

        if !(self.repair.degenerate_area_epsilon.is_finite()
            && self.repair.degenerate_area_epsilon >= 0.0)
        {
            return Err(PipelineError::Config(
                "degenerate_area_epsilon must be non-negative".into(),
            ));
        }

        Ok(())
    }
}
