// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Export formats, artifacts and dispatch

use super::{export_3mf, obj, stl};
use crate::geometry::Mesh;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Output file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "stl")]
    Stl,
    #[serde(rename = "obj")]
    Obj,
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Stl, ExportFormat::Obj, ExportFormat::ThreeMf];

    /// Parse a case-insensitive format name, with or without a leading dot
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "stl" => Some(ExportFormat::Stl),
            "obj" => Some(ExportFormat::Obj),
            "3mf" => Some(ExportFormat::ThreeMf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::Obj => "obj",
            ExportFormat::ThreeMf => "3mf",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Stl => "model/stl",
            ExportFormat::Obj => "model/obj",
            ExportFormat::ThreeMf => "model/3mf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Failure while serializing a mesh. Never partially recovered.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        format: ExportFormat,
        triangle: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("{what} count {count} does not fit the {format} format")]
    CountOverflow {
        format: ExportFormat,
        what: &'static str,
        count: usize,
    },

    #[error("{format} write failed: {message}")]
    Write {
        format: ExportFormat,
        message: String,
    },
}

impl ExportError {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportError::IndexOutOfRange { format, .. }
            | ExportError::CountOverflow { format, .. }
            | ExportError::Write { format, .. } => *format,
        }
    }

    pub(crate) fn write(format: ExportFormat, err: impl std::fmt::Display) -> Self {
        ExportError::Write {
            format,
            message: err.to_string(),
        }
    }
}

/// Serialized mesh in one format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    format: ExportFormat,
    bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Default file name, e.g. `buildings.3mf`
    pub fn file_name(&self) -> String {
        format!("buildings.{}", self.format.extension())
    }

    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    /// Lowercase hex SHA-256 of the bytes
    pub fn sha256(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Write atomically: the bytes go to a temporary file in the target
    /// directory which is then renamed into place. If `path` is an existing
    /// directory the default file name is used inside it.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(self.file_name())
        } else {
            path.to_path_buf()
        };
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
        file.write_all(&self.bytes)
            .context("Failed to write artifact bytes")?;
        file.as_file().sync_all().context("Failed to flush artifact")?;
        file.persist(&target)
            .with_context(|| format!("Failed to move artifact into place at {:?}", target))?;

        debug!(path = ?target, bytes = self.bytes.len(), "wrote artifact");
        Ok(target)
    }
}

/// Serialize `mesh` in `format`
pub fn export(mesh: &Mesh, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
    check_indices(mesh, format)?;

    let bytes = match format {
        ExportFormat::Stl => stl::write(mesh)?,
        ExportFormat::Obj => obj::write(mesh)?,
        ExportFormat::ThreeMf => export_3mf::write(mesh)?,
    };

    debug!(%format, bytes = bytes.len(), "exported mesh");
    Ok(ExportArtifact::new(format, bytes))
}

/// Serialize `mesh` once per format, in order. The first failure aborts.
pub fn export_all(
    mesh: &Mesh,
    formats: &[ExportFormat],
) -> Result<Vec<ExportArtifact>, ExportError> {
    formats.iter().map(|&format| export(mesh, format)).collect()
}

fn check_indices(mesh: &Mesh, format: ExportFormat) -> Result<(), ExportError> {
    let vertex_count = mesh.vertices.len();
    for (triangle, t) in mesh.triangles.iter().enumerate() {
        if let Some(&index) = t.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(ExportError::IndexOutOfRange {
                format,
                triangle,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}
