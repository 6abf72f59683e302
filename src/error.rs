// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the footprint pipeline

use crate::io::{ExportError, ExportFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Run-level failures. Any of these fails the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The footprint batch (or the request around it) is malformed or empty.
    #[error("invalid input: {0}")]
    Input(String),

    /// Options are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Nothing survived normalization, extrusion or repair.
    #[error("no valid buildings: {0}")]
    EmptyMesh(String),

    /// A requested format could not be produced.
    #[error("failed to serialize {format}: {message}")]
    Serialization {
        format: ExportFormat,
        message: String,
    },

    /// Unexpected failure inside the core.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Input(_) => ErrorKind::Input,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::EmptyMesh(_) => ErrorKind::EmptyMesh,
            PipelineError::Serialization { .. } => ErrorKind::Serialization,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ExportError> for PipelineError {
    fn from(err: ExportError) -> Self {
        PipelineError::Serialization {
            format: err.format(),
            message: err.to_string(),
        }
    }
}

/// Coarse error category reported through the job status surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Config,
    EmptyMesh,
    Serialization,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::Config => "config",
            ErrorKind::EmptyMesh => "empty_mesh",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to extrude a single footprint. Never escalates on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtrusionError {
    /// Height is not a positive finite number.
    #[error("invalid extrusion height {0}")]
    InvalidHeight(f64),

    /// A ring has fewer than three vertices.
    #[error("ring {ring} has only {count} vertices")]
    TooFewVertices { ring: usize, count: usize },

    /// Two ring vertices coincide.
    #[error("duplicate vertex at ({x}, {y})")]
    DuplicateVertex { x: f64, y: f64 },

    /// The constrained triangulation rejected the input.
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    /// The footprint is collinear or otherwise produced no cap triangles.
    #[error("footprint triangulates to zero triangles")]
    NoTriangles,

    /// Post-condition: the solid has unmatched edges.
    #[error("solid is not watertight ({boundary_edges} unmatched edges)")]
    NotWatertight { boundary_edges: usize },

    /// Post-condition: the solid encloses no volume or is inside out.
    #[error("solid has non-positive volume {0}")]
    NonPositiveVolume(f64),
}
