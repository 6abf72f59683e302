// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh serialization to STL, OBJ and 3MF

mod export_3mf;
mod exporter;
mod obj;
mod stl;

pub use exporter::{export, export_all, ExportArtifact, ExportError, ExportFormat};
