// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation, extrusion and assembly

pub mod analytics;
mod assemble;
mod bbox;
mod extrude;
mod mesh;

pub use analytics::{analyze, is_watertight, GeometryStats};
pub use assemble::MeshAssembler;
pub use bbox::BoundingBox;
pub use extrude::{Solid, SolidExtruder};
pub use mesh::{Mesh, Triangle, Vertex};
