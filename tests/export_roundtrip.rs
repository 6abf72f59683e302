// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Export round-trip tests: write each format to disk and read it back

use anyhow::Result;
use footprint3d::{generate, ExportFormat, Footprint, FootprintAttributes, PipelineOptions};
use geo::polygon;
use std::io::Read;

fn two_buildings() -> Vec<Footprint> {
    vec![
        Footprint::polygon(
            "a",
            polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
        ),
        Footprint::polygon(
            "b",
            polygon![(x: 20.0, y: 0.0), (x: 28.0, y: 0.0), (x: 28.0, y: 6.0), (x: 20.0, y: 6.0)],
        )
        .with_attributes(FootprintAttributes::default().with_levels("3")),
    ]
}

fn all_formats() -> PipelineOptions {
    PipelineOptions {
        formats: ExportFormat::ALL.to_vec(),
        ..Default::default()
    }
}

#[test]
fn test_roundtrip_stl_export() -> Result<()> {
    let output = generate(&two_buildings(), &all_formats())?;
    let dir = tempfile::tempdir()?;
    let path = output.artifacts[0].write_to(dir.path())?;
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("buildings.stl"));

    let mut file = std::fs::File::open(&path)?;
    let stl = stl_io::read_stl(&mut file)?;

    println!("STL: {} vertices, {} faces", stl.vertices.len(), stl.faces.len());
    assert_eq!(stl.faces.len(), output.stats.triangle_count);
    assert_eq!(stl.vertices.len(), output.stats.vertex_count);
    assert_eq!(
        std::fs::metadata(&path)?.len() as usize,
        84 + 50 * output.stats.triangle_count
    );
    Ok(())
}

#[test]
fn test_roundtrip_obj_export() -> Result<()> {
    let output = generate(&two_buildings(), &all_formats())?;
    let obj = std::str::from_utf8(output.artifacts[1].bytes())?;

    let vertices = obj.lines().filter(|l| l.starts_with("v ")).count();
    let faces: Vec<Vec<usize>> = obj
        .lines()
        .filter_map(|l| l.strip_prefix("f "))
        .map(|f| f.split_whitespace().map(|i| i.parse().unwrap()).collect())
        .collect();

    assert_eq!(vertices, output.stats.vertex_count);
    assert_eq!(faces.len(), output.stats.triangle_count);
    assert!(faces.iter().flatten().all(|&i| i >= 1 && i <= vertices));
    Ok(())
}

#[test]
fn test_roundtrip_3mf_export() -> Result<()> {
    let output = generate(&two_buildings(), &all_formats())?;
    let artifact = &output.artifacts[2];
    assert_eq!(artifact.format(), ExportFormat::ThreeMf);
    assert_eq!(&artifact.bytes()[0..2], b"PK", "3MF file is not a valid ZIP");

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(artifact.bytes()))?;
    let mut model = String::new();
    archive.by_name("3D/3dmodel.model")?.read_to_string(&mut model)?;

    assert_eq!(model.matches("<vertex ").count(), output.stats.vertex_count);
    assert_eq!(model.matches("<triangle ").count(), output.stats.triangle_count);
    Ok(())
}

#[test]
fn test_artifacts_follow_requested_order() -> Result<()> {
    let options = PipelineOptions {
        formats: vec![ExportFormat::ThreeMf, ExportFormat::Obj],
        ..Default::default()
    };
    let output = generate(&two_buildings(), &options)?;
    let names: Vec<String> = output.artifacts.iter().map(|a| a.file_name()).collect();
    assert_eq!(names, vec!["buildings.3mf", "buildings.obj"]);
    assert_eq!(output.artifacts[0].media_type(), "model/3mf");
    Ok(())
}
