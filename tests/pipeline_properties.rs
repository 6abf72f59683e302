// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end properties of the footprint pipeline

use anyhow::Result;
use approx::assert_relative_eq;
use footprint3d::geometry::{analyze, is_watertight};
use footprint3d::{
    generate, ExportFormat, Footprint, FootprintAttributes, FootprintGeometry, PipelineError,
    PipelineOptions, SolidExtruder,
};
use geo::algorithm::orient::{Direction, Orient};
use geo::{polygon, LineString, Polygon};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Footprint {
    Footprint::polygon(
        id,
        polygon![(x: x, y: y), (x: x + w, y: y), (x: x + w, y: y + h), (x: x, y: y + h)],
    )
}

fn bowtie(id: &str) -> Footprint {
    Footprint::polygon(
        id,
        polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0)],
    )
}

/// A small city block: plain boxes, an L-shape, a courtyard and a dense
/// round tower
fn city_block() -> Vec<Footprint> {
    let l_shape = Footprint::polygon(
        "l",
        polygon![
            (x: 40.0, y: 0.0),
            (x: 60.0, y: 0.0),
            (x: 60.0, y: 8.0),
            (x: 48.0, y: 8.0),
            (x: 48.0, y: 20.0),
            (x: 40.0, y: 20.0),
        ],
    )
    .with_attributes(FootprintAttributes::default().with_building("retail"));

    let courtyard = Footprint::polygon(
        "court",
        polygon!(
            exterior: [(x: 0.0, y: 40.0), (x: 30.0, y: 40.0), (x: 30.0, y: 70.0), (x: 0.0, y: 70.0)],
            interiors: [[(x: 10.0, y: 50.0), (x: 20.0, y: 50.0), (x: 20.0, y: 60.0), (x: 10.0, y: 60.0)]]
        ),
    )
    .with_attributes(FootprintAttributes::default().with_levels("6"));

    let tower_ring: Vec<(f64, f64)> = (0..240)
        .map(|i| {
            let t = i as f64 / 240.0 * std::f64::consts::TAU;
            (80.0 + 12.0 * t.cos(), 60.0 + 12.0 * t.sin())
        })
        .collect();
    let tower = Footprint::polygon("tower", Polygon::new(LineString::from(tower_ring), Vec::new()))
        .with_attributes(FootprintAttributes::default().with_height("95 m"));

    vec![
        rect("a", 0.0, 0.0, 10.0, 12.0)
            .with_attributes(FootprintAttributes::default().with_building("house")),
        rect("b", 15.0, 0.0, 12.0, 12.0),
        l_shape,
        courtyard,
        tower,
    ]
}

#[test]
fn test_city_block_is_watertight_and_positive() -> Result<()> {
    init_tracing();
    let output = generate(&city_block(), &PipelineOptions::default())?;

    assert!(output.stats.is_watertight);
    assert!(output.stats.volume > 0.0);
    assert_eq!(output.diagnostics.solids, 5);
    assert_eq!(output.diagnostics.simplified_rings, 1);
    assert_eq!(output.diagnostics.extrusion_failures, 0);

    println!("{}", output.stats);
    Ok(())
}

#[test]
fn test_every_valid_extrusion_is_closed() {
    let extruder = SolidExtruder::new();
    for footprint in city_block() {
        let polygon = match &footprint.geometry {
            FootprintGeometry::Polygon(p) => p.orient(Direction::Default),
            _ => unreachable!(),
        };
        let solid = extruder.extrude(&footprint.id, &polygon, 10.0).unwrap();
        assert!(is_watertight(&solid.mesh), "{} leaks", footprint.id);
        assert!(analyze(&solid.mesh).volume > 0.0);
    }
}

#[test]
fn test_heights_drive_the_mesh() -> Result<()> {
    let cases = [
        (FootprintAttributes::default().with_height("350m"), 300.0),
        (FootprintAttributes::default().with_height("1m"), 3.0),
        (FootprintAttributes::default().with_height("12.5 m"), 12.5),
        (FootprintAttributes::default().with_levels("4"), 14.0),
        (FootprintAttributes::default().with_building("skyscraper"), 120.0),
        (FootprintAttributes::default(), 15.0),
        (
            FootprintAttributes::default()
                .with_height("tall")
                .with_levels("30"),
            15.0,
        ),
    ];

    for (attributes, expected) in cases {
        let footprint = rect("h", 0.0, 0.0, 10.0, 10.0).with_attributes(attributes);
        let output = generate(&[footprint], &PipelineOptions::default())?;
        assert_relative_eq!(output.stats.size()[2], expected, epsilon = 1e-9);
        assert_relative_eq!(output.stats.volume, 100.0 * expected, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_area_threshold() -> Result<()> {
    let small = rect("small", 0.0, 0.0, 5.0, 1.0);
    let kept = rect("kept", 20.0, 0.0, 11.0, 1.0);

    let output = generate(&[small, kept], &PipelineOptions::default())?;
    assert_eq!(output.diagnostics.below_min_area, 1);
    assert_eq!(output.diagnostics.solids, 1);
    assert_relative_eq!(output.stats.volume, 11.0 * 15.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_runs_are_deterministic() -> Result<()> {
    let first = generate(&city_block(), &PipelineOptions::default())?;
    let second = generate(&city_block(), &PipelineOptions::default())?;

    assert_eq!(first.stats.vertex_count, second.stats.vertex_count);
    assert_eq!(first.stats.triangle_count, second.stats.triangle_count);
    assert_eq!(first.artifacts[0].sha256(), second.artifacts[0].sha256());
    Ok(())
}

#[test]
fn test_bounding_box_is_centered() -> Result<()> {
    let output = generate(&city_block(), &PipelineOptions::default())?;
    let b = output.stats.bbox;
    for axis in 0..3 {
        assert_relative_eq!(b[axis], -b[axis + 3], epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn test_all_invalid_batch_is_empty_mesh() {
    let batch = vec![
        bowtie("x"),
        rect("tiny", 0.0, 0.0, 1.0, 1.0),
        Footprint::new("null", FootprintGeometry::Empty),
    ];
    let err = generate(&batch, &PipelineOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyMesh(_)));
    assert!(err.to_string().starts_with("no valid buildings"));
}

#[test]
fn test_one_invalid_one_valid() -> Result<()> {
    let output = generate(
        &[bowtie("bad"), rect("good", 50.0, 50.0, 10.0, 10.0)],
        &PipelineOptions::default(),
    )?;

    assert_eq!(output.diagnostics.unrepairable, 1);
    assert_eq!(output.diagnostics.solids, 1);
    assert_eq!(output.stats.triangle_count, 12);
    assert_relative_eq!(output.stats.volume, 1500.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_run_summary_serializes() -> Result<()> {
    let options = PipelineOptions {
        formats: vec![ExportFormat::Stl, ExportFormat::Obj],
        ..Default::default()
    };
    let output = generate(&city_block(), &options)?;
    let summary = serde_json::to_value(output.summary())?;

    assert_eq!(summary["formats"], serde_json::json!(["stl", "obj"]));
    assert_eq!(
        summary["bytes"].as_u64(),
        Some((output.artifacts[0].len() + output.artifacts[1].len()) as u64)
    );
    assert_eq!(summary["diagnostics"]["solids"], 5);
    assert_eq!(summary["stats"]["is_watertight"], true);
    assert_eq!(
        summary["stats"]["triangle_count"].as_u64(),
        Some(output.stats.triangle_count as u64)
    );
    Ok(())
}
