// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF (3D Manufacturing Format) writer

use super::{ExportError, ExportFormat};
use crate::geometry::Mesh;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write as IoWrite};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// Build the zip package in memory
pub(crate) fn write(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let err = |e: &dyn std::fmt::Display| ExportError::write(ExportFormat::ThreeMf, e);

    let model_xml = generate_3dmodel_xml(mesh)?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)
        .map_err(|e| err(&e))?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())
        .map_err(|e| err(&e))?;

    zip.start_file("_rels/.rels", options).map_err(|e| err(&e))?;
    zip.write_all(RELS_XML.as_bytes()).map_err(|e| err(&e))?;

    zip.start_file("3D/3dmodel.model", options)
        .map_err(|e| err(&e))?;
    zip.write_all(&model_xml).map_err(|e| err(&e))?;

    let cursor = zip.finish().map_err(|e| err(&e))?;
    Ok(cursor.into_inner())
}

fn generate_3dmodel_xml(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let created = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut emit = |event: Event<'_>| {
        writer
            .write_event(event)
            .map_err(|e| ExportError::write(ExportFormat::ThreeMf, e.to_string()))
    };

    emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", "meter"));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", CORE_NAMESPACE));
    emit(Event::Start(model))?;

    for (name, value) in [
        ("Application", concat!("footprint3d ", env!("CARGO_PKG_VERSION"))),
        ("Title", "Buildings"),
        ("CreationDate", created.as_str()),
    ] {
        let mut metadata = BytesStart::new("metadata");
        metadata.push_attribute(("name", name));
        emit(Event::Start(metadata))?;
        emit(Event::Text(BytesText::new(value)))?;
        emit(Event::End(BytesEnd::new("metadata")))?;
    }

    emit(Event::Start(BytesStart::new("resources")))?;

    let mut object = BytesStart::new("object");
    object.push_attribute(("id", "1"));
    object.push_attribute(("type", "model"));
    emit(Event::Start(object))?;
    emit(Event::Start(BytesStart::new("mesh")))?;

    emit(Event::Start(BytesStart::new("vertices")))?;
    for vertex in &mesh.vertices {
        let mut v = BytesStart::new("vertex");
        v.push_attribute(("x", vertex.position.x.to_string().as_str()));
        v.push_attribute(("y", vertex.position.y.to_string().as_str()));
        v.push_attribute(("z", vertex.position.z.to_string().as_str()));
        emit(Event::Empty(v))?;
    }
    emit(Event::End(BytesEnd::new("vertices")))?;

    emit(Event::Start(BytesStart::new("triangles")))?;
    for triangle in &mesh.triangles {
        let mut t = BytesStart::new("triangle");
        t.push_attribute(("v1", triangle.indices[0].to_string().as_str()));
        t.push_attribute(("v2", triangle.indices[1].to_string().as_str()));
        t.push_attribute(("v3", triangle.indices[2].to_string().as_str()));
        emit(Event::Empty(t))?;
    }
    emit(Event::End(BytesEnd::new("triangles")))?;

    emit(Event::End(BytesEnd::new("mesh")))?;
    emit(Event::End(BytesEnd::new("object")))?;
    emit(Event::End(BytesEnd::new("resources")))?;

    emit(Event::Start(BytesStart::new("build")))?;
    let mut item = BytesStart::new("item");
    item.push_attribute(("objectid", "1"));
    emit(Event::Empty(item))?;
    emit(Event::End(BytesEnd::new("build")))?;

    emit(Event::End(BytesEnd::new("model")))?;

    Ok(writer.into_inner().into_inner())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;
