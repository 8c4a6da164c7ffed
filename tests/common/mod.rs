#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use medpredict_lib::commands::Submission;
use medpredict_lib::types::{EquipmentInfo, UploadedFile};
use medpredict_lib::{AppConfig, InferenceContext};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::io::{Cursor, Write};
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Linear model over (Temperature, Vibration): vibration < ~-0.5 → Normal,
/// around 0 → Warning, > ~0.5 → Failure.
pub const MODEL_JSON: &str = r#"{
    "kind": "linear",
    "classes": ["Normal", "Warning", "Failure"],
    "coef": [[0.0, -1.0], [0.0, 0.0], [0.0, 1.0]],
    "intercept": [0.0, 0.5, 0.0]
}"#;

pub const SCALER_JSON: &str = r#"{
    "kind": "standard",
    "mean": [60.0, 0.0],
    "scale": [10.0, 1.0]
}"#;

pub const MANUAL_TEXT: &str = "Maintenance guide\n\
Normal: No action needed\n\
Warning: Schedule inspection\n\
Failure: Replace bearing\n";

pub struct Fixture {
    pub dir: TempDir,
    pub ctx: InferenceContext,
    pub config: AppConfig,
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model_pfe.json");
    let scaler = dir.path().join("scaler_pfe.json");
    fs::write(&model, MODEL_JSON).unwrap();
    fs::write(&scaler, SCALER_JSON).unwrap();
    let ctx = InferenceContext::load(&model, &scaler).unwrap();
    let config = AppConfig {
        model_path: model,
        scaler_path: scaler,
        alert_sound_path: dir.path().join("alert.mp3"),
        logo_path: dir.path().join("logo.png"),
        alert_delay: Duration::ZERO,
        ..AppConfig::default()
    };
    Fixture { dir, ctx, config }
}

/// Workbook with Machine (text), Temperature and Vibration (numbers).
pub fn log_workbook(rows: &[(&str, f64, f64)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.write_string(0, 0, "Machine").unwrap();
    ws.write_string(0, 1, "Temperature").unwrap();
    ws.write_string(0, 2, "Vibration").unwrap();
    for (i, (machine, temp, vib)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        ws.write_string(r, 0, *machine).unwrap();
        ws.write_number(r, 1, *temp).unwrap();
        ws.write_number(r, 2, *vib).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Workbook with text columns only.
pub fn text_only_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.write_string(0, 0, "Machine").unwrap();
    ws.write_string(0, 1, "Status").unwrap();
    ws.write_string(1, 0, "M1").unwrap();
    ws.write_string(1, 1, "running").unwrap();
    workbook.save_to_buffer().unwrap()
}

/// Minimal DOCX: one paragraph per entry (entries are inserted as raw XML text).
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buf);
        zip.start_file("word/document.xml", SimpleFileOptions::default()).unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

/// One-page PDF with one text line per entry, in a single text block.
pub fn pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn equipment() -> EquipmentInfo {
    EquipmentInfo {
        equipment_name: "Surgical Microscope".into(),
        company: "Leica".into(),
        model: "Provido".into(),
    }
}

pub fn submission(logs: Vec<u8>, manual_name: &str, manual: Vec<u8>) -> Submission {
    Submission {
        equipment: equipment(),
        log_file: Some(UploadedFile::new("logs.xlsx", logs)),
        manual_file: Some(UploadedFile::new(manual_name, manual)),
    }
}
