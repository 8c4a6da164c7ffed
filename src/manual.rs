//! Technical manual text extraction and the status → action rule scan.

use crate::error::Error;
use crate::types::{ActionMap, UploadedFile};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::read::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualFormat {
    Pdf,
    Docx,
    Text,
}

impl ManualFormat {
    /// Pick the format from the extension, falling back to the file's magic bytes.
    pub fn detect(file: &UploadedFile) -> Result<Self, Error> {
        match file.extension().as_str() {
            "pdf" => return Ok(ManualFormat::Pdf),
            "docx" => return Ok(ManualFormat::Docx),
            "txt" | "text" | "md" => return Ok(ManualFormat::Text),
            _ => {}
        }
        if file.bytes.starts_with(b"%PDF-") {
            Ok(ManualFormat::Pdf)
        } else if file.bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            Ok(ManualFormat::Docx)
        } else {
            Err(Error::UnsupportedFile(format!(
                "'{}' is not a PDF, DOCX or text manual.",
                file.file_name
            )))
        }
    }
}

/// Plain text of the manual, pages (or paragraphs) separated by newlines.
pub fn extract_manual_text(file: &UploadedFile) -> Result<String, Error> {
    let text = match ManualFormat::detect(file)? {
        ManualFormat::Pdf => pdf_text(&file.bytes)?,
        ManualFormat::Docx => docx_text(&file.bytes)?,
        ManualFormat::Text => String::from_utf8_lossy(&file.bytes).into_owned(),
    };
    debug!(file = %file.file_name, chars = text.len(), "Manual text extracted");
    Ok(text)
}

fn pdf_text(bytes: &[u8]) -> Result<String, Error> {
    let doc = Document::load_mem(bytes).map_err(|e| Error::Manual(format!("Invalid PDF: {}", e)))?;
    let mut pages = Vec::new();
    // get_pages is keyed by 1-based page number, so iteration is in page order.
    for (page_number, page_id) in doc.get_pages() {
        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| Error::Manual(format!("Page {}: {}", page_number, e)))?;
        let content =
            Content::decode(&raw).map_err(|e| Error::Manual(format!("Page {}: {}", page_number, e)))?;
        let text = content_text(&content.operations);
        if !text.is_empty() {
            pages.push(text);
        }
    }
    Ok(pages.join("\n"))
}

/// Shown text of a content stream, with a line break wherever the text moves to a new line.
fn content_text(operations: &[Operation]) -> String {
    let mut out = String::new();
    for op in operations {
        match op.operator.as_str() {
            "Tj" => push_shown(&mut out, op.operands.first()),
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(..) => push_shown(&mut out, Some(item)),
                            // Large negative kerning is how generators encode a word gap.
                            other if number(other).map_or(false, |n| n < -200.0) => out.push(' '),
                            _ => {}
                        }
                    }
                }
            }
            "'" => {
                line_break(&mut out);
                push_shown(&mut out, op.operands.first());
            }
            "\"" => {
                line_break(&mut out);
                push_shown(&mut out, op.operands.get(2));
            }
            "Td" | "TD" => {
                // A purely horizontal move stays on the same line.
                if op.operands.get(1).and_then(number).map_or(true, |ty| ty != 0.0) {
                    line_break(&mut out);
                }
            }
            "T*" | "Tm" | "ET" => line_break(&mut out),
            _ => {}
        }
    }
    out.trim_end_matches('\n').to_string()
}

fn line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn push_shown(out: &mut String, operand: Option<&Object>) {
    if let Some(Object::String(bytes, _)) = operand {
        out.push_str(&decode_pdf_string(bytes));
    }
}

/// UTF-16BE when the string carries a byte-order mark, otherwise one byte per character.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn docx_text(bytes: &[u8]) -> Result<String, Error> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::Manual(format!("Invalid DOCX: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| Error::Manual("DOCX has no word/document.xml".to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::Manual(format!("Read word/document.xml: {}", e)))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let s = t
                    .unescape()
                    .map_err(|e| Error::Manual(format!("Bad text in DOCX: {}", e)))?;
                out.push_str(&s);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Manual(format!(
                    "Malformed DOCX XML at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Scan `key: value` lines. Key is the trimmed text before the first colon,
/// value the trimmed rest; lines without a colon are skipped and the last
/// occurrence of a key wins.
pub fn parse_actions(text: &str) -> ActionMap {
    let mut actions = ActionMap::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            actions.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    actions
}

/// Action map plus a notice when the manual could not be read and was ignored.
#[derive(Debug, Default)]
pub struct LoadedActions {
    pub actions: ActionMap,
    pub notice: Option<String>,
}

/// Extract and parse the manual. Unless `strict`, an unreadable manual yields
/// an empty map so predictions are still delivered.
pub fn load_action_map(file: &UploadedFile, strict: bool) -> Result<LoadedActions, Error> {
    match extract_manual_text(file) {
        Ok(text) => Ok(LoadedActions {
            actions: parse_actions(&text),
            notice: None,
        }),
        Err(e) if strict => Err(e),
        Err(e) => {
            warn!(file = %file.file_name, error = %e, "Manual unreadable, continuing without recommended actions");
            Ok(LoadedActions {
                actions: ActionMap::new(),
                notice: Some(format!("{} No recommended actions were found.", e)),
            })
        }
    }
}
