use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status code → recommended action, built from the manual of one submission.
pub type ActionMap = HashMap<String, String>;

/// Single spreadsheet cell as loaded from the uploaded log.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Text(s) => f.write_str(s),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Equipment log: header names plus rows, each row as wide as `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl LogTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Numeric = every non-empty cell is an int or float, and at least one such cell exists.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            match row.get(index) {
                Some(cell) if cell.is_numeric() => seen = true,
                Some(cell) if cell.is_empty() => {}
                None => {}
                Some(_) => return false,
            }
        }
        seen
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.is_numeric_column(i))
            .collect()
    }

    pub fn head(&self, n: usize) -> LogTable {
        LogTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// One classifier output. Models are trained either on integer codes or on status strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawLabel")]
pub enum Label {
    Code(i64),
    Status(String),
}

/// Class labels as they appear in exported artifacts; integer classes are often written as floats.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawLabel> for Label {
    type Error = String;

    fn try_from(raw: RawLabel) -> Result<Self, Self::Error> {
        match raw {
            RawLabel::Int(i) => Ok(Label::Code(i)),
            RawLabel::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Label::Code(f as i64)),
            RawLabel::Float(f) => Err(format!("class label {} is not a whole number", f)),
            RawLabel::Text(s) => Ok(Label::Status(s)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Code(c) => write!(f, "{}", c),
            Label::Status(s) => f.write_str(s),
        }
    }
}

impl From<Label> for Cell {
    fn from(label: Label) -> Self {
        match label {
            Label::Code(c) => Cell::Int(c),
            Label::Status(s) => Cell::Text(s),
        }
    }
}

/// Log table with the Prediction and Recommended Action columns appended.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedResult {
    pub table: LogTable,
    pub predictions: Vec<Label>,
}

/// Free-text fields of the submission form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentInfo {
    pub equipment_name: String,
    pub company: String,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lowercased extension without the dot, empty when absent.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }
}
