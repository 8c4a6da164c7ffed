use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use rust_xlsxwriter::{Color, DocProperties, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::Error;
use crate::types::{AnnotatedResult, Cell, EquipmentInfo, LogTable, UploadedFile};

/// Name the annotated workbook is offered under.
pub const EXPORT_FILE_NAME: &str = "medpredict_results.xlsx";
pub const EXPORT_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const EXPORT_SHEET_NAME: &str = "Results";

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(data.to_string())),
        other => Cell::Text(other.to_string()),
    }
}

/// Header names from the first row: blanks become `Unnamed: <i>`, repeats get `.1`, `.2`, ...
fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(i, data)| {
            let base = match to_cell(data) {
                Cell::Empty => format!("Unnamed: {}", i),
                cell => cell.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

/// First row is the header; rows with no data at all are dropped.
fn range_to_table(range: &Range<Data>) -> Result<LogTable, Error> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| Error::Spreadsheet("The sheet is empty.".to_string()))?;
    let columns = header_names(header);
    let rows: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(to_cell).collect::<Vec<Cell>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();
    debug!(columns = columns.len(), rows = rows.len(), "Log table loaded");
    Ok(LogTable { columns, rows })
}

/// Read the first worksheet of an uploaded workbook (xlsx, xlsm, xls, ods).
pub fn read_log_table(file: &UploadedFile) -> Result<LogTable, Error> {
    let cursor = Cursor::new(file.bytes.as_slice());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| Error::Spreadsheet(format!("Could not open Excel file '{}': {}", file.file_name, e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("The workbook has no sheets.".to_string()))?
        .map_err(|e| Error::Spreadsheet(format!("Could not read the first sheet: {}", e)))?;
    range_to_table(&range)
}

/// Read a named sheet (or the first one) from disk.
pub fn read_log_table_from_path(path: &Path, sheet_name: Option<&str>) -> Result<LogTable, Error> {
    if !path.exists() {
        return Err(Error::Spreadsheet(format!("File not found: {}", path.display())));
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|e| Error::Spreadsheet(format!("Could not open Excel file: {}", e)))?;
    let range = match sheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| Error::Spreadsheet(format!("Sheet not found: {}", e)))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Spreadsheet("The workbook has no sheets.".to_string()))?
            .map_err(|e| Error::Spreadsheet(e.to_string()))?,
    };
    range_to_table(&range)
}

/// Get list of sheet names from workbook.
pub fn get_sheet_names(path: &Path) -> Result<Vec<String>, Error> {
    let workbook =
        open_workbook_auto(path).map_err(|e| Error::Spreadsheet(format!("Could not open Excel file: {}", e)))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Drop characters that are invalid in sheet XML (control chars except tab, newline, CR).
fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            c == '\t' || c == '\n' || c == '\r' || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .collect()
}

fn write_text_cell_safe(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> Result<(), XlsxError> {
    let cleaned = sanitize_cell(text);
    worksheet.write_string_with_format(row, col, &cleaned, format).map(|_| ())
}

/// Estimate column width from text length (char count × 1.2, clamped 10–50).
fn estimate_text_width(text: &str) -> f64 {
    let w = text.chars().count() as f64 * 1.2;
    w.clamp(10.0, 50.0)
}

fn calculate_column_widths(table: &LogTable) -> Vec<f64> {
    let mut widths: Vec<f64> = table.columns.iter().map(|h| estimate_text_width(h)).collect();
    for row in &table.rows {
        for (col, cell) in row.iter().enumerate() {
            let w = estimate_text_width(&cell.to_string());
            if col < widths.len() && w > widths[col] {
                widths[col] = w;
            }
        }
    }
    widths
}

fn export_err(e: XlsxError) -> Error {
    Error::Export(e.to_string())
}

/// Serialize the annotated table to xlsx bytes: one `Results` sheet, header row of
/// column names, one row per table row, numbers kept numeric.
pub fn export_annotated_result(result: &AnnotatedResult, equipment: &EquipmentInfo) -> Result<Vec<u8>, Error> {
    let table = &result.table;
    let mut workbook = Workbook::new();

    let properties = DocProperties::new()
        .set_title(&format!("MedPredict results - {}", equipment.equipment_name))
        .set_subject(&format!("{} {}", equipment.company, equipment.model))
        .set_company(&equipment.company)
        .set_comment("Predicted maintenance status and recommended actions");
    workbook.set_properties(&properties);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME).map_err(export_err)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x2563EB))
        .set_font_color(Color::RGB(0xFFFFFF));
    let text_format = Format::new().set_text_wrap();
    let number_format = Format::new().set_align(FormatAlign::Right);

    for (col, &w) in calculate_column_widths(table).iter().enumerate() {
        worksheet.set_column_width(col as u16, w).map_err(export_err)?;
    }

    for (col, header) in table.columns.iter().enumerate() {
        write_text_cell_safe(worksheet, 0, col as u16, header, &header_format).map_err(export_err)?;
    }

    for (row_idx, cells) in table.rows.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        for (col_idx, cell) in cells.iter().enumerate() {
            let col = col_idx as u16;
            match cell {
                Cell::Empty => {}
                Cell::Int(i) => {
                    worksheet
                        .write_number_with_format(row, col, *i as f64, &number_format)
                        .map_err(export_err)?;
                }
                Cell::Float(f) => {
                    worksheet
                        .write_number_with_format(row, col, *f, &number_format)
                        .map_err(export_err)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row, col, *b).map_err(export_err)?;
                }
                Cell::Text(s) => write_text_cell_safe(worksheet, row, col, s, &text_format).map_err(export_err)?,
                Cell::DateTime(_) => {
                    write_text_cell_safe(worksheet, row, col, &cell.to_string(), &text_format).map_err(export_err)?
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(export_err)?;
    workbook.save_to_buffer().map_err(export_err)
}
