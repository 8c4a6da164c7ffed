use crate::config::AppConfig;
use crate::error::{Error, Result, Stage, StageError, StageExt};
use crate::excel;
use crate::manual;
use crate::models::InferenceContext;
use crate::services::{alert, annotator};
use crate::services::alert::FailureAlert;
use crate::types::{AnnotatedResult, EquipmentInfo, LogTable, UploadedFile};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const MAX_LOG_BYTES: usize = 100 * 1024 * 1024;
const MAX_MANUAL_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn invalid(msg: &str) -> Self {
        Self {
            valid: false,
            error: Some(msg.to_string()),
        }
    }
}

/// Everything the form collects. Files are `None` when nothing was uploaded.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub equipment: EquipmentInfo,
    pub log_file: Option<UploadedFile>,
    pub manual_file: Option<UploadedFile>,
}

/// A submission that passed [`Submission::check`].
#[derive(Debug)]
pub struct CompleteSubmission<'a> {
    pub equipment: &'a EquipmentInfo,
    pub log_file: &'a UploadedFile,
    pub manual_file: &'a UploadedFile,
}

impl Submission {
    /// All five inputs must be present; text fields count as missing when blank.
    pub fn check(&self) -> Result<CompleteSubmission<'_>> {
        let mut missing = Vec::new();
        if self.equipment.equipment_name.trim().is_empty() {
            missing.push("Equipment Name");
        }
        if self.equipment.company.trim().is_empty() {
            missing.push("Company");
        }
        if self.equipment.model.trim().is_empty() {
            missing.push("Model");
        }
        let log_file = self.log_file.as_ref().filter(|f| !f.bytes.is_empty());
        if log_file.is_none() {
            missing.push("Logs");
        }
        let manual_file = self.manual_file.as_ref().filter(|f| !f.bytes.is_empty());
        if manual_file.is_none() {
            missing.push("Technical Manual");
        }
        match (log_file, manual_file) {
            (Some(log_file), Some(manual_file)) if missing.is_empty() => Ok(CompleteSubmission {
                equipment: &self.equipment,
                log_file,
                manual_file,
            }),
            _ => Err(StageError::new(Stage::Input, Error::MissingInput(missing))),
        }
    }
}

/// Spreadsheet upload: size limit and xlsx (ZIP) / xls (OLE) header.
pub fn validate_excel_file(file: &UploadedFile) -> ValidationResult {
    if file.bytes.len() > MAX_LOG_BYTES {
        return ValidationResult::invalid("File too large (max 100MB).");
    }
    if file.bytes.len() < 4 {
        return ValidationResult::invalid("Not a valid Excel file (could not read header).");
    }
    let is_zip = file.bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]);
    let is_ole = file.bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]);
    if !is_zip && !is_ole {
        return ValidationResult::invalid("Not a valid Excel file (.xlsx).");
    }
    ValidationResult::ok()
}

/// Manual upload: size limit and a format [`manual::ManualFormat`] understands.
pub fn validate_document_file(file: &UploadedFile) -> ValidationResult {
    if file.bytes.len() > MAX_MANUAL_BYTES {
        return ValidationResult::invalid("File too large (max 50MB).");
    }
    match manual::ManualFormat::detect(file) {
        Ok(manual::ManualFormat::Pdf) if !file.bytes.starts_with(b"%PDF-") => {
            ValidationResult::invalid("Not a valid PDF file.")
        }
        Ok(_) => ValidationResult::ok(),
        Err(_) => ValidationResult::invalid("Not a PDF, DOCX or text manual."),
    }
}

fn require_valid(result: ValidationResult, stage: Stage) -> Result<()> {
    match result.error {
        Some(msg) if !result.valid => Err(StageError::new(stage, Error::UnsupportedFile(msg))),
        _ => Ok(()),
    }
}

/// Result of one processed submission.
#[derive(Debug)]
pub struct Outcome {
    pub equipment: EquipmentInfo,
    /// First rows of the uploaded log, as loaded.
    pub preview: LogTable,
    pub result: AnnotatedResult,
    pub workbook: Vec<u8>,
    pub file_name: &'static str,
    pub mime: &'static str,
    /// Non-fatal messages for the user, e.g. an unreadable manual.
    pub notices: Vec<String>,
    pub alert: Option<FailureAlert>,
}

/// Run the whole pipeline for one submission. Does not wait for the alert delay;
/// the caller decides how to wait.
pub fn process_submission(ctx: &InferenceContext, config: &AppConfig, submission: &Submission) -> Result<Outcome> {
    let input = submission.check()?;
    require_valid(validate_excel_file(input.log_file), Stage::Logs)?;
    require_valid(validate_document_file(input.manual_file), Stage::Manual)?;
    info!(
        equipment = %input.equipment.equipment_name,
        company = %input.equipment.company,
        model = %input.equipment.model,
        logs = %input.log_file.file_name,
        manual = %input.manual_file.file_name,
        "Processing submission"
    );

    let table = excel::read_log_table(input.log_file).at(Stage::Logs)?;
    let preview = table.head(config.preview_rows);

    let loaded = manual::load_action_map(input.manual_file, config.strict_manual).at(Stage::Manual)?;
    let mut notices = Vec::new();
    notices.extend(loaded.notice);
    info!(actions = loaded.actions.len(), "Recommended actions extracted");

    let result = annotator::annotate(&table, ctx, &loaded.actions).at(Stage::Inference)?;
    let workbook = excel::export_annotated_result(&result, input.equipment).at(Stage::Export)?;
    let alert = alert::check(&result.predictions, config);

    Ok(Outcome {
        equipment: input.equipment.clone(),
        preview,
        result,
        workbook,
        file_name: excel::EXPORT_FILE_NAME,
        mime: excel::EXPORT_MIME,
        notices,
        alert,
    })
}

fn read_upload(path: &Path) -> io::Result<UploadedFile> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|o| o.to_str())
        .unwrap_or("")
        .to_string();
    Ok(UploadedFile::new(name, bytes))
}

/// `output` as given (forcing .xlsx), or the fixed result name in Downloads with a
/// `_2`, `_3`, ... suffix when taken.
pub fn resolve_output_path(output: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = output {
        let mut pb = p.to_path_buf();
        if pb.extension().and_then(|e| e.to_str()) != Some("xlsx") {
            pb.set_extension("xlsx");
        }
        return Ok(pb);
    }
    let dir = dirs::download_dir()
        .or_else(dirs::desktop_dir)
        .ok_or_else(|| StageError::new(Stage::Export, Error::Export("Could not find Downloads or Desktop folder.".into())))?;
    let stem = excel::EXPORT_FILE_NAME.trim_end_matches(".xlsx");
    let mut p = dir.join(excel::EXPORT_FILE_NAME);
    let mut counter = 2u32;
    while p.exists() {
        p = dir.join(format!("{}_{}.xlsx", stem, counter));
        counter += 1;
    }
    Ok(p)
}

/// Process files from disk and write the annotated workbook. Returns the outcome and the written path.
pub fn annotate_files(
    ctx: &InferenceContext,
    config: &AppConfig,
    equipment: EquipmentInfo,
    logs: &Path,
    manual_path: &Path,
    output: Option<&Path>,
) -> Result<(Outcome, PathBuf)> {
    let log_file = read_upload(logs).at(Stage::Logs)?;
    let manual_file = read_upload(manual_path).at(Stage::Manual)?;
    let submission = Submission {
        equipment,
        log_file: Some(log_file),
        manual_file: Some(manual_file),
    };
    let outcome = process_submission(ctx, config, &submission)?;
    let path = resolve_output_path(output)?;
    fs::write(&path, &outcome.workbook)
        .map_err(|e| Error::Export(format!("Cannot write to {}: {}", path.display(), e)))
        .at(Stage::Export)?;
    info!(path = %path.display(), "Results written");
    Ok((outcome, path))
}
