//! End-to-end runs of the submission pipeline on real workbooks and manuals.

mod common;

use common::*;
use medpredict_lib::commands::{self, Submission};
use medpredict_lib::excel::{self, EXPORT_FILE_NAME, EXPORT_MIME};
use medpredict_lib::manual;
use medpredict_lib::services::annotator::NO_ACTION_PLACEHOLDER;
use medpredict_lib::types::{Cell, Label, UploadedFile};
use medpredict_lib::{Error, Stage};

const ROWS: &[(&str, f64, f64)] = &[("M1", 60.0, -2.0), ("M2", 65.0, 0.2), ("M3", 70.0, 3.0)];

fn actions_of(table: &medpredict_lib::types::LogTable) -> Vec<String> {
    let col = table.column_index("Recommended Action").unwrap();
    table.rows.iter().map(|r| r[col].to_string()).collect()
}

#[test]
fn text_manual_end_to_end() {
    let fx = fixture();
    let submission = submission(log_workbook(ROWS), "manual.txt", MANUAL_TEXT.as_bytes().to_vec());
    let outcome = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap();

    assert_eq!(outcome.file_name, EXPORT_FILE_NAME);
    assert_eq!(outcome.mime, EXPORT_MIME);
    assert!(outcome.notices.is_empty());
    assert_eq!(outcome.preview.rows.len(), 3);

    let table = &outcome.result.table;
    assert_eq!(table.rows.len(), 3);
    assert_eq!(
        table.columns,
        vec!["Machine", "Temperature", "Vibration", "Prediction", "Recommended Action"]
    );
    assert_eq!(
        outcome.result.predictions,
        vec![
            Label::Status("Normal".into()),
            Label::Status("Warning".into()),
            Label::Status("Failure".into())
        ]
    );
    assert_eq!(
        actions_of(table),
        vec!["No action needed", "Schedule inspection", "Replace bearing"]
    );

    let alert = outcome.alert.expect("failure predicted");
    assert!(alert.message.contains("1 log row(s)"));
    assert!(alert.sound.is_none());

    // The exported workbook reads back with identical columns and values.
    let back = excel::read_log_table(&UploadedFile::new(EXPORT_FILE_NAME, outcome.workbook)).unwrap();
    assert_eq!(back.columns, table.columns);
    assert_eq!(back.rows.len(), table.rows.len());
    for (got, want) in back.rows.iter().zip(&table.rows) {
        for (g, w) in got.iter().zip(want) {
            match (g.as_f64(), w.as_f64()) {
                (Some(a), Some(b)) => assert_eq!(a, b),
                _ => assert_eq!(g, w),
            }
        }
    }
}

#[test]
fn docx_manual_and_unmatched_label() {
    let fx = fixture();
    let manual = docx(&["Normal: No action needed", "Failure: Replace bearing &amp; realign", "Notes without rules"]);
    let submission = submission(log_workbook(ROWS), "manual.docx", manual);
    let outcome = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap();
    assert_eq!(
        actions_of(&outcome.result.table),
        vec!["No action needed", NO_ACTION_PLACEHOLDER, "Replace bearing & realign"]
    );
}

#[test]
fn pdf_manual_keeps_one_rule_per_line() {
    let fx = fixture();
    let manual = pdf(&["Maintenance guide", "Normal: No action needed", "Failure: Replace bearing"]);
    let submission = submission(log_workbook(ROWS), "manual.pdf", manual);
    let outcome = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap();
    assert!(outcome.notices.is_empty());
    assert_eq!(
        actions_of(&outcome.result.table),
        vec!["No action needed", NO_ACTION_PLACEHOLDER, "Replace bearing"]
    );
}

#[test]
fn pdf_manual_action_map() {
    let file = UploadedFile::new("manual.pdf", pdf(&["A: Replace filter", "B: Inspect seal"]));
    let loaded = manual::load_action_map(&file, true).unwrap();
    assert_eq!(loaded.actions.len(), 2);
    assert_eq!(loaded.actions["A"], "Replace filter");
    assert_eq!(loaded.actions["B"], "Inspect seal");
}

#[test]
fn no_failure_means_no_alert() {
    let fx = fixture();
    let rows = &[("M1", 60.0, -2.0), ("M2", 61.0, -3.0)];
    let submission = submission(log_workbook(rows), "manual.txt", MANUAL_TEXT.as_bytes().to_vec());
    let outcome = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap();
    assert!(outcome.alert.is_none());
}

#[test]
fn unreadable_manual_degrades_to_no_actions() {
    let fx = fixture();
    let submission = submission(log_workbook(ROWS), "manual.pdf", b"%PDF-1.4 broken".to_vec());
    let outcome = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap();
    assert_eq!(outcome.notices.len(), 1);
    assert!(actions_of(&outcome.result.table)
        .iter()
        .all(|a| a == NO_ACTION_PLACEHOLDER));
}

#[test]
fn unreadable_manual_aborts_when_strict() {
    let mut fx = fixture();
    fx.config.strict_manual = true;
    let submission = submission(log_workbook(ROWS), "manual.pdf", b"%PDF-1.4 broken".to_vec());
    let err = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap_err();
    assert_eq!(err.stage, Stage::Manual);
    assert!(err.is_user_error());
}

#[test]
fn text_only_log_is_a_data_shape_error() {
    let fx = fixture();
    let submission = submission(text_only_workbook(), "manual.txt", MANUAL_TEXT.as_bytes().to_vec());
    let err = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap_err();
    assert_eq!(err.stage, Stage::Inference);
    assert!(matches!(err.source, Error::DataShape(_)));
}

#[test]
fn not_a_spreadsheet_is_rejected_before_reading() {
    let fx = fixture();
    let submission = submission(b"id,temp\n1,2\n".to_vec(), "manual.txt", MANUAL_TEXT.as_bytes().to_vec());
    let err = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap_err();
    assert_eq!(err.stage, Stage::Logs);
    assert!(matches!(err.source, Error::UnsupportedFile(_)));
}

#[test]
fn missing_files_are_input_errors() {
    let fx = fixture();
    let submission = Submission {
        equipment: equipment(),
        ..Default::default()
    };
    let err = commands::process_submission(&fx.ctx, &fx.config, &submission).unwrap_err();
    assert_eq!(err.stage, Stage::Input);
    assert!(err.to_string().contains("Logs, Technical Manual"));
}

#[test]
fn annotate_files_writes_workbook() {
    let fx = fixture();
    let logs = fx.dir.path().join("logs.xlsx");
    let manual = fx.dir.path().join("manual.txt");
    std::fs::write(&logs, log_workbook(ROWS)).unwrap();
    std::fs::write(&manual, MANUAL_TEXT).unwrap();
    let output = fx.dir.path().join("out");

    let (outcome, path) =
        commands::annotate_files(&fx.ctx, &fx.config, equipment(), &logs, &manual, Some(&output)).unwrap();
    assert_eq!(path, fx.dir.path().join("out.xlsx"));
    let back = excel::read_log_table_from_path(&path, Some(excel::EXPORT_SHEET_NAME)).unwrap();
    assert_eq!(back.rows.len(), outcome.result.table.rows.len());
    assert_eq!(back.rows[2][4], Cell::Text("Replace bearing".into()));
}
