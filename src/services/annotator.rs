//! Log table → scaled features → predictions → Prediction and Recommended Action columns.

use crate::error::Error;
use crate::models::InferenceContext;
use crate::types::{ActionMap, AnnotatedResult, Cell, Label, LogTable};
use tracing::{debug, info};

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const ACTION_COLUMN: &str = "Recommended Action";
/// Shown when the manual defines no action for a predicted status.
pub const NO_ACTION_PLACEHOLDER: &str = "No defined action";

/// Columns fed to the scaler. If the scaler remembers its training column names,
/// those are taken by name; otherwise every numeric column in table order.
pub fn select_feature_columns(table: &LogTable, ctx: &InferenceContext) -> Result<Vec<usize>, Error> {
    if let Some(names) = ctx.scaler.feature_names() {
        return names
            .iter()
            .map(|name| {
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| Error::DataShape(format!("the log has no '{}' column", name)))?;
                if !table.is_numeric_column(idx) {
                    return Err(Error::DataShape(format!("column '{}' is not numeric", name)));
                }
                Ok(idx)
            })
            .collect();
    }

    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        return Err(Error::DataShape("the log has no numeric columns".to_string()));
    }
    let expected = ctx.scaler.n_features();
    if numeric.len() != expected {
        let names: Vec<&str> = numeric.iter().map(|&i| table.columns[i].as_str()).collect();
        return Err(Error::DataShape(format!(
            "the log has {} numeric columns ({}), the model was trained on {}",
            numeric.len(),
            names.join(", "),
            expected
        )));
    }
    Ok(numeric)
}

fn feature_matrix(table: &LogTable, columns: &[usize]) -> Result<Vec<Vec<f64>>, Error> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            columns
                .iter()
                .map(|&c| {
                    row.get(c).and_then(Cell::as_f64).ok_or_else(|| {
                        // +2: 1-based plus the header row, as the user sees it in Excel.
                        Error::DataShape(format!("missing value in column '{}' at row {}", table.columns[c], r + 2))
                    })
                })
                .collect()
        })
        .collect()
}

/// Scale, predict and merge. The input table is left untouched.
pub fn annotate(table: &LogTable, ctx: &InferenceContext, actions: &ActionMap) -> Result<AnnotatedResult, Error> {
    for name in [PREDICTION_COLUMN, ACTION_COLUMN] {
        if table.column_index(name).is_some() {
            return Err(Error::DataShape(format!("the log already has a '{}' column", name)));
        }
    }
    if table.rows.is_empty() {
        return Err(Error::DataShape("the log has no data rows".to_string()));
    }

    let columns = select_feature_columns(table, ctx)?;
    let features = feature_matrix(table, &columns)?;
    let scaled = ctx.scaler.transform(&features)?;
    debug!(rows = scaled.len(), features = columns.len(), "Features scaled");

    let predictions = ctx.classifier.predict(&scaled)?;
    if predictions.len() != table.rows.len() {
        return Err(Error::DataShape(format!(
            "the model returned {} predictions for {} rows",
            predictions.len(),
            table.rows.len()
        )));
    }

    let mut out = table.clone();
    out.columns.push(PREDICTION_COLUMN.to_string());
    out.columns.push(ACTION_COLUMN.to_string());
    let mut matched = 0usize;
    for (row, label) in out.rows.iter_mut().zip(&predictions) {
        let action = match actions.get(&label.to_string()) {
            Some(a) => {
                matched += 1;
                a.clone()
            }
            None => NO_ACTION_PLACEHOLDER.to_string(),
        };
        row.push(Cell::from(label.clone()));
        row.push(Cell::Text(action));
    }
    info!(rows = out.rows.len(), with_action = matched, "Predictions annotated");

    Ok(AnnotatedResult { table: out, predictions })
}

/// Count of each predicted label, in first-seen order.
pub fn prediction_summary(predictions: &[Label]) -> Vec<(String, usize)> {
    let mut summary: Vec<(String, usize)> = Vec::new();
    for label in predictions {
        let key = label.to_string();
        match summary.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => summary.push((key, 1)),
        }
    }
    summary
}
