//! Pipeline error types. Every stage returns a [`StageError`] so the surface
//! (web page or CLI) can render the failure once, tagged with where it happened.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StageError>;

/// Where in a submission a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Startup,
    Input,
    Manual,
    Logs,
    Inference,
    Export,
    Alert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Startup => "startup",
            Stage::Input => "input",
            Stage::Manual => "technical manual",
            Stage::Logs => "equipment logs",
            Stage::Inference => "prediction",
            Stage::Export => "export",
            Stage::Alert => "alert",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or corrupt model artifacts, invalid environment values.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Please fill in all fields and upload both files (missing: {})", .0.join(", "))]
    MissingInput(Vec<&'static str>),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    /// Uploaded table does not fit the fitted scaler/model.
    #[error("Input data does not match the model: {0}")]
    DataShape(String),

    #[error("Could not read the technical manual: {0}")]
    Manual(String),

    #[error("Could not read the spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Could not write results: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl StageError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    /// True for failures caused by what the user submitted, as opposed to
    /// server configuration.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.source,
            Error::MissingInput(_)
                | Error::UnsupportedFile(_)
                | Error::DataShape(_)
                | Error::Manual(_)
                | Error::Spreadsheet(_)
        )
    }
}

/// Tag a bare [`Error`] result with its stage.
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<Error>> StageExt<T> for std::result::Result<T, E> {
    fn at(self, stage: Stage) -> Result<T> {
        self.map_err(|e| StageError::new(stage, e.into()))
    }
}
