//! Error types for survey operations.

use std::path::PathBuf;

use crate::command_line::TokenizeError;
use crate::query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not find {} or {}", .cache.display(), .workbook.display())]
    NoData { cache: PathBuf, workbook: PathBuf },

    #[error("{0}")]
    Usage(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid command line: {0}")]
    Tokenize(#[from] TokenizeError),

    #[error("Invalid response query: {0}")]
    Query(#[from] QueryError),
}

pub type Result<T> = std::result::Result<T, Error>;
