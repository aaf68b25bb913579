use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook {0} contains no worksheets")]
    NoWorksheet(PathBuf),

    #[error("import contains no data rows")]
    Empty,

    #[error("column \"{column}\" is not present in the import (mapping field: {field})")]
    UnknownColumn { field: &'static str, column: String },
}
