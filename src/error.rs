use chrono::NaiveDate;
use thiserror::Error;

/// Every failure the dashboard pipeline can report.
///
/// Load errors (`Io`, `Workbook`, `Csv`, `SheetNotFound`, `HeaderRowMissing`,
/// `MissingColumns`, `UnsupportedSource`) are fatal at startup. An empty
/// filter result is never an error.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to parse CSV {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("header row {row} is missing from '{source_name}'")]
    HeaderRowMissing { source_name: String, row: usize },

    #[error("header row is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported source file: {0}")]
    UnsupportedSource(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown file type '{0}' (expected one of pdf, doc, docx, xls, xlsx)")]
    UnknownFileType(String),

    #[error("unknown chart '{0}'")]
    UnknownChart(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
