use chrono::{Duration, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DashboardError;

lazy_static! {
    static ref EXTENSION_REGEX: Regex = Regex::new(r"\.([a-zA-Z0-9]+)$").unwrap();
}

/// Text formats accepted for timestamp cells stored as strings
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Largest serial Excel can represent (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// Document types the dashboard keeps after loading.
///
/// Any row whose URL extension is not one of these is discarded by the loader,
/// so every `AccessEvent` carries exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Doc,
    Docx,
    Pdf,
    Xls,
    Xlsx,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Doc,
        FileType::Docx,
        FileType::Pdf,
        FileType::Xls,
        FileType::Xlsx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Doc => "doc",
            FileType::Docx => "docx",
            FileType::Pdf => "pdf",
            FileType::Xls => "xls",
            FileType::Xlsx => "xlsx",
        }
    }

    /// Derive the file type from a document URL.
    ///
    /// Takes the trailing `.<ext>` of the URL, compares it case-insensitively
    /// and returns `None` when there is no extension or it is not allowed.
    ///
    /// # Examples
    /// ```
    /// use access_dashboard::record::FileType;
    ///
    /// assert_eq!(FileType::from_url("https://x/y/report.PDF"), Some(FileType::Pdf));
    /// assert_eq!(FileType::from_url("https://x/y/readme"), None);
    /// ```
    pub fn from_url(url: &str) -> Option<Self> {
        extract_extension(url).and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "doc" => Ok(FileType::Doc),
            "docx" => Ok(FileType::Docx),
            "pdf" => Ok(FileType::Pdf),
            "xls" => Ok(FileType::Xls),
            "xlsx" => Ok(FileType::Xlsx),
            _ => Err(DashboardError::UnknownFileType(s.to_string())),
        }
    }
}

/// Lowercased trailing extension of a URL, if any
pub fn extract_extension(url: &str) -> Option<String> {
    EXTENSION_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// One normalized document-access event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub user: Option<String>,
    pub timestamp: NaiveDateTime,
    pub action: Option<String>,
    pub element_type: Option<String>,
    pub url: String,
    pub file_type: FileType,
    pub file_name: Option<String>,
}

impl AccessEvent {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// The (Usuario, Fecha, Acción, Nombre Archivo) projection shown in the table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow<'a> {
    pub user: Option<&'a str>,
    pub timestamp: NaiveDateTime,
    pub action: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

impl<'a> From<&'a AccessEvent> for TableRow<'a> {
    fn from(event: &'a AccessEvent) -> Self {
        TableRow {
            user: event.user.as_deref(),
            timestamp: event.timestamp,
            action: event.action.as_deref(),
            file_name: event.file_name.as_deref(),
        }
    }
}

/// Convert an Excel serial date (1900 date system) to a timestamp.
///
/// The integer part counts days since 1899-12-30 and the fraction is the time
/// of day, rounded to the millisecond.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// Parse a timestamp stored as text
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
