#![allow(dead_code)]

use access_dashboard::{AccessEvent, AccessLog, FileType};
use chrono::NaiveDate;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn event(
    user: Option<&str>,
    d: u32,
    hour: u32,
    action: Option<&str>,
    file_type: FileType,
    file_name: Option<&str>,
) -> AccessEvent {
    let url = match file_name {
        Some(name) => format!("https://intranet/docs/{name}"),
        None => format!("https://intranet/docs/sin-nombre.{file_type}"),
    };
    AccessEvent {
        user: user.map(str::to_string),
        timestamp: day(d).and_hms_opt(hour, 15, 0).unwrap(),
        action: action.map(str::to_string),
        element_type: Some("Archivo".to_string()),
        url,
        file_type,
        file_name: file_name.map(str::to_string),
    }
}

/// The three-row log used throughout the docs:
/// ana/view/pdf on the 1st, ana/download/docx on the 2nd, bob/view/pdf on the 1st
pub fn sample_log() -> AccessLog {
    AccessLog::new(
        vec![
            event(Some("ana"), 1, 9, Some("view"), FileType::Pdf, Some("Report.PDF")),
            event(Some("ana"), 2, 10, Some("download"), FileType::Docx, Some("minutes.docx")),
            event(Some("bob"), 1, 23, Some("view"), FileType::Pdf, Some("budget.pdf")),
        ],
        true,
    )
}

/// A larger log with nulls and several days
pub fn busy_log() -> AccessLog {
    AccessLog::new(
        vec![
            event(Some("ana"), 1, 8, Some("view"), FileType::Pdf, Some("Report.PDF")),
            event(Some("ana"), 1, 9, Some("download"), FileType::Pdf, Some("Report.PDF")),
            event(Some("bob"), 2, 10, Some("view"), FileType::Xlsx, Some("Budget 2024.xlsx")),
            event(None, 2, 11, Some("view"), FileType::Docx, None),
            event(Some("carla"), 3, 12, None, FileType::Doc, Some("old-report.doc")),
            event(Some("bob"), 5, 13, Some("edit"), FileType::Xls, Some("budget.xls")),
            event(Some("ana"), 5, 14, Some("view"), FileType::Pdf, Some("manual.pdf")),
        ],
        true,
    )
}

pub const HEADER: &str =
    "Id. de usuario,Ocurrencia (GMT),Evento,Tipo de elemento,Ubicación del documento,SourceFileName";
