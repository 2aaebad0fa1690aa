mod common;

use access_dashboard::downloader::{ExportFormat, export_to_file, to_csv, to_xlsx};
use access_dashboard::{AccessLog, DashboardError, FileType, FilterSpec};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use common::{busy_log, event, sample_log};
use std::io::Cursor;
use tempfile::TempDir;

#[test]
fn csv_has_the_table_columns() {
    let log = sample_log();
    let view = FilterSpec::new().with_user("ana").apply(&log).unwrap();
    let csv = to_csv(&view);
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "Usuario,Fecha,Acción,Nombre Archivo");
    assert_eq!(lines[1], "ana,2024-01-01 09:15:00,view,Report.PDF");
    assert_eq!(lines[2], "ana,2024-01-02 10:15:00,download,minutes.docx");
    assert_eq!(lines.len(), 3);
}

#[test]
fn csv_quotes_and_blanks() {
    let log = AccessLog::new(
        vec![
            event(Some("Pérez, Juan"), 4, 8, None, FileType::Pdf, Some("say \"hi\".pdf")),
            event(None, 4, 9, Some("view"), FileType::Pdf, None),
        ],
        true,
    );
    let csv = to_csv(&FilterSpec::new().apply(&log).unwrap());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[1], "\"Pérez, Juan\",2024-01-04 08:15:00,,\"say \"\"hi\"\".pdf\"");
    assert_eq!(lines[2], ",2024-01-04 09:15:00,view,");
}

#[test]
fn empty_view_exports_only_the_header() {
    let log = busy_log();
    let view = FilterSpec::new().with_user("nobody").apply(&log).unwrap();
    assert_eq!(to_csv(&view), "Usuario,Fecha,Acción,Nombre Archivo\n");
}

#[test]
fn xlsx_round_trips_through_calamine() {
    let log = busy_log();
    let view = FilterSpec::new().with_file_type(FileType::Pdf).apply(&log).unwrap();
    let bytes = to_xlsx(&view).unwrap();

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("Accesos").unwrap();
    assert_eq!(range.height(), 1 + view.len());

    let header: Vec<String> = range.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
    assert_eq!(header, vec!["Usuario", "Fecha", "Acción", "Nombre Archivo"]);

    let first = range.rows().nth(1).unwrap();
    assert_eq!(first[0], Data::String("ana".to_string()));
    assert_eq!(first[3], Data::String("Report.PDF".to_string()));
}

#[test]
fn export_picks_the_format_from_the_extension() {
    let dir = TempDir::new().unwrap();
    let log = sample_log();
    let view = FilterSpec::new().apply(&log).unwrap();

    let csv_path = dir.path().join("accesos.csv");
    assert_eq!(export_to_file(&view, &csv_path).unwrap(), ExportFormat::Csv);
    assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with("Usuario,"));

    let xlsx_path = dir.path().join("accesos.XLSX");
    assert_eq!(export_to_file(&view, &xlsx_path).unwrap(), ExportFormat::Xlsx);
    // xlsx files are zip archives
    assert_eq!(&std::fs::read(&xlsx_path).unwrap()[..2], b"PK");

    assert!(matches!(
        export_to_file(&view, dir.path().join("accesos.pdf")),
        Err(DashboardError::UnsupportedSource(_))
    ));
}
