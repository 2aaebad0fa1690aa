use std::path::Path;

use crate::error::{DashboardError, Result};
use crate::filter::FilteredView;
use crate::record::TableRow;

/// Column headers of the exported table
pub const TABLE_HEADERS: [&str; 4] = ["Usuario", "Fecha", "Acción", "Nombre Archivo"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Export formats for the filtered table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Pick the format from an output path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            _ => Err(DashboardError::UnsupportedSource(format!(
                "cannot export to {} (use .csv or .xlsx)",
                path.display()
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

fn table_cells<'a>(row: &TableRow<'a>) -> [String; 4] {
    [
        row.user.unwrap_or_default().to_string(),
        row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        row.action.unwrap_or_default().to_string(),
        row.file_name.unwrap_or_default().to_string(),
    ]
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert the filtered table to CSV format
///
/// Writes a header row followed by one line per event with the
/// (Usuario, Fecha, Acción, Nombre Archivo) columns. Values containing
/// commas, quotes or newlines are quoted. Null cells are left empty.
///
/// # Arguments
/// * `view` - The filtered view to export
///
/// # Returns
/// * `String` - CSV content
pub fn to_csv(view: &FilteredView<'_>) -> String {
    let mut csv_content = TABLE_HEADERS.join(",");
    csv_content.push('\n');

    for row in view.table_rows() {
        let line: Vec<String> = table_cells(&row).iter().map(|v| escape_csv(v)).collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert the filtered table to XLSX format
///
/// Uses rust_xlsxwriter to build a single-sheet workbook in memory with the
/// same columns as [`to_csv`]. Timestamps are written as text.
///
/// # Arguments
/// * `view` - The filtered view to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
pub fn to_xlsx(view: &FilteredView<'_>) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Accesos")?;

    for (c, header) in TABLE_HEADERS.iter().enumerate() {
        worksheet.write_string(0, c as u16, *header)?;
    }

    for (r, row) in view.table_rows().iter().enumerate() {
        for (c, value) in table_cells(row).iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, c as u16, value.as_str())?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Render the view in `format`
pub fn export(view: &FilteredView<'_>, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => Ok(to_csv(view).into_bytes()),
        ExportFormat::Xlsx => to_xlsx(view),
    }
}

/// Write the view to `path`, choosing the format from its extension
pub fn export_to_file(view: &FilteredView<'_>, path: impl AsRef<Path>) -> Result<ExportFormat> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path)?;
    let bytes = export(view, format)?;
    std::fs::write(path, bytes).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(format)
}
