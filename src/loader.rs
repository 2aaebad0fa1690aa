use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::path::Path;

use crate::config::SourceConfig;
use crate::dataset::AccessLog;
use crate::error::{DashboardError, Result};
use crate::record::{AccessEvent, FileType, excel_serial_to_datetime, parse_timestamp};

/// Source header for Usuario
pub const USER_HEADER: &str = "Id. de usuario";
/// Source header for Fecha
pub const TIMESTAMP_HEADER: &str = "Ocurrencia (GMT)";
/// Source header for Acción
pub const ACTION_HEADER: &str = "Evento";
/// Source header for Tipo de Elemento
pub const ELEMENT_TYPE_HEADER: &str = "Tipo de elemento";
/// Source header for URL
pub const URL_HEADER: &str = "Ubicación del documento";
/// Source header for Nombre Archivo
pub const FILE_NAME_HEADER: &str = "SourceFileName";

/// A cell value before it is mapped onto an `AccessEvent` field
#[derive(Clone, Debug, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Timestamp(NaiveDateTime),
}

impl RawCell {
    fn from_data(cell: &Data) -> Self {
        match cell {
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                RawCell::Text(s.clone())
            }
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Text(b.to_string()),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(RawCell::Timestamp)
                .unwrap_or(RawCell::Empty),
            _ => RawCell::Empty,
        }
    }

    /// Cell as text; blank cells are null
    fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) if s.trim().is_empty() => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            RawCell::Number(n) => Some(n.to_string()),
            RawCell::Timestamp(ts) => Some(ts.to_string()),
        }
    }

    fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => parse_timestamp(s),
            RawCell::Number(n) => excel_serial_to_datetime(*n),
            RawCell::Timestamp(ts) => Some(*ts),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Positions of the source columns inside a data row
#[derive(Debug, PartialEq)]
struct ColumnMap {
    user: usize,
    timestamp: usize,
    action: usize,
    element_type: Option<usize>,
    url: usize,
    file_name: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[RawCell]) -> Result<Self> {
        let names: Vec<Option<String>> = headers
            .iter()
            .map(|h| h.as_text().map(|t| t.trim().to_string()))
            .collect();
        let find = |wanted: &str| names.iter().position(|n| n.as_deref() == Some(wanted));

        let mut missing = Vec::new();
        let mut require = |wanted: &str| {
            let index = find(wanted);
            if index.is_none() {
                missing.push(wanted.to_string());
            }
            index.unwrap_or_default()
        };
        let user = require(USER_HEADER);
        let timestamp = require(TIMESTAMP_HEADER);
        let action = require(ACTION_HEADER);
        let url = require(URL_HEADER);

        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns(missing));
        }

        Ok(ColumnMap {
            user,
            timestamp,
            action,
            element_type: find(ELEMENT_TYPE_HEADER),
            url,
            file_name: find(FILE_NAME_HEADER),
        })
    }
}

/// Running counts reported once the log is normalized
#[derive(Debug, Default)]
struct LoadStats {
    read: usize,
    no_timestamp: usize,
    bad_timestamp: usize,
    disallowed_type: usize,
}

static EMPTY_CELL: RawCell = RawCell::Empty;

fn cell(row: &[RawCell], index: usize) -> &RawCell {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// Turn a header row plus data rows into the normalized log.
///
/// Drops rows without a usable timestamp and rows whose URL extension is not
/// an allowed document type.
fn normalize(headers: &[RawCell], rows: Vec<Vec<RawCell>>) -> Result<AccessLog> {
    let columns = ColumnMap::resolve(headers)?;
    let mut stats = LoadStats::default();
    let mut events = Vec::with_capacity(rows.len());

    for row in rows {
        stats.read += 1;

        let raw_timestamp = cell(&row, columns.timestamp);
        if raw_timestamp.is_empty() {
            stats.no_timestamp += 1;
            continue;
        }
        let Some(timestamp) = raw_timestamp.as_timestamp() else {
            stats.bad_timestamp += 1;
            debug!("unparseable timestamp {:?}", raw_timestamp);
            continue;
        };

        let url = cell(&row, columns.url).as_text().unwrap_or_default();
        let Some(file_type) = FileType::from_url(&url) else {
            stats.disallowed_type += 1;
            continue;
        };

        events.push(AccessEvent {
            user: cell(&row, columns.user).as_text(),
            timestamp,
            action: cell(&row, columns.action).as_text(),
            element_type: columns.element_type.and_then(|i| cell(&row, i).as_text()),
            url,
            file_type,
            file_name: columns.file_name.and_then(|i| cell(&row, i).as_text()),
        });
    }

    if stats.bad_timestamp > 0 {
        warn!(
            "dropped {} rows with an unparseable '{}' value",
            stats.bad_timestamp, TIMESTAMP_HEADER
        );
    }
    info!(
        "loaded {} of {} rows ({} without timestamp, {} with other file types)",
        events.len(),
        stats.read,
        stats.no_timestamp,
        stats.disallowed_type
    );
    if columns.file_name.is_none() {
        info!("source has no '{}' column", FILE_NAME_HEADER);
    }

    Ok(AccessLog::new(events, columns.file_name.is_some()))
}

/// Split rows at the header offset and normalize what follows it
fn normalize_at_offset(
    source_name: &str,
    header_row: usize,
    mut rows: Vec<Vec<RawCell>>,
) -> Result<AccessLog> {
    if header_row >= rows.len() {
        return Err(DashboardError::HeaderRowMissing {
            source_name: source_name.to_string(),
            row: header_row,
        });
    }
    let data = rows.split_off(header_row + 1);
    let headers = rows.pop().unwrap_or_default();
    normalize(&headers, data)
}

/// Load an access log from a workbook sheet
///
/// Opens the workbook with calamine, selects the named sheet and treats the
/// row at `header_row` (zero-based, counted from the top of the sheet) as the
/// header. Rows above it are ignored.
///
/// # Arguments
/// * `filepath` - Path to the workbook (xlsx, xlsm, xls or ods)
/// * `sheet` - Name of the sheet holding the report
/// * `header_row` - Zero-based row index of the header
///
/// # Returns
/// * `Result<AccessLog>` - The normalized log or a load error
///
/// # Examples
/// ```no_run
/// use access_dashboard::loader::from_excel;
///
/// match from_excel("log_modelo.xlsx", "Datos del informe 1", 2) {
///     Ok(log) => println!("Loaded {} events", log.len()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn from_excel(filepath: impl AsRef<Path>, sheet: &str, header_row: usize) -> Result<AccessLog> {
    let path = filepath.as_ref();
    let path_name = path.display().to_string();

    let mut workbook = open_workbook_auto(path).map_err(|source| DashboardError::Workbook {
        path: path_name.clone(),
        source,
    })?;

    let available = workbook.sheet_names();
    if !available.iter().any(|name| name == sheet) {
        return Err(DashboardError::SheetNotFound {
            sheet: sheet.to_string(),
            available,
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| DashboardError::Workbook {
            path: path_name.clone(),
            source,
        })?;

    // calamine ranges start at the first used cell, not at A1
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    if range.is_empty() || header_row < first_row || header_row - first_row >= range.height() {
        return Err(DashboardError::HeaderRowMissing {
            source_name: format!("{path_name}#{sheet}"),
            row: header_row,
        });
    }

    let rows: Vec<Vec<RawCell>> = range
        .rows()
        .map(|row| row.iter().map(RawCell::from_data).collect())
        .collect();

    normalize_at_offset(
        &format!("{path_name}#{sheet}"),
        header_row - first_row,
        rows,
    )
}

/// Load an access log from a CSV export
///
/// Same header rules as [`from_excel`]; every cell is read as text, so the
/// timestamp column must use one of the supported text formats.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
/// * `header_row` - Zero-based record index of the header (blank lines are
///   not counted)
///
/// # Returns
/// * `Result<AccessLog>` - The normalized log or a load error
pub fn from_csv(filepath: impl AsRef<Path>, header_row: usize) -> Result<AccessLog> {
    let path = filepath.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_csv_str(&content, header_row, &path.display().to_string())
}

/// Parse CSV text that has already been read into memory
pub fn from_csv_str(content: &str, header_row: usize, source_name: &str) -> Result<AccessLog> {
    let rows = read_csv_rows(content, source_name)?;
    normalize_at_offset(source_name, header_row, rows)
}

// Split CSV text into records. Quoted fields may hold commas, doubled
// quotes and line breaks; the report preamble is shorter than the data rows.
fn read_csv_rows(content: &str, source_name: &str) -> Result<Vec<Vec<RawCell>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| DashboardError::Csv {
            source_name: source_name.to_string(),
            source,
        })?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Detect file type and load appropriate format
///
/// This function examines the source extension and calls the appropriate
/// loader for CSV or workbook files.
///
/// # Examples
/// ```no_run
/// use access_dashboard::config::SourceConfig;
/// use access_dashboard::loader::load_access_log;
///
/// let log = load_access_log(&SourceConfig::default()).expect("load failed");
/// println!("{} events", log.len());
/// ```
pub fn load_access_log(source: &SourceConfig) -> Result<AccessLog> {
    let path = source.path.as_path();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    info!("loading access log from {}", path.display());
    match extension.as_deref() {
        Some("csv") => from_csv(path, source.header_row),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => {
            from_excel(path, &source.sheet, source.header_row)
        }
        Some(ext) => Err(DashboardError::UnsupportedSource(format!(
            "unsupported file extension: {ext}"
        ))),
        None => Err(DashboardError::UnsupportedSource(format!(
            "{} has no extension",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn csv_records_honour_quotes() {
        let rows = read_csv_rows("a,b,c\n\"Pérez, Ana\",\"say \"\"hi\"\"\",,\"x\ny\"\n", "inline").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![text("a"), text("b"), text("c")]);
        assert_eq!(
            rows[1],
            vec![text("Pérez, Ana"), text("say \"hi\""), RawCell::Empty, text("x\ny")]
        );
    }

    #[test]
    fn csv_records_may_differ_in_width() {
        let rows = read_csv_rows("\u{feff}Informe\n\na,b,c\n", "inline").unwrap();
        assert_eq!(rows, vec![vec![text("Informe")], vec![text("a"), text("b"), text("c")]]);
    }

    #[test]
    fn numbers_render_as_text() {
        assert_eq!(RawCell::Number(1042.0).as_text().as_deref(), Some("1042"));
        assert_eq!(RawCell::Number(2.5).as_text().as_deref(), Some("2.5"));
        assert_eq!(text("   ").as_text(), None);
    }

    #[test]
    fn columns_resolve_by_header_name() {
        let headers = vec![
            text("Evento"),
            text(" Id. de usuario "),
            text("Ocurrencia (GMT)"),
            text("Ubicación del documento"),
        ];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.action, 0);
        assert_eq!(map.user, 1);
        assert_eq!(map.url, 3);
        assert_eq!(map.file_name, None);
        assert_eq!(map.element_type, None);
    }

    #[test]
    fn missing_columns_are_listed() {
        let headers = vec![text("Id. de usuario"), text("Evento")];
        match ColumnMap::resolve(&headers) {
            Err(DashboardError::MissingColumns(missing)) => {
                assert_eq!(missing, vec![TIMESTAMP_HEADER, URL_HEADER]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn short_rows_read_as_empty() {
        let headers = vec![
            text(USER_HEADER),
            text(TIMESTAMP_HEADER),
            text(ACTION_HEADER),
            text(URL_HEADER),
            text(FILE_NAME_HEADER),
        ];
        let rows = vec![vec![
            text("ana"),
            RawCell::Number(45292.25),
            text("view"),
            text("https://x/a.pdf"),
        ]];
        let log = normalize(&headers, rows).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.has_file_names());
        assert_eq!(log.events()[0].file_name, None);
        assert_eq!(log.events()[0].timestamp.to_string(), "2024-01-01 06:00:00");
    }
}
