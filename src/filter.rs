use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dataset::AccessLog;
use crate::error::{DashboardError, Result};
use crate::record::{AccessEvent, FileType, TableRow};

/// The user's current facet selection.
///
/// Every field is optional: `None` means the facet is not filtering. The
/// active facets are combined with a logical AND, evaluated row by row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub user: Option<String>,
    pub action: Option<String>,
    pub file_type: Option<FileType>,
    /// Case-insensitive substring of the file name; empty means no filter
    pub file_name_contains: Option<String>,
    /// Exact file name
    pub file_name: Option<String>,
    /// Inclusive, defaults to the first date in the log
    pub start_date: Option<NaiveDate>,
    /// Inclusive, defaults to the last date in the log
    pub end_date: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn with_file_name_containing(mut self, text: impl Into<String>) -> Self {
        self.file_name_contains = Some(text.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Resolve the date bounds against the log, rejecting inverted ranges.
    ///
    /// Returns `Ok(None)` only for an empty log with no explicit bounds.
    pub fn date_range(&self, log: &AccessLog) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let bounds = log.date_bounds();
        let start = self.start_date.or(bounds.map(|(min, _)| min));
        let end = self.end_date.or(bounds.map(|(_, max)| max));

        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                Err(DashboardError::InvalidDateRange { start, end })
            }
            (Some(start), Some(end)) => Ok(Some((start, end))),
            _ => Ok(None),
        }
    }

    /// Apply the selection to the log.
    ///
    /// # Arguments
    /// * `log` - The normalized log; it is only borrowed
    ///
    /// # Returns
    /// * `Result<FilteredView>` - Matching rows in log order, or
    ///   `InvalidDateRange` when the start date is after the end date
    ///
    /// # Examples
    /// ```
    /// use access_dashboard::dataset::AccessLog;
    /// use access_dashboard::filter::FilterSpec;
    ///
    /// let log = AccessLog::default();
    /// let view = FilterSpec::new().with_user("ana").apply(&log).unwrap();
    /// assert!(view.is_empty());
    /// ```
    pub fn apply<'a>(&self, log: &'a AccessLog) -> Result<FilteredView<'a>> {
        let range = self.date_range(log)?;
        let predicate = RowPredicate::new(self, range, log.has_file_names());

        let rows: Vec<&AccessEvent> = log
            .events()
            .iter()
            .filter(|event| predicate.matches(event))
            .collect();

        debug!("filter {:?} kept {} of {} rows", self, rows.len(), log.len());
        Ok(FilteredView {
            rows,
            has_file_names: log.has_file_names(),
        })
    }
}

/// The selection prepared for per-row evaluation
struct RowPredicate<'s> {
    user: Option<&'s str>,
    action: Option<&'s str>,
    file_type: Option<FileType>,
    name_needle: Option<String>,
    file_name: Option<&'s str>,
    range: Option<(NaiveDate, NaiveDate)>,
}

impl<'s> RowPredicate<'s> {
    fn new(spec: &'s FilterSpec, range: Option<(NaiveDate, NaiveDate)>, has_file_names: bool) -> Self {
        // File name facets are skipped when the column does not exist
        let name_needle = spec
            .file_name_contains
            .as_deref()
            .filter(|text| has_file_names && !text.is_empty())
            .map(str::to_lowercase);
        let file_name = spec.file_name.as_deref().filter(|_| has_file_names);

        RowPredicate {
            user: spec.user.as_deref(),
            action: spec.action.as_deref(),
            file_type: spec.file_type,
            name_needle,
            file_name,
            range,
        }
    }

    fn matches(&self, event: &AccessEvent) -> bool {
        if let Some(user) = self.user {
            if event.user.as_deref() != Some(user) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if event.action.as_deref() != Some(action) {
                return false;
            }
        }
        if let Some(file_type) = self.file_type {
            if event.file_type != file_type {
                return false;
            }
        }
        if let Some(needle) = &self.name_needle {
            match &event.file_name {
                Some(name) if name.to_lowercase().contains(needle.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(file_name) = self.file_name {
            if event.file_name.as_deref() != Some(file_name) {
                return false;
            }
        }
        if let Some((start, end)) = self.range {
            let date = event.date();
            if date < start || date > end {
                return false;
            }
        }
        true
    }
}

/// Read-only projection of the log holding the rows that passed a filter
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredView<'a> {
    rows: Vec<&'a AccessEvent>,
    has_file_names: bool,
}

impl<'a> FilteredView<'a> {
    /// The whole log, unfiltered
    pub fn all(log: &'a AccessLog) -> Self {
        FilteredView {
            rows: log.events().iter().collect(),
            has_file_names: log.has_file_names(),
        }
    }

    pub fn rows(&self) -> &[&'a AccessEvent] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_file_names(&self) -> bool {
        self.has_file_names
    }

    /// Whether the access table has anything to show. It needs matching rows
    /// and a file-name column; otherwise surfaces print a "no data" notice.
    pub fn has_table(&self) -> bool {
        !self.is_empty() && self.has_file_names
    }

    /// Rows for the (Usuario, Fecha, Acción, Nombre Archivo) table
    pub fn table_rows(&self) -> Vec<TableRow<'a>> {
        self.rows.iter().map(|event| TableRow::from(*event)).collect()
    }
}
