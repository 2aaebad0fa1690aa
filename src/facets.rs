use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::dataset::AccessLog;
use crate::record::FileType;

/// Option lists for the selection inputs.
///
/// Always built from the full log, never from a filtered view, so the choices
/// stay the same while filters are applied. Every list is sorted ascending in
/// case-sensitive byte order and has no duplicates or nulls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FacetOptions {
    pub users: Vec<String>,
    pub actions: Vec<String>,
    pub file_types: Vec<FileType>,
    /// `None` when the source has no file name column
    pub file_names: Option<Vec<String>>,
    /// Default date range: first and last event date
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl FacetOptions {
    pub fn from_log(log: &AccessLog) -> Self {
        let events = log.events();

        let users = distinct(events.iter().map(|e| e.user.as_deref()));
        let actions = distinct(events.iter().map(|e| e.action.as_deref()));

        // FileType orders the same way as its lowercase name
        let file_types = events
            .iter()
            .map(|e| e.file_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let file_names = log
            .has_file_names()
            .then(|| distinct(events.iter().map(|e| e.file_name.as_deref())));

        FacetOptions {
            users,
            actions,
            file_types,
            file_names,
            date_bounds: log.date_bounds(),
        }
    }
}
