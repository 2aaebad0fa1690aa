use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::filter::FilteredView;

/// Value → count table, largest count first.
///
/// Ties are broken by value so the order is deterministic. Rows whose value
/// is null are not listed but counted in `missing`, so
/// `sum() + missing` always equals the number of rows counted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    pub entries: Vec<(String, usize)>,
    pub missing: usize,
}

impl FrequencyTable {
    pub fn from_values<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut missing = 0;
        for value in values {
            match value {
                Some(v) => *counts.entry(v).or_insert(0) += 1,
                None => missing += 1,
            }
        }

        let mut entries: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        FrequencyTable { entries, missing }
    }

    pub fn sum(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, count)| *count)
    }
}

/// Number of events on one calendar day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Everything the dashboard shows about a filtered view.
///
/// An empty view yields zero metrics and empty tables, never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unique_users: usize,
    /// Zero when the source has no file name column
    pub unique_files: usize,
    pub by_file_type: FrequencyTable,
    pub by_user: FrequencyTable,
    pub by_action: FrequencyTable,
    /// Chronological
    pub daily: Vec<DailyCount>,
}

impl Summary {
    pub fn from_view(view: &FilteredView<'_>) -> Self {
        let rows = view.rows();

        let unique_users = rows
            .iter()
            .filter_map(|e| e.user.as_deref())
            .collect::<HashSet<_>>()
            .len();
        let unique_files = if view.has_file_names() {
            rows.iter()
                .filter_map(|e| e.file_name.as_deref())
                .collect::<HashSet<_>>()
                .len()
        } else {
            0
        };

        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for event in rows {
            *per_day.entry(event.date()).or_insert(0) += 1;
        }

        Summary {
            total: rows.len(),
            unique_users,
            unique_files,
            by_file_type: FrequencyTable::from_values(
                rows.iter().map(|e| Some(e.file_type.as_str())),
            ),
            by_user: FrequencyTable::from_values(rows.iter().map(|e| e.user.as_deref())),
            by_action: FrequencyTable::from_values(rows.iter().map(|e| e.action.as_deref())),
            daily: per_day
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_sort_by_value() {
        let table = FrequencyTable::from_values(
            ["view", "edit", "view", "delete", "edit"]
                .into_iter()
                .map(Some),
        );
        assert_eq!(
            table.entries,
            vec![
                ("edit".to_string(), 2),
                ("view".to_string(), 2),
                ("delete".to_string(), 1)
            ]
        );
        assert_eq!(table.get("delete"), Some(1));
        assert_eq!(table.get("print"), None);
    }

    #[test]
    fn nulls_are_counted_apart() {
        let table = FrequencyTable::from_values(vec![Some("ana"), None, Some("ana"), None]);
        assert_eq!(table.entries, vec![("ana".to_string(), 2)]);
        assert_eq!(table.missing, 2);
        assert_eq!(table.sum() + table.missing, 4);
    }
}
