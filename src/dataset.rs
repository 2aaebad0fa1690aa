use chrono::NaiveDate;

use crate::record::AccessEvent;

/// The normalized access log.
///
/// Built once by the loader and never mutated afterwards. Filters borrow it
/// and produce views, so it can be shared freely between readers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccessLog {
    events: Vec<AccessEvent>,
    has_file_names: bool,
}

impl AccessLog {
    /// Wrap already-normalized events.
    ///
    /// `has_file_names` records whether the source carried the file name
    /// column at all, which is different from every name being empty.
    pub fn new(events: Vec<AccessEvent>, has_file_names: bool) -> Self {
        AccessLog {
            events,
            has_file_names,
        }
    }

    pub fn events(&self) -> &[AccessEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn has_file_names(&self) -> bool {
        self.has_file_names
    }

    /// First and last event date, or `None` for an empty log
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.events.iter().map(AccessEvent::date).min()?;
        let max = self.events.iter().map(AccessEvent::date).max()?;
        Some((min, max))
    }
}
