use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{DateRange, VisitDataset, VisitRecord};

// ---------------------------------------------------------------------------
// Filter predicate: date window plus selected diagnostic codes
// ---------------------------------------------------------------------------

/// Active filters. An empty `codes` set means "no code filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub date_range: DateRange,
    pub codes: BTreeSet<String>,
}

impl FilterState {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            codes: BTreeSet::new(),
        }
    }

    /// Whether a record passes both filters. Undated records never pass.
    pub fn matches(&self, record: &VisitRecord) -> bool {
        let Some(date) = record.date else {
            return false;
        };
        self.date_range.contains(date) && (self.codes.is_empty() || self.codes.contains(&record.code))
    }
}

/// Initialise a [`FilterState`] spanning the whole dataset with no code
/// selected (i.e., show everything dated).
pub fn init_filter_state(dataset: &VisitDataset) -> FilterState {
    let span = dataset.date_span.unwrap_or_else(|| {
        let epoch = NaiveDate::default();
        DateRange::new(epoch, epoch)
    });
    FilterState::new(span)
}

/// Records passing the filters, in their original order. The rows are
/// borrowed from `records`; only the collection is new.
pub fn filter_records<'a>(records: &'a [VisitRecord], filters: &FilterState) -> Vec<&'a VisitRecord> {
    records.iter().filter(|rec| filters.matches(rec)).collect()
}

/// Return indices of records that pass the filters.
pub fn filtered_indices(dataset: &VisitDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filters.matches(rec))
        .map(|(i, _)| i)
        .collect()
}
