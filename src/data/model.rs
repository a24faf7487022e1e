use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Codes seen at least this many times in the full dataset are offered as
/// filter options.
pub const RELEVANCE_THRESHOLD: usize = 1000;

// ---------------------------------------------------------------------------
// VisitRecord – one row of the source dataset
// ---------------------------------------------------------------------------

/// A single hospital encounter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisitRecord {
    /// `None` when the source value did not parse as `DD/MM/YYYY`.
    pub date: Option<NaiveDate>,
    pub patient_id: String,
    /// Age in years as recorded; fractional ages are kept.
    pub age: Option<f64>,
    pub sex: Option<String>,
    /// Diagnostic code (CID) description.
    pub code: String,
    pub specialty: String,
    pub insurer: String,
    pub municipality: String,
}

// ---------------------------------------------------------------------------
// DateRange – inclusive date window
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` window over visit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Clamp both endpoints into `bounds`, keeping `start <= end`.
    pub fn clamp_to(&self, bounds: &DateRange) -> DateRange {
        let start = self.start.clamp(bounds.start, bounds.end);
        let end = self.end.clamp(start, bounds.end.max(start));
        DateRange { start, end }
    }
}

// ---------------------------------------------------------------------------
// DiagnosticCode – a code label with its dataset-wide frequency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticCode {
    pub label: String,
    pub frequency: usize,
}

// ---------------------------------------------------------------------------
// VisitDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with indices computed once from the unfiltered
/// rows. Nothing here depends on the active filters.
#[derive(Debug, Clone, Default)]
pub struct VisitDataset {
    pub records: Vec<VisitRecord>,
    /// Occurrences of each non-blank code across the dated rows.
    pub code_frequencies: BTreeMap<String, usize>,
    /// Earliest and latest parseable visit date.
    pub date_span: Option<DateRange>,
    /// Rows whose date could not be parsed.
    pub undated: usize,
}

impl VisitDataset {
    /// Build the dataset-wide indices from the loaded records.
    pub fn from_records(records: Vec<VisitRecord>) -> Self {
        let mut code_frequencies: BTreeMap<String, usize> = BTreeMap::new();
        let mut date_span: Option<DateRange> = None;
        let mut undated = 0;

        for rec in &records {
            match rec.date {
                Some(date) => {
                    if !rec.code.is_empty() {
                        *code_frequencies.entry(rec.code.clone()).or_default() += 1;
                    }
                    date_span = Some(match date_span {
                        Some(span) => DateRange::new(span.start.min(date), span.end.max(date)),
                        None => DateRange::new(date, date),
                    });
                }
                None => undated += 1,
            }
        }

        VisitDataset {
            records,
            code_frequencies,
            date_span,
            undated,
        }
    }

    /// Codes whose dataset-wide frequency reaches `threshold`, sorted by label.
    pub fn relevant_codes(&self, threshold: usize) -> Vec<DiagnosticCode> {
        self.code_frequencies
            .iter()
            .filter(|(_, &frequency)| frequency >= threshold)
            .map(|(label, &frequency)| DiagnosticCode {
                label: label.clone(),
                frequency,
            })
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
