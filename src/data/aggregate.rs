//! Derived views over a filtered record set.
//!
//! Every function here is pure, takes the filtered rows as `&[&VisitRecord]`
//! and returns an empty or zeroed table for empty input.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::geo::{normalize_name, BoundarySet};
use super::model::VisitRecord;

/// Categories kept by the specialty and insurer rankings.
pub const TOP_N: usize = 15;

/// Symmetric pyramid axis used when there is nothing to plot.
pub const DEFAULT_PYRAMID_AXIS: f64 = 10.0;

// ---------------------------------------------------------------------------
// AggregateTable – ordered (key, count) pairs
// ---------------------------------------------------------------------------

/// Counts keyed by category label or time bucket, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateTable<K> {
    pub entries: Vec<(K, usize)>,
}

impl<K> Default for AggregateTable<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K> AggregateTable<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Largest single count (0 when empty).
    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, usize)> {
        self.entries.iter()
    }
}

/// Count occurrences of `key` and order them largest first, ties by label.
/// Missing and blank keys are not counted.
fn value_counts<'a, F>(records: &[&'a VisitRecord], key: F) -> AggregateTable<String>
where
    F: Fn(&'a VisitRecord) -> Option<&'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &rec in records {
        if let Some(k) = key(rec).filter(|k| !k.is_empty()) {
            *counts.entry(k).or_default() += 1;
        }
    }
    let mut entries: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    entries.sort_by(|(la, na), (lb, nb)| nb.cmp(na).then_with(|| la.cmp(lb)));
    AggregateTable { entries }
}

// ---------------------------------------------------------------------------
// KPI summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Kpis {
    pub total_visits: usize,
    /// Distinct non-blank patient ids.
    pub unique_patients: usize,
    /// Mean of the known ages, rounded down.
    pub mean_age: u32,
}

pub fn kpi_summary(records: &[&VisitRecord]) -> Kpis {
    let unique_patients = records
        .iter()
        .map(|rec| rec.patient_id.as_str())
        .filter(|id| !id.is_empty())
        .collect::<HashSet<_>>()
        .len();

    let (age_sum, age_count) = records
        .iter()
        .filter_map(|rec| rec.age)
        .fold((0.0_f64, 0usize), |(sum, n), age| (sum + age, n + 1));
    let mean_age = if age_count == 0 {
        0
    } else {
        (age_sum / age_count as f64).floor() as u32
    };

    Kpis {
        total_visits: records.len(),
        unique_patients,
        mean_age,
    }
}

// ---------------------------------------------------------------------------
// Sex distribution
// ---------------------------------------------------------------------------

/// Visits per sex label, largest first. Rows without a sex are skipped.
pub fn sex_distribution(records: &[&VisitRecord]) -> AggregateTable<String> {
    value_counts(records, |rec| rec.sex.as_deref())
}

// ---------------------------------------------------------------------------
// Top-N rankings
// ---------------------------------------------------------------------------

/// Category a ranking groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankField {
    Specialty,
    Insurer,
}

impl RankField {
    fn value<'a>(&self, rec: &'a VisitRecord) -> &'a str {
        match self {
            RankField::Specialty => &rec.specialty,
            RankField::Insurer => &rec.insurer,
        }
    }
}

/// Display order of a ranking once the top categories are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Smallest first; horizontal bars then grow towards the top.
    Ascending,
    Descending,
}

/// The `n` most frequent categories of `field`, ordered per `order`.
pub fn top_n(
    records: &[&VisitRecord],
    field: RankField,
    n: usize,
    order: RankOrder,
) -> AggregateTable<String> {
    let mut table = value_counts(records, |rec| Some(field.value(rec)));
    table.entries.truncate(n);
    if order == RankOrder::Ascending {
        table.entries.reverse();
    }
    table
}

// ---------------------------------------------------------------------------
// Age pyramid
// ---------------------------------------------------------------------------

/// Upper edges of every band but the last. A band holds ages greater than
/// the previous edge and up to its own.
const BAND_UPPER_EDGES: [f64; 8] = [9.0, 19.0, 29.0, 39.0, 49.0, 59.0, 69.0, 79.0];

/// Ten-year age band; edges are right-closed and the last band is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    Under10,
    Teens,
    Twenties,
    Thirties,
    Forties,
    Fifties,
    Sixties,
    Seventies,
    EightyPlus,
}

impl AgeBand {
    pub const ALL: [AgeBand; 9] = [
        AgeBand::Under10,
        AgeBand::Teens,
        AgeBand::Twenties,
        AgeBand::Thirties,
        AgeBand::Forties,
        AgeBand::Fifties,
        AgeBand::Sixties,
        AgeBand::Seventies,
        AgeBand::EightyPlus,
    ];

    /// Band of a (possibly fractional) age: 9 is in `0-9`, 9.5 in `10-19`.
    pub fn of(age: f64) -> AgeBand {
        let above = BAND_UPPER_EDGES.iter().take_while(|&&edge| age > edge).count();
        AgeBand::ALL[above]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Under10 => "0-9",
            AgeBand::Teens => "10-19",
            AgeBand::Twenties => "20-29",
            AgeBand::Thirties => "30-39",
            AgeBand::Forties => "40-49",
            AgeBand::Fifties => "50-59",
            AgeBand::Sixties => "60-69",
            AgeBand::Seventies => "70-79",
            AgeBand::EightyPlus => "80+",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side of the pyramid a sex label is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidSide {
    Male,
    Female,
    Other,
}

impl PyramidSide {
    pub fn classify(sex: &str) -> PyramidSide {
        match sex.trim().to_uppercase().as_str() {
            "MASCULINO" | "M" | "MALE" => PyramidSide::Male,
            "FEMININO" | "F" | "FEMALE" => PyramidSide::Female,
            _ => PyramidSide::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidRow {
    pub band: AgeBand,
    pub male: usize,
    pub female: usize,
    /// Sex labels that are neither male nor female.
    pub other: usize,
}

impl PyramidRow {
    /// Male count negated for the left half of a back-to-back chart.
    pub fn male_bar(&self) -> f64 {
        -(self.male as f64)
    }

    pub fn female_bar(&self) -> f64 {
        self.female as f64
    }

    pub fn total(&self) -> usize {
        self.male + self.female + self.other
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgePyramid {
    /// One row per [`AgeBand`], youngest first.
    pub rows: Vec<PyramidRow>,
    /// Symmetric half-width of the count axis.
    pub axis_max: f64,
}

impl AgePyramid {
    pub fn total(&self) -> usize {
        self.rows.iter().map(PyramidRow::total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Cross-tabulate age band × sex. Rows lacking age or sex are skipped.
pub fn age_pyramid(records: &[&VisitRecord]) -> AgePyramid {
    let mut rows: Vec<PyramidRow> = AgeBand::ALL
        .iter()
        .map(|&band| PyramidRow {
            band,
            male: 0,
            female: 0,
            other: 0,
        })
        .collect();

    for rec in records {
        let (Some(age), Some(sex)) = (rec.age, rec.sex.as_deref()) else {
            continue;
        };
        let row = &mut rows[AgeBand::of(age) as usize];
        match PyramidSide::classify(sex) {
            PyramidSide::Male => row.male += 1,
            PyramidSide::Female => row.female += 1,
            PyramidSide::Other => row.other += 1,
        }
    }

    let largest = rows
        .iter()
        .flat_map(|r| [r.male, r.female, r.other])
        .max()
        .unwrap_or(0);
    let axis_max = if largest == 0 {
        DEFAULT_PYRAMID_AXIS
    } else {
        largest as f64
    };

    AgePyramid { rows, axis_max }
}

// ---------------------------------------------------------------------------
// Geographic join
// ---------------------------------------------------------------------------

/// Visits per municipality exactly as spelled in the dataset.
pub fn municipality_counts(records: &[&VisitRecord]) -> AggregateTable<String> {
    value_counts(records, |rec| Some(rec.municipality.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCount {
    /// Region name as written in the boundary file.
    pub name: String,
    /// Normalized join key.
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Choropleth {
    /// One entry per boundary region, in boundary-file order.
    pub regions: Vec<RegionCount>,
    /// Dataset municipalities with no matching region, largest first.
    pub unmatched: AggregateTable<String>,
}

impl Choropleth {
    pub fn max_count(&self) -> usize {
        self.regions.iter().map(|r| r.count).max().unwrap_or(0)
    }

    pub fn matched_total(&self) -> usize {
        self.regions.iter().map(|r| r.count).sum()
    }
}

/// Join visit counts onto boundary regions by normalized name.
pub fn choropleth(records: &[&VisitRecord], boundaries: &BoundarySet) -> Choropleth {
    // Spellings sharing a key are merged; the most frequent one names the entry.
    let mut by_key: HashMap<String, (String, usize)> = HashMap::new();
    for (name, count) in municipality_counts(records).entries {
        by_key.entry(normalize_name(&name)).or_insert((name, 0)).1 += count;
    }

    let regions: Vec<RegionCount> = boundaries
        .regions
        .iter()
        .map(|region| RegionCount {
            name: region.name.clone(),
            key: region.key.clone(),
            count: by_key.get(&region.key).map_or(0, |(_, n)| *n),
        })
        .collect();

    let known: HashSet<&str> = boundaries.regions.iter().map(|r| r.key.as_str()).collect();
    let mut unmatched: Vec<(String, usize)> = by_key
        .into_iter()
        .filter(|(key, _)| !known.contains(key.as_str()))
        .map(|(_, named)| named)
        .collect();
    unmatched.sort_by(|(la, na), (lb, nb)| nb.cmp(na).then_with(|| la.cmp(lb)));

    Choropleth {
        regions,
        unmatched: AggregateTable { entries: unmatched },
    }
}

// ---------------------------------------------------------------------------
// Temporal resampling
// ---------------------------------------------------------------------------

/// Calendar period used to bucket visit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    /// Weeks start on Monday.
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
                .unwrap_or(date),
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the bucket following the one starting at `bucket`.
    pub fn next_bucket(&self, bucket: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => bucket.checked_add_days(Days::new(1)),
            Granularity::Week => bucket.checked_add_days(Days::new(7)),
            Granularity::Month => bucket.checked_add_months(Months::new(1)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Day => "Day",
            Granularity::Week => "Week",
            Granularity::Month => "Month",
        }
    }
}

/// Whether empty periods between the first and last visit are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapFill {
    /// Emit every bucket in the span, with zero counts for empty periods.
    Zeros,
    /// Emit only buckets containing at least one visit.
    Omit,
}

/// Visits per calendar bucket, ordered by bucket start. Undated rows are
/// skipped.
pub fn resample(
    records: &[&VisitRecord],
    granularity: Granularity,
    gaps: GapFill,
) -> AggregateTable<NaiveDate> {
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in records.iter().filter_map(|rec| rec.date) {
        *buckets.entry(granularity.bucket_start(date)).or_default() += 1;
    }

    let first = buckets.keys().next().copied();
    let last = buckets.keys().next_back().copied();
    let entries = match (gaps, first, last) {
        (GapFill::Zeros, Some(first), Some(last)) => {
            let mut filled = Vec::new();
            let mut cursor = Some(first);
            while let Some(bucket) = cursor.filter(|b| *b <= last) {
                filled.push((bucket, buckets.get(&bucket).copied().unwrap_or(0)));
                cursor = granularity.next_bucket(bucket);
            }
            filled
        }
        _ => buckets.into_iter().collect(),
    };

    AggregateTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn band_edges_are_right_closed() {
        assert_eq!(AgeBand::of(0.0), AgeBand::Under10);
        assert_eq!(AgeBand::of(9.0), AgeBand::Under10);
        assert_eq!(AgeBand::of(9.5), AgeBand::Teens);
        assert_eq!(AgeBand::of(10.0), AgeBand::Teens);
        assert_eq!(AgeBand::of(79.0), AgeBand::Seventies);
        assert_eq!(AgeBand::of(79.2), AgeBand::EightyPlus);
        assert_eq!(AgeBand::of(130.0), AgeBand::EightyPlus);
        assert_eq!(AgeBand::ALL.map(|b| b as usize), [0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn sex_labels_are_classified() {
        assert_eq!(PyramidSide::classify("MASCULINO"), PyramidSide::Male);
        assert_eq!(PyramidSide::classify(" feminino "), PyramidSide::Female);
        assert_eq!(PyramidSide::classify("IGNORADO"), PyramidSide::Other);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-01-07 is a Sunday, 2024-01-08 a Monday.
        assert_eq!(Granularity::Week.bucket_start(d(2024, 1, 7)), d(2024, 1, 1));
        assert_eq!(Granularity::Week.bucket_start(d(2024, 1, 8)), d(2024, 1, 8));
        assert_eq!(Granularity::Month.bucket_start(d(2024, 2, 29)), d(2024, 2, 1));
        assert_eq!(Granularity::Month.next_bucket(d(2024, 12, 1)), Some(d(2025, 1, 1)));
    }

    #[test]
    fn mean_age_uses_fractional_ages() {
        let ages = [1.5, 2.5];
        let records: Vec<VisitRecord> = ages
            .iter()
            .map(|&age| VisitRecord {
                age: Some(age),
                ..VisitRecord::default()
            })
            .collect();
        let rows: Vec<&VisitRecord> = records.iter().collect();
        assert_eq!(kpi_summary(&rows).mean_age, 2);
    }

    #[test]
    fn blank_cells_are_not_categories() {
        let blank = VisitRecord {
            age: Some(40.0),
            ..VisitRecord::default()
        };
        let full = VisitRecord {
            patient_id: "7".to_string(),
            code: "A".to_string(),
            specialty: "CLINICA".to_string(),
            insurer: "SUS".to_string(),
            municipality: "SERRA".to_string(),
            ..VisitRecord::default()
        };
        let rows = vec![&blank, &blank, &full];

        assert_eq!(kpi_summary(&rows).unique_patients, 1);
        let specialties = top_n(&rows, RankField::Specialty, TOP_N, RankOrder::Descending);
        assert_eq!(specialties.entries, vec![("CLINICA".to_string(), 1)]);
        let insurers = top_n(&rows, RankField::Insurer, TOP_N, RankOrder::Descending);
        assert_eq!(insurers.entries, vec![("SUS".to_string(), 1)]);
        assert_eq!(municipality_counts(&rows).entries, vec![("SERRA".to_string(), 1)]);
        let map = choropleth(&rows, &BoundarySet::default());
        assert_eq!(map.unmatched.entries, vec![("SERRA".to_string(), 1)]);
    }

    #[test]
    fn empty_pyramid_uses_default_axis() {
        let pyramid = age_pyramid(&[]);
        assert_eq!(pyramid.rows.len(), 9);
        assert!(pyramid.is_empty());
        assert_eq!(pyramid.axis_max, DEFAULT_PYRAMID_AXIS);
    }

    #[test]
    fn male_bars_are_negated() {
        let row = PyramidRow {
            band: AgeBand::Thirties,
            male: 4,
            female: 3,
            other: 0,
        };
        assert_eq!(row.male_bar(), -4.0);
        assert_eq!(row.female_bar(), 3.0);
    }
}
