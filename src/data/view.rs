use chrono::NaiveDate;

use super::aggregate::{
    age_pyramid, choropleth, kpi_summary, resample, sex_distribution, top_n, AgePyramid,
    AggregateTable, Choropleth, GapFill, Granularity, Kpis, RankField, RankOrder, TOP_N,
};
use super::filter::{filter_records, FilterState};
use super::geo::BoundarySet;
use super::model::VisitDataset;

/// Presentation choices that shape the aggregates but not the filtered rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub top_n: usize,
    pub granularity: Granularity,
    pub gap_fill: GapFill,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            top_n: TOP_N,
            granularity: Granularity::Day,
            gap_fill: GapFill::Zeros,
        }
    }
}

/// Every chartable table for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// Rows passing the filters.
    pub visible: usize,
    pub kpis: Kpis,
    pub sexes: AggregateTable<String>,
    /// Smallest first, for horizontal bars.
    pub specialties: AggregateTable<String>,
    /// Largest first, for vertical bars.
    pub insurers: AggregateTable<String>,
    pub pyramid: AgePyramid,
    /// `None` when no boundary file is loaded.
    pub map: Option<Choropleth>,
    pub timeline: AggregateTable<NaiveDate>,
}

/// Filter the dataset once and run every aggregator over the result.
pub fn compute_view(
    dataset: &VisitDataset,
    boundaries: Option<&BoundarySet>,
    filters: &FilterState,
    options: &ViewOptions,
) -> DashboardView {
    let rows = filter_records(&dataset.records, filters);
    log::debug!("{} of {} visits pass the filters", rows.len(), dataset.len());

    DashboardView {
        visible: rows.len(),
        kpis: kpi_summary(&rows),
        sexes: sex_distribution(&rows),
        specialties: top_n(&rows, RankField::Specialty, options.top_n, RankOrder::Ascending),
        insurers: top_n(&rows, RankField::Insurer, options.top_n, RankOrder::Descending),
        pyramid: age_pyramid(&rows),
        map: boundaries.map(|set| choropleth(&rows, set)),
        timeline: resample(&rows, options.granularity, options.gap_fill),
    }
}
