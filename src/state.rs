use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use epidash::config::DashboardConfig;
use epidash::data::aggregate::Granularity;
use epidash::data::cache::Memo;
use epidash::data::filter::{init_filter_state, FilterState};
use epidash::data::geo::{load_boundaries, normalize_name, BoundarySet};
use epidash::data::loader::load_file;
use epidash::data::model::{DateRange, DiagnosticCode, VisitDataset};
use epidash::data::view::{compute_view, DashboardView, ViewOptions};

use crate::color::ColorMap;

/// Top-level tabs of the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Summary,
    Epidemiology,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Arc<VisitDataset>>,

    /// Boundary regions; `None` disables the map only.
    pub boundaries: Option<Arc<BoundarySet>>,

    /// Filter options, computed once per dataset load.
    pub relevant_codes: Vec<DiagnosticCode>,

    pub filters: FilterState,
    pub options: ViewOptions,

    /// Aggregates for the current filters (cached until they change).
    pub view: Option<DashboardView>,

    /// Colours for the sex labels of the loaded dataset.
    pub sex_colors: ColorMap,

    /// Search text over the code list.
    pub code_search: String,

    pub tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Why the map is unavailable, when it is.
    pub map_message: Option<String>,

    dataset_cache: Memo<VisitDataset>,
    boundary_cache: Memo<BoundarySet>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let options = ViewOptions {
            top_n: config.top_n,
            granularity: config.granularity,
            gap_fill: config.gap_fill,
        };
        Self {
            config,
            dataset: None,
            boundaries: None,
            relevant_codes: Vec::new(),
            filters: init_filter_state(&VisitDataset::default()),
            options,
            view: None,
            sex_colors: ColorMap::default(),
            code_search: String::new(),
            tab: Tab::default(),
            status_message: None,
            map_message: None,
            dataset_cache: Memo::default(),
            boundary_cache: Memo::default(),
        }
    }

    /// Load both configured files (through the caches).
    pub fn load_configured(&mut self) {
        let boundary_path = self.config.boundary_path.clone();
        self.load_boundaries(&boundary_path);
        let dataset_path = self.config.dataset_path.clone();
        self.load_dataset(&dataset_path);
    }

    /// Load (or reuse) the visits dataset at `path`.
    pub fn load_dataset(&mut self, path: &Path) {
        let columns = self.config.columns.clone();
        match self
            .dataset_cache
            .get_or_load(path, |p| load_file(p, &columns))
        {
            Ok(dataset) => {
                self.config.dataset_path = path.to_path_buf();
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.dataset = None;
                self.view = None;
            }
        }
    }

    /// Load (or reuse) boundary regions at `path`; failure only disables the map.
    pub fn load_boundaries(&mut self, path: &Path) {
        let property = self.config.boundary_name_property.clone();
        match self
            .boundary_cache
            .get_or_load(path, |p| load_boundaries(p, &property))
        {
            Ok(set) => {
                self.config.boundary_path = path.to_path_buf();
                self.boundaries = Some(set);
                self.map_message = None;
            }
            Err(e) => {
                log::warn!("Geographic view disabled: {e}");
                self.boundaries = None;
                self.map_message = Some(e.to_string());
            }
        }
        self.refilter();
    }

    /// Ingest a newly loaded dataset, initialise filters and colours.
    pub fn set_dataset(&mut self, dataset: Arc<VisitDataset>) {
        self.relevant_codes = dataset.relevant_codes(self.config.relevance_threshold);
        self.filters = init_filter_state(&dataset);

        let mut sexes: Vec<&str> = dataset
            .records
            .iter()
            .filter_map(|r| r.sex.as_deref())
            .collect();
        sexes.sort_unstable();
        sexes.dedup();
        self.sex_colors = ColorMap::new(sexes);

        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Drop both caches and read the files again.
    pub fn clear_cache(&mut self) {
        self.dataset_cache.clear();
        self.boundary_cache.clear();
        log::info!("Load caches cleared");
        self.load_configured();
    }

    /// Recompute the aggregates after a filter or option change.
    pub fn refilter(&mut self) {
        self.view = self.dataset.as_ref().map(|ds| {
            compute_view(ds, self.boundaries.as_deref(), &self.filters, &self.options)
        });
    }

    /// The dataset's full date span, if any row has a date.
    pub fn date_bounds(&self) -> Option<DateRange> {
        self.dataset.as_ref().and_then(|ds| ds.date_span)
    }

    /// Set the date window, clamped to the dataset span.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let mut range = DateRange::new(start, end);
        if let Some(bounds) = self.date_bounds() {
            range = range.clamp_to(&bounds);
        }
        if range != self.filters.date_range {
            self.filters.date_range = range;
            self.refilter();
        }
    }

    /// Toggle a single code in the selection.
    pub fn toggle_code(&mut self, label: &str) {
        if !self.filters.codes.remove(label) {
            self.filters.codes.insert(label.to_string());
        }
        self.refilter();
    }

    /// Clear the code selection (i.e., no code filter).
    pub fn clear_codes(&mut self) {
        if !self.filters.codes.is_empty() {
            self.filters.codes.clear();
            self.refilter();
        }
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        if self.options.granularity != granularity {
            self.options.granularity = granularity;
            self.refilter();
        }
    }

    /// Relevant codes matching the search text, ignoring case and accents.
    pub fn searched_codes(&self) -> Vec<&DiagnosticCode> {
        let needle = normalize_name(&self.code_search);
        self.relevant_codes
            .iter()
            .filter(|c| needle.is_empty() || normalize_name(&c.label).contains(&needle))
            .collect()
    }
}
