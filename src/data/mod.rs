/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .zip / .parquet          .geojson
///        │                            │
///        ▼                            ▼
///   ┌──────────┐                ┌──────────┐
///   │  loader   │ → VisitDataset │   geo    │ → BoundarySet
///   └──────────┘                └──────────┘
///        │   (both memoized by cache::Memo)
///        ▼
///   ┌──────────┐
///   │  filter   │  date range + selected codes → Vec<&VisitRecord>
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  KPIs, sexes, top-N, pyramid, choropleth, timeline
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   view    │  DashboardView consumed by the UI
///   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod model;
pub mod view;
