//! Reporting pipeline over hospital visit records.
//!
//! The library is UI-free: load a [`data::model::VisitDataset`], narrow it
//! with [`data::filter`], and derive chartable tables with
//! [`data::aggregate`] (or all at once through [`data::view::compute_view`]).

pub mod config;
pub mod data;
pub mod error;

pub use error::{Error, Result};
