//! Citation extraction and DOI resolution for structured research reports
//!
//! Pipeline: [`report`] extracts sections and citations, [`papers`] resolves
//! each corpus id to a DOI through the [`cache`], and [`render`] writes the
//! two-column text report using [`layout`].

pub mod cache;
pub mod error;
pub mod layout;
pub mod logging;
pub mod papers;
pub mod render;
pub mod report;
pub mod settings;

pub use error::{CiteError, LookupError};
