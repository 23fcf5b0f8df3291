//! Renderers and exporters for an aggregation run.
//!
//! # Submodules
//!
//! - [`table`]: fixed-width text table printed to stdout
//! - [`csv`]: CSV export with a fixed column order
//! - [`json`]: JSON report with the period, outcome summary and articles
//!
//! # Output Files
//!
//! ```text
//! fno_news.csv     # --csv (default path)
//! <path>.json      # --json-output <path>
//! ```

pub mod csv;
pub mod json;
pub mod table;
