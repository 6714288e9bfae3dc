//! Core tabular analysis engine for TabSurveyor.
//!
//! This crate turns a raw delimited file into an immutable in-memory table
//! and runs the analyses an analyst reaches for first: filtering, summary
//! statistics, correlation, hypothesis tests, outlier detection, frequency
//! tables and a data quality audit. Results can be exported as CSV, JSON or
//! xlsx, and assembled into a self-contained HTML or Markdown report.
//!
//! # Guarantees
//! - Offline: nothing in this crate performs network I/O
//! - Cell values never appear in logs or error messages, only names and counts
//! - Tables are immutable; every filter or analysis returns a new value
//!
//! # Pipeline
//! raw bytes → [`loader`] → [`table::Table`] → [`schema`] → [`filter`] →
//! {[`stats`], [`quality`]} → [`report`]

pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod quality;
pub mod report;
pub mod samples;
pub mod schema;
pub mod session;
pub mod stats;
pub mod table;

// Re-export commonly used types
pub use chart::{ChartKind, ChartOptions, ChartRenderer, ChartRequest, PreparedChart};
pub use config::AppConfig;
pub use error::{Result, TabSurveyorError};
pub use export::{ExportFormat, ExportKind};
pub use filter::{FilterSpec, Predicate, View};
pub use loader::{DatasetCache, LoadedDataset, load};
pub use quality::QualityReport;
pub use report::ReportDocument;
pub use schema::{ColumnClassification, ColumnKind, classify};
pub use session::{AnalysisSession, AnalysisWarning};
pub use stats::StatisticsResult;
pub use table::{Column, ColumnData, Table};
