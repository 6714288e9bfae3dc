//! Data quality assessment module.
//!
//! This module provides data quality analysis over a full source table:
//! - **Completeness**: Share of present cells and per-column missing rates
//! - **Uniqueness**: Duplicate rows under full-row equality
//!
//! Quality metrics expose counts, ratios and row positions only, never cell
//! values.
//!
//! # Example
//! ```rust,ignore
//! use tabsurveyor_core::quality::{audit, deduplicate};
//!
//! let report = audit(&table);
//! println!("Duplicates: {}", report.duplicate_row_count);
//! let unique = deduplicate(&table);
//! ```

mod analyzer;
mod completeness;
mod models;
mod uniqueness;

// Re-export public API
pub use analyzer::{audit, deduplicate};
pub use models::{ColumnMissing, CompletenessMetrics, QualityReport, UniquenessMetrics};
