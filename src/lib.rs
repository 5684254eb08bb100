//! Hunt Log Stats
//!
//! Turns loosely-structured hunting-log sources into normalized hunt records
//! and harvest statistics.
//!
//! This library provides:
//! - `text_parser`: Recovers a structured table from OCR text (or a JSON payload)
//! - `columns`: Case-insensitive header lookup for member/guide/blind/guns/species
//! - `records`: Normalizes one sheet's rows into `HuntRecord`s
//! - `aggregate`: Per-member/blind/guide/species totals and the per-date trend
//! - `ranking`: Top-N views by total and by per-hunt average
//! - `pipeline`: File loading, OCR CSV ingestion, text report and workbook export
//!
//! Binaries:
//! - `huntlog`: Command-line front end for the pipeline operations

pub mod aggregate;
pub mod columns;
pub mod model;
pub mod pipeline;
pub mod ranking;
pub mod records;
pub mod text_parser;

pub use aggregate::{aggregate, aggregate_sheets, available_conditions, HuntStats, SeasonTotals};
pub use model::{
    AggregateEntry, DateTrendEntry, HuntRecord, ParsedTable, Sheet, TableMetadata, TrendStatus,
};
pub use ranking::TopView;
pub use records::extract_records;
pub use text_parser::parse_text;
