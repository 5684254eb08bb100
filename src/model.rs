//! Data model shared by the parser, the record extractor and the aggregation engine.
//!
//! Field names serialize in camelCase to match the JSON consumed by the
//! dashboard front end.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One spreadsheet row: header name -> raw cell (string, number, null).
pub type SheetRow = BTreeMap<String, Value>;

/// One parsed-table row: header name -> text.
pub type TableRow = BTreeMap<String, String>;

/// Keywords that mark a spreadsheet row as the real header row.
const HEADER_KEYWORDS: [&str; 4] = ["member", "guide", "blind", "guns"];

/// One hunt date's spreadsheet tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Date key (`MM_DD_YY`, `YYYY-MM-DD`, or anything else)
    pub name: String,
    /// Column names in spreadsheet order
    #[serde(default)]
    pub headers: Vec<String>,
    /// Rows in spreadsheet order
    #[serde(default)]
    pub rows: Vec<SheetRow>,
}

/// Top-level shape of the workbook JSON: `{ "sheets": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetSource {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Sheet {
    /// Build a sheet from a raw grid of cells as read from a CSV export.
    ///
    /// Fully empty rows and columns are dropped. If the first remaining row
    /// mentions member/guide/blind/guns it is promoted to the header row,
    /// otherwise `column_names` is used. Blank names become `Column_<n>`.
    pub fn from_grid(name: &str, column_names: Vec<String>, grid: Vec<Vec<String>>) -> Sheet {
        let rows: Vec<Vec<String>> = grid
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        let width = rows
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(column_names.len());
        let kept: Vec<usize> = (0..width)
            .filter(|&i| {
                rows.iter()
                    .any(|r| r.get(i).is_some_and(|c| !c.trim().is_empty()))
            })
            .collect();

        let project = |row: &[String]| -> Vec<String> {
            kept.iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        };

        let mut rows: Vec<Vec<String>> = rows.iter().map(|r| project(r)).collect();
        let first_is_header = rows.first().is_some_and(|first| {
            first.iter().any(|cell| {
                let lower = cell.to_lowercase();
                HEADER_KEYWORDS.iter().any(|k| lower.contains(k))
            })
        });

        let raw_headers = if first_is_header {
            rows.remove(0)
        } else {
            project(&column_names)
        };
        let headers: Vec<String> = raw_headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() || h.starts_with("Unnamed") {
                    format!("Column_{}", i + 1)
                } else {
                    h.to_string()
                }
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        let cell = row.get(i).cloned().unwrap_or_default();
                        (h.clone(), Value::String(cell))
                    })
                    .collect()
            })
            .collect();

        Sheet {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Treat a parsed OCR table as a sheet. The sheet is named after the
    /// table's metadata date when one was found, else `fallback_name`.
    pub fn from_parsed(table: &ParsedTable, fallback_name: &str) -> Sheet {
        let name = table
            .metadata
            .date
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        let rows = table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect()
            })
            .collect();
        Sheet {
            name,
            headers: table.headers.clone(),
            rows,
        }
    }
}

/// Render a raw cell as text. Null becomes the empty string.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A species count inside a `HuntRecord`, kept in header order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesKill {
    pub species: String,
    pub count: f64,
}

/// Placeholder for a missing blind or condition.
pub const UNKNOWN: &str = "Unknown";

/// One member's participation in one hunt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntRecord {
    pub date: String,
    pub member: String,
    pub guide: Option<String>,
    /// `"Unknown"` when the sheet had no blind for this row
    pub blind: String,
    pub guns: f64,
    /// Sheet-wide condition label, `"Unknown"` when none was recorded
    pub condition: String,
    /// Positive counts only, in header order
    pub species_kills: Vec<SpeciesKill>,
    pub total_ducks: f64,
    pub total_geese: f64,
    /// Drake + hen mallards, computed separately from `species_kills`
    pub total_mallards: f64,
}

impl HuntRecord {
    pub fn total_birds(&self) -> f64 {
        self.total_ducks + self.total_geese
    }
}

/// Metadata recovered alongside a parsed table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Any other keys carried by a JSON payload (location, notes, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TableMetadata {
    /// Fill fields this metadata lacks from `other`.
    pub fn fill_from(&mut self, other: &TableMetadata) {
        if self.date.is_none() {
            self.date = other.date.clone();
        }
        if self.record_type.is_none() {
            self.record_type = other.record_type.clone();
        }
        if self.section.is_none() {
            self.section = other.section.clone();
        }
    }
}

/// Generic structured table recovered from text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub metadata: TableMetadata,
}

impl ParsedTable {
    pub fn new(headers: Vec<String>, rows: Vec<TableRow>) -> Self {
        ParsedTable {
            headers,
            rows,
            metadata: TableMetadata::default(),
        }
    }

    /// No structured data was recovered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of a grouped statistic (member, blind, guide or species).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntry {
    pub name: String,
    pub ducks: f64,
    pub geese: f64,
    pub total: f64,
    /// Number of contributing records
    pub hunts: usize,
    pub average: f64,
    pub average_ducks: f64,
    pub average_geese: f64,
}

impl AggregateEntry {
    pub fn new(name: &str, ducks: f64, geese: f64, hunts: usize) -> Self {
        let divisor = hunts.max(1) as f64;
        let total = ducks + geese;
        AggregateEntry {
            name: name.to_string(),
            ducks,
            geese,
            total,
            hunts,
            average: total / divisor,
            average_ducks: ducks / divisor,
            average_geese: geese / divisor,
        }
    }
}

/// Whether anything was recorded on a known date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    #[serde(rename = "hunted")]
    Hunted,
    /// Did not hunt
    #[serde(rename = "DNH")]
    Dnh,
}

impl TrendStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TrendStatus::Hunted => "hunted",
            TrendStatus::Dnh => "DNH",
        }
    }
}

/// One row of the date-ordered trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTrendEntry {
    pub date: String,
    pub date_formatted: String,
    pub ducks: f64,
    pub geese: f64,
    pub mallards: f64,
    pub total: f64,
    pub blind_count: usize,
    pub status: TrendStatus,
}
