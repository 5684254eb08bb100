//! Sheet rows -> normalized hunt records.

use crate::columns::{self, ColumnRole};
use crate::model::{cell_text, HuntRecord, Sheet, SheetRow, SpeciesKill, UNKNOWN};
use regex::Regex;
use serde_json::Value;

lazy_static::lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").unwrap();
    static ref ISO_DATE_PREFIX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap();
}

/// Parse the leading number of a cell ("3", " 2.5 ", "4 birds").
/// Anything without a leading number is 0.
pub fn parse_number(text: &str) -> f64 {
    LEADING_NUMBER
        .find(text.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn cell_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0),
        Some(other) => parse_number(&cell_text(other)),
        None => 0.0,
    }
}

fn cell_string(row: &SheetRow, column: Option<&str>) -> String {
    column
        .and_then(|c| row.get(c))
        .map(|v| cell_text(v).trim().to_string())
        .unwrap_or_default()
}

/// Locate the sheet's condition row: a row whose date-column label reads
/// "condition(s)", paired with the next column's value. Returns the row
/// index and the condition, unless the value is itself a date.
fn find_condition(sheet: &Sheet) -> Option<(usize, String)> {
    let label_col = columns::resolve(&sheet.headers, ColumnRole::Date)?;
    let label_idx = sheet.headers.iter().position(|h| h == label_col)?;
    let value_col = sheet.headers.get(label_idx + 1)?.as_str();

    sheet.rows.iter().enumerate().find_map(|(i, row)| {
        let label = cell_string(row, Some(label_col)).to_lowercase();
        if label != "conditions" && label != "condition" {
            return None;
        }
        let value = cell_string(row, Some(value_col));
        if value.is_empty() || ISO_DATE_PREFIX.is_match(&value) {
            None
        } else {
            Some((i, value))
        }
    })
}

/// Sheet-wide condition label, if the sheet records one.
pub fn sheet_condition(sheet: &Sheet) -> Option<String> {
    find_condition(sheet).map(|(_, condition)| condition)
}

/// Rows whose member cell is blank, the header word, or a total label.
fn is_skipped_member(member: &str) -> bool {
    let lower = member.to_lowercase();
    lower.is_empty() || lower == "member" || lower.contains("total")
}

/// Extract the hunt records from one sheet.
///
/// Rows without a member, header/total label rows, and rows with no birds
/// and no guns produce no record.
pub fn extract_records(sheet: &Sheet) -> Vec<HuntRecord> {
    let headers = &sheet.headers;
    let member_col = columns::resolve(headers, ColumnRole::Member);
    let guide_col = columns::resolve(headers, ColumnRole::Guide);
    let blind_col = columns::resolve(headers, ColumnRole::Blind);
    let guns_col = columns::resolve(headers, ColumnRole::Guns);
    let species_cols = columns::species_columns(headers);
    let (drake_col, hen_col) = columns::mallard_columns(headers);

    let condition_row = find_condition(sheet);
    let condition = condition_row
        .as_ref()
        .map(|(_, c)| c.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (i, row) in sheet.rows.iter().enumerate() {
        if condition_row.as_ref().is_some_and(|(idx, _)| *idx == i) {
            continue;
        }

        let member = cell_string(row, member_col);
        if is_skipped_member(&member) {
            skipped += 1;
            continue;
        }

        let mut species_kills = Vec::new();
        let mut total_ducks = 0.0;
        let mut total_geese = 0.0;
        for col in &species_cols {
            let count = cell_number(row.get(*col));
            if count <= 0.0 {
                continue;
            }
            if columns::is_geese_column(col) {
                total_geese += count;
            } else {
                total_ducks += count;
            }
            species_kills.push(SpeciesKill {
                species: col.to_string(),
                count,
            });
        }

        let total_mallards: f64 = [drake_col, hen_col]
            .iter()
            .flatten()
            .map(|col| cell_number(row.get(*col)).max(0.0))
            .sum();

        let guns = cell_number(guns_col.and_then(|c| row.get(c))).max(0.0);
        if total_ducks + total_geese == 0.0 && guns == 0.0 {
            skipped += 1;
            continue;
        }

        let guide = cell_string(row, guide_col);
        let blind = cell_string(row, blind_col);

        records.push(HuntRecord {
            date: sheet.name.clone(),
            member,
            guide: if guide.is_empty() { None } else { Some(guide) },
            blind: if blind.is_empty() {
                UNKNOWN.to_string()
            } else {
                blind
            },
            guns,
            condition: condition.clone(),
            species_kills,
            total_ducks,
            total_geese,
            total_mallards,
        });
    }

    log::debug!(
        "Sheet '{}': {} records from {} rows ({} skipped)",
        sheet.name,
        records.len(),
        sheet.rows.len(),
        skipped
    );

    records
}

/// Extract records from every sheet, in sheet order.
pub fn extract_all(sheets: &[Sheet]) -> Vec<HuntRecord> {
    sheets.iter().flat_map(extract_records).collect()
}
