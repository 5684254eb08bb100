//! Heuristic table recovery from OCR text.
//!
//! Text is handed to an ordered list of strategies; the first one that
//! yields a structured result wins and nothing is merged across strategies:
//!
//! 1. `Json` - the text is a JSON object with `headers` and `rows` arrays
//! 2. `LineScan` - numbered member/guide lists and `key: value` pairs,
//!    driven by section headers ("Members", "Guide", "Weather", "Total")
//! 3. `Delimited` - pipe or multi-space separated columns
//! 4. `Reconstructed` - rows anchored on `key: value` / numbered lines
//! 5. `Content` - one row per line under a single `Content` header
//!
//! Date and record-type metadata found by the line scan is attached to
//! whichever table is returned, except a JSON payload, whose own metadata
//! is kept as-is. Parsing never fails; an empty `rows` list
//! only comes back for blank input.

use crate::model::{cell_text, ParsedTable, TableMetadata, TableRow};
use regex::Regex;
use serde_json::Value;

lazy_static::lazy_static! {
    static ref DATE_LINE: Regex = Regex::new(
        r"(?i)\bdate(?::\s*|\s+)((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2})\b"
    ).unwrap();
    static ref NUMBERED_LINE: Regex = Regex::new(r"^(\d+)\s+(.+)$").unwrap();
    static ref NAME_LINE: Regex =
        Regex::new(r"^[A-Z][A-Za-z'.\-]*\s+[A-Z][A-Za-z'.\-]*$").unwrap();
    static ref KEY_VALUE_LINE: Regex = Regex::new(r"^([^:]+?)\s*:\s*(.+)$").unwrap();
    static ref NUMERIC_LINE: Regex = Regex::new(r"^[\d\s.,]+$").unwrap();
    static ref MULTI_SPACE: Regex = Regex::new(r"\s{2,}").unwrap();
    static ref CELL_SEPARATOR: Regex = Regex::new(r"\s*\|\s*|\s{2,}").unwrap();
    /// Phrases that name the kind of logsheet.
    static ref RECORD_TYPE: Regex = Regex::new(
        r"(?i)\b(?:waterfowl|upland|hunt|harvest) record\b|\bscore ?card\b|\blog ?sheet\b"
    ).unwrap();
}


const MEMBER_MARKERS: [&str; 1] = ["member"];
const GUIDE_MARKERS: [&str; 1] = ["guide"];
const WEATHER_MARKERS: [&str; 2] = ["weather", "condition"];
const TOTAL_MARKERS: [&str; 2] = ["day total", "total"];

/// Parse a text blob into a table, trying each strategy in order.
pub fn parse_text(text: &str) -> ParsedTable {
    let (strategy, mut table) = STRATEGIES
        .iter()
        .find_map(|s| s.apply(text).map(|t| (*s, t)))
        .unwrap_or_else(|| (Strategy::Content, content_table(&[])));

    log::debug!(
        "Parsed {} rows with {:?} strategy",
        table.rows.len(),
        strategy
    );

    // A JSON payload carries its own metadata.
    if strategy != Strategy::Json {
        let scan = scan_lines(&split_lines(text));
        table.metadata.fill_from(&scan.metadata());
    }
    table
}

/// One way of turning text into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Json,
    LineScan,
    Delimited,
    Reconstructed,
    Content,
}

/// Strategies in precedence order.
pub const STRATEGIES: [Strategy; 5] = [
    Strategy::Json,
    Strategy::LineScan,
    Strategy::Delimited,
    Strategy::Reconstructed,
    Strategy::Content,
];

impl Strategy {
    /// Run this strategy alone. `None` means "no structured result".
    pub fn apply(&self, text: &str) -> Option<ParsedTable> {
        match self {
            Strategy::Json => parse_json_table(text),
            Strategy::LineScan => scan_lines(&split_lines(text)).into_table(),
            Strategy::Delimited => parse_delimited(&split_lines(text)),
            Strategy::Reconstructed => reconstruct_rows(&split_lines(text)),
            Strategy::Content => Some(content_table(&split_lines(text))),
        }
    }
}

/// Non-empty trimmed lines.
fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn row(pairs: &[(&str, &str)]) -> TableRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Strategy 1: JSON payload
// ============================================================================

fn parse_json_table(text: &str) -> Option<ParsedTable> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let object = value.as_object()?;
    let headers: Vec<String> = object
        .get("headers")?
        .as_array()?
        .iter()
        .map(cell_text)
        .collect();

    let rows = object
        .get("rows")?
        .as_array()?
        .iter()
        .map(|raw| match raw {
            Value::Array(cells) => headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), cells.get(i).map(cell_text).unwrap_or_default()))
                .collect(),
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| (k.clone(), cell_text(v)))
                .collect(),
            other => row(&[("Value", cell_text(other).as_str())]),
        })
        .collect();

    let metadata = object
        .get("metadata")
        .and_then(|m| serde_json::from_value::<TableMetadata>(m.clone()).ok())
        .unwrap_or_default();

    Some(ParsedTable {
        headers,
        rows,
        metadata,
    })
}

// ============================================================================
// Strategy 2: Line scan
// ============================================================================

/// Section of the logsheet the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    None,
    Members,
    Guide,
    Weather,
    Totals,
}

impl Section {
    /// Section named by a header line, if the line is one.
    fn from_header(line: &str) -> Option<Section> {
        let lower = line.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
        if has(&MEMBER_MARKERS[..]) {
            Some(Section::Members)
        } else if has(&GUIDE_MARKERS[..]) {
            Some(Section::Guide)
        } else if has(&WEATHER_MARKERS[..]) {
            Some(Section::Weather)
        } else if has(&TOTAL_MARKERS[..]) {
            Some(Section::Totals)
        } else {
            None
        }
    }

    /// Numbered and bare-name lines are list entries only in these sections.
    fn takes_entries(&self) -> bool {
        matches!(self, Section::None | Section::Members | Section::Guide)
    }
}

/// How a single line is read, given the current section.
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    Date(&'a str),
    RecordType(&'a str),
    SectionHeader(Section),
    Numbered { number: &'a str, rest: &'a str },
    Name,
    KeyValue { key: &'a str, value: &'a str },
    Numeric,
    Other,
}

fn classify(line: &str, section: Section) -> LineKind<'_> {
    if let Some(caps) = DATE_LINE.captures(line) {
        if let Some(date) = caps.get(1) {
            return LineKind::Date(date.as_str().trim());
        }
    }

    if let Some(phrase) = RECORD_TYPE.find(line) {
        return LineKind::RecordType(phrase.as_str());
    }
    if let Some(next) = Section::from_header(line) {
        return LineKind::SectionHeader(next);
    }
    if section.takes_entries() {
        if let Some(caps) = NUMBERED_LINE.captures(line) {
            if let (Some(number), Some(rest)) = (caps.get(1), caps.get(2)) {
                return LineKind::Numbered {
                    number: number.as_str(),
                    rest: rest.as_str().trim(),
                };
            }
        }
    }
    if matches!(section, Section::Members | Section::Guide) && NAME_LINE.is_match(line) {
        return LineKind::Name;
    }
    if let Some((key, value)) = key_value(line) {
        return LineKind::KeyValue { key, value };
    }
    if NUMERIC_LINE.is_match(line) {
        LineKind::Numeric
    } else {
        LineKind::Other
    }
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let caps = KEY_VALUE_LINE.captures(line)?;
    let key = caps.get(1)?.as_str().trim();
    let value = caps.get(2)?.as_str().trim();
    if key.is_empty() || value.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

/// Everything the line scan recovered.
#[derive(Debug, Default)]
struct LineScan {
    date: Option<String>,
    record_type: Option<String>,
    members: Vec<TableRow>,
    guide: Vec<TableRow>,
    pairs: Vec<TableRow>,
    /// Unclassified lines, not used by any consumer yet
    #[allow(dead_code)]
    other: Vec<String>,
}

impl LineScan {
    fn metadata(&self) -> TableMetadata {
        TableMetadata {
            date: self.date.clone(),
            record_type: self.record_type.clone(),
            ..Default::default()
        }
    }

    /// Members beat guides beat key/value pairs.
    fn into_table(self) -> Option<ParsedTable> {
        let metadata = self.metadata();
        let (headers, rows) = if !self.members.is_empty() {
            (headers(&["Number", "Name"]), self.members)
        } else if !self.guide.is_empty() {
            (headers(&["Number", "Name"]), self.guide)
        } else if !self.pairs.is_empty() {
            (headers(&["Key", "Value"]), self.pairs)
        } else {
            return None;
        };
        Some(ParsedTable {
            headers,
            rows,
            metadata,
        })
    }
}

/// Walk the lines once, tracking the current section.
fn scan_lines(lines: &[&str]) -> LineScan {
    let mut section = Section::None;
    let mut scan = LineScan::default();

    for line in lines {
        match classify(line, section) {
            LineKind::Date(date) => {
                if scan.date.is_none() {
                    scan.date = Some(date.to_string());
                }
            }
            LineKind::RecordType(phrase) => {
                if scan.record_type.is_none() {
                    scan.record_type = Some(phrase.to_string());
                }
            }
            LineKind::SectionHeader(next) => section = next,
            LineKind::Numbered { number, rest } => {
                let entry = row(&[("Number", number), ("Name", rest)]);
                if section == Section::Guide {
                    scan.guide.push(entry);
                } else {
                    scan.members.push(entry);
                }
            }
            LineKind::Name => {
                let list = if section == Section::Guide {
                    &mut scan.guide
                } else {
                    &mut scan.members
                };
                let number = (list.len() + 1).to_string();
                list.push(row(&[("Number", number.as_str()), ("Name", *line)]));
            }
            LineKind::KeyValue { key, value } => {
                scan.pairs.push(row(&[("Key", key), ("Value", value)]));
            }
            LineKind::Numeric => {}
            LineKind::Other => scan.other.push(line.to_string()),
        }
    }

    scan
}

// ============================================================================
// Strategy 3: Delimited columns
// ============================================================================

fn is_tabular(line: &str) -> bool {
    line.matches('|').count() >= 2 || MULTI_SPACE.find_iter(line).count() >= 2
}

fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim_matches(|c: char| c == '|' || c.is_whitespace());
    CELL_SEPARATOR
        .split(inner)
        .map(|c| c.trim().to_string())
        .collect()
}

fn parse_delimited(lines: &[&str]) -> Option<ParsedTable> {
    let candidates: Vec<Vec<String>> = lines
        .iter()
        .filter(|l| is_tabular(l))
        .map(|l| split_cells(l))
        .collect();

    let max_cols = candidates.iter().map(|c| c.len()).max()?;
    let header_idx = candidates.iter().position(|c| c.len() == max_cols)?;
    let header = &candidates[header_idx];
    if header.len() <= 1 {
        return None;
    }

    let rows: Vec<TableRow> = candidates[header_idx + 1..]
        .iter()
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| {
            header
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return None;
    }
    Some(ParsedTable::new(header.clone(), rows))
}

// ============================================================================
// Strategy 4: Reconstructed rows
// ============================================================================

fn push_field(headers: &mut Vec<String>, row: &mut TableRow, key: &str, value: &str) {
    if !headers.iter().any(|h| h == key) {
        headers.push(key.to_string());
    }
    row.insert(key.to_string(), value.to_string());
}

fn reconstruct_rows(lines: &[&str]) -> Option<ParsedTable> {
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<TableRow> = Vec::new();
    let mut current: Option<TableRow> = None;
    let mut fields = 0usize;
    let mut anchored = false;

    for line in lines {
        if let Some((key, value)) = key_value(line) {
            rows.extend(current.take());
            let mut fresh = TableRow::new();
            push_field(&mut headers, &mut fresh, key, value);
            current = Some(fresh);
            fields = 0;
            anchored = true;
        } else if let Some(caps) = NUMBERED_LINE.captures(line) {
            rows.extend(current.take());
            let mut fresh = TableRow::new();
            push_field(&mut headers, &mut fresh, "Number", &caps[1]);
            push_field(&mut headers, &mut fresh, "Name", caps[2].trim());
            current = Some(fresh);
            fields = 0;
            anchored = true;
        } else {
            fields += 1;
            let open = current.get_or_insert_with(TableRow::new);
            push_field(&mut headers, open, &format!("Field{}", fields), line);
        }
    }
    rows.extend(current);

    if !anchored || rows.is_empty() {
        return None;
    }
    Some(ParsedTable::new(headers, rows))
}

// ============================================================================
// Strategy 5: Raw content
// ============================================================================

fn content_table(lines: &[&str]) -> ParsedTable {
    let rows = lines.iter().map(|l| row(&[("Content", *l)])).collect();
    ParsedTable::new(headers(&["Content"]), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_members_with_date() {
        let table = parse_text("DATE: November 16\nMembers\n1 John Smith\n2 Jane Doe");
        assert_eq!(table.headers, vec!["Number", "Name"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Number"], "1");
        assert_eq!(table.rows[0]["Name"], "John Smith");
        assert_eq!(table.rows[1]["Name"], "Jane Doe");
        assert_eq!(table.metadata.date.as_deref(), Some("November 16"));
        assert_eq!(table.metadata.record_type, None);
    }

    #[test]
    fn test_guide_section_and_bare_names() {
        let table = parse_text("Guides\nTom Baker\nSam Reed");
        assert_eq!(table.headers, vec!["Number", "Name"]);
        assert_eq!(table.rows[0]["Number"], "1");
        assert_eq!(table.rows[1]["Number"], "2");
        assert_eq!(table.rows[1]["Name"], "Sam Reed");
    }

    #[test]
    fn test_key_value_pairs() {
        let table = parse_text("Club: Live Oak\nPond: North");
        assert_eq!(table.headers, vec!["Key", "Value"]);
        assert_eq!(table.rows[0]["Key"], "Club");
        assert_eq!(table.rows[0]["Value"], "Live Oak");
        assert_eq!(table.rows[1]["Value"], "North");
    }

    #[test]
    fn test_record_type_metadata() {
        let table = parse_text("Live Oak Waterfowl Record\nDate Nov 3\n1 Bob Lee");
        assert_eq!(
            table.metadata.record_type.as_deref(),
            Some("Waterfowl Record")
        );
        assert_eq!(table.metadata.date.as_deref(), Some("Nov 3"));
        assert_eq!(table.rows[0]["Name"], "Bob Lee");
    }

    #[test]
    fn test_json_array_rows_align_to_headers() {
        let text = r#"{"headers":["Member","Guns","Geese"],"rows":[["Bob",2,null],["Jay"],7],"metadata":{"date":"November 22","location":"Live Oak"}}"#;
        let table = parse_text(text);
        assert_eq!(table.headers, vec!["Member", "Guns", "Geese"]);
        assert_eq!(table.rows[0]["Guns"], "2");
        assert_eq!(table.rows[0]["Geese"], "");
        assert_eq!(table.rows[1]["Guns"], "");
        assert_eq!(table.rows[2]["Value"], "7");
        assert_eq!(table.metadata.date.as_deref(), Some("November 22"));
        assert_eq!(
            table.metadata.extra.get("location"),
            Some(&Value::String("Live Oak".to_string()))
        );
    }

    #[test]
    fn test_json_metadata_is_not_rescanned() {
        let text = r#"{"headers":["Member","Guns"],"rows":[["Kevin Harvey",2]],"metadata":{"date":"November 22","notes":"Waterfowl Record"}}"#;
        let table = parse_text(text);
        assert_eq!(table.metadata.record_type, None);
        assert_eq!(table.metadata.date.as_deref(), Some("November 22"));
        assert_eq!(
            table.metadata.extra.get("notes"),
            Some(&Value::String("Waterfowl Record".to_string()))
        );

        let pretty = "{\n  \"headers\": [\"Member\"],\n  \"rows\": [[\"Bob\"]],\n  \"metadata\": {\"notes\": \"Date: Nov 9 Waterfowl Record\"}\n}";
        let table = parse_text(pretty);
        assert_eq!(table.metadata.record_type, None);
        assert_eq!(table.metadata.date, None);
        assert_eq!(table.rows[0]["Member"], "Bob");
    }

    #[test]
    fn test_members_win_over_earlier_guides() {
        let table = parse_text("Guide
Tom Baker
Members
1 Bob Smith
2 Jay Reed");
        assert_eq!(table.headers, vec!["Number", "Name"]);
        let names: Vec<&str> = table.rows.iter().map(|r| r["Name"].as_str()).collect();
        assert_eq!(names, vec!["Bob Smith", "Jay Reed"]);
    }

    #[test]
    fn test_guides_win_over_key_values() {
        let table = parse_text("Pond: North
Guides
1 Tom Baker
Wind: NW");
        assert_eq!(table.headers, vec!["Number", "Name"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Name"], "Tom Baker");
    }

    #[test]
    fn test_malformed_json_falls_through() {
        let table = parse_text("{ not json\nClub: Live Oak");
        assert_eq!(table.headers, vec!["Key", "Value"]);
        assert_eq!(table.rows[0]["Value"], "Live Oak");
    }

    #[test]
    fn test_pipe_table() {
        let text = "Blind | Ducks | Geese\nNorth | 10 | 2\nSouth | 3 |\n| | |";
        assert!(Strategy::LineScan.apply(text).is_none());
        let table = parse_text(text);
        assert_eq!(table.headers, vec!["Blind", "Ducks", "Geese"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Ducks"], "10");
        assert_eq!(table.rows[1]["Blind"], "South");
        assert_eq!(table.rows[1]["Geese"], "");
    }

    #[test]
    fn test_space_aligned_table_header_is_widest_line() {
        let text = "Pond | North |\nBlind  Ducks  Geese\nFour  10  2";
        let table = parse_text(text);
        assert_eq!(table.headers, vec!["Blind", "Ducks", "Geese"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Blind"], "Four");
    }

    #[test]
    fn test_reconstructed_rows_in_weather_section() {
        let text = "Weather\n1 cloudy\nwind from north\n2 rain";
        let table = parse_text(text);
        assert_eq!(table.headers, vec!["Field1", "Number", "Name"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0]["Field1"], "Weather");
        assert_eq!(table.rows[1]["Name"], "cloudy");
        assert_eq!(table.rows[1]["Field1"], "wind from north");
        assert_eq!(table.rows[2]["Number"], "2");
    }

    #[test]
    fn test_content_fallback() {
        let table = parse_text("scribbles here\nmore scribbles");
        assert_eq!(table.headers, vec!["Content"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["Content"], "more scribbles");
    }

    #[test]
    fn test_empty_input_has_no_rows() {
        let table = parse_text("   \n\n");
        assert!(table.is_empty());
        assert_eq!(table.headers, vec!["Content"]);
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify("Members", Section::None),
            LineKind::SectionHeader(Section::Members)
        );
        assert_eq!(
            classify("Day Total", Section::Members),
            LineKind::SectionHeader(Section::Totals)
        );
        assert_eq!(
            classify("LOGC Hunt Record 2025", Section::None),
            LineKind::RecordType("Hunt Record")
        );
        assert_eq!(classify("12 4", Section::Totals), LineKind::Numeric);
        assert_eq!(classify("Bob Lee", Section::None), LineKind::Other);
        assert_eq!(classify("Bob Lee", Section::Members), LineKind::Name);
    }
}
