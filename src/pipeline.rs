//! Pipeline functions for programmatic use by the CLI.
//!
//! These wrap the pure parsing/aggregation core with file loading and
//! output, returning summaries or structured data instead of printing.

use crate::aggregate::{aggregate, available_conditions, HuntStats};
use crate::model::{AggregateEntry, ParsedTable, Sheet, SheetSource};
use crate::ranking::{self, TopView};
use crate::records::extract_all;
use crate::text_parser::parse_text;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// OCR rows whose text starts with this were failed extractions.
const OCR_ERROR_PREFIX: &str = "ERROR:";

// ============================================================================
// Sheet Loading
// ============================================================================

/// Load hunt sheets from a path.
///
/// Accepts the workbook JSON (`{"sheets": [...]}`), a single CSV file (one
/// sheet named after the file stem, or an OCR results CSV with
/// `filename`/`text` columns), or a directory of sheet CSV files.
pub fn load_sheets(path: &Path) -> Result<Vec<Sheet>> {
    if path.is_dir() {
        return load_sheet_dir(path);
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if !is_csv {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source: SheetSource =
            serde_json::from_str(&contents).context("Failed to parse sheet JSON")?;
        log::info!("Loaded {} sheets from {}", source.sheets.len(), path.display());
        return Ok(source.sheets);
    }

    if is_ocr_results(path)? {
        let pages = read_ocr_results(path)?;
        return Ok(pages.iter().map(OcrPage::to_sheet).collect());
    }

    Ok(vec![load_sheet_csv(path)?])
}

fn load_sheet_dir(dir: &Path) -> Result<Vec<Sheet>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    let mut sheets = Vec::new();
    for path in &paths {
        match load_sheet_csv(path) {
            Ok(sheet) => sheets.push(sheet),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    log::info!("Loaded {} sheets from {}", sheets.len(), dir.display());
    Ok(sheets)
}

/// Read one sheet from a CSV export; the sheet is named after the file stem.
pub fn load_sheet_csv(path: &Path) -> Result<Sheet> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let column_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV row")?;
        grid.push(record.iter().map(str::to_string).collect());
    }

    let name = file_stem(path);
    Ok(Sheet::from_grid(&name, column_names, grid))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string()
}

// ============================================================================
// OCR Results
// ============================================================================

/// One OCR'd image and the table recovered from its text.
#[derive(Debug, Clone, Serialize)]
pub struct OcrPage {
    pub filename: String,
    pub table: ParsedTable,
}

impl OcrPage {
    /// Sheet view of the page, named by its date or else its image stem.
    pub fn to_sheet(&self) -> Sheet {
        Sheet::from_parsed(&self.table, &file_stem(Path::new(&self.filename)))
    }
}

fn is_ocr_results(path: &Path) -> Result<bool> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers()?;
    let has = |name: &str| headers.iter().any(|h| h.trim().eq_ignore_ascii_case(name));
    Ok(has("filename") && has("text"))
}

/// Read an OCR results CSV (`filename`, `text`, ...) and parse every page.
///
/// Rows whose text starts with `ERROR:` are failed extractions and are
/// dropped.
pub fn read_ocr_results(path: &Path) -> Result<Vec<OcrPage>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let text_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("text"))
        .ok_or_else(|| anyhow::anyhow!("Column 'text' not found in {}", path.display()))?;
    let filename_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("filename"));

    let mut pages = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = result.context("Failed to read CSV row")?;
        let filename = filename_col
            .and_then(|i| record.get(i))
            .map(str::to_string)
            .unwrap_or_else(|| format!("row_{}", row_num + 1));
        let text = record.get(text_col).unwrap_or("");

        if text.trim_start().starts_with(OCR_ERROR_PREFIX) {
            log::warn!("Row {}: skipping failed OCR for '{}'", row_num + 1, filename);
            continue;
        }

        let table = parse_text(text);
        if table.is_empty() {
            log::debug!("Row {}: no structured data in '{}'", row_num + 1, filename);
        }
        pages.push(OcrPage { filename, table });
    }

    Ok(pages)
}

/// Configuration for the parse-ocr operation.
pub struct ParseOcrConfig {
    /// OCR results CSV
    pub input: PathBuf,
    /// Output JSON path
    pub output: PathBuf,
}

/// Parse an OCR results CSV and write the recovered tables as JSON.
pub fn parse_ocr(config: &ParseOcrConfig) -> Result<String> {
    let pages = read_ocr_results(&config.input)?;
    let json = serde_json::to_string_pretty(&pages)?;

    if let Some(parent) = config.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.output, json)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    let structured = pages.iter().filter(|p| !p.table.is_empty()).count();
    Ok(format!(
        "Parsed {} pages ({} with structured data) -> {}",
        pages.len(),
        structured,
        config.output.display()
    ))
}

// ============================================================================
// Stats
// ============================================================================

/// Configuration for the stats and export operations.
pub struct StatsConfig {
    /// Sheet JSON, sheet CSV, OCR results CSV, or a directory of sheet CSVs
    pub input: PathBuf,
    /// Only count records with this condition
    pub condition: Option<String>,
}

/// Load, extract and aggregate in one step.
pub fn load_stats(config: &StatsConfig) -> Result<HuntStats> {
    let sheets = load_sheets(&config.input)?;
    let records = extract_all(&sheets);
    let names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
    log::info!(
        "Extracted {} hunt records from {} sheets",
        records.len(),
        sheets.len()
    );
    Ok(aggregate(&records, &names, config.condition.as_deref()))
}

/// Distinct conditions recorded across all sheets.
pub fn list_conditions(input: &Path) -> Result<Vec<String>> {
    let sheets = load_sheets(input)?;
    Ok(available_conditions(&extract_all(&sheets)))
}

/// Compute harvest statistics and return a formatted text report.
pub fn compute_stats(config: &StatsConfig) -> Result<String> {
    let stats = load_stats(config)?;
    let mut out = String::new();

    let title = match &config.condition {
        Some(c) => format!(" Harvest Report ({}) ", c),
        None => " Harvest Report ".to_string(),
    };
    writeln!(out, "{:=^72}", title)?;

    let t = &stats.totals;
    writeln!(
        out,
        "\nDucks: {}  Geese: {}  Mallards: {}  Total: {}",
        fmt_count(t.ducks),
        fmt_count(t.geese),
        fmt_count(t.mallards),
        fmt_count(t.total)
    )?;
    writeln!(
        out,
        "Records: {}  Days hunted: {}  Did not hunt: {}",
        t.records, t.days_hunted, t.days_not_hunted
    )?;

    write_view(&mut out, "Top Members", &ranking::top_members(&stats))?;
    write_view(&mut out, "Top Guides", &ranking::top_guides(&stats))?;
    write_view(&mut out, "Blinds", &ranking::top_blinds(&stats))?;
    write_view(&mut out, "Species", &ranking::top_species(&stats))?;

    writeln!(out, "\n{:-^72}", " Season Trend ")?;
    writeln!(
        out,
        "{:<16} {:>8} {:>8} {:>9} {:>8} {:>7} {:>7}",
        "Date", "Ducks", "Geese", "Mallards", "Total", "Blinds", "Status"
    )?;
    for day in &stats.date_trend {
        writeln!(
            out,
            "{:<16} {:>8} {:>8} {:>9} {:>8} {:>7} {:>7}",
            truncate_name(&day.date_formatted, 16),
            fmt_count(day.ducks),
            fmt_count(day.geese),
            fmt_count(day.mallards),
            fmt_count(day.total),
            day.blind_count,
            day.status.label()
        )?;
    }

    Ok(out)
}

fn write_view(out: &mut String, title: &str, view: &TopView) -> Result<()> {
    writeln!(out, "\n{:-^72}", format!(" {} ", title))?;
    if view.by_total.is_empty() {
        writeln!(out, "(none)")?;
        return Ok(());
    }
    writeln!(out, "By total:")?;
    write_entries(out, &view.by_total)?;
    writeln!(out, "By average:")?;
    write_entries(out, &view.by_average)?;
    Ok(())
}

fn write_entries(out: &mut String, entries: &[AggregateEntry]) -> Result<()> {
    writeln!(
        out,
        "  {:<22} {:>7} {:>7} {:>7} {:>6} {:>8}",
        "Name", "Ducks", "Geese", "Total", "Hunts", "Avg"
    )?;
    for e in entries {
        writeln!(
            out,
            "  {:<22} {:>7} {:>7} {:>7} {:>6} {:>8.2}",
            truncate_name(&e.name, 22),
            fmt_count(e.ducks),
            fmt_count(e.geese),
            fmt_count(e.total),
            e.hunts,
            e.average
        )?;
    }
    Ok(())
}

// ============================================================================
// Workbook Export
// ============================================================================

/// Configuration for the export operation.
pub struct ExportConfig {
    pub stats: StatsConfig,
    /// Output xlsx path
    pub output: PathBuf,
}

/// Write harvest statistics to an Excel workbook, one worksheet per view.
pub fn export_workbook(config: &ExportConfig) -> Result<String> {
    use rust_xlsxwriter::{Format, Workbook};

    let stats = load_stats(&config.stats)?;
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let views = [
        ("Members", ranking::top_members(&stats)),
        ("Guides", ranking::top_guides(&stats)),
        ("Blinds", ranking::top_blinds(&stats)),
        ("Species", ranking::top_species(&stats)),
    ];
    let entry_headers = [
        "Name",
        "Ducks",
        "Geese",
        "Total",
        "Hunts",
        "Average",
        "Avg Ducks",
        "Avg Geese",
    ];

    for (name, view) in &views {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name)?;
        for (col, header) in entry_headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (i, e) in view.by_total.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &e.name)?;
            sheet.write_number(row, 1, e.ducks)?;
            sheet.write_number(row, 2, e.geese)?;
            sheet.write_number(row, 3, e.total)?;
            sheet.write_number(row, 4, e.hunts as f64)?;
            sheet.write_number(row, 5, e.average)?;
            sheet.write_number(row, 6, e.average_ducks)?;
            sheet.write_number(row, 7, e.average_geese)?;
        }
        sheet.set_column_width(0, 24)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Trend")?;
        let trend_headers = [
            "Sheet", "Date", "Ducks", "Geese", "Mallards", "Total", "Blinds", "Status",
        ];
        for (col, header) in trend_headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (i, day) in stats.date_trend.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &day.date)?;
            sheet.write_string(row, 1, &day.date_formatted)?;
            sheet.write_number(row, 2, day.ducks)?;
            sheet.write_number(row, 3, day.geese)?;
            sheet.write_number(row, 4, day.mallards)?;
            sheet.write_number(row, 5, day.total)?;
            sheet.write_number(row, 6, day.blind_count as f64)?;
            sheet.write_string(row, 7, day.status.label())?;
        }
        sheet.set_column_width(0, 14)?;
        sheet.set_column_width(1, 16)?;
    }

    if let Some(parent) = config.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    workbook
        .save(&config.output)
        .map_err(|e| anyhow::anyhow!("Failed to save workbook: {}", e))?;

    Ok(format!(
        "Workbook created: {}\n  Members: {}\n  Dates: {}",
        config.output.display(),
        stats.members.len(),
        stats.date_trend.len()
    ))
}

// ============================================================================
// Internal Helpers
// ============================================================================

/// Truncate a name to fit in a column.
fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let kept: String = name.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Bird counts are whole numbers on paper; show them without ".0".
fn fmt_count(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{:.1}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = r#"{
      "sheets": [
        {
          "name": "11_19_25",
          "headers": ["Member", "Guide", "Blind", "Guns", "Drake Mallard", "Hen Mallard", "Geese"],
          "rows": [
            {"Member": "Bob", "Guide": "Tom", "Blind": "4", "Guns": 1, "Drake Mallard": 2, "Hen Mallard": 1, "Geese": 0},
            {"Member": "Day Total", "Guide": "", "Blind": "", "Guns": 1, "Drake Mallard": 2, "Hen Mallard": 1, "Geese": 0}
          ]
        },
        {"name": "11_20_25", "headers": ["Member"], "rows": []}
      ]
    }"#;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Bob", 10), "Bob");
        assert_eq!(truncate_name("Mike Mountanos", 8), "Mike ...");
    }

    #[test]
    fn test_fmt_count() {
        assert_eq!(fmt_count(3.0), "3");
        assert_eq!(fmt_count(2.5), "2.5");
    }

    #[test]
    fn test_load_sheets_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logc_tracker.json");
        std::fs::write(&path, WORKBOOK).unwrap();

        let sheets = load_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].headers.len(), 7);

        let report = compute_stats(&StatsConfig {
            input: path,
            condition: None,
        })
        .unwrap();
        assert!(report.contains("Harvest Report"));
        assert!(report.contains("Bob"));
        assert!(report.contains("DNH"));
    }

    #[test]
    fn test_load_sheet_csv_promotes_header() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("11_21_25.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "LOGC,Unnamed: 1,Unnamed: 2").unwrap();
        writeln!(f, "Member,Blind,Teal").unwrap();
        writeln!(f, "Jay,7,3").unwrap();
        writeln!(f, ",,").unwrap();
        f.flush().unwrap();

        let sheets = load_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "11_21_25");
        assert_eq!(sheets[0].headers, vec!["Member", "Blind", "Teal"]);
        assert_eq!(sheets[0].rows.len(), 1);
    }

    #[test]
    fn test_read_ocr_results_skips_errors() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr_results.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "\"filename\",\"text\"").unwrap();
        writeln!(f, "\"card1.jpg\",\"DATE: November 16\nMembers\n1 John Smith\"").unwrap();
        writeln!(f, "\"card2.jpg\",\"ERROR: GPT-4 Vision API error\"").unwrap();
        f.flush().unwrap();

        let pages = read_ocr_results(&path).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].filename, "card1.jpg");
        assert_eq!(pages[0].table.rows[0]["Name"], "John Smith");
        assert_eq!(pages[0].to_sheet().name, "November 16");

        let sheets = load_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 1);

        let output = dir.path().join("out").join("tables.json");
        let summary = parse_ocr(&ParseOcrConfig {
            input: path,
            output: output.clone(),
        })
        .unwrap();
        assert!(summary.contains("Parsed 1 pages"));
        assert!(std::fs::read_to_string(output).unwrap().contains("John Smith"));
    }

    #[test]
    fn test_export_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("logc_tracker.json");
        std::fs::write(&input, WORKBOOK).unwrap();
        let output = dir.path().join("report.xlsx");

        let summary = export_workbook(&ExportConfig {
            stats: StatsConfig {
                input,
                condition: None,
            },
            output: output.clone(),
        })
        .unwrap();
        assert!(output.exists());
        assert!(summary.contains("Members: 1"));
        assert!(summary.contains("Dates: 2"));
    }
}
