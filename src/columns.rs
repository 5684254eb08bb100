//! Name-based column lookup.
//!
//! Sheet headers vary in case and phrasing ("Member", "MEMBER NAME",
//! "Blind #"), so columns are found by lowercase substring match against a
//! keyword per logical role. Absence is never an error: callers treat a
//! missing column as "no data".

/// Species vocabulary. A header containing any of these is a species column.
const SPECIES_KEYWORDS: [&str; 8] = [
    "mallard", "sprig", "widgeon", "teal", "wood", "other", "geese", "pheasant",
];

/// Derived total columns reuse the species vocabulary and must be skipped.
const TOTAL_MARKERS: [&str; 2] = ["day total", "hunter total"];

/// Logical column roles on a hunt sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Member,
    Guide,
    Blind,
    Guns,
    /// Label column that carries the "Conditions" row
    Date,
}

impl ColumnRole {
    pub fn keyword(&self) -> &'static str {
        match self {
            ColumnRole::Member => "member",
            ColumnRole::Guide => "guide",
            ColumnRole::Blind => "blind",
            ColumnRole::Guns => "guns",
            ColumnRole::Date => "date",
        }
    }
}

/// First header whose lowercase form contains the role's keyword.
pub fn resolve(headers: &[String], role: ColumnRole) -> Option<&str> {
    let keyword = role.keyword();
    headers
        .iter()
        .find(|h| h.to_lowercase().contains(keyword))
        .map(|h| h.as_str())
}

/// Whether a header names a countable species (and is not a derived total).
pub fn is_species_column(header: &str) -> bool {
    let lower = header.to_lowercase();
    SPECIES_KEYWORDS.iter().any(|k| lower.contains(k))
        && !TOTAL_MARKERS.iter().any(|m| lower.contains(m))
}

/// All species columns, in header order.
pub fn species_columns(headers: &[String]) -> Vec<&str> {
    headers
        .iter()
        .filter(|h| is_species_column(h))
        .map(|h| h.as_str())
        .collect()
}

/// Whether a species column counts geese rather than ducks.
pub fn is_geese_column(header: &str) -> bool {
    header.to_lowercase().contains("geese")
}

/// The drake and hen mallard columns, if the sheet has them.
pub fn mallard_columns(headers: &[String]) -> (Option<&str>, Option<&str>) {
    let find = |sex: &str| {
        species_columns(headers).into_iter().find(|h| {
            let lower = h.to_lowercase();
            lower.contains("mallard") && lower.contains(sex)
        })
    };
    (find("drake"), find("hen"))
}
