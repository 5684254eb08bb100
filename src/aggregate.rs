//! Harvest statistics grouped by member, blind, guide, species and date.
//!
//! Every view is recomputed from scratch from the record list. A condition
//! filter narrows the records first and then runs the exact same grouping,
//! so filtered and unfiltered statistics cannot drift apart.

use crate::columns;
use crate::model::{AggregateEntry, DateTrendEntry, HuntRecord, Sheet, TrendStatus, UNKNOWN};
use crate::records::extract_all;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Days from 0001-01-01 to 1970-01-01; unparsable dates sort here.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// All grouped statistics for one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntStats {
    pub members: Vec<AggregateEntry>,
    pub blinds: Vec<AggregateEntry>,
    pub guides: Vec<AggregateEntry>,
    pub species: Vec<AggregateEntry>,
    pub date_trend: Vec<DateTrendEntry>,
    pub totals: SeasonTotals,
}

/// Season-wide summary figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTotals {
    pub ducks: f64,
    pub geese: f64,
    pub mallards: f64,
    pub total: f64,
    pub records: usize,
    pub days_hunted: usize,
    pub days_not_hunted: usize,
}

/// Sums for one group key, in first-seen order.
#[derive(Default)]
struct Grouper {
    order: Vec<String>,
    sums: HashMap<String, (f64, f64, usize)>,
}

impl Grouper {
    fn add(&mut self, key: &str, ducks: f64, geese: f64) {
        if !self.sums.contains_key(key) {
            self.order.push(key.to_string());
        }
        let entry = self.sums.entry(key.to_string()).or_insert((0.0, 0.0, 0));
        entry.0 += ducks;
        entry.1 += geese;
        entry.2 += 1;
    }

    fn into_entries(self) -> Vec<AggregateEntry> {
        let Grouper { order, sums } = self;
        order
            .iter()
            .filter_map(|key| {
                sums.get(key)
                    .map(|(ducks, geese, hunts)| AggregateEntry::new(key, *ducks, *geese, *hunts))
            })
            .collect()
    }
}

/// Blind/guide keys that do not name a real group.
fn is_known(key: &str) -> bool {
    !key.is_empty() && key != UNKNOWN
}

/// Aggregate `records`, optionally restricted to one condition.
///
/// `sheet_names` lists every known hunt date regardless of filtering, so
/// dates without qualifying records still appear in the trend as DNH.
pub fn aggregate(
    records: &[HuntRecord],
    sheet_names: &[String],
    condition: Option<&str>,
) -> HuntStats {
    let selected: Vec<&HuntRecord> = records
        .iter()
        .filter(|r| condition.map_or(true, |c| r.condition == c))
        .collect();

    let mut members = Grouper::default();
    let mut blinds = Grouper::default();
    let mut guides = Grouper::default();
    let mut species = Grouper::default();

    for record in &selected {
        members.add(&record.member, record.total_ducks, record.total_geese);
        if is_known(&record.blind) {
            blinds.add(&record.blind, record.total_ducks, record.total_geese);
        }
        if let Some(guide) = record.guide.as_deref().filter(|g| is_known(g)) {
            guides.add(guide, record.total_ducks, record.total_geese);
        }
        for kill in &record.species_kills {
            if columns::is_geese_column(&kill.species) {
                species.add(&kill.species, 0.0, kill.count);
            } else {
                species.add(&kill.species, kill.count, 0.0);
            }
        }
    }

    let date_trend = date_trend(&selected, sheet_names);
    let totals = SeasonTotals {
        ducks: selected.iter().map(|r| r.total_ducks).sum(),
        geese: selected.iter().map(|r| r.total_geese).sum(),
        mallards: selected.iter().map(|r| r.total_mallards).sum(),
        total: selected.iter().map(|r| r.total_birds()).sum(),
        records: selected.len(),
        days_hunted: date_trend
            .iter()
            .filter(|d| d.status == TrendStatus::Hunted)
            .count(),
        days_not_hunted: date_trend
            .iter()
            .filter(|d| d.status == TrendStatus::Dnh)
            .count(),
    };

    HuntStats {
        members: members.into_entries(),
        blinds: blinds.into_entries(),
        guides: guides.into_entries(),
        species: species.into_entries(),
        date_trend,
        totals,
    }
}

/// Extract records from `sheets` and aggregate them.
pub fn aggregate_sheets(sheets: &[Sheet], condition: Option<&str>) -> HuntStats {
    let records = extract_all(sheets);
    let names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
    aggregate(&records, &names, condition)
}

/// Distinct record conditions in first-seen order.
pub fn available_conditions(records: &[HuntRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.condition.as_str()))
        .map(|r| r.condition.clone())
        .collect()
}

fn date_trend(records: &[&HuntRecord], sheet_names: &[String]) -> Vec<DateTrendEntry> {
    let mut by_date: HashMap<&str, Vec<&HuntRecord>> = HashMap::new();
    for &record in records {
        by_date.entry(record.date.as_str()).or_default().push(record);
    }

    let mut seen = HashSet::new();
    let mut trend: Vec<DateTrendEntry> = sheet_names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| {
            let day = by_date.get(name.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let blinds: HashSet<&str> = day
                .iter()
                .map(|r| r.blind.as_str())
                .filter(|b| is_known(b))
                .collect();
            let ducks: f64 = day.iter().map(|r| r.total_ducks).sum();
            let geese: f64 = day.iter().map(|r| r.total_geese).sum();
            DateTrendEntry {
                date: name.clone(),
                date_formatted: format_sheet_date(name),
                ducks,
                geese,
                mallards: day.iter().map(|r| r.total_mallards).sum(),
                total: ducks + geese,
                blind_count: blinds.len(),
                status: if day.is_empty() {
                    TrendStatus::Dnh
                } else {
                    TrendStatus::Hunted
                },
            }
        })
        .collect();

    trend.sort_by_key(|entry| date_sort_key(&entry.date));
    trend
}

/// Parse a sheet name as a date: `MM_DD_YY` (two-digit years are 20xx)
/// when it contains `_`, otherwise a `YYYY-MM-DD` prefix.
pub fn parse_sheet_date(name: &str) -> Option<NaiveDate> {
    let name = name.trim();
    if name.contains('_') {
        let mut parts = name.split('_').map(|p| p.trim().parse::<i32>());
        let month = parts.next()?.ok()?;
        let day = parts.next()?.ok()?;
        let mut year = parts.next()?.ok()?;
        if year < 100 {
            year += 2000;
        }
        NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    } else {
        NaiveDate::parse_from_str(name.get(..10)?, "%Y-%m-%d").ok()
    }
}

/// Days since 1970-01-01; unparsable names sort as the epoch.
fn date_sort_key(name: &str) -> i32 {
    parse_sheet_date(name)
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .unwrap_or(0)
}

/// Display form of a sheet name ("Nov 19, 2025"); unparsable names verbatim.
pub fn format_sheet_date(name: &str) -> String {
    parse_sheet_date(name)
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpeciesKill;

    fn record(date: &str, member: &str, blind: &str, kills: &[(&str, f64)]) -> HuntRecord {
        let species_kills: Vec<SpeciesKill> = kills
            .iter()
            .map(|(s, c)| SpeciesKill {
                species: s.to_string(),
                count: *c,
            })
            .collect();
        let geese: f64 = kills.iter().filter(|(s, _)| *s == "Geese").map(|(_, c)| c).sum();
        let ducks: f64 = kills.iter().filter(|(s, _)| *s != "Geese").map(|(_, c)| c).sum();
        HuntRecord {
            date: date.to_string(),
            member: member.to_string(),
            guide: None,
            blind: blind.to_string(),
            guns: 1.0,
            condition: UNKNOWN.to_string(),
            species_kills,
            total_ducks: ducks,
            total_geese: geese,
            total_mallards: 0.0,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_sheet_date() {
        assert_eq!(parse_sheet_date("11_19_25"), NaiveDate::from_ymd_opt(2025, 11, 19));
        assert_eq!(parse_sheet_date("1_02_2026"), NaiveDate::from_ymd_opt(2026, 1, 2));
        assert_eq!(parse_sheet_date("2025-12-03"), NaiveDate::from_ymd_opt(2025, 12, 3));
        assert_eq!(parse_sheet_date("Summary"), None);
        assert_eq!(parse_sheet_date("13_40_25"), None);
    }

    #[test]
    fn test_format_sheet_date() {
        assert_eq!(format_sheet_date("11_19_25"), "Nov 19, 2025");
        assert_eq!(format_sheet_date("Opener"), "Opener");
    }

    #[test]
    fn test_member_hunts_count_records() {
        let records = vec![
            record("11_19_25", "Bob", "4", &[("Teal", 2.0)]),
            record("11_19_25", "Bob", "4", &[("Geese", 1.0)]),
            record("11_20_25", "Jay", "Unknown", &[("Teal", 3.0)]),
        ];
        let stats = aggregate(&records, &names(&["11_19_25", "11_20_25"]), None);
        assert_eq!(stats.members.len(), 2);
        let bob = &stats.members[0];
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.hunts, 2);
        assert_eq!(bob.ducks, 2.0);
        assert_eq!(bob.geese, 1.0);
        assert_eq!(bob.average, 1.5);
        assert_eq!(stats.blinds.len(), 1);
        assert_eq!(stats.blinds[0].name, "4");
        assert!(stats.guides.is_empty());
    }

    #[test]
    fn test_species_groups() {
        let records = vec![
            record("11_19_25", "Bob", "4", &[("Teal", 2.0), ("Geese", 1.0)]),
            record("11_19_25", "Jay", "5", &[("Teal", 1.0)]),
        ];
        let stats = aggregate(&records, &names(&["11_19_25"]), None);
        assert_eq!(stats.species[0].name, "Teal");
        assert_eq!(stats.species[0].ducks, 3.0);
        assert_eq!(stats.species[0].hunts, 2);
        assert_eq!(stats.species[1].name, "Geese");
        assert_eq!(stats.species[1].geese, 1.0);
        assert_eq!(stats.species[1].ducks, 0.0);
    }

    #[test]
    fn test_trend_sorted_with_dnh() {
        let records = vec![
            record("11_20_25", "Bob", "4", &[("Teal", 2.0)]),
            record("11_20_25", "Jay", "5", &[("Teal", 1.0)]),
            record("11_20_25", "Kev", "Unknown", &[("Teal", 1.0)]),
        ];
        let sheet_names = names(&["11_20_25", "11_19_25", "11_20_25", "Notes"]);
        let stats = aggregate(&records, &sheet_names, None);
        let dates: Vec<&str> = stats.date_trend.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["Notes", "11_19_25", "11_20_25"]);
        assert_eq!(stats.date_trend[1].status, TrendStatus::Dnh);
        assert_eq!(stats.date_trend[1].total, 0.0);
        assert_eq!(stats.date_trend[2].status, TrendStatus::Hunted);
        assert_eq!(stats.date_trend[2].blind_count, 2);
        assert_eq!(stats.date_trend[2].total, 4.0);
        assert_eq!(stats.totals.days_hunted, 1);
        assert_eq!(stats.totals.days_not_hunted, 2);
    }

    #[test]
    fn test_condition_filter() {
        let mut wet = record("11_19_25", "Bob", "4", &[("Teal", 2.0)]);
        wet.condition = "Rainy".to_string();
        let dry = record("11_20_25", "Jay", "5", &[("Teal", 1.0)]);
        let records = vec![wet, dry];
        let sheet_names = names(&["11_19_25", "11_20_25"]);

        let rainy = aggregate(&records, &sheet_names, Some("Rainy"));
        assert_eq!(rainy.members.len(), 1);
        assert_eq!(rainy.members[0].name, "Bob");
        assert_eq!(rainy.date_trend[1].status, TrendStatus::Dnh);

        let foggy = aggregate(&records, &sheet_names, Some("Foggy"));
        assert!(foggy.members.is_empty());
        assert!(foggy.date_trend.iter().all(|d| d.status == TrendStatus::Dnh));

        assert_eq!(available_conditions(&records), vec!["Rainy", "Unknown"]);
    }
}
