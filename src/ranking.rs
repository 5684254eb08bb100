//! Top-N views over aggregate groups.
//!
//! Each view is two independent rankings of the same groups: one by total
//! birds and one by per-hunt average. Sorting is stable, so equal values
//! keep first-seen order.

use crate::aggregate::HuntStats;
use crate::model::AggregateEntry;
use serde::Serialize;
use std::cmp::Ordering;

/// Members shown in each top-member ranking.
pub const TOP_MEMBERS: usize = 10;

/// Guides shown in each top-guide ranking.
pub const TOP_GUIDES: usize = 5;

/// A group ranked by total and, separately, by average.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopView {
    pub by_total: Vec<AggregateEntry>,
    pub by_average: Vec<AggregateEntry>,
}

fn ranked_by(
    entries: &[AggregateEntry],
    limit: Option<usize>,
    key: impl Fn(&AggregateEntry) -> f64,
) -> Vec<AggregateEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }
    sorted
}

/// Rank `entries` by total and by average, keeping at most `limit` of each.
pub fn rank(entries: &[AggregateEntry], limit: Option<usize>) -> TopView {
    TopView {
        by_total: ranked_by(entries, limit, |e| e.total),
        by_average: ranked_by(entries, limit, |e| e.average),
    }
}

pub fn top_members(stats: &HuntStats) -> TopView {
    rank(&stats.members, Some(TOP_MEMBERS))
}

pub fn top_guides(stats: &HuntStats) -> TopView {
    rank(&stats.guides, Some(TOP_GUIDES))
}

pub fn top_blinds(stats: &HuntStats) -> TopView {
    rank(&stats.blinds, None)
}

pub fn top_species(stats: &HuntStats) -> TopView {
    rank(&stats.species, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(spec: &[(&str, f64, usize)]) -> Vec<AggregateEntry> {
        spec.iter()
            .map(|(name, ducks, hunts)| AggregateEntry::new(name, *ducks, 0.0, *hunts))
            .collect()
    }

    #[test]
    fn test_total_and_average_are_independent() {
        let groups = entries(&[("Bob", 10.0, 5), ("Jay", 6.0, 1), ("Kev", 8.0, 2)]);
        let view = rank(&groups, None);
        let by_total: Vec<&str> = view.by_total.iter().map(|e| e.name.as_str()).collect();
        let by_average: Vec<&str> = view.by_average.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(by_total, vec!["Bob", "Kev", "Jay"]);
        assert_eq!(by_average, vec!["Jay", "Kev", "Bob"]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let groups = entries(&[("Bob", 4.0, 1), ("Jay", 4.0, 1), ("Kev", 4.0, 1)]);
        let view = rank(&groups, Some(2));
        let names: Vec<&str> = view.by_total.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Jay"]);
    }

    #[test]
    fn test_limit_applies_to_each_ranking() {
        let groups: Vec<AggregateEntry> = (0..12)
            .map(|i| AggregateEntry::new(&format!("M{}", i), i as f64, 0.0, 12 - i))
            .collect();
        let view = rank(&groups, Some(TOP_MEMBERS));
        assert_eq!(view.by_total.len(), 10);
        assert_eq!(view.by_average.len(), 10);
        assert_eq!(view.by_total[0].name, "M11");
    }
}
