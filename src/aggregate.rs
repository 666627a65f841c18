//! Group-by accumulation for the exploratory summaries.
//!
//! A [`GroupAccumulator`] keys rows by one label and keeps, per group, the
//! numeric metrics and distinct-value sets the explorer asks for. Ranking
//! mirrors frequency tables: larger totals first, ties broken by key.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{dataset::Dataset, stats::ColumnStats};

#[derive(Debug, Clone, Default)]
pub struct GroupEntry {
    rows: usize,
    metrics: HashMap<String, ColumnStats>,
    distinct: HashMap<String, HashSet<String>>,
    first: HashMap<String, String>,
}

impl GroupEntry {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn add_metric(&mut self, name: &str, value: Option<f64>) {
        let stats = self.metrics.entry(name.to_string()).or_default();
        if let Some(value) = value {
            stats.add_value(value);
        }
    }

    pub fn add_distinct(&mut self, name: &str, value: Option<&str>) {
        let set = self.distinct.entry(name.to_string()).or_default();
        if let Some(value) = value {
            set.insert(value.to_string());
        }
    }

    /// Remembers the first value seen for `name` in this group.
    pub fn keep_first(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.first
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    pub fn metric(&self, name: &str) -> Option<&ColumnStats> {
        self.metrics.get(name)
    }

    pub fn sum(&self, name: &str) -> f64 {
        self.metric(name).map_or(0.0, ColumnStats::sum)
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        self.metric(name).and_then(ColumnStats::mean)
    }

    pub fn std_dev(&self, name: &str) -> Option<f64> {
        self.metric(name).and_then(ColumnStats::std_dev)
    }

    pub fn count(&self, name: &str) -> usize {
        self.metric(name).map_or(0, ColumnStats::count)
    }

    pub fn distinct_count(&self, name: &str) -> usize {
        self.distinct.get(name).map_or(0, HashSet::len)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.first.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct GroupAccumulator<K> {
    groups: BTreeMap<K, GroupEntry>,
}

impl<K> Default for GroupAccumulator<K> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> GroupAccumulator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group for `key`, counting one more row in it.
    pub fn row(&mut self, key: K) -> &mut GroupEntry {
        let entry = self.groups.entry(key).or_default();
        entry.rows += 1;
        entry
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&GroupEntry> {
        self.groups.get(key)
    }

    /// Groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &GroupEntry)> {
        self.groups.iter()
    }

    /// Groups ordered by the sum of `metric`, largest first.
    pub fn ranked_by(&self, metric: &str) -> Vec<(&K, &GroupEntry)> {
        let mut items: Vec<_> = self.groups.iter().collect();
        items.sort_by(|a, b| {
            b.1.sum(metric)
                .total_cmp(&a.1.sum(metric))
                .then_with(|| a.0.cmp(b.0))
        });
        items
    }
}

/// Groups the rows of `dataset` by the text of column `key`, feeding each
/// group through `ingest`. Rows with a missing key are skipped.
pub fn group_by_text<F>(dataset: &Dataset, key: &str, mut ingest: F) -> GroupAccumulator<String>
where
    F: FnMut(&mut GroupEntry, usize),
{
    let mut groups = GroupAccumulator::new();
    let Some(column) = dataset.column(key) else {
        return groups;
    };
    for row in 0..dataset.row_count() {
        let Some(label) = column.data.value(row).map(|value| value.as_display()) else {
            continue;
        };
        ingest(groups.row(label), row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_by_sorts_totals_descending_then_key() {
        let mut groups = GroupAccumulator::new();
        groups.row("b".to_string()).add_metric("SALES", Some(10.0));
        groups.row("a".to_string()).add_metric("SALES", Some(10.0));
        groups.row("c".to_string()).add_metric("SALES", Some(30.0));
        let order: Vec<&String> = groups.ranked_by("SALES").into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn entries_track_rows_distinct_values_and_first_seen() {
        let mut groups = GroupAccumulator::new();
        for (line, code) in [("Ships", "S1"), ("Ships", "S2"), ("Ships", "S1")] {
            let entry = groups.row(line.to_string());
            entry.add_distinct("PRODUCTCODE", Some(code));
            entry.keep_first("PRODUCTCODE", Some(code));
            entry.add_metric("SALES", None);
        }
        let entry = groups.get(&"Ships".to_string()).unwrap();
        assert_eq!(entry.rows(), 3);
        assert_eq!(entry.distinct_count("PRODUCTCODE"), 2);
        assert_eq!(entry.first("PRODUCTCODE"), Some("S1"));
        assert_eq!(entry.count("SALES"), 0);
    }
}
