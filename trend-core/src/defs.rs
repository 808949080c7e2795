use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// String-keyed map that iterates in insertion order.
///
/// Platform and title maps use this so that "encounter order" (which the
/// aggregation engine preserves for equal weights) is the order in which
/// rounds introduced each key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.positions.get(key).map(|&index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.positions.get(key) {
            Some(&index) => Some(&mut self.entries[index].1),
            None => None,
        }
    }

    /// Insert or replace a value. A replaced value keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Get the value for `key`, inserting `make()` at the end first if absent.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let index = match self.positions.get(key) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                self.positions.insert(key.to_string(), index);
                self.entries.push((key.to_string(), make()));
                index
            }
        };
        &mut self.entries[index].1
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &V) -> bool) {
        self.entries.retain(|(key, value)| keep(key, value));
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, (key, _))| (key.clone(), index))
            .collect();
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One title as listed by one platform in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    #[serde(default)]
    pub ranks: Vec<u32>,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "mobileUrl")]
    pub mobile_url: String,
}

impl RoundEntry {
    pub fn ranked(rank: u32) -> Self {
        Self {
            ranks: vec![rank],
            ..Self::default()
        }
    }

    pub fn with_urls(mut self, url: impl Into<String>, mobile_url: impl Into<String>) -> Self {
        self.url = url.into();
        self.mobile_url = mobile_url.into();
        self
    }
}

/// Titles of a single platform in a single round: title -> entry.
pub type RoundHeadlines = OrderedMap<RoundEntry>;

/// Merged ranks and urls per platform and title across the day's rounds.
pub type DayDataset = OrderedMap<RoundHeadlines>;

/// Consolidated per-title history: platform -> title -> record.
pub type TitleInfo = OrderedMap<OrderedMap<HeadlineRecord>>;

/// Set of platform ids still being monitored.
pub type PlatformFilter = HashSet<String>;

/// Accumulated history of one (platform, title) pair within a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub ranks: Vec<u32>,
    pub url: String,
    pub mobile_url: String,
    pub count: u32,
    pub first_seen: String,
    pub last_seen: String,
}

impl HeadlineRecord {
    /// Record for a title seen for the first time in `round_id`.
    pub fn first_sighting(entry: &RoundEntry, round_id: &str) -> Self {
        Self {
            ranks: distinct_ranks(&entry.ranks),
            url: entry.url.clone(),
            mobile_url: entry.mobile_url.clone(),
            count: 1,
            first_seen: round_id.to_string(),
            last_seen: round_id.to_string(),
        }
    }

    /// Stand-in record for a title that has no consolidated history.
    pub fn from_entry(entry: &RoundEntry) -> Self {
        Self {
            ranks: entry.ranks.clone(),
            url: entry.url.clone(),
            mobile_url: entry.mobile_url.clone(),
            count: 1,
            first_seen: String::new(),
            last_seen: String::new(),
        }
    }
}

/// Ranks with duplicates removed, first occurrence order kept.
pub fn distinct_ranks(ranks: &[u32]) -> Vec<u32> {
    let mut distinct = Vec::with_capacity(ranks.len());
    for &rank in ranks {
        if !distinct.contains(&rank) {
            distinct.push(rank);
        }
    }
    distinct
}

/// One polling pass across all platforms. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundSnapshot {
    pub round_id: String,
    pub headlines: OrderedMap<RoundHeadlines>,
    pub names: HashMap<String, String>,
    pub failed: Vec<String>,
}

impl RoundSnapshot {
    pub fn new(round_id: impl Into<String>) -> Self {
        Self {
            round_id: round_id.into(),
            ..Self::default()
        }
    }

    pub fn title_count(&self) -> usize {
        self.headlines.values().map(|titles| titles.len()).sum()
    }

    /// Platforms of this round that pass `filter` (all of them when `None`).
    pub fn platforms<'a>(
        &'a self,
        filter: Option<&'a PlatformFilter>,
    ) -> impl Iterator<Item = (&'a str, &'a RoundHeadlines)> + 'a {
        self.headlines
            .iter()
            .filter(move |(platform_id, _)| filter.is_none_or(|ids| ids.contains(*platform_id)))
    }
}

/// Keyword rule group loaded from the keyword file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub required: Vec<String>,
    pub normal: Vec<String>,
    pub group_key: String,
}

impl RuleGroup {
    /// Build a group, deriving the display key from the normal terms
    /// (or the required terms when there are no normal ones).
    pub fn new(required: Vec<String>, normal: Vec<String>) -> Self {
        let group_key = if normal.is_empty() {
            required.join(" ")
        } else {
            normal.join(" ")
        };
        Self {
            required,
            normal,
            group_key,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.normal.is_empty()
    }
}

/// Fractions applied to the rank, frequency and hotness components.
/// Callers keep them summing to 1.0; the scorer does not check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub rank: f64,
    pub frequency: f64,
    pub hotness: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            rank: 0.6,
            frequency: 0.3,
            hotness: 0.1,
        }
    }
}

/// A matched headline with its computed weight. Derived output, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredHeadline {
    pub platform_id: String,
    pub source_name: String,
    pub title: String,
    pub ranks: Vec<u32>,
    pub rank_display: String,
    pub count: u32,
    pub first_seen: String,
    pub last_seen: String,
    pub url: String,
    pub mobile_url: String,
    pub weight: f64,
    pub group_key: Option<String>,
}

/// Plain "[min]" or "[min - max]" display of a rank list; empty when there are no ranks.
pub fn rank_range(ranks: &[u32]) -> String {
    match (ranks.iter().min(), ranks.iter().max()) {
        (Some(min), Some(max)) if min == max => format!("[{min}]"),
        (Some(min), Some(max)) => format!("[{min} - {max}]"),
        _ => String::new(),
    }
}

// Object style note:
// Everything in this crate runs synchronously on state the caller owns and
// passes in. No function here keeps hidden state between calls; the day's
// state is rebuilt by replaying rounds through the merger.
