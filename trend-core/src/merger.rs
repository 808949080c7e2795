use crate::defs::{
    DayDataset, HeadlineRecord, OrderedMap, PlatformFilter, RoundEntry, RoundHeadlines,
    RoundSnapshot, TitleInfo, distinct_ranks,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Fold one platform's batch from one round into the day's state.
///
/// New titles are inserted with `count = 1`. Titles already present get
/// their rank lists unioned (existing order kept, new ranks appended),
/// their count bumped and `last_seen` moved to `round_id`. A url captured
/// earlier is never replaced; an empty one is backfilled.
///
/// Merging the same round again leaves ranks unchanged but still bumps the
/// count, so each round must be merged exactly once.
pub fn merge_round(
    platform_id: &str,
    round: &RoundHeadlines,
    round_id: &str,
    dataset: &mut DayDataset,
    title_info: &mut TitleInfo,
) {
    let platform_titles = dataset.get_or_insert_with(platform_id, OrderedMap::new);
    let platform_info = title_info.get_or_insert_with(platform_id, OrderedMap::new);

    for (title, incoming) in round.iter() {
        match platform_titles.get_mut(title) {
            None => {
                platform_titles.insert(
                    title,
                    RoundEntry {
                        ranks: distinct_ranks(&incoming.ranks),
                        url: incoming.url.clone(),
                        mobile_url: incoming.mobile_url.clone(),
                    },
                );
                platform_info.insert(title, HeadlineRecord::first_sighting(incoming, round_id));
            }
            Some(existing) => {
                union_ranks(&mut existing.ranks, &incoming.ranks);
                backfill(&mut existing.url, &incoming.url);
                backfill(&mut existing.mobile_url, &incoming.mobile_url);

                let merged_ranks = existing.ranks.clone();
                let record = platform_info
                    .get_or_insert_with(title, || HeadlineRecord::first_sighting(incoming, round_id));
                record.ranks = merged_ranks;
                record.count += 1;
                record.last_seen = round_id.to_string();
                backfill(&mut record.url, &incoming.url);
                backfill(&mut record.mobile_url, &incoming.mobile_url);
            }
        }
    }

    debug!(
        "Merged {} titles for {} from round {}",
        round.len(),
        platform_id,
        round_id
    );
}

fn union_ranks(existing: &mut Vec<u32>, incoming: &[u32]) {
    for &rank in incoming {
        if !existing.contains(&rank) {
            existing.push(rank);
        }
    }
}

fn backfill(current: &mut String, incoming: &str) {
    if current.is_empty() && !incoming.is_empty() {
        *current = incoming.to_string();
    }
}

/// The day's accumulated state: merged dataset, per-title history and
/// the latest known display name of each platform.
///
/// Owned by whoever runs the aggregation cycle; built fresh from the
/// day's rounds and discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct DayState {
    pub dataset: DayDataset,
    pub title_info: TitleInfo,
    pub names: HashMap<String, String>,
    rounds_applied: usize,
}

impl DayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the day's state by folding rounds in chronological order.
    pub fn replay<'a>(
        rounds: impl IntoIterator<Item = &'a RoundSnapshot>,
        filter: Option<&PlatformFilter>,
    ) -> Self {
        let mut state = Self::new();
        for snapshot in rounds {
            state.apply(snapshot, filter);
        }
        info!(
            "Replayed {} rounds: {} platforms, {} titles",
            state.rounds_applied,
            state.dataset.len(),
            state.total_titles()
        );
        state
    }

    /// Merge every platform batch of `snapshot` that passes `filter`.
    pub fn apply(&mut self, snapshot: &RoundSnapshot, filter: Option<&PlatformFilter>) {
        for (platform_id, titles) in snapshot.platforms(filter) {
            merge_round(
                platform_id,
                titles,
                &snapshot.round_id,
                &mut self.dataset,
                &mut self.title_info,
            );
            if let Some(name) = snapshot.names.get(platform_id) {
                self.names.insert(platform_id.to_string(), name.clone());
            }
        }
        self.rounds_applied += 1;
    }

    pub fn rounds_applied(&self) -> usize {
        self.rounds_applied
    }

    pub fn total_titles(&self) -> usize {
        self.dataset.values().map(|titles| titles.len()).sum()
    }

    pub fn record(&self, platform_id: &str, title: &str) -> Option<&HeadlineRecord> {
        self.title_info.get(platform_id)?.get(title)
    }
}
