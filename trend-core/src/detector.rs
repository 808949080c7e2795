use crate::defs::{OrderedMap, PlatformFilter, RoundHeadlines, RoundSnapshot};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// New titles per platform: platform -> title -> entry from the latest round.
pub type NewArrivals = OrderedMap<RoundHeadlines>;

/// Titles in the most recent round that no earlier round listed for the
/// same platform.
///
/// `rounds` must be in chronological order. With fewer than two rounds
/// there is nothing to compare against and the result is empty. When a
/// filter is given, platforms outside it are ignored on both sides.
/// Platforms with no new titles are omitted.
pub fn detect_new(rounds: &[RoundSnapshot], filter: Option<&PlatformFilter>) -> NewArrivals {
    let Some((latest, earlier)) = rounds.split_last() else {
        return NewArrivals::new();
    };
    if earlier.is_empty() {
        info!("Only one round recorded today, skipping new arrival detection");
        return NewArrivals::new();
    }

    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
    for snapshot in earlier {
        for (platform_id, titles) in snapshot.platforms(filter) {
            seen.entry(platform_id).or_default().extend(titles.keys());
        }
    }

    let mut arrivals = NewArrivals::new();
    for (platform_id, titles) in latest.platforms(filter) {
        let history = seen.get(platform_id);
        let fresh: RoundHeadlines = titles
            .iter()
            .filter(|(title, _)| history.is_none_or(|known| !known.contains(title)))
            .map(|(title, entry)| (title.to_string(), entry.clone()))
            .collect();

        if !fresh.is_empty() {
            arrivals.insert(platform_id, fresh);
        }
    }

    info!(
        "Detected {} new titles in round {}",
        arrivals.values().map(|titles| titles.len()).sum::<usize>(),
        latest.round_id
    );
    arrivals
}

/// New arrivals when the latest round is also the first of the day:
/// every title in it is new.
pub fn first_round_arrivals(round: &RoundSnapshot, filter: Option<&PlatformFilter>) -> NewArrivals {
    round
        .platforms(filter)
        .filter(|(_, titles)| !titles.is_empty())
        .map(|(platform_id, titles)| (platform_id.to_string(), titles.clone()))
        .collect()
}
