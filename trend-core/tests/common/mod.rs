#![allow(dead_code)]

use std::sync::Once;
use trend_core::{OrderedMap, RoundEntry, RoundHeadlines, RoundSnapshot};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

/// Platform batch from `(title, rank)` pairs, urls empty.
pub fn batch(titles: &[(&str, u32)]) -> RoundHeadlines {
    titles
        .iter()
        .map(|(title, rank)| (title.to_string(), RoundEntry::ranked(*rank)))
        .collect()
}

/// Round holding one batch per `(platform, titles)` pair.
pub fn round(round_id: &str, platforms: &[(&str, &[(&str, u32)])]) -> RoundSnapshot {
    let mut snapshot = RoundSnapshot::new(round_id);
    snapshot.headlines = platforms
        .iter()
        .map(|(platform_id, titles)| (platform_id.to_string(), batch(titles)))
        .collect::<OrderedMap<_>>();
    snapshot
}
