#![allow(dead_code)]

use std::sync::Once;
use trend_aggregator::{AppConfig, KeywordRules, Platform};
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

pub fn headlines(titles: &[(&str, u32)]) -> RoundHeadlines {
    titles
        .iter()
        .map(|(title, rank)| (title.to_string(), RoundEntry::ranked(*rank)))
        .collect()
}

pub fn round(round_id: &str, platforms: &[(&str, &[(&str, u32)])]) -> RoundSnapshot {
    let mut snapshot = RoundSnapshot::new(round_id);
    snapshot.headlines = platforms
        .iter()
        .map(|(platform_id, titles)| (platform_id.to_string(), headlines(titles)))
        .collect::<OrderedMap<_>>();
    for (platform_id, _) in platforms {
        snapshot
            .names
            .insert(platform_id.to_string(), platform_id.to_uppercase());
    }
    snapshot
}

/// Config with the given platforms, output under `output_dir`, crawler and
/// notifications left at their defaults.
pub fn config_for(output_dir: &str, platforms: &[(&str, &str)]) -> AppConfig {
    let mut config = AppConfig::default();
    config.report.output_dir = output_dir.to_string();
    config.platforms = platforms
        .iter()
        .map(|(id, name)| Platform::new(*id, *name))
        .collect();
    config
}

pub fn rules(contents: &str) -> KeywordRules {
    KeywordRules::parse(contents)
}

/// Mock API body listing `titles` in rank order.
pub fn api_body(titles: &[&str]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            serde_json::json!({
                "title": title,
                "url": format!("https://example.com/{index}"),
                "mobileUrl": format!("https://m.example.com/{index}"),
            })
        })
        .collect();
    serde_json::json!({ "status": "success", "items": items })
}

pub fn scored(platform_id: &str, title: &str, ranks: &[u32], group: Option<&str>, weight: f64) -> trend_core::ScoredHeadline {
    trend_core::ScoredHeadline {
        platform_id: platform_id.to_string(),
        source_name: platform_id.to_uppercase(),
        title: title.to_string(),
        ranks: ranks.to_vec(),
        rank_display: trend_core::rank_range(ranks),
        count: ranks.len() as u32,
        first_seen: "09-00".to_string(),
        last_seen: "10-30".to_string(),
        url: format!("https://{platform_id}.com/{}", title.len()),
        mobile_url: String::new(),
        weight,
        group_key: group.map(str::to_string),
    }
}

pub fn names(ids: &[&str]) -> std::collections::HashMap<String, String> {
    ids.iter().map(|id| (id.to_string(), id.to_uppercase())).collect()
}
