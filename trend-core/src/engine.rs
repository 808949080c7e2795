use crate::defs::{
    DayDataset, HeadlineRecord, RuleGroup, ScoredHeadline, TitleInfo, WeightConfig, rank_range,
};
use crate::matcher::KeywordMatcher;
use std::collections::HashMap;
use tracing::{debug, info};

/// Everything the engine needs besides the data itself.
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub rank_threshold: u32,
    pub weights: WeightConfig,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            rank_threshold: 10,
            weights: WeightConfig::default(),
        }
    }
}

/// Match, score and rank every title of the day's dataset.
///
/// With an empty `groups` list every title is kept and `filters` is ignored.
/// History comes from `title_info` when it has the title; otherwise the
/// raw dataset entry stands in with a count of one. Output is sorted by
/// weight, highest first, keeping dataset order among equal weights.
pub fn aggregate(
    dataset: &DayDataset,
    groups: &[RuleGroup],
    filters: &[String],
    id_to_name: &HashMap<String, String>,
    title_info: &TitleInfo,
    rank_threshold: u32,
    weights: &WeightConfig,
) -> Vec<ScoredHeadline> {
    let matcher = if groups.is_empty() {
        info!("No keyword groups configured, showing every headline");
        KeywordMatcher::show_all()
    } else {
        KeywordMatcher::new(groups, filters)
    };

    let settings = AggregationSettings {
        rank_threshold,
        weights: *weights,
    };
    AggregationEngine::new(matcher, settings).run(dataset, id_to_name, title_info)
}

/// Keyword matcher plus scoring settings, reusable across datasets.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    matcher: KeywordMatcher,
    settings: AggregationSettings,
}

impl AggregationEngine {
    pub fn new(matcher: KeywordMatcher, settings: AggregationSettings) -> Self {
        Self { matcher, settings }
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    pub fn run(
        &self,
        dataset: &DayDataset,
        id_to_name: &HashMap<String, String>,
        title_info: &TitleInfo,
    ) -> Vec<ScoredHeadline> {
        let mut scored = Vec::new();

        for (platform_id, titles) in dataset.iter() {
            let source_name = id_to_name
                .get(platform_id)
                .cloned()
                .unwrap_or_else(|| platform_id.to_string());
            let platform_info = title_info.get(platform_id);

            for (title, entry) in titles.iter() {
                let group_key = if self.matcher.is_show_all() {
                    None
                } else {
                    match self.matcher.matching_group(title) {
                        Some(group) => Some(group.group_key.clone()),
                        None => continue,
                    }
                };

                let record = platform_info
                    .and_then(|info| info.get(title))
                    .cloned()
                    .unwrap_or_else(|| HeadlineRecord::from_entry(entry));
                let weight = record.weight(self.settings.rank_threshold, &self.settings.weights);

                debug!("Matched [{}] {} (weight {:.2})", platform_id, title, weight);

                scored.push(ScoredHeadline {
                    platform_id: platform_id.to_string(),
                    source_name: source_name.clone(),
                    title: title.to_string(),
                    rank_display: rank_range(&record.ranks),
                    ranks: record.ranks,
                    count: record.count,
                    first_seen: record.first_seen,
                    last_seen: record.last_seen,
                    url: record.url,
                    mobile_url: record.mobile_url,
                    weight,
                    group_key,
                });
            }
        }

        // Vec::sort_by is stable, so equal weights keep dataset order.
        scored.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        info!("Matched {} headlines", scored.len());
        scored
    }
}
