use crate::merger::DayState;

/// A title seen in more than one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatedTitle {
    pub platform_id: String,
    pub title: String,
    pub count: u32,
}

/// Day-level totals over a replayed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayStatistics {
    pub total_platforms: usize,
    pub total_titles: usize,
    /// Title count per platform, in platform encounter order.
    pub per_platform: Vec<(String, usize)>,
    pub repeated: Vec<RepeatedTitle>,
    /// Sum of `count` over every repeated title.
    pub repeated_sightings: u32,
}

impl DayStatistics {
    pub fn from_state(state: &DayState) -> Self {
        let per_platform: Vec<(String, usize)> = state
            .dataset
            .iter()
            .map(|(platform_id, titles)| (platform_id.to_string(), titles.len()))
            .collect();

        let repeated: Vec<RepeatedTitle> = state
            .title_info
            .iter()
            .flat_map(|(platform_id, records)| {
                records
                    .iter()
                    .filter(|(_, record)| record.count > 1)
                    .map(move |(title, record)| RepeatedTitle {
                        platform_id: platform_id.to_string(),
                        title: title.to_string(),
                        count: record.count,
                    })
            })
            .collect();

        Self {
            total_platforms: per_platform.len(),
            total_titles: per_platform.iter().map(|(_, count)| count).sum(),
            repeated_sightings: repeated.iter().map(|title| title.count).sum(),
            per_platform,
            repeated,
        }
    }

    pub fn titles_for(&self, platform_id: &str) -> usize {
        self.per_platform
            .iter()
            .find(|(id, _)| id == platform_id)
            .map_or(0, |(_, count)| *count)
    }
}
