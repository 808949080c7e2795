use crate::defs::{HeadlineRecord, WeightConfig};

/// Ranks at or past this position all contribute the minimum rank score.
const RANK_FLOOR: u32 = 10;
/// Rounds beyond this many do not raise the frequency score further.
const FREQUENCY_CAP: u32 = 10;

/// Weight of a headline from its rank history and round count.
///
/// - rank component: mean of `11 - min(rank, 10)` over all ranks (1..=10)
/// - frequency component: `min(count, 10) * 10` (0..=100)
/// - hotness component: share of ranks within `rank_threshold`, times 100
///
/// An empty rank list scores exactly 0.0.
pub fn score(ranks: &[u32], count: u32, rank_threshold: u32, weights: &WeightConfig) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }

    let appearances = ranks.len() as f64;

    let rank_total: u32 = ranks
        .iter()
        .map(|&rank| RANK_FLOOR + 1 - rank.min(RANK_FLOOR))
        .sum();
    let rank_component = f64::from(rank_total) / appearances;

    let frequency_component = f64::from(count.min(FREQUENCY_CAP)) * 10.0;

    let hot = ranks.iter().filter(|&&rank| rank <= rank_threshold).count();
    let hotness_component = hot as f64 / appearances * 100.0;

    rank_component * weights.rank
        + frequency_component * weights.frequency
        + hotness_component * weights.hotness
}

impl HeadlineRecord {
    pub fn weight(&self, rank_threshold: u32, weights: &WeightConfig) -> f64 {
        score(&self.ranks, self.count, rank_threshold, weights)
    }
}
