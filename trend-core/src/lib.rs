pub mod defs;
pub mod matcher;
pub mod scorer;
pub mod merger;
pub mod detector;
pub mod engine;
pub mod stats;

pub use defs::*;
pub use matcher::KeywordMatcher;
pub use scorer::score;
pub use merger::{DayState, merge_round};
pub use detector::{NewArrivals, detect_new, first_round_arrivals};
pub use engine::{AggregationEngine, AggregationSettings, aggregate};
pub use stats::{DayStatistics, RepeatedTitle};
