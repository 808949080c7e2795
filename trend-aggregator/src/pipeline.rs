use crate::config::{AppConfig, KeywordRules};
use crate::fetcher::Fetcher;
use crate::notifiers::build_notifiers;
use crate::report::{HtmlReport, ReportData, ReportMode};
use crate::storage::open_round_log;
use crate::traits::{Notifier, RoundLog};
use crate::types::Result;
use crate::utils::time::{beijing_now, day_label, round_label, timestamp_label};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use trend_core::{
    AggregationEngine, AggregationSettings, DayDataset, DayState, DayStatistics, KeywordMatcher,
    NewArrivals, OrderedMap, PlatformFilter, detect_new, first_round_arrivals,
};

/// Outcome of one polling cycle.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub day: String,
    pub round_id: String,
    pub rounds_today: usize,
    pub total_titles: usize,
    pub matched: usize,
    pub new_titles: usize,
    pub failed: Vec<String>,
    pub report_path: Option<PathBuf>,
    pub notified_channels: usize,
}

/// Fetch, persist, replay, score, report and notify: one full cycle.
pub struct TrendPipeline {
    config: AppConfig,
    rules: KeywordRules,
    mode: ReportMode,
    notify: bool,
    fetcher: Option<Fetcher>,
    round_log: Box<dyn RoundLog>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl TrendPipeline {
    pub async fn new(config: AppConfig, rules: KeywordRules, mode: ReportMode, notify: bool) -> Result<Self> {
        let fetcher = if config.crawler.enable_crawler {
            Some(Fetcher::new(config.crawler.fetch_config())?)
        } else {
            None
        };
        let round_log = open_round_log(&config).await?;
        let proxy = config.crawler.fetch_config().proxy_url;
        let notifiers = build_notifiers(&config.notification, proxy.as_deref())?;

        Ok(Self::from_parts(config, rules, mode, notify, fetcher, round_log, notifiers))
    }

    pub fn from_parts(
        config: AppConfig,
        rules: KeywordRules,
        mode: ReportMode,
        notify: bool,
        fetcher: Option<Fetcher>,
        round_log: Box<dyn RoundLog>,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            config,
            rules,
            mode,
            notify,
            fetcher,
            round_log,
            notifiers,
        }
    }

    pub async fn run_once(&self) -> Result<RunSummary> {
        let now = beijing_now();
        let day = day_label(&now);
        let round_id = round_label(&now);
        self.run_round(&day, &round_id, &timestamp_label(&now)).await
    }

    /// Run a cycle for an explicit day and round id.
    pub async fn run_round(&self, day: &str, round_id: &str, generated_at: &str) -> Result<RunSummary> {
        let mut summary = RunSummary {
            day: day.to_string(),
            round_id: round_id.to_string(),
            ..RunSummary::default()
        };

        match &self.fetcher {
            Some(fetcher) => {
                let snapshot = fetcher
                    .fetch_round(&self.config.platforms)
                    .await
                    .into_snapshot(round_id);
                self.round_log.append(day, &snapshot).await?;
            }
            None => info!("Crawler disabled, reporting on stored rounds only"),
        }

        let rounds = self.round_log.load_day(day).await?;
        let Some(latest) = rounds.last() else {
            warn!("No rounds recorded for {}, nothing to report", day);
            return Ok(summary);
        };
        info!("Replaying {} rounds from {} log", rounds.len(), self.round_log.backend());

        let filter: PlatformFilter = self.config.platform_ids();
        let state = DayState::replay(&rounds, Some(&filter));
        let names = self.platform_names(&state);

        let stats = DayStatistics::from_state(&state);
        for (platform_id, titles) in &stats.per_platform {
            debug!("{}: {} titles today", platform_id, titles);
        }
        info!(
            "Day so far: {} titles on {} platforms, {} seen in several rounds",
            stats.total_titles,
            stats.total_platforms,
            stats.repeated.len()
        );

        let arrivals = detect_new(&rounds, Some(&filter));
        let fresh_this_round = if rounds.len() == 1 {
            first_round_arrivals(latest, Some(&filter))
        } else {
            arrivals.clone()
        };

        let selected = match self.mode {
            ReportMode::Daily => state.dataset.clone(),
            ReportMode::Current => select_titles(&state.dataset, |platform, title| {
                latest
                    .headlines
                    .get(platform)
                    .is_some_and(|titles| titles.contains_key(title))
            }),
            ReportMode::Incremental => select_titles(&state.dataset, |platform, title| {
                fresh_this_round
                    .get(platform)
                    .is_some_and(|titles| titles.contains_key(title))
            }),
        };

        let engine = self.engine();
        let scored = engine.run(&selected, &names, &state.title_info);

        let report = ReportData::prepare(
            &scored,
            &arrivals,
            engine.matcher(),
            &names,
            &latest.failed,
            self.mode,
            engine.settings().rank_threshold,
        );

        let html = HtmlReport::render(&report, state.total_titles(), generated_at);
        summary.report_path = Some(HtmlReport::write(
            Path::new(&self.config.report.output_dir),
            day,
            self.mode.title(),
            &html,
        )
        .await?);

        summary.notified_channels = self.notify_all(&report).await;
        summary.rounds_today = rounds.len();
        summary.total_titles = state.total_titles();
        summary.matched = scored.len();
        summary.new_titles = count_titles(&arrivals);
        summary.failed = latest.failed.clone();

        info!(
            "Round {} done: {} titles, {} matched, {} new, {} failed",
            summary.round_id,
            summary.total_titles,
            summary.matched,
            summary.new_titles,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Engine for the loaded keyword rules. No groups means show-all.
    fn engine(&self) -> AggregationEngine {
        let matcher = if self.rules.groups.is_empty() {
            KeywordMatcher::show_all()
        } else {
            KeywordMatcher::new(&self.rules.groups, &self.rules.filters)
        };
        let settings = AggregationSettings {
            rank_threshold: self.config.report.rank_threshold,
            weights: self.config.weights(),
        };
        AggregationEngine::new(matcher, settings)
    }

    /// Names recorded in the rounds, overridden by the configured ones.
    fn platform_names(&self, state: &DayState) -> HashMap<String, String> {
        let mut names = state.names.clone();
        for platform in &self.config.platforms {
            names.insert(platform.id.clone(), platform.display_name().to_string());
        }
        names
    }

    async fn notify_all(&self, report: &ReportData) -> usize {
        if !self.notify || !self.config.notification.enabled {
            info!("Notifications disabled");
            return 0;
        }
        if self.notifiers.is_empty() {
            info!("No notification channel configured");
            return 0;
        }
        if report.is_empty() {
            info!("No matched headlines, skipping notifications");
            return 0;
        }

        let report_type = self.mode.title();
        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.send(report, report_type).await {
                Ok(_) => delivered += 1,
                Err(e) => error!("{} notification failed: {}", notifier.channel(), e),
            }
        }

        if delivered == 0 {
            warn!("Every notification channel failed");
        }
        delivered
    }
}

fn select_titles(dataset: &DayDataset, keep: impl Fn(&str, &str) -> bool) -> DayDataset {
    dataset
        .iter()
        .map(|(platform, titles)| {
            let kept: OrderedMap<_> = titles
                .iter()
                .filter(|(title, _)| keep(platform, title))
                .map(|(title, entry)| (title.to_string(), entry.clone()))
                .collect();
            (platform.to_string(), kept)
        })
        .filter(|(_, titles)| !titles.is_empty())
        .collect()
}

fn count_titles(arrivals: &NewArrivals) -> usize {
    arrivals.values().map(|titles| titles.len()).sum()
}
