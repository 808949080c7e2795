use crate::types::{Result, TrendError};
use crate::utils::text::html_escape;
use crate::utils::time::time_display;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use trend_core::{KeywordMatcher, NewArrivals, ScoredHeadline};

/// Label used for the single group in show-all mode.
pub const SHOW_ALL_LABEL: &str = "全部新闻";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Everything seen today.
    Daily,
    /// Only titles on the lists right now, scored with the whole day's history.
    Current,
    /// Only titles that first appeared in this round.
    Incremental,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Daily => "daily",
            ReportMode::Current => "current",
            ReportMode::Incremental => "incremental",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportMode::Daily => "当日汇总",
            ReportMode::Current => "当前榜单汇总",
            ReportMode::Incremental => "当日增量",
        }
    }

    fn empty_message(&self) -> &'static str {
        match self {
            ReportMode::Daily => "暂无匹配的热点词汇",
            ReportMode::Current => "当前榜单模式下暂无匹配的热点词汇",
            ReportMode::Incremental => "增量模式下暂无新增匹配的热点词汇",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportMode::Daily),
            "current" => Ok(ReportMode::Current),
            "incremental" => Ok(ReportMode::Incremental),
            other => Err(TrendError::config(
                format!("unknown report mode {other}"),
                "use daily, current or incremental",
            )),
        }
    }
}

/// One headline as presented to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeadline {
    pub title: String,
    pub source_name: String,
    pub ranks: Vec<u32>,
    pub time_display: String,
    pub count: u32,
    pub url: String,
    pub mobile_url: String,
    pub is_new: bool,
}

impl ReportHeadline {
    /// Mobile link when there is one, desktop link otherwise.
    pub fn link(&self) -> &str {
        if self.mobile_url.is_empty() {
            &self.url
        } else {
            &self.mobile_url
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub word: String,
    pub titles: Vec<ReportHeadline>,
}

impl GroupReport {
    pub fn count(&self) -> usize {
        self.titles.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceArrivals {
    pub source_id: String,
    pub source_name: String,
    pub titles: Vec<ReportHeadline>,
}

/// Everything a renderer needs, already grouped and ordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub mode: ReportMode,
    pub rank_threshold: u32,
    pub stats: Vec<GroupReport>,
    pub new_titles: Vec<SourceArrivals>,
    pub failed_ids: Vec<String>,
    pub total_new_count: usize,
}

impl ReportData {
    /// Group the ranked list by matched rule group and attach the new
    /// arrivals section.
    ///
    /// Groups are ordered by size, largest first; a group keeps the weight
    /// order of its headlines. New arrivals go through the same keyword
    /// rules and are left out entirely in incremental mode, where every
    /// reported headline is already new.
    pub fn prepare(
        scored: &[ScoredHeadline],
        new_arrivals: &NewArrivals,
        matcher: &KeywordMatcher,
        names: &HashMap<String, String>,
        failed: &[String],
        mode: ReportMode,
        rank_threshold: u32,
    ) -> Self {
        let fresh: HashSet<(&str, &str)> = new_arrivals
            .iter()
            .flat_map(|(platform_id, titles)| titles.keys().map(move |title| (platform_id, title)))
            .collect();

        let mut stats: Vec<GroupReport> = Vec::new();
        for headline in scored {
            let word = headline.group_key.as_deref().unwrap_or(SHOW_ALL_LABEL);
            let entry = ReportHeadline {
                title: headline.title.clone(),
                source_name: headline.source_name.clone(),
                ranks: headline.ranks.clone(),
                time_display: time_display(&headline.first_seen, &headline.last_seen),
                count: headline.count,
                url: headline.url.clone(),
                mobile_url: headline.mobile_url.clone(),
                is_new: fresh.contains(&(headline.platform_id.as_str(), headline.title.as_str())),
            };
            match stats.iter_mut().find(|group| group.word == word) {
                Some(group) => group.titles.push(entry),
                None => stats.push(GroupReport {
                    word: word.to_string(),
                    titles: vec![entry],
                }),
            }
        }
        stats.sort_by(|a, b| b.count().cmp(&a.count()));

        let new_titles = if mode == ReportMode::Incremental {
            Vec::new()
        } else {
            arrivals_section(new_arrivals, matcher, names)
        };
        let total_new_count = new_titles.iter().map(|source| source.titles.len()).sum();

        info!(
            "Prepared {} report: {} groups, {} new titles, {} failed platforms",
            mode,
            stats.len(),
            total_new_count,
            failed.len()
        );

        Self {
            mode,
            rank_threshold,
            stats,
            new_titles,
            failed_ids: failed.to_vec(),
            total_new_count,
        }
    }

    pub fn total_matched(&self) -> usize {
        self.stats.iter().map(GroupReport::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn empty_message(&self) -> &'static str {
        self.mode.empty_message()
    }
}

fn arrivals_section(
    new_arrivals: &NewArrivals,
    matcher: &KeywordMatcher,
    names: &HashMap<String, String>,
) -> Vec<SourceArrivals> {
    let mut sections = Vec::new();
    for (platform_id, titles) in new_arrivals.iter() {
        let source_name = names
            .get(platform_id)
            .cloned()
            .unwrap_or_else(|| platform_id.to_string());

        let matched: Vec<ReportHeadline> = titles
            .iter()
            .filter(|(title, _)| matcher.matches(title))
            .map(|(title, entry)| ReportHeadline {
                title: title.to_string(),
                source_name: source_name.clone(),
                ranks: entry.ranks.clone(),
                time_display: String::new(),
                count: 1,
                url: entry.url.clone(),
                mobile_url: entry.mobile_url.clone(),
                is_new: true,
            })
            .collect();

        if !matched.is_empty() {
            sections.push(SourceArrivals {
                source_id: platform_id.to_string(),
                source_name,
                titles: matched,
            });
        }
    }
    sections
}

/// Per-channel highlight for rank ranges that reach the hot zone.
pub trait RankMarkup {
    fn highlight(&self, range: &str) -> String;
}

/// Plain text, no highlight.
pub struct PlainRank;

impl RankMarkup for PlainRank {
    fn highlight(&self, range: &str) -> String {
        range.to_string()
    }
}

/// `[min]` or `[min - max]`, highlighted when the best rank is within `threshold`.
pub fn format_rank(ranks: &[u32], threshold: u32, markup: &dyn RankMarkup) -> String {
    let range = trend_core::rank_range(ranks);
    match ranks.iter().min() {
        Some(&best) if best <= threshold => markup.highlight(&range),
        _ => range,
    }
}

struct HtmlRank;

impl RankMarkup for HtmlRank {
    fn highlight(&self, range: &str) -> String {
        format!("<span class=\"rank hot\">{range}</span>")
    }
}

const HTML_STYLE: &str = r#"
        * { box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif; margin: 0; padding: 16px; background: #fafafa; color: #333; line-height: 1.5; }
        .container { max-width: 600px; margin: 0 auto; background: white; border-radius: 12px; overflow: hidden; box-shadow: 0 2px 16px rgba(0,0,0,0.06); }
        .header { background: linear-gradient(135deg, #4f46e5 0%, #7c3aed 100%); color: white; padding: 32px 24px; text-align: center; }
        .title { font-size: 24px; font-weight: 700; margin: 0 0 8px; }
        .subtitle { font-size: 14px; opacity: 0.95; margin: 0; }
        .content { padding: 24px; }
        .section { margin-bottom: 32px; }
        .section-title { font-size: 16px; font-weight: 600; color: #1f2937; margin: 0 0 16px; padding-bottom: 8px; border-bottom: 2px solid #e5e7eb; }
        .section-count { font-size: 14px; color: #6b7280; font-weight: 500; }
        .news-item { background: #f9fafb; border-radius: 8px; padding: 16px; margin-bottom: 12px; }
        .news-title { font-size: 15px; font-weight: 500; color: #1f2937; margin: 0 0 8px; }
        .news-title a { color: inherit; text-decoration: none; }
        .news-meta { font-size: 13px; color: #6b7280; display: flex; flex-wrap: wrap; gap: 12px; }
        .rank { display: inline-block; background: #e0e7ff; color: #4338ca; padding: 2px 6px; border-radius: 4px; font-size: 12px; font-weight: 600; }
        .rank.hot { background: #fef2f2; color: #dc2626; }
        .badge.new { background: #fef3c7; color: #d97706; padding: 2px 8px; border-radius: 4px; font-size: 12px; }
        .failed { color: #dc2626; }
        .footer { padding: 16px 24px; font-size: 12px; color: #9ca3af; text-align: center; }
"#;

/// Standalone HTML page for a prepared report.
pub struct HtmlReport;

impl HtmlReport {
    pub fn render(report: &ReportData, total_titles: usize, generated_at: &str) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        html.push_str("<title>热点新闻分析</title>\n<style>");
        html.push_str(HTML_STYLE);
        html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");

        html.push_str(&format!(
            "<div class=\"header\"><div class=\"title\">{}</div><div class=\"subtitle\">{}</div>\
             <div class=\"subtitle\">新闻总数 {} · 匹配 {}</div></div>\n",
            html_escape(report.mode.title()),
            html_escape(generated_at),
            total_titles,
            report.total_matched()
        ));
        html.push_str("<div class=\"content\">\n");

        if report.stats.is_empty() {
            html.push_str(&format!(
                "<div class=\"section\"><div class=\"section-title\">{}</div></div>\n",
                html_escape(report.empty_message())
            ));
        }

        let total_groups = report.stats.len();
        for (index, group) in report.stats.iter().enumerate() {
            html.push_str(&format!(
                "<div class=\"section\"><div class=\"section-title\">{} <span class=\"section-count\">[{}/{}] {} 条</span></div>\n",
                html_escape(&group.word),
                index + 1,
                total_groups,
                group.count()
            ));
            for headline in &group.titles {
                html.push_str(&render_item(headline, report.rank_threshold, true));
            }
            html.push_str("</div>\n");
        }

        if !report.new_titles.is_empty() {
            html.push_str(&format!(
                "<div class=\"section\"><div class=\"section-title\">本次新增热点新闻 <span class=\"section-count\">共 {} 条</span></div>\n",
                report.total_new_count
            ));
            for source in &report.new_titles {
                html.push_str(&format!(
                    "<div class=\"news-meta\"><strong>{}</strong> ({} 条)</div>\n",
                    html_escape(&source.source_name),
                    source.titles.len()
                ));
                for headline in &source.titles {
                    html.push_str(&render_item(headline, report.rank_threshold, false));
                }
            }
            html.push_str("</div>\n");
        }

        if !report.failed_ids.is_empty() {
            html.push_str("<div class=\"section\"><div class=\"section-title\">数据获取失败的平台</div>\n<ul>\n");
            for id in &report.failed_ids {
                html.push_str(&format!("<li class=\"failed\">{}</li>\n", html_escape(id)));
            }
            html.push_str("</ul></div>\n");
        }

        html.push_str(&format!(
            "</div>\n<div class=\"footer\">更新时间 {}</div>\n</div>\n</body>\n</html>\n",
            html_escape(generated_at)
        ));
        html
    }

    /// Write the page to `{output_dir}/{day}/html/{file_name}.html` and
    /// refresh `{output_dir}/index.html`. Returns the dated path.
    pub async fn write(output_dir: &Path, day: &str, file_name: &str, html: &str) -> Result<PathBuf> {
        let dir = output_dir.join(day).join("html");
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{file_name}.html"));
        tokio::fs::write(&path, html).await?;
        tokio::fs::write(output_dir.join("index.html"), html).await?;

        info!("HTML report written to {}", path.display());
        Ok(path)
    }
}

fn render_item(headline: &ReportHeadline, rank_threshold: u32, show_source: bool) -> String {
    let title = html_escape(&headline.title);
    let link = headline.link();
    let title_html = if link.is_empty() {
        title
    } else {
        format!("<a href=\"{}\" target=\"_blank\">{}</a>", html_escape(link), title)
    };

    let mut meta = Vec::new();
    if show_source {
        meta.push(html_escape(&headline.source_name));
    }
    if !headline.ranks.is_empty() {
        let rank = format_rank(&headline.ranks, rank_threshold, &HtmlRank);
        if rank.starts_with('<') {
            meta.push(rank);
        } else {
            meta.push(format!("<span class=\"rank\">{rank}</span>"));
        }
    }
    if !headline.time_display.is_empty() {
        meta.push(html_escape(&headline.time_display));
    }
    if headline.count > 1 {
        meta.push(format!("{}次", headline.count));
    }
    if headline.is_new && show_source {
        meta.push("<span class=\"badge new\">NEW</span>".to_string());
    }

    format!(
        "<div class=\"news-item\"><div class=\"news-title\">{}</div><div class=\"news-meta\">{}</div></div>\n",
        title_html,
        meta.join(" ")
    )
}
