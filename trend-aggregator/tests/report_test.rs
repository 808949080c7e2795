mod common;

use trend_aggregator::report::{PlainRank, RankMarkup, SHOW_ALL_LABEL, format_rank};
use trend_aggregator::{HtmlReport, ReportData, ReportMode, Result};
use trend_core::{KeywordMatcher, NewArrivals, RuleGroup};

fn matcher() -> KeywordMatcher {
    KeywordMatcher::new(
        &[
            RuleGroup::new(vec![], vec!["华为".to_string()]),
            RuleGroup::new(vec![], vec!["特斯拉".to_string()]),
        ],
        &["广告".to_string()],
    )
}

fn arrivals() -> NewArrivals {
    let mut arrivals = NewArrivals::new();
    arrivals.insert(
        "weibo",
        common::headlines(&[("华为新机", 4), ("无关新闻", 5), ("华为广告", 6)]),
    );
    arrivals.insert("zhihu", common::headlines(&[("随便聊聊", 1)]));
    arrivals
}

fn sample_report(mode: ReportMode) -> ReportData {
    let scored = vec![
        common::scored("weibo", "特斯拉降价", &[1, 2], Some("特斯拉"), 30.0),
        common::scored("weibo", "华为新机", &[4], Some("华为"), 20.0),
        common::scored("zhihu", "华为财报", &[12], Some("华为"), 10.0),
    ];
    ReportData::prepare(
        &scored,
        &arrivals(),
        &matcher(),
        &common::names(&["weibo", "zhihu"]),
        &["baidu".to_string()],
        mode,
        5,
    )
}

#[test]
fn test_prepare_groups_by_size_then_weight() {
    common::init_tracing();
    let report = sample_report(ReportMode::Daily);

    let words: Vec<&str> = report.stats.iter().map(|g| g.word.as_str()).collect();
    assert_eq!(words, vec!["华为", "特斯拉"], "largest group first");

    let huawei: Vec<&str> = report.stats[0].titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(huawei, vec!["华为新机", "华为财报"]);
    assert!(report.stats[0].titles[0].is_new);
    assert!(!report.stats[0].titles[1].is_new);
    assert_eq!(report.stats[0].titles[0].time_display, "09-00 ~ 10-30");

    assert_eq!(report.total_matched(), 3);
    assert_eq!(report.failed_ids, vec!["baidu"]);
}

#[test]
fn test_new_arrivals_follow_keyword_rules() {
    let report = sample_report(ReportMode::Current);

    assert_eq!(report.new_titles.len(), 1, "sources with no match are dropped");
    let weibo = &report.new_titles[0];
    assert_eq!(weibo.source_name, "WEIBO");
    let titles: Vec<&str> = weibo.titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["华为新机"], "unmatched and filtered titles are dropped");
    assert_eq!(report.total_new_count, 1);
}

#[test]
fn test_incremental_report_has_no_new_section() {
    let report = sample_report(ReportMode::Incremental);
    assert!(report.new_titles.is_empty());
    assert_eq!(report.total_new_count, 0);
    assert_eq!(report.stats.len(), 2);
}

#[test]
fn test_show_all_uses_single_label() {
    let scored = vec![
        common::scored("weibo", "任意标题", &[3], None, 5.0),
        common::scored("weibo", "另一个", &[8], None, 4.0),
    ];
    let report = ReportData::prepare(
        &scored,
        &NewArrivals::new(),
        &KeywordMatcher::show_all(),
        &common::names(&["weibo"]),
        &[],
        ReportMode::Daily,
        10,
    );
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.stats[0].word, SHOW_ALL_LABEL);
    assert_eq!(report.stats[0].count(), 2);
}

#[test]
fn test_empty_report_messages() {
    let report = ReportData::prepare(
        &[],
        &NewArrivals::new(),
        &matcher(),
        &common::names(&[]),
        &[],
        ReportMode::Incremental,
        10,
    );
    assert!(report.is_empty());
    assert_eq!(report.empty_message(), "增量模式下暂无新增匹配的热点词汇");
}

struct Brackets;

impl RankMarkup for Brackets {
    fn highlight(&self, range: &str) -> String {
        format!("*{range}*")
    }
}

#[test]
fn test_rank_formatting() {
    assert_eq!(format_rank(&[3], 5, &Brackets), "*[3]*");
    assert_eq!(format_rank(&[8, 2, 5], 5, &Brackets), "*[2 - 8]*");
    assert_eq!(format_rank(&[6, 9], 5, &Brackets), "[6 - 9]");
    assert_eq!(format_rank(&[1], 5, &PlainRank), "[1]");
    assert_eq!(format_rank(&[], 5, &Brackets), "");
}

#[test]
fn test_report_mode_parsing() -> Result<()> {
    assert_eq!(" Current ".parse::<ReportMode>()?, ReportMode::Current);
    assert_eq!("incremental".parse::<ReportMode>()?, ReportMode::Incremental);
    assert!("weekly".parse::<ReportMode>().is_err());
    assert_eq!(ReportMode::Daily.to_string(), "daily");
    assert_eq!(ReportMode::Daily.title(), "当日汇总");
    Ok(())
}

#[tokio::test]
async fn test_html_render_and_write() -> Result<()> {
    let report = sample_report(ReportMode::Daily);
    let html = HtmlReport::render(&report, 42, "2025-10-08 10:30:00");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("新闻总数 42 · 匹配 3"));
    assert!(html.contains("<span class=\"rank hot\">[4]</span>"));
    assert!(html.contains("<span class=\"rank\">[12]</span>"));
    assert!(html.contains("本次新增热点新闻"));
    assert!(html.contains("<li class=\"failed\">baidu</li>"));
    assert!(html.contains("2次"));

    let dir = tempfile::tempdir()?;
    let path = HtmlReport::write(dir.path(), "2025-10-08", ReportMode::Daily.title(), &html).await?;
    assert_eq!(path, dir.path().join("2025-10-08").join("html").join("当日汇总.html"));
    assert_eq!(tokio::fs::read_to_string(&path).await?, html);
    assert_eq!(tokio::fs::read_to_string(dir.path().join("index.html")).await?, html);

    let again = HtmlReport::render(&sample_report(ReportMode::Current), 42, "2025-10-08 11:00:00");
    HtmlReport::write(dir.path(), "2025-10-08", ReportMode::Current.title(), &again).await?;
    assert_eq!(tokio::fs::read_to_string(dir.path().join("index.html")).await?, again);
    assert!(path.exists(), "earlier pages are kept");
    Ok(())
}

#[test]
fn test_html_escapes_titles() {
    let scored = vec![common::scored("weibo", "<script>华为</script>", &[1], Some("华为"), 1.0)];
    let report = ReportData::prepare(
        &scored,
        &NewArrivals::new(),
        &matcher(),
        &common::names(&["weibo"]),
        &[],
        ReportMode::Daily,
        5,
    );
    let html = HtmlReport::render(&report, 1, "now");
    assert!(html.contains("&lt;script&gt;华为&lt;/script&gt;"));
    assert!(!html.contains("<script>华为"));
}
