mod common;

use serde_json::json;
use std::time::Duration;
use trend_aggregator::config::NotificationConfig;
use trend_aggregator::notifiers::{
    DingTalkNotifier, FeishuNotifier, TelegramNotifier, WeWorkNotifier, WebhookClient, build_notifiers,
    split_into_batches,
};
use trend_aggregator::{Notifier, ReportData, ReportMode, Result};
use trend_core::{KeywordMatcher, NewArrivals};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn report_with(count: usize) -> ReportData {
    let scored: Vec<_> = (0..count)
        .map(|i| {
            common::scored(
                "weibo",
                &format!("热点新闻标题第{i}条，内容足够长以便测试分批发送的行为"),
                &[(i % 20) as u32 + 1],
                None,
                (count - i) as f64,
            )
        })
        .collect();
    ReportData::prepare(
        &scored,
        &NewArrivals::new(),
        &KeywordMatcher::show_all(),
        &common::names(&["weibo"]),
        &["zhihu".to_string()],
        ReportMode::Current,
        5,
    )
}

fn webhook(server: &MockServer, hook: &str) -> Result<WebhookClient> {
    WebhookClient::new(format!("{}{hook}", server.uri()), None, Duration::ZERO)
}

#[test]
fn test_split_respects_byte_limit() {
    let content = (0..200)
        .map(|i| format!("第{i}行：一些中文内容"))
        .collect::<Vec<_>>()
        .join("\n");

    let batches = split_into_batches(&content, 500);
    assert!(batches.len() > 1);
    for batch in &batches {
        assert!(batch.len() <= 500, "batch of {} bytes", batch.len());
    }
    let rejoined = batches.join("\n");
    assert!(rejoined.contains("第0行") && rejoined.contains("第199行"));
}

#[test]
fn test_split_short_content_is_one_batch() {
    assert_eq!(split_into_batches("短消息", 100), vec!["短消息".to_string()]);
}

#[test]
fn test_split_truncates_overlong_line() {
    let line = "长".repeat(100);
    let batches = split_into_batches(&format!("开头\n{line}\n结尾"), 31);
    for batch in &batches {
        assert!(batch.len() <= 31);
        assert!(std::str::from_utf8(batch.as_bytes()).is_ok());
    }
    assert_eq!(batches.first().map(String::as_str), Some("开头"));
    assert_eq!(batches.last().map(String::as_str), Some("结尾"));
}

#[tokio::test]
async fn test_feishu_delivery() -> Result<()> {
    common::init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feishu"))
        .and(body_partial_json(json!({ "msg_type": "text", "content": { "report_type": "当前榜单汇总" } })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = FeishuNotifier::new(webhook(&server, "/feishu")?);
    let report = report_with(3);
    let text = notifier.render(&report);
    assert!(text.contains("全部新闻"));
    assert!(text.contains("zhihu"));

    assert_eq!(notifier.send(&report, ReportMode::Current.title()).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_dingtalk_errcode_checked() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dingtalk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 310000, "errmsg": "keywords not in content" })))
        .mount(&server)
        .await;

    let notifier = DingTalkNotifier::new(webhook(&server, "/dingtalk")?);
    assert!(notifier.send(&report_with(2), "当日汇总").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_wework_requires_zero_errcode() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ok"))
        .and(body_partial_json(json!({ "msgtype": "markdown" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0, "errmsg": "ok" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/silent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let report = report_with(2);
    let ok = WeWorkNotifier::new(webhook(&server, "/ok")?);
    assert!(ok.render(&report).starts_with("**总新闻数：** 2"));
    assert_eq!(ok.send(&report, "当日汇总").await?, 1);

    let silent = WeWorkNotifier::new(webhook(&server, "/silent")?);
    assert!(silent.send(&report, "当日汇总").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_http_error_fails_delivery() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = FeishuNotifier::new(webhook(&server, "/feishu")?);
    assert!(notifier.send(&report_with(1), "当日汇总").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_telegram_splits_long_reports() -> Result<()> {
    common::init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": "-10042", "parse_mode": "HTML" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(&server.uri(), "123:abc", "-10042", None, Duration::ZERO)?;
    let report = report_with(80);
    assert!(notifier.render(&report).len() > notifier.max_bytes());

    let batches = notifier.send(&report, "当前榜单汇总").await?;
    assert!(batches > 1);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), batches);
    for (index, request) in requests.iter().enumerate() {
        let body: serde_json::Value = serde_json::from_slice(&request.body)?;
        let text = body["text"].as_str().unwrap_or_default();
        assert!(text.len() <= notifier.max_bytes());
        assert!(text.starts_with(&format!("[batch {}/{}]", index + 1, batches)));
    }
    Ok(())
}

#[tokio::test]
async fn test_telegram_rejection() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "description": "chat not found" })))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(&server.uri(), "t", "c", None, Duration::ZERO)?;
    assert!(notifier.send(&report_with(1), "当日汇总").await.is_err());
    Ok(())
}

#[test]
fn test_build_notifiers_from_config() -> Result<()> {
    let mut config = NotificationConfig::default();
    assert!(build_notifiers(&config, None)?.is_empty());

    config.feishu_url = "https://open.feishu.cn/hook/a".to_string();
    config.wework_url = "https://qyapi.weixin.qq.com/hook/b".to_string();
    config.telegram_bot_token = "123:abc".to_string();
    let channels: Vec<&str> = build_notifiers(&config, None)?
        .iter()
        .map(|notifier| notifier.channel())
        .collect();
    assert_eq!(channels, vec!["feishu", "wework"], "telegram needs a chat id too");

    config.telegram_chat_id = "-1".to_string();
    assert_eq!(build_notifiers(&config, None)?.len(), 3);
    Ok(())
}
