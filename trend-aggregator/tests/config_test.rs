mod common;

use std::collections::HashMap;
use trend_aggregator::config::StorageBackend;
use trend_aggregator::{AppConfig, ConfigValidator, KeywordRules, Result, TrendError};

const SAMPLE_CONFIG: &str = r#"
[app]
log_level = "debug"

[crawler]
request_timeout_seconds = 5
max_retries = 1
use_proxy = true
proxy_url = "http://127.0.0.1:7890"

[report]
mode = "incremental"
rank_threshold = 5

[weight]
rank_weight = 0.5
frequency_weight = 0.4
hotness_weight = 0.1

[storage]
backend = "sqlite"
database_url = "sqlite::memory:"

[notification]
feishu_url = "https://open.feishu.cn/hook/abc"

[[platforms]]
id = "weibo"
name = "微博"

[[platforms]]
id = "zhihu"
"#;

#[test]
fn test_parse_full_config() -> Result<()> {
    common::init_tracing();
    let config = AppConfig::from_toml(SAMPLE_CONFIG)?;

    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.report.mode, "incremental");
    assert_eq!(config.report.rank_threshold, 5);
    assert_eq!(config.report.output_dir, "output");
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.platforms.len(), 2);
    assert_eq!(config.platforms[0].display_name(), "微博");
    assert_eq!(config.platforms[1].display_name(), "zhihu");

    let weights = config.weights();
    assert_eq!(weights.rank, 0.5);
    assert_eq!(weights.frequency, 0.4);

    let fetch = config.crawler.fetch_config();
    assert_eq!(fetch.timeout_seconds, 5);
    assert_eq!(fetch.max_retries, 1);
    assert_eq!(fetch.proxy_url.as_deref(), Some("http://127.0.0.1:7890"));

    ConfigValidator::validate(&config)?;
    Ok(())
}

#[test]
fn test_defaults_for_missing_sections() -> Result<()> {
    let config = AppConfig::from_toml("")?;

    assert_eq!(config.report.rank_threshold, 10);
    assert_eq!(config.report.mode, "daily");
    assert_eq!(config.storage.backend, StorageBackend::Text);
    assert_eq!(config.crawler.max_concurrency, 10);
    assert!(config.crawler.enable_crawler);
    assert!(config.crawler.fetch_config().proxy_url.is_none());
    assert!(config.notification.enabled);
    assert!(!config.notification.has_any_channel());
    assert_eq!(config.weights(), trend_core::WeightConfig::default());
    Ok(())
}

#[test]
fn test_proxy_ignored_unless_enabled() -> Result<()> {
    let config = AppConfig::from_toml(
        r#"
        [crawler]
        proxy_url = "http://127.0.0.1:7890"
        "#,
    )?;
    assert!(config.crawler.fetch_config().proxy_url.is_none());
    Ok(())
}

#[test]
fn test_bad_toml_is_an_error() {
    let result = AppConfig::from_toml("[report\nmode = ");
    assert!(matches!(result, Err(TrendError::Toml(_))));
}

#[test]
fn test_environment_overrides_webhooks() -> Result<()> {
    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    let env: HashMap<&str, &str> = HashMap::from([
        ("FEISHU_WEBHOOK_URL", "https://open.feishu.cn/hook/from-env"),
        ("DINGTALK_WEBHOOK_URL", "   "),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "-10042"),
    ]);

    config
        .notification
        .apply_overrides(|key| env.get(key).map(|value| value.to_string()));

    assert_eq!(config.notification.feishu_url, "https://open.feishu.cn/hook/from-env");
    assert!(config.notification.dingtalk_url.is_empty(), "blank values are ignored");
    assert_eq!(config.notification.telegram_bot_token, "123:abc");
    assert_eq!(config.notification.telegram_chat_id, "-10042");
    assert!(config.notification.has_any_channel());
    Ok(())
}

#[test]
fn test_keyword_file_parsing() {
    let rules = KeywordRules::parse(
        "华为\n+芯片\n\n\n特斯拉\n马斯克\n!广告\n\n  +AI  \n模型\n\n!推广\n",
    );

    assert_eq!(rules.groups.len(), 3);
    assert_eq!(rules.groups[0].required, vec!["芯片"]);
    assert_eq!(rules.groups[0].normal, vec!["华为"]);
    assert_eq!(rules.groups[0].group_key, "华为");
    assert_eq!(rules.groups[1].normal, vec!["特斯拉", "马斯克"]);
    assert_eq!(rules.groups[1].group_key, "特斯拉 马斯克");
    assert_eq!(rules.groups[2].required, vec!["AI"]);
    assert_eq!(rules.filters, vec!["广告", "推广"]);
}

#[test]
fn test_keyword_file_with_only_required_terms() {
    let rules = KeywordRules::parse("+AI\n+芯片\n");
    assert_eq!(rules.groups.len(), 1);
    assert_eq!(rules.groups[0].group_key, "AI 芯片");
}

#[test]
fn test_empty_keyword_file() {
    let rules = KeywordRules::parse("\n\n  \n");
    assert!(rules.groups.is_empty());
    assert!(rules.filters.is_empty());
}

#[test]
fn test_keyword_file_missing_path() {
    let result = KeywordRules::load(Some(std::path::Path::new("/nonexistent/frequency_words.txt")));
    assert!(matches!(result, Err(TrendError::Config { .. })));
}

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE_CONFIG)?;

    let config = AppConfig::load(Some(&path))?;
    assert_eq!(config.platforms.len(), 2);
    Ok(())
}

#[test]
fn test_validator_rejects_bad_weights() -> Result<()> {
    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.weight.rank_weight = 0.9;
    assert!(matches!(
        ConfigValidator::validate(&config),
        Err(TrendError::Config { .. })
    ));

    config.weight.rank_weight = -0.1;
    config.weight.frequency_weight = 1.0;
    assert!(ConfigValidator::validate(&config).is_err());
    Ok(())
}

#[test]
fn test_validator_accepts_rounding_slack() -> Result<()> {
    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.weight.rank_weight = 0.333;
    config.weight.frequency_weight = 0.333;
    config.weight.hotness_weight = 0.333;
    ConfigValidator::validate(&config)?;
    Ok(())
}

#[test]
fn test_validator_rejects_platform_problems() -> Result<()> {
    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.platforms[1].id = "weibo".to_string();
    assert!(ConfigValidator::validate(&config).is_err(), "duplicate ids");

    config.platforms.clear();
    assert!(ConfigValidator::validate(&config).is_err(), "no platforms");
    Ok(())
}

#[test]
fn test_validator_rejects_report_and_webhook_problems() -> Result<()> {
    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.report.mode = "weekly".to_string();
    assert!(ConfigValidator::validate(&config).is_err());

    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.report.rank_threshold = 0;
    assert!(ConfigValidator::validate(&config).is_err());

    let mut config = AppConfig::from_toml(SAMPLE_CONFIG)?;
    config.notification.wework_url = "ftp://example.com/hook".to_string();
    assert!(ConfigValidator::validate(&config).is_err());
    Ok(())
}

#[test]
fn test_shipped_config_files_are_valid() -> Result<()> {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("config");
    let config = AppConfig::load(Some(&root.join("config.toml")))?;
    ConfigValidator::validate(&config)?;

    let rules = KeywordRules::load(Some(&root.join("frequency_words.txt")))?;
    assert!(!rules.groups.is_empty());
    assert_eq!(rules.filters, vec!["广告", "推广"]);
    Ok(())
}
