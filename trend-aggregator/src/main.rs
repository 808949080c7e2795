use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trend_aggregator::{AppConfig, ConfigValidator, KeywordRules, ReportMode, TrendPipeline};

#[derive(Parser, Debug)]
#[command(name = "trend-radar", about = "Trending headline aggregation and ranking")]
struct Cli {
    /// Config file (default: $CONFIG_PATH or config/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keyword file (default: $FREQUENCY_WORDS_PATH or config/frequency_words.txt)
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,

    /// Override the configured report mode
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Skip chat notifications for this run
    #[arg(long, global = true)]
    no_notify: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one round, rebuild today's report and notify
    Run,
    /// Validate the config and keyword files
    Check,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("loading config")?;
    init_tracing(&config.app.log_level);

    let rules = KeywordRules::load(cli.keywords.as_deref()).context("loading keyword file")?;
    if let Err(e) = ConfigValidator::validate(&config) {
        error!("{}", e);
        return Err(e).context("invalid config");
    }

    let mode: ReportMode = cli
        .mode
        .as_deref()
        .unwrap_or(config.report.mode.as_str())
        .parse()
        .context("parsing report mode")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => {
            info!(
                "Config OK: {} platforms, mode {}, {} storage",
                config.platforms.len(),
                mode,
                config.storage.backend.as_str()
            );
            for group in &rules.groups {
                info!(
                    "Group [{}]: required {:?}, normal {:?}",
                    group.group_key, group.required, group.normal
                );
            }
            info!("{} filter terms", rules.filters.len());
            Ok(())
        }
        Command::Run => {
            info!("Starting TrendRadar ({} mode)", mode);
            let pipeline = TrendPipeline::new(config, rules, mode, !cli.no_notify).await?;
            let summary = pipeline.run_once().await?;
            if let Some(path) = &summary.report_path {
                info!("Report: {}", path.display());
            }
            info!(
                "Finished: {} matched, {} new, {} channels notified",
                summary.matched, summary.new_titles, summary.notified_channels
            );
            Ok(())
        }
    }
}
