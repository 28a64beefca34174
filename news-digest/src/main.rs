use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use news_digest::config::{AppConfig, DEFAULT_CONFIG, LINE_RECIPIENT_ENV};
use news_digest::webhook::{self, LineReplier, WebhookState};
use news_digest::{
    deliver, FeedSource, Fetcher, GoogleNewsSource, HtmlSummarizer, LinePusher, NewsPipeline, RssFeedSource,
    TinyUrlShortener,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "news-digest", about = "Filter, classify and push a daily news digest")]
struct Cli {
    /// TOML file layered over the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the digest instead of pushing it
    #[arg(long)]
    dry_run: bool,

    /// Push recipient, overrides LINE_GROUP_ID
    #[arg(long)]
    recipient: Option<String>,

    /// Print the built-in configuration and exit
    #[arg(long)]
    print_default_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the LINE webhook that replies with the group ID
    Webhook {
        /// Listen address, overrides webhook.bind
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", DEFAULT_CONFIG.trim_start());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::defaults(),
    };
    config.apply_env();
    if let Some(recipient) = cli.recipient.clone() {
        config.line.recipient = Some(recipient);
    }

    if let Some(Command::Webhook { bind }) = cli.command {
        let bind = bind.unwrap_or_else(|| config.webhook.bind.clone());
        let channel_token = config.line_config()?.channel_token;
        let replier = LineReplier::new(channel_token, &config.fetch)?.with_endpoint(config.webhook.reply_endpoint.clone());
        let state = WebhookState::new(config.channel_secret()?, Arc::new(replier));
        webhook::serve(&bind, state).await?;
        return Ok(());
    }

    info!("Starting news digest run");

    let fetcher = Fetcher::new(config.fetch_config()).context("building HTTP client")?;
    let sources = build_sources(&config, &fetcher);
    if sources.is_empty() {
        warn!("No feeds configured");
    }

    let mut builder = NewsPipeline::builder()
        .add_sources(sources)
        .category_table(config.category_table())
        .admission(config.admission_filter())
        .options(config.pipeline_options())
        .summarizer(Box::new(HtmlSummarizer::new(fetcher.clone())));
    if config.enrichment.shorten_links {
        builder = builder.shortener(Box::new(TinyUrlShortener::new(&config.fetch)?));
    }
    let pipeline = builder.build();

    let report = pipeline.run(Utc::now()).await;
    for (kind, count) in &report.rejections {
        info!("Rejected ({}): {}", kind, count);
    }
    for failed in report.failed_sources() {
        warn!("Source unavailable: {} ({})", failed.source_name, failed.url);
    }

    let messages = config
        .formatter()
        .on_date(Local::now().date_naive())
        .format(&report.digest, config.digest.limit);

    if cli.dry_run {
        for (i, message) in messages.iter().enumerate() {
            println!("----- message {} of {} -----", i + 1, messages.len());
            println!("{}", message);
        }
        return Ok(());
    }

    let Some(recipient) = config.line.recipient.clone() else {
        bail!("no recipient configured (set {} or pass --recipient)", LINE_RECIPIENT_ENV);
    };
    let pusher = LinePusher::new(config.line_config()?, &config.fetch)?;

    let deliveries = deliver(&pusher, &recipient, &messages).await;
    let failed = deliveries.iter().filter(|d| !d.status.is_success()).count();
    if failed > 0 {
        error!("{} of {} messages failed to deliver", failed, deliveries.len());
    } else {
        info!("Delivered {} message(s) to {}", deliveries.len(), recipient);
    }

    Ok(())
}

fn build_sources(config: &AppConfig, fetcher: &Fetcher) -> Vec<Box<dyn FeedSource>> {
    let locale = config.locale();
    let mut sources: Vec<Box<dyn FeedSource>> = Vec::new();

    for query in &config.feeds.google_news_queries {
        match GoogleNewsSource::new(query, &locale, fetcher.clone()) {
            Ok(source) => sources.push(Box::new(source)),
            Err(e) => error!("Skipping query '{}': {}", query, e),
        }
    }
    for url in &config.feeds.urls {
        sources.push(Box::new(RssFeedSource::new(url.clone(), fetcher.clone())));
    }
    sources
}
