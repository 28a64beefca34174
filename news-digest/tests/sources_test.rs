mod common;

use common::*;
use news_digest::config::AppConfig;
use news_digest::sources::google_news::{search_url, GOOGLE_NEWS_SEARCH};
use news_digest::{FeedParser, FeedSource, FetchConfig, Fetcher, GoogleNewsSource, NewsLocale, NewsPipeline, RssFeedSource};
use tracing::info;
use url::Url;

fn offline_fetcher() -> Fetcher {
    Fetcher::new(FetchConfig {
        user_agent: "News-Digest-Test/1.0".to_string(),
        max_retries: 0,
        retry_delay_seconds: 0,
        min_host_interval_ms: 0,
        ..FetchConfig::default()
    })
    .unwrap()
}

#[test]
fn search_url_carries_query_and_locale() {
    init_tracing();
    let url = search_url("新光金控 人事", &NewsLocale::default()).unwrap();
    info!("Search URL: {}", url);

    assert!(url.starts_with(GOOGLE_NEWS_SEARCH));
    let parsed = Url::parse(&url).unwrap();
    let pairs: Vec<(String, String)> = parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    assert_eq!(
        pairs,
        vec![
            ("q".to_string(), "新光金控 人事".to_string()),
            ("hl".to_string(), "zh-TW".to_string()),
            ("gl".to_string(), "TW".to_string()),
            ("ceid".to_string(), "TW:zh-Hant".to_string()),
        ]
    );
}

#[test]
fn sources_describe_themselves() {
    init_tracing();
    let fetcher = offline_fetcher();

    let google = GoogleNewsSource::new("新光人壽", &NewsLocale::default(), fetcher.clone()).unwrap();
    assert_eq!(google.query(), "新光人壽");
    assert_eq!(google.source_name(), "Google News: 新光人壽");
    assert!(google.url().starts_with(GOOGLE_NEWS_SEARCH));

    let rss = RssFeedSource::new("https://feeds.example.com.tw/finance.xml".to_string(), fetcher.clone());
    assert_eq!(rss.source_name(), "RSS Feed (feeds.example.com.tw)");

    let titled = RssFeedSource::new("https://feeds.example.com.tw/finance.xml".to_string(), fetcher)
        .with_title(Some("財經新聞".to_string()));
    assert_eq!(titled.source_name(), "財經新聞");
}

#[tokio::test]
async fn unreachable_feed_is_an_error_not_a_panic() {
    init_tracing();
    let source = RssFeedSource::new("not a url".to_string(), offline_fetcher());
    assert!(source.fetch().await.is_err());
}

const GOOGLE_NEWS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"新光金控" - Google 新聞</title>
    <link>https://news.google.com</link>
    <description>Google 新聞</description>
    <item>
      <title>新光金控Q3獲利創新高 - 工商時報</title>
      <link>https://news.google.com/rss/articles/a1</link>
      <guid>a1</guid>
      <pubDate>Mon, 10 Mar 2025 07:00:00 GMT</pubDate>
    </item>
    <item>
      <title>新光金控Q3獲利創新高 - 經濟日報</title>
      <link>https://news.google.com/rss/articles/a2</link>
      <guid>a2</guid>
      <pubDate>Mon, 10 Mar 2025 06:30:00 GMT</pubDate>
    </item>
    <item>
      <title>新光人壽新任總經理接任 - 某部落格</title>
      <link>https://news.google.com/rss/articles/a3</link>
      <guid>a3</guid>
      <pubDate>Mon, 10 Mar 2025 06:00:00 GMT</pubDate>
    </item>
    <item>
      <title>金管會發布保險業監理新規 - 自由時報</title>
      <link>https://news.google.com/rss/articles/a4</link>
      <guid>a4</guid>
      <pubDate>Fri, 07 Mar 2025 06:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

#[tokio::test]
async fn parsed_google_news_feed_flows_through_admission() {
    init_tracing();
    let parsed = FeedParser::new().with_outlet_from_title(true).parse_feed(GOOGLE_NEWS_SAMPLE).unwrap();
    assert_eq!(parsed.entries.len(), 4);

    let config = AppConfig::defaults();
    let report = NewsPipeline::builder()
        .add_source(StaticSource::boxed("google", parsed.entries))
        .category_table(config.category_table())
        .admission(config.admission_filter())
        .build()
        .run(now())
        .await;

    // a2 repeats a1, a3 comes from an unlisted outlet, a4 is three days old.
    assert_eq!(report.digest.total_items(), 1);
    assert_eq!(report.digest.items("📈 業績 / 財報")[0].item.source_name(), "工商時報");
    assert_eq!(report.rejections.get("duplicate"), Some(&1));
    assert_eq!(report.rejections.get("unrecognized_source"), Some(&1));
    assert_eq!(report.rejections.get("stale"), Some(&1));
}
