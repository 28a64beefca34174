pub mod google_news;
pub mod rss_feed;

pub use google_news::{GoogleNewsSource, NewsLocale};
pub use rss_feed::RssFeedSource;
