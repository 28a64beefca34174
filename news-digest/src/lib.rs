pub mod types;
pub mod utils;
pub mod normalizer;
pub mod dedup;
pub mod admission;
pub mod classifier;
pub mod digest;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod summarizer;
pub mod shortener;
pub mod push;
pub mod pipeline;
pub mod config;
pub mod webhook;

pub use types::*;
pub use admission::{AdmissionFilter, AdmissionPolicy, ExclusionList, Rejection, UnparsedTimestamp};
pub use classifier::{Category, CategoryTable, ClassificationMode};
pub use config::AppConfig;
pub use dedup::{is_duplicate, SeenTitleSet};
pub use digest::{CategorizedDigest, DigestFormatter, OverflowMode};
pub use fetcher::Fetcher;
pub use normalizer::{normalize, NormalizedTitle};
pub use parser::FeedParser;
pub use pipeline::{deliver, run_pipeline, run_pipeline_with_policy, NewsPipeline, PipelineBuilder, PipelineOptions};
pub use push::{LineConfig, LinePusher};
pub use shortener::TinyUrlShortener;
pub use sources::{GoogleNewsSource, NewsLocale, RssFeedSource};
pub use summarizer::HtmlSummarizer;
pub use webhook::{LineReplier, ReplySender, WebhookState};
