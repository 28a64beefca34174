use crate::admission::{AdmissionFilter, AdmissionPolicy, ExclusionList};
use crate::classifier::{CategoryTable, ClassificationMode};
use crate::config::AppConfig;
use crate::dedup::SeenTitleSet;
use crate::digest::CategorizedDigest;
use crate::types::{
    AdmittedItem, DeliveryReport, FeedSource, LinkShortener, Pusher, RawItem, RunReport, SourceReport,
    SourceStatus, Summarizer,
};
use crate::utils::text::excerpt;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub classification: ClassificationMode,
    /// Fetch an excerpt for every admitted item.
    pub attach_summaries: bool,
    pub summary_max_chars: usize,
    pub shorten_links: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            classification: ClassificationMode::TitleOnly,
            attach_summaries: false,
            summary_max_chars: 100,
            shorten_links: false,
        }
    }
}

/// One configured filter-and-classify pipeline. Every call to [`run`]
/// starts from empty state.
///
/// [`run`]: NewsPipeline::run
pub struct NewsPipeline {
    sources: Vec<Box<dyn FeedSource>>,
    table: CategoryTable,
    filter: AdmissionFilter,
    summarizer: Option<Box<dyn Summarizer>>,
    shortener: Option<Box<dyn LinkShortener>>,
    options: PipelineOptions,
}

impl NewsPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn FeedSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        self.run_inner(run_id, now).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport {
            run_id,
            started_at: now,
            digest: CategorizedDigest::new(&self.table),
            sources: Vec::new(),
            rejections: BTreeMap::new(),
        };

        if self.sources.is_empty() || self.table.categories().is_empty() {
            warn!(
                "Nothing to do: {} source(s), {} categories",
                self.sources.len(),
                self.table.categories().len()
            );
            return report;
        }

        info!("Starting run with {} sources", self.sources.len());

        // Fetches may overlap; admission below walks results strictly in
        // source order so the seen set observes every earlier admission.
        let fetched = join_all(self.sources.iter().map(|source| source.fetch())).await;

        let mut seen = SeenTitleSet::new();
        for (source, result) in self.sources.iter().zip(fetched) {
            let mut source_report = SourceReport {
                source_name: source.source_name(),
                url: source.url().to_string(),
                status: SourceStatus::Ok,
                entries_found: 0,
                admitted: 0,
            };

            let items = match result {
                Ok(items) => items,
                Err(e) => {
                    warn!("Failed to fetch {}: {:#}", source_report.source_name, e);
                    source_report.status = SourceStatus::Failed(format!("{:#}", e));
                    report.sources.push(source_report);
                    continue;
                }
            };
            source_report.entries_found = items.len();

            for item in items {
                match self.filter.admit(&item, now, &mut seen) {
                    Ok(_) => {
                        let admitted = self.enrich(item).await;
                        report.digest.push(admitted);
                        source_report.admitted += 1;
                    }
                    Err(rejection) => {
                        debug!("Rejected '{}': {}", item.title, rejection);
                        report.record_rejection(&rejection);
                    }
                }
            }

            info!(
                "{}: {} entries, {} admitted",
                source_report.source_name, source_report.entries_found, source_report.admitted
            );
            report.sources.push(source_report);
        }

        info!(
            "Run finished: {} admitted out of {} entries",
            report.digest.total_items(),
            report.total_entries()
        );
        report
    }

    /// Classify an admitted item and attach summary / short link.
    async fn enrich(&self, item: RawItem) -> AdmittedItem {
        let feed_summary = item
            .summary
            .as_deref()
            .map(|text| excerpt(text, self.options.summary_max_chars))
            .filter(|text| !text.is_empty());
        let mut summary = None;
        let mut summary_fetched = false;

        let mut category = self.table.find_match(&item.title).map(str::to_string);

        if category.is_none() && self.options.classification == ClassificationMode::TwoPhase {
            // The feed's own description is tried before fetching the page.
            if let Some(text) = &feed_summary {
                category = self.reclassify(&item.title, text);
                if category.is_some() {
                    summary = feed_summary.clone();
                }
            }
            if category.is_none() {
                summary = self.summarize(&item).await;
                summary_fetched = true;
                if let Some(text) = &summary {
                    category = self.reclassify(&item.title, text);
                }
            }
        }
        let category = category.unwrap_or_else(|| self.table.fallback_label().to_string());

        if self.options.attach_summaries && summary.is_none() {
            if !summary_fetched {
                summary = self.summarize(&item).await;
            }
            summary = summary.or(feed_summary);
        }

        let short_link = if self.options.shorten_links {
            self.shorten(&item.link).await
        } else {
            None
        };

        debug!("'{}' -> {}", item.title, category);
        AdmittedItem::new(item, category)
            .with_summary(summary)
            .with_short_link(short_link)
    }

    fn reclassify(&self, title: &str, summary: &str) -> Option<String> {
        self.table.find_match(&format!("{} {}", title, summary)).map(str::to_string)
    }

    async fn summarize(&self, item: &RawItem) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        summarizer.summarize(&item.link, self.options.summary_max_chars).await
    }

    async fn shorten(&self, link: &str) -> Option<String> {
        let shortener = self.shortener.as_ref()?;
        match shortener.shorten(link).await {
            Ok(short) => Some(short),
            Err(e) => {
                warn!("Keeping original link {}: {:#}", link, e);
                None
            }
        }
    }
}

/// Run the pipeline once over `sources` with no enrichment collaborators,
/// admitting under the built-in admission policy.
pub async fn run_pipeline(
    sources: Vec<Box<dyn FeedSource>>,
    table: &CategoryTable,
    exclusions: &ExclusionList,
    now: DateTime<Utc>,
) -> CategorizedDigest {
    let policy = AppConfig::defaults().admission_policy();
    run_pipeline_with_policy(sources, table, exclusions, &policy, now).await
}

pub async fn run_pipeline_with_policy(
    sources: Vec<Box<dyn FeedSource>>,
    table: &CategoryTable,
    exclusions: &ExclusionList,
    policy: &AdmissionPolicy,
    now: DateTime<Utc>,
) -> CategorizedDigest {
    let pipeline = NewsPipeline::builder()
        .add_sources(sources)
        .category_table(table.clone())
        .admission(AdmissionFilter::new(policy.clone(), exclusions.clone()))
        .build();
    pipeline.run(now).await.digest
}

/// Push each message in order. Failures are reported, never fatal.
pub async fn deliver(pusher: &dyn Pusher, recipient: &str, messages: &[String]) -> Vec<DeliveryReport> {
    let mut reports = Vec::with_capacity(messages.len());
    for (message_index, message) in messages.iter().enumerate() {
        let status = pusher.push(message, recipient).await;
        if !status.is_success() {
            warn!("Message {} to {} not delivered: {:?}", message_index, recipient, status);
        }
        reports.push(DeliveryReport {
            message_index,
            recipient: recipient.to_string(),
            status,
        });
    }
    reports
}

/// Pipeline builder for easier configuration
pub struct PipelineBuilder {
    pipeline: NewsPipeline,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: NewsPipeline {
                sources: Vec::new(),
                table: CategoryTable::default(),
                filter: AdmissionFilter::default(),
                summarizer: None,
                shortener: None,
                options: PipelineOptions::default(),
            },
        }
    }

    pub fn add_source(mut self, source: Box<dyn FeedSource>) -> Self {
        info!("Adding source to pipeline: {}", source.source_name());
        self.pipeline.sources.push(source);
        self
    }

    pub fn add_sources(self, sources: impl IntoIterator<Item = Box<dyn FeedSource>>) -> Self {
        sources.into_iter().fold(self, |builder, source| builder.add_source(source))
    }

    pub fn category_table(mut self, table: CategoryTable) -> Self {
        self.pipeline.table = table;
        self
    }

    pub fn admission(mut self, filter: AdmissionFilter) -> Self {
        self.pipeline.filter = filter;
        self
    }

    pub fn summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.pipeline.summarizer = Some(summarizer);
        self
    }

    pub fn shortener(mut self, shortener: Box<dyn LinkShortener>) -> Self {
        self.pipeline.shortener = Some(shortener);
        self
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.pipeline.options = options;
        self
    }

    pub fn build(self) -> NewsPipeline {
        self.pipeline
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
